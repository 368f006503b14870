//! Scalar bodies and the pair.

use crate::hash::{hash_64, mix_32};
use crate::val::{Kind, Object, Val};

/// 64-bit signed integer body.
#[derive(Debug, Clone, Copy)]
pub struct Int(i64);

impl Int {
    /// Wraps `value`.
    pub fn new(value: i64) -> Self {
        Int(value)
    }

    /// The wrapped integer.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl Object for Int {
    fn kind(&self) -> Kind {
        Kind::Int
    }

    fn hashcode(&self) -> u32 {
        hash_64((self.0 as u64).wrapping_mul(13))
    }

    fn equals(&self, other: &dyn Object) -> bool {
        other
            .as_any()
            .downcast_ref::<Int>()
            .is_some_and(|other| other.0 == self.0)
    }

    fn tostring(&self) -> Option<String> {
        Some(self.0.to_string())
    }
}

/// 64-bit float body.
#[derive(Debug, Clone, Copy)]
pub struct Double(f64);

impl Double {
    /// Wraps `value`.
    pub fn new(value: f64) -> Self {
        Double(value)
    }

    /// The wrapped float.
    pub fn get(&self) -> f64 {
        self.0
    }
}

impl Object for Double {
    fn kind(&self) -> Kind {
        Kind::Double
    }

    fn hashcode(&self) -> u32 {
        // Truncating cast: 0.0 and -0.0 share a hash.
        hash_64(self.0 as u64)
    }

    fn equals(&self, other: &dyn Object) -> bool {
        other
            .as_any()
            .downcast_ref::<Double>()
            .is_some_and(|other| other.0 == self.0)
    }

    fn tostring(&self) -> Option<String> {
        let mut text = general_16(self.0);
        if !text.contains('.') {
            text.push_str(".0");
        }
        Some(text)
    }
}

/// Significant digits of a rendered double.
const DOUBLE_DIGITS: i32 = 16;

/// `value` with [`DOUBLE_DIGITS`] significant digits, trailing zeros
/// stripped, switching to exponent form outside `1e-4..1e16`.
fn general_16(value: f64) -> String {
    if value.is_nan() {
        return if value.is_sign_negative() { "-nan" } else { "nan" }.to_string();
    }
    if value.is_infinite() {
        return if value < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    let scientific = format!("{:.*e}", (DOUBLE_DIGITS - 1) as usize, value);
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if exponent < -4 || exponent >= DOUBLE_DIGITS {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{sign}{:02}",
            strip_fraction_zeros(mantissa),
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (DOUBLE_DIGITS - 1 - exponent) as usize;
        strip_fraction_zeros(&format!("{value:.decimals$}")).to_string()
    }
}

fn strip_fraction_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// Immutable string body.
#[derive(Debug, Clone)]
pub struct Str(Box<str>);

impl Str {
    /// Copies `value`.
    pub fn new(value: &str) -> Self {
        Str(value.into())
    }

    /// The string contents.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Object for Str {
    fn kind(&self) -> Kind {
        Kind::String
    }

    fn hashcode(&self) -> u32 {
        self.0.bytes().fold(0, |hash, b| mix_32(hash, b as u32))
    }

    fn equals(&self, other: &dyn Object) -> bool {
        other
            .as_any()
            .downcast_ref::<Str>()
            .is_some_and(|other| other.0 == self.0)
    }

    fn tostring(&self) -> Option<String> {
        Some(format!("\"{}\"", self.0))
    }
}

/// Two retained members.
#[derive(Debug, Clone)]
pub struct Pair {
    first: Val,
    second: Val,
}

impl Pair {
    /// Takes over both members.
    pub fn new(first: Val, second: Val) -> Self {
        Pair { first, second }
    }

    /// First member.
    pub fn first(&self) -> &Val {
        &self.first
    }

    /// Second member.
    pub fn second(&self) -> &Val {
        &self.second
    }

    /// Replaces both members, releasing the old ones.
    pub fn set(&mut self, first: Val, second: Val) {
        self.first = first;
        self.second = second;
    }
}

impl Object for Pair {
    fn kind(&self) -> Kind {
        Kind::Pair
    }

    fn hashcode(&self) -> u32 {
        mix_32(self.first.hashcode(), self.second.hashcode()).wrapping_mul(11)
    }

    fn equals(&self, other: &dyn Object) -> bool {
        other.as_any().downcast_ref::<Pair>().is_some_and(|other| {
            self.first.equals(&other.first) && self.second.equals(&other.second)
        })
    }

    fn tostring(&self) -> Option<String> {
        let first = self.first.tostring()?;
        let second = self.second.tostring()?;
        Some(format!("({first}, {second})"))
    }
}
