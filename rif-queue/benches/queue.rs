use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::Rng;
use rif::Val;
use rif_queue::{BlockingQueue, ConcurrentQueue};
use std::hint::black_box;
use std::sync::Arc;
use std::thread;

fn bench_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_push_pop");
    let val = Val::int(1).unwrap();

    for batch in [1, 64, 1_024] {
        group.throughput(Throughput::Elements(batch as u64));

        group.bench_with_input(BenchmarkId::new("concurrent", batch), &batch, |b, &batch| {
            let queue = ConcurrentQueue::new().unwrap();
            b.iter(|| {
                for _ in 0..batch {
                    queue.push(val.clone()).unwrap();
                }
                for _ in 0..batch {
                    black_box(queue.pop());
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("blocking", batch), &batch, |b, &batch| {
            let queue = BlockingQueue::new().unwrap();
            b.iter(|| {
                for _ in 0..batch {
                    queue.push(val.clone()).unwrap();
                }
                for _ in 0..batch {
                    black_box(queue.pop());
                }
            });
        });
    }
    group.finish();
}

fn bench_random_mix(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_random_mix");
    const OPS: usize = 10_000;
    group.throughput(Throughput::Elements(OPS as u64));

    for threads in [1, 2, 4] {
        group.bench_with_input(BenchmarkId::new("concurrent", threads), &threads, |b, &threads| {
            b.iter(|| {
                let queue = Arc::new(ConcurrentQueue::new().unwrap());
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let queue = Arc::clone(&queue);
                        thread::spawn(move || {
                            let mut rng = rand::rng();
                            for _ in 0..OPS / threads {
                                if rng.random_range(0..2) == 0 {
                                    queue.push(Val::Null).unwrap();
                                } else {
                                    black_box(queue.pop());
                                }
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().unwrap();
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_push_pop, bench_random_mix);
criterion_main!(benches);
