use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use linked_cache::{Cache, CacheBuilder};

fn populated_cache(capacity: u64, entries: u64) -> Arc<Cache<u64, Vec<u8>>> {
	let cache = Arc::new(CacheBuilder::new(capacity).build());
	for i in 0..entries {
		cache.insert(i, vec![0u8; 64]);
	}
	cache
}

fn bench_insert(c: &mut Criterion) {
	let mut group = c.benchmark_group("insert");

	for size in [100u64, 1_000, 10_000] {
		group.throughput(Throughput::Elements(size));
		group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
			b.iter(|| {
				let cache: Cache<u64, Vec<u8>> = CacheBuilder::new(size * 2).build();
				for i in 0..size {
					cache.insert(black_box(i), black_box(vec![0u8; 64]));
				}
			});
		});
	}

	group.finish();
}

fn bench_get_hit(c: &mut Criterion) {
	let cache = populated_cache(10_000, 1_000);

	c.bench_function("get_hit", |b| {
		b.iter(|| {
			for i in 0..1_000 {
				let _ = cache.get(&black_box(i));
			}
		});
	});
}

fn bench_get_vs_get_quietly(c: &mut Criterion) {
	let cache = populated_cache(10_000, 100);

	let mut group = c.benchmark_group("get_methods");

	group.bench_function("get", |b| {
		b.iter(|| {
			for i in 0..100 {
				let _ = cache.get(&black_box(i));
			}
		});
	});

	group.bench_function("get_quietly", |b| {
		b.iter(|| {
			for i in 0..100 {
				let _ = cache.get_quietly(&black_box(i));
			}
		});
	});

	group.finish();
}

fn bench_mixed_workload(c: &mut Criterion) {
	let cache = populated_cache(10_000, 500);

	c.bench_function("mixed_80_20", |b| {
		b.iter(|| {
			for i in 0..100u64 {
				if i % 5 == 0 {
					// 20% writes
					cache.insert(black_box(i), black_box(vec![0u8; 64]));
				} else {
					// 80% reads
					let _ = cache.get(&black_box(i % 500));
				}
			}
		});
	});
}

fn bench_concurrent_reads(c: &mut Criterion) {
	use std::thread;

	let cache = populated_cache(10_000, 1_000);

	c.bench_function("concurrent_reads_4_threads", |b| {
		b.iter(|| {
			let mut handles = vec![];

			for _ in 0..4 {
				let cache = cache.clone();
				handles.push(thread::spawn(move || {
					for i in 0..250 {
						let _ = cache.get(&i);
					}
				}));
			}

			for handle in handles {
				handle.join().unwrap();
			}
		});
	});
}

fn bench_eviction_pressure(c: &mut Criterion) {
	c.bench_function("eviction_pressure", |b| {
		b.iter(|| {
			// Small capacity so most inserts evict.
			let cache: Cache<u64, Vec<u8>> = CacheBuilder::new(100).build();
			for i in 0..1_000 {
				cache.insert(black_box(i), vec![0u8; 100]);
			}
		});
	});
}

fn bench_weighted_inserts(c: &mut Criterion) {
	c.bench_function("weighted_inserts", |b| {
		b.iter(|| {
			let cache: Cache<u64, Vec<u8>> = CacheBuilder::new(64 * 1024)
				.weigher(|value: &Vec<u8>| value.len().max(1) as u32)
				.build();
			for i in 0..500u64 {
				cache.insert(black_box(i), vec![0u8; (i % 256 + 1) as usize]);
			}
		});
	});
}

fn bench_zipf_hit_rate(c: &mut Criterion) {
	let cache = populated_cache(200, 0);

	// A skewed access pattern: the first key appears 100 times, the second
	// 50 times, and so on.
	let zipf_keys: Vec<u64> = (0..100u64)
		.flat_map(|i| {
			let freq = 100 / (i + 1);
			vec![i; freq as usize]
		})
		.collect();

	c.bench_function("zipf_distribution", |b| {
		b.iter(|| {
			for &key in &zipf_keys {
				if cache.get(&key).is_none() {
					cache.insert(key, vec![0u8; 64]);
				}
			}
		});
	});
}

criterion_group!(
	benches,
	bench_insert,
	bench_get_hit,
	bench_get_vs_get_quietly,
	bench_mixed_workload,
	bench_concurrent_reads,
	bench_eviction_pressure,
	bench_weighted_inserts,
	bench_zipf_hit_rate
);

criterion_main!(benches);
