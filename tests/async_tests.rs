//! Tests for usage from async tasks. The cache is synchronous, but values
//! come out as `Arc`, so holding them across await points is safe.

use std::sync::Arc;

use linked_cache::{Cache, CacheBuilder};

fn cache_of(capacity: u64) -> Arc<Cache<u64, String>> {
	Arc::new(CacheBuilder::new(capacity).build())
}

#[tokio::test]
async fn test_value_held_across_await() {
	let cache = cache_of(1024);
	cache.insert(1, "async test".to_string());

	if let Some(value) = cache.get(&1) {
		tokio::time::sleep(tokio::time::Duration::from_millis(1)).await;
		assert_eq!(*value, "async test");
	} else {
		panic!("value should exist");
	}
}

#[tokio::test]
async fn test_concurrent_async_readers() {
	let cache = cache_of(102_400);

	for i in 0..100 {
		cache.insert(i, format!("value-{i}"));
	}

	let mut handles = vec![];
	for task_id in 0..10u64 {
		let cache = cache.clone();
		handles.push(tokio::spawn(async move {
			for i in 0..100 {
				let key = (task_id * 100 + i) % 100;
				if let Some(value) = cache.get(&key) {
					tokio::time::sleep(tokio::time::Duration::from_micros(1)).await;
					assert!(!value.is_empty());
				}
			}
		}));
	}

	for handle in handles {
		handle.await.expect("task should not panic");
	}
}

#[tokio::test]
async fn test_async_insert_and_get() {
	let cache = cache_of(10_240);

	let tasks: Vec<_> = (0..20u64)
		.map(|i| {
			let cache = cache.clone();
			tokio::spawn(async move {
				let value = format!("async-{i}");
				cache.insert(i, value.clone());

				tokio::time::sleep(tokio::time::Duration::from_micros(10)).await;

				let retrieved = cache.get(&i).expect("inserted in this task");
				assert_eq!(*retrieved, value);
			})
		})
		.collect();

	for task in tasks {
		task.await.expect("task should not panic");
	}
}

#[tokio::test]
async fn test_eviction_under_async_load() {
	let cache = cache_of(32);

	let tasks: Vec<_> = (0..4u64)
		.map(|t| {
			let cache = cache.clone();
			tokio::spawn(async move {
				for i in 0..200 {
					cache.insert(t * 200 + i, "payload".to_string());
					if i % 16 == 0 {
						tokio::task::yield_now().await;
					}
				}
			})
		})
		.collect();

	for task in tasks {
		task.await.expect("task should not panic");
	}

	// Each drain applies a bounded batch of write tasks; repeat until the
	// backlog left by the joined tasks is settled.
	for _ in 0..1_000 {
		if cache.weighted_size() <= cache.capacity() {
			break;
		}
		cache.ascending_key_set();
	}
	assert!(cache.weighted_size() <= cache.capacity());
}
