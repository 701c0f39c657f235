//! # Linked Cache
//!
//! A bounded, concurrent, in-memory map with:
//! - **Weighted capacity** (entry count by default, any cost function via a
//!   weigher)
//! - **Approximate LRU eviction** kept eventually consistent with the table
//!   through lossy read buffers and a replayed write buffer
//! - **Non-blocking hot paths** (the eviction lock is only ever tried, never
//!   waited on, by reads and writes)
//! - **Eviction notifications** delivered exactly once per evicted entry
//!
//! ## Quick Start
//!
//! ```rust
//! use linked_cache::CacheBuilder;
//!
//! let cache = CacheBuilder::new(10_000).build();
//!
//! cache.insert("user:1".to_string(), vec![1u8, 2, 3]);
//!
//! // Values come out as Arc, so reads are cheap to share across threads.
//! if let Some(blob) = cache.get(&"user:1".to_string()) {
//! 	println!("{} bytes", blob.len());
//! }
//! ```
//!
//! ## Bounding by weight
//!
//! ```rust
//! use linked_cache::CacheBuilder;
//!
//! // Bound by total payload bytes instead of entry count.
//! let cache = CacheBuilder::new(64 * 1024)
//! 	.weigher(|value: &Vec<u8>| value.len().max(1) as u32)
//! 	.listener(|key: &String, _value: std::sync::Arc<Vec<u8>>| println!("evicted {key}"))
//! 	.build();
//!
//! cache.insert("a".to_string(), vec![0u8; 1024]);
//! assert_eq!(cache.weighted_size(), 1024);
//! ```
//!
//! ## Ordering guarantees
//!
//! Table mutations are immediately visible to every thread. The eviction
//! order is a *hint*: reads are folded into it lazily, in batches, by
//! whichever thread next wins the eviction lock without blocking. The
//! ordered snapshot views ([`Cache::ascending_map`] and friends) force a
//! full drain first and are therefore not constant-time.
//!
//! ## Thread Safety
//!
//! The cache is `Send + Sync`; share it via `Arc`:
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//!
//! use linked_cache::CacheBuilder;
//!
//! let cache = Arc::new(CacheBuilder::new(1000).build());
//!
//! let handles: Vec<_> = (0..4u64)
//! 	.map(|t| {
//! 		let cache = cache.clone();
//! 		thread::spawn(move || {
//! 			cache.insert(t, t * 10);
//! 			cache.get(&t);
//! 		})
//! 	})
//! 	.collect();
//!
//! for handle in handles {
//! 	handle.join().unwrap();
//! }
//! ```

mod builder;
mod cache;
mod deque;
mod metrics;
mod node;
mod read_buffer;
mod traits;

pub use builder::CacheBuilder;
pub use cache::Cache;
pub use metrics::CacheMetrics;
pub use traits::{EntryWeigher, EvictionListener, Weigher};
