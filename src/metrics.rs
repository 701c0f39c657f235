//! Cache performance metrics.

/// Point-in-time snapshot of cache activity.
///
/// Counters are cumulative for the lifetime of the cache; `clear` removes
/// entries but does not rewind history.
///
/// # Example
///
/// ```
/// use linked_cache::{Cache, CacheBuilder};
///
/// let cache: Cache<u64, String> = CacheBuilder::new(1000).build();
/// // ... perform cache operations ...
///
/// let metrics = cache.metrics();
/// println!("Hit rate: {:.2}%", metrics.hit_rate() * 100.0);
/// println!("Utilization: {:.2}%", metrics.utilization() * 100.0);
/// println!("Evictions: {}", metrics.evictions);
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
	/// Number of successful lookups.
	pub hits: u64,
	/// Number of lookups that found no entry.
	pub misses: u64,
	/// Number of new entries inserted.
	pub inserts: u64,
	/// Number of existing entries whose value was replaced.
	pub updates: u64,
	/// Number of entries evicted by the page-replacement policy.
	pub evictions: u64,
	/// Number of entries removed explicitly.
	pub removals: u64,
	/// Combined weight of the resident entries.
	pub weighted_size: u64,
	/// Maximum weighted capacity.
	pub capacity: u64,
	/// Current number of entries.
	pub len: usize,
}

impl CacheMetrics {
	/// The fraction of lookups that hit, between 0.0 and 1.0.
	///
	/// Returns 0.0 when there have been no lookups.
	pub fn hit_rate(&self) -> f64 {
		let total = self.hits + self.misses;
		if total == 0 {
			0.0
		} else {
			self.hits as f64 / total as f64
		}
	}

	/// The fraction of weighted capacity in use, between 0.0 and 1.0.
	pub fn utilization(&self) -> f64 {
		if self.capacity == 0 {
			0.0
		} else {
			self.weighted_size as f64 / self.capacity as f64
		}
	}

	/// Total lookups, hit or miss.
	pub fn total_accesses(&self) -> u64 {
		self.hits + self.misses
	}

	/// Total write operations, inserts plus updates.
	pub fn total_writes(&self) -> u64 {
		self.inserts + self.updates
	}
}
