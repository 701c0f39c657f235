use crate::cache::{Cache, MAXIMUM_CAPACITY};
use crate::traits::{
	BoundedEntryWeigher, EntryWeigher, EvictionListener, SingletonWeigher, ValueWeigher, Weigher,
};

const DEFAULT_INITIAL_CAPACITY: usize = 16;
const DEFAULT_CONCURRENCY_LEVEL: usize = 16;

/// Builder for configuring a [`Cache`].
///
/// The maximum weighted capacity is the one required setting and is taken by
/// [`CacheBuilder::new`]. Everything else has a default.
///
/// # Example
///
/// ```
/// use linked_cache::CacheBuilder;
///
/// let cache = CacheBuilder::new(10_000)
/// 	.initial_capacity(256)
/// 	.concurrency_level(8)
/// 	.build();
///
/// cache.insert("alpha", 1u64);
/// assert_eq!(cache.get(&"alpha").as_deref(), Some(&1));
/// ```
pub struct CacheBuilder<K: 'static, V: 'static> {
	capacity: u64,
	initial_capacity: usize,
	concurrency_level: usize,
	weigher: Box<dyn EntryWeigher<K, V>>,
	listener: Option<Box<dyn EvictionListener<K, V>>>,
}

impl<K, V> CacheBuilder<K, V>
where
	K: std::hash::Hash + Eq + Clone + Send + Sync + 'static,
	V: Send + Sync + 'static,
{
	/// Creates a builder bounding the cache at `maximum_weighted_capacity`
	/// units. With the default weigher every entry costs one unit, so the
	/// bound is an entry count.
	pub fn new(maximum_weighted_capacity: u64) -> Self {
		Self {
			capacity: maximum_weighted_capacity,
			initial_capacity: DEFAULT_INITIAL_CAPACITY,
			concurrency_level: DEFAULT_CONCURRENCY_LEVEL,
			weigher: Box::new(SingletonWeigher),
			listener: None,
		}
	}

	/// Sizes the hash table for this many entries up front (default 16).
	pub fn initial_capacity(mut self, initial_capacity: usize) -> Self {
		self.initial_capacity = initial_capacity;
		self
	}

	/// Estimated number of concurrently updating threads (default 16).
	/// Sizing hint for the backing table's shards; must be nonzero.
	pub fn concurrency_level(mut self, concurrency_level: usize) -> Self {
		self.concurrency_level = concurrency_level;
		self
	}

	/// Uses `weigher` to determine how many units of capacity a value
	/// consumes. The weigher must return at least 1 for every value; a
	/// violation panics at the offending call.
	pub fn weigher<W>(mut self, weigher: W) -> Self
	where
		W: Weigher<V> + 'static,
	{
		self.weigher = Box::new(BoundedEntryWeigher(ValueWeigher(weigher)));
		self
	}

	/// Like [`CacheBuilder::weigher`], but the cost may depend on the key.
	pub fn entry_weigher<W>(mut self, weigher: W) -> Self
	where
		W: EntryWeigher<K, V> + 'static,
	{
		self.weigher = Box::new(BoundedEntryWeigher(weigher));
		self
	}

	/// Registers a callback invoked once per evicted entry. Entries removed
	/// explicitly are not reported. The callback runs on whichever thread
	/// drains the notification queue.
	pub fn listener<L>(mut self, listener: L) -> Self
	where
		L: EvictionListener<K, V> + 'static,
	{
		self.listener = Some(Box::new(listener));
		self
	}

	/// Builds the cache.
	///
	/// # Panics
	///
	/// Panics if `concurrency_level` is zero. Configuration problems surface
	/// here, never during later map operations.
	pub fn build(self) -> Cache<K, V> {
		assert!(self.concurrency_level > 0, "concurrency_level must be positive");
		Cache::from_parts(
			self.capacity.min(MAXIMUM_CAPACITY),
			self.initial_capacity,
			self.concurrency_level,
			self.weigher,
			self.listener,
		)
	}
}
