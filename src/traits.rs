use std::sync::Arc;

/// Maximum weight a single entry may carry.
pub(crate) const MAXIMUM_WEIGHT: u32 = i32::MAX as u32;

/// Cost function over values.
///
/// The returned weight is the number of capacity units the value consumes.
/// It must be at least 1. Bound a cache by entry count with the default
/// weigher, or by any other resource by returning its cost here. A change to
/// a value that affects its weight requires re-inserting the entry.
///
/// Closures implement this trait directly:
///
/// ```
/// use linked_cache::{Cache, CacheBuilder};
///
/// let cache: Cache<String, Vec<u8>> = CacheBuilder::new(1024)
/// 	.weigher(|value: &Vec<u8>| value.len().max(1) as u32)
/// 	.build();
/// ```
pub trait Weigher<V>: Send + Sync {
	/// The units of capacity `value` consumes.
	fn weight_of(&self, value: &V) -> u32;
}

impl<V, F> Weigher<V> for F
where
	F: Fn(&V) -> u32 + Send + Sync,
{
	fn weight_of(&self, value: &V) -> u32 {
		self(value)
	}
}

/// Cost function over entries, for weights that depend on the key too.
pub trait EntryWeigher<K, V>: Send + Sync {
	/// The units of capacity the `(key, value)` entry consumes.
	fn weight_of_entry(&self, key: &K, value: &V) -> u32;
}

impl<K, V, F> EntryWeigher<K, V> for F
where
	F: Fn(&K, &V) -> u32 + Send + Sync,
{
	fn weight_of_entry(&self, key: &K, value: &V) -> u32 {
		self(key, value)
	}
}

/// Callback invoked once per evicted entry.
///
/// Runs on whichever thread happens to drain the notification queue, after
/// the entry has already left the map. Entries removed explicitly are not
/// reported. Long-running work belongs elsewhere; hand the pair off to a
/// channel or task if the callback may be slow.
pub trait EvictionListener<K, V>: Send + Sync {
	fn on_evict(&self, key: &K, value: Arc<V>);
}

impl<K, V, F> EvictionListener<K, V> for F
where
	F: Fn(&K, Arc<V>) + Send + Sync,
{
	fn on_evict(&self, key: &K, value: Arc<V>) {
		self(key, value)
	}
}

/// The default weigher: every entry costs one unit, bounding the map by
/// entry count.
pub(crate) struct SingletonWeigher;

impl<K, V> EntryWeigher<K, V> for SingletonWeigher {
	fn weight_of_entry(&self, _key: &K, _value: &V) -> u32 {
		1
	}
}

/// Adapts a value-only weigher to the entry-weigher seam.
pub(crate) struct ValueWeigher<W>(pub(crate) W);

impl<K, V, W> EntryWeigher<K, V> for ValueWeigher<W>
where
	W: Weigher<V>,
{
	fn weight_of_entry(&self, _key: &K, value: &V) -> u32 {
		self.0.weight_of(value)
	}
}

/// Enforces the weight contract on every call to a user-supplied weigher.
pub(crate) struct BoundedEntryWeigher<W>(pub(crate) W);

impl<K, V, W> EntryWeigher<K, V> for BoundedEntryWeigher<W>
where
	W: EntryWeigher<K, V>,
{
	fn weight_of_entry(&self, key: &K, value: &V) -> u32 {
		let weight = self.0.weight_of_entry(key, value);
		assert!(
			(1..=MAXIMUM_WEIGHT).contains(&weight),
			"weigher returned {weight}, expected 1..={MAXIMUM_WEIGHT}"
		);
		weight
	}
}
