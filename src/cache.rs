use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, AtomicU8, Ordering};

use ahash::RandomState;
use crossbeam_queue::SegQueue;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::deque::AccessDeque;
use crate::metrics::CacheMetrics;
use crate::node::{self, Node, WeightedValue};
use crate::read_buffer::{READ_BUFFER_DRAIN_THRESHOLD, READ_BUFFER_THRESHOLD, ReadBuffers, thread_index};
use crate::traits::{EntryWeigher, EvictionListener};

/// Upper bound on the configurable capacity, leaving headroom so adding one
/// maximum-weight entry to a full cache cannot overflow the signed
/// weighted-size counter.
pub(crate) const MAXIMUM_CAPACITY: u64 = i64::MAX as u64 - i32::MAX as u64;

/// Maximum write tasks applied per amortized drain.
const WRITE_BUFFER_DRAIN_THRESHOLD: usize = 16;

const IDLE: u8 = 0;
const REQUIRED: u8 = 1;
const PROCESSING: u8 = 2;

/// Governs when a thread should try to apply the buffered reads and writes
/// to the page-replacement policy.
struct DrainStatus(AtomicU8);

impl DrainStatus {
	fn new() -> Self {
		Self(AtomicU8::new(IDLE))
	}

	fn should_drain(&self, delayable: bool) -> bool {
		match self.0.load(Ordering::Acquire) {
			IDLE => !delayable,
			REQUIRED => true,
			// A drain is already in progress.
			_ => false,
		}
	}

	fn set(&self, status: u8) {
		self.0.store(status, Ordering::Release);
	}

	/// Leaves a concurrently-set `REQUIRED` in place.
	fn finish(&self) {
		let _ = self.0.compare_exchange(PROCESSING, IDLE, Ordering::AcqRel, Ordering::Acquire);
	}
}

/// A pending structural change to the page-replacement policy.
enum Task<K, V> {
	Add {
		node: Arc<Node<K, V>>,
		weight: i32,
	},
	Update {
		node: Arc<Node<K, V>>,
		weight_diff: i32,
	},
	Remove {
		node: Arc<Node<K, V>>,
	},
}

/// A bounded, thread-safe map with approximate least-recently-used eviction.
///
/// The hash table is the source of truth and is updated first on every
/// operation, so reads observe mutations immediately. The eviction policy is
/// kept *eventually* consistent with the table: reads record themselves in
/// lossy striped buffers, writes enqueue a task on an unbounded buffer, and
/// whichever thread next wins a non-blocking try on the eviction lock
/// replays both against the access-order deque and evicts until the weighted
/// size is back under capacity. Hot paths never wait on that lock.
///
/// Out-of-order replay is resolved by each entry's lifecycle state, encoded
/// in the sign of its weight:
///
/// - **alive** — in the table and (eventually) the deque
/// - **retired** — removed from the table, still linked in the deque
/// - **dead** — in neither structure
///
/// Transitions are forward-only and race through compare-and-swap; whichever
/// thread wins a transition owns it, and the loser observes the new state
/// and retries or does nothing.
///
/// Sharing works through `Arc<Cache>`; every method takes `&self`.
///
/// # Example
///
/// ```
/// use linked_cache::CacheBuilder;
///
/// let cache = CacheBuilder::new(2).build();
/// cache.insert("a", 1u32);
/// cache.insert("b", 2);
/// cache.get(&"a");
/// cache.insert("c", 3);
///
/// // "b" was the least recently used entry.
/// assert!(cache.get(&"b").is_none());
/// assert_eq!(cache.get(&"a").as_deref(), Some(&1));
/// ```
pub struct Cache<K: 'static, V: 'static> {
	/// The backing table holding the key-to-node associations.
	data: DashMap<K, Arc<Node<K, V>>, RandomState>,
	/// The access-order deque; the mutex doubles as the eviction lock.
	deque: Mutex<AccessDeque<K, V>>,
	/// Striped lossy buffers recording reads.
	read_buffers: ReadBuffers<K, V>,
	/// Pending structural tasks, applied in batches under the eviction lock.
	write_buffer: SegQueue<Task<K, V>>,
	drain_status: DrainStatus,
	/// Combined weight of alive and retired entries. Mutated only under the
	/// eviction lock; transiently negative under out-of-order replay.
	weighted_size: AtomicI64,
	capacity: AtomicU64,
	weigher: Box<dyn EntryWeigher<K, V>>,
	listener: Option<Box<dyn EvictionListener<K, V>>>,
	/// Evicted-but-not-yet-reported entries, drained outside all locks.
	pending_notifications: SegQueue<Arc<Node<K, V>>>,
	hits: AtomicU64,
	misses: AtomicU64,
	inserts: AtomicU64,
	updates: AtomicU64,
	evictions: AtomicU64,
	removals: AtomicU64,
}

impl<K, V> Cache<K, V>
where
	K: Hash + Eq + Clone + Send + Sync + 'static,
	V: Send + Sync + 'static,
{
	/// Creates a cache bounded at `maximum_weighted_capacity` entries, with
	/// every other setting at its default. Use [`crate::CacheBuilder`] for a
	/// weigher, listener, or sizing hints.
	pub fn new(maximum_weighted_capacity: u64) -> Self {
		crate::CacheBuilder::new(maximum_weighted_capacity).build()
	}

	pub(crate) fn from_parts(
		capacity: u64,
		initial_capacity: usize,
		concurrency_level: usize,
		weigher: Box<dyn EntryWeigher<K, V>>,
		listener: Option<Box<dyn EvictionListener<K, V>>>,
	) -> Self {
		let shard_amount = concurrency_level.next_power_of_two().max(4);
		Self {
			data: DashMap::with_capacity_and_hasher_and_shard_amount(
				initial_capacity,
				RandomState::new(),
				shard_amount,
			),
			deque: Mutex::new(AccessDeque::with_capacity(initial_capacity)),
			read_buffers: ReadBuffers::new(num_cpus::get()),
			write_buffer: SegQueue::new(),
			drain_status: DrainStatus::new(),
			weighted_size: AtomicI64::new(0),
			capacity: AtomicU64::new(capacity),
			weigher,
			listener,
			pending_notifications: SegQueue::new(),
			hits: AtomicU64::new(0),
			misses: AtomicU64::new(0),
			inserts: AtomicU64::new(0),
			updates: AtomicU64::new(0),
			evictions: AtomicU64::new(0),
			removals: AtomicU64::new(0),
		}
	}

	/* ---------------- Map operations ---------------- */

	/// Returns the value mapped to `key` and records the access for the
	/// page-replacement policy. Never blocks and never evicts by itself.
	pub fn get(&self, key: &K) -> Option<Arc<V>> {
		let Some(node) = self.data.get(key).map(|entry| entry.value().clone()) else {
			self.misses.fetch_add(1, Ordering::Relaxed);
			return None;
		};
		self.hits.fetch_add(1, Ordering::Relaxed);
		let value = node.current_value();
		self.after_read(&node);
		Some(value)
	}

	/// Returns the value mapped to `key` without recording the access, so
	/// the entry's position in the eviction order is unaffected. Does not
	/// count as a hit or miss.
	pub fn get_quietly(&self, key: &K) -> Option<Arc<V>> {
		self.data.get(key).map(|entry| entry.value().current_value())
	}

	/// Maps `key` to `value`, returning the previous value if one existed.
	pub fn insert(&self, key: K, value: V) -> Option<Arc<V>> {
		self.insert_internal(key, value, false)
	}

	/// Maps `key` to `value` only if no mapping exists. Returns the current
	/// value when the key was already present.
	pub fn insert_if_absent(&self, key: K, value: V) -> Option<Arc<V>> {
		self.insert_internal(key, value, true)
	}

	fn insert_internal(&self, key: K, value: V, only_if_absent: bool) -> Option<Arc<V>> {
		let weight = self.weigher.weight_of_entry(&key, &value) as i32;
		let new_value = Arc::new(WeightedValue::alive(Arc::new(value), weight));
		let node = Arc::new(Node::new(key.clone(), new_value.clone()));

		loop {
			let (prior, inserted) = match self.data.entry(key.clone()) {
				Entry::Vacant(entry) => {
					entry.insert(node.clone());
					(node.clone(), true)
				}
				Entry::Occupied(entry) => (entry.get().clone(), false),
			};

			if inserted {
				self.inserts.fetch_add(1, Ordering::Relaxed);
				self.after_write(Task::Add {
					node,
					weight,
				});
				return None;
			}

			if only_if_absent {
				let current = prior.weighted_value();
				self.after_read(&prior);
				return Some(current.value.clone());
			}

			loop {
				let old = prior.weighted_value();
				if !old.is_alive() {
					// The entry lost a race to removal or eviction; the
					// table slot will free up, so retry the insertion.
					break;
				}
				if prior.compare_and_set(&old, new_value.clone()) {
					self.updates.fetch_add(1, Ordering::Relaxed);
					let weight_diff = weight - old.weight();
					if weight_diff == 0 {
						self.after_read(&prior);
					} else {
						self.after_write(Task::Update {
							node: prior.clone(),
							weight_diff,
						});
					}
					return Some(old.value.clone());
				}
			}
		}
	}

	/// Removes the mapping for `key`, returning the removed value.
	pub fn remove(&self, key: &K) -> Option<Arc<V>> {
		let (_, node) = self.data.remove(key)?;
		node::make_retired(&node);
		self.removals.fetch_add(1, Ordering::Relaxed);
		let value = node.current_value();
		self.after_write(Task::Remove {
			node,
		});
		Some(value)
	}

	/// Removes the mapping for `key` only if it currently maps to `value`.
	/// A racer that observes a different value returns `false`.
	pub fn remove_if_equals(&self, key: &K, value: &V) -> bool
	where
		V: PartialEq,
	{
		let Some(node) = self.data.get(key).map(|entry| entry.value().clone()) else {
			return false;
		};
		let mut weighted_value = node.weighted_value();
		loop {
			if !weighted_value.contains(value) {
				return false;
			}
			if node::try_retire(&node, &weighted_value) {
				if self.data.remove_if(key, |_, current| Arc::ptr_eq(current, &node)).is_some() {
					self.removals.fetch_add(1, Ordering::Relaxed);
					self.after_write(Task::Remove {
						node,
					});
					return true;
				}
				// Another thread removed the mapping first and owns the
				// policy cleanup.
				return false;
			}
			weighted_value = node.weighted_value();
			if !weighted_value.is_alive() {
				return false;
			}
			// An intermediate update may have swapped in an equal value with
			// a different identity; retry against the fresh record.
		}
	}

	/// Replaces the value for `key` only if a mapping exists. Returns the
	/// previous value.
	pub fn replace(&self, key: &K, value: V) -> Option<Arc<V>> {
		let weight = self.weigher.weight_of_entry(key, &value) as i32;
		let new_value = Arc::new(WeightedValue::alive(Arc::new(value), weight));

		let node = self.data.get(key).map(|entry| entry.value().clone())?;
		loop {
			let old = node.weighted_value();
			if !old.is_alive() {
				return None;
			}
			if node.compare_and_set(&old, new_value.clone()) {
				self.updates.fetch_add(1, Ordering::Relaxed);
				let weight_diff = weight - old.weight();
				if weight_diff == 0 {
					self.after_read(&node);
				} else {
					self.after_write(Task::Update {
						node: node.clone(),
						weight_diff,
					});
				}
				return Some(old.value.clone());
			}
		}
	}

	/// Replaces the value for `key` only if it currently maps to
	/// `old_value`.
	pub fn replace_if_equals(&self, key: &K, old_value: &V, new_value: V) -> bool
	where
		V: PartialEq,
	{
		let weight = self.weigher.weight_of_entry(key, &new_value) as i32;
		let replacement = Arc::new(WeightedValue::alive(Arc::new(new_value), weight));

		let Some(node) = self.data.get(key).map(|entry| entry.value().clone()) else {
			return false;
		};
		loop {
			let old = node.weighted_value();
			if !old.is_alive() || !old.contains(old_value) {
				return false;
			}
			if node.compare_and_set(&old, replacement.clone()) {
				self.updates.fetch_add(1, Ordering::Relaxed);
				let weight_diff = weight - old.weight();
				if weight_diff == 0 {
					self.after_read(&node);
				} else {
					self.after_write(Task::Update {
						node: node.clone(),
						weight_diff,
					});
				}
				return true;
			}
		}
	}

	/// Whether a mapping for `key` exists. Does not record an access.
	pub fn contains_key(&self, key: &K) -> bool {
		self.data.contains_key(key)
	}

	/// Whether any entry currently holds `value`. O(n).
	pub fn contains_value(&self, value: &V) -> bool
	where
		V: PartialEq,
	{
		self.data.iter().any(|entry| entry.value().weighted_value().contains(value))
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.data.len()
	}

	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	/// An unordered snapshot of the keys.
	pub fn keys(&self) -> Vec<K> {
		self.data.iter().map(|entry| entry.key().clone()).collect()
	}

	/// Discards every entry reachable through the policy, then applies the
	/// pending write backlog. Entries inserted concurrently may survive.
	/// Evicted-entry notifications are not fired for cleared entries.
	pub fn clear(&self) {
		let mut deque = self.deque.lock();
		let mut discarded = 0usize;
		while let Some(node) = deque.pop_front() {
			self.data.remove_if(&node.key, |_, current| Arc::ptr_eq(current, &node));
			self.make_dead(&node);
			discarded += 1;
		}
		self.read_buffers.discard_all();
		while let Some(task) = self.write_buffer.pop() {
			self.run_task(task, &mut deque);
		}
		debug!(discarded, "cleared cache");
	}

	/* ---------------- Eviction support ---------------- */

	/// The maximum weighted capacity.
	pub fn capacity(&self) -> u64 {
		self.capacity.load(Ordering::Relaxed)
	}

	/// Changes the maximum weighted capacity and eagerly evicts until the
	/// cache complies. Unlike every other operation this blocks on the
	/// eviction lock; capacity changes are administrative and rare.
	pub fn set_capacity(&self, capacity: u64) {
		let capacity = capacity.min(MAXIMUM_CAPACITY);
		{
			let mut deque = self.deque.lock();
			self.capacity.store(capacity, Ordering::Relaxed);
			debug!(capacity, "resized maximum weighted capacity");
			self.drain_buffers(&mut deque);
			self.evict(&mut deque);
		}
		self.notify_listener();
	}

	/// The combined weight of the resident entries, clamped at zero. The
	/// value trails in-flight operations and may briefly exceed the
	/// capacity between drains.
	pub fn weighted_size(&self) -> u64 {
		self.weighted_size.load(Ordering::Relaxed).max(0) as u64
	}

	/// Performance counters and occupancy, as one consistent-enough
	/// snapshot.
	pub fn metrics(&self) -> CacheMetrics {
		CacheMetrics {
			hits: self.hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
			inserts: self.inserts.load(Ordering::Relaxed),
			updates: self.updates.load(Ordering::Relaxed),
			evictions: self.evictions.load(Ordering::Relaxed),
			removals: self.removals.load(Ordering::Relaxed),
			weighted_size: self.weighted_size(),
			capacity: self.capacity(),
			len: self.len(),
		}
	}

	/* ---------------- Ordered snapshots ---------------- */

	/// The keys ordered from least- to most-recently used.
	///
	/// Takes the eviction lock and forces a full drain to settle the order,
	/// so this is *not* a constant-time operation.
	pub fn ascending_key_set(&self) -> IndexSet<K> {
		self.ordered_key_set(true, usize::MAX)
	}

	/// The `limit` least recently used keys, in eviction order.
	pub fn ascending_key_set_with_limit(&self, limit: usize) -> IndexSet<K> {
		self.ordered_key_set(true, limit)
	}

	/// The keys ordered from most- to least-recently used. Not O(1); see
	/// [`Cache::ascending_key_set`].
	pub fn descending_key_set(&self) -> IndexSet<K> {
		self.ordered_key_set(false, usize::MAX)
	}

	/// The `limit` most recently used keys.
	pub fn descending_key_set_with_limit(&self, limit: usize) -> IndexSet<K> {
		self.ordered_key_set(false, limit)
	}

	/// A snapshot of the entries ordered from least- to most-recently used.
	/// Not O(1); see [`Cache::ascending_key_set`].
	pub fn ascending_map(&self) -> IndexMap<K, Arc<V>> {
		self.ordered_map(true, usize::MAX)
	}

	/// The `limit` least recently used entries, in eviction order.
	pub fn ascending_map_with_limit(&self, limit: usize) -> IndexMap<K, Arc<V>> {
		self.ordered_map(true, limit)
	}

	/// A snapshot of the entries ordered from most- to least-recently used.
	pub fn descending_map(&self) -> IndexMap<K, Arc<V>> {
		self.ordered_map(false, usize::MAX)
	}

	/// The `limit` most recently used entries.
	pub fn descending_map_with_limit(&self, limit: usize) -> IndexMap<K, Arc<V>> {
		self.ordered_map(false, limit)
	}

	fn ordered_key_set(&self, ascending: bool, limit: usize) -> IndexSet<K> {
		let mut deque = self.deque.lock();
		self.drain_buffers(&mut deque);

		let mut keys = IndexSet::with_capacity(limit.min(deque.len()));
		if ascending {
			for node in deque.iter().take(limit) {
				keys.insert(node.key.clone());
			}
		} else {
			for node in deque.iter_descending().take(limit) {
				keys.insert(node.key.clone());
			}
		}
		keys
	}

	fn ordered_map(&self, ascending: bool, limit: usize) -> IndexMap<K, Arc<V>> {
		let mut deque = self.deque.lock();
		self.drain_buffers(&mut deque);

		let mut map = IndexMap::with_capacity(limit.min(deque.len()));
		if ascending {
			for node in deque.iter().take(limit) {
				map.insert(node.key.clone(), node.current_value());
			}
		} else {
			for node in deque.iter_descending().take(limit) {
				map.insert(node.key.clone(), node.current_value());
			}
		}
		map
	}

	/* ---------------- Buffer draining ---------------- */

	/// Post-read bookkeeping: record the access, drain if the buffers are
	/// filling up or a write already demanded it.
	fn after_read(&self, node: &Arc<Node<K, V>>) {
		let pending = self.read_buffers.record(node);
		let delayable = pending < READ_BUFFER_THRESHOLD;
		if self.drain_status.should_drain(delayable) {
			self.try_drain_buffers();
		}
		self.notify_listener();
	}

	/// Post-write bookkeeping: queue the task and attempt a drain. The
	/// table already reflects the write, so it is safe to walk away when
	/// the eviction lock is contended.
	fn after_write(&self, task: Task<K, V>) {
		self.write_buffer.push(task);
		self.drain_status.set(REQUIRED);
		self.try_drain_buffers();
		self.notify_listener();
	}

	fn try_drain_buffers(&self) {
		if let Some(mut deque) = self.deque.try_lock() {
			self.drain_status.set(PROCESSING);
			self.drain_buffers(&mut deque);
			self.drain_status.finish();
		}
	}

	/// Applies the buffered reads and writes, each up to an amortized
	/// threshold. Caller must hold the eviction lock.
	fn drain_buffers(&self, deque: &mut AccessDeque<K, V>) {
		self.drain_read_buffers(deque);
		self.drain_write_buffer(deque);
	}

	fn drain_read_buffers(&self, deque: &mut AccessDeque<K, V>) {
		// Start at the calling thread's stripe so concurrent drainers tend
		// to touch different buffers first.
		let start = thread_index();
		for offset in 0..self.read_buffers.stripe_count() {
			let stripe = (start + offset) & self.read_buffers.mask();
			for _ in 0..READ_BUFFER_DRAIN_THRESHOLD {
				match self.read_buffers.pop(stripe) {
					Some(node) => Self::apply_read(deque, &node),
					None => break,
				}
			}
		}
	}

	/// Reorders the deque for one recorded read. The node may have been
	/// unlinked by a concurrent eviction, in which case the stale event is
	/// skipped.
	fn apply_read(deque: &mut AccessDeque<K, V>, node: &Arc<Node<K, V>>) {
		if deque.contains(node) {
			deque.move_to_back(node);
		}
	}

	fn drain_write_buffer(&self, deque: &mut AccessDeque<K, V>) {
		for _ in 0..WRITE_BUFFER_DRAIN_THRESHOLD {
			match self.write_buffer.pop() {
				Some(task) => self.run_task(task, deque),
				None => break,
			}
		}
	}

	fn run_task(&self, task: Task<K, V>, deque: &mut AccessDeque<K, V>) {
		match task {
			Task::Add {
				node,
				weight,
			} => {
				self.weighted_size.fetch_add(weight as i64, Ordering::Relaxed);
				// An out-of-order removal may already have killed the entry.
				if node.is_alive() {
					deque.push_back(node);
					self.evict(deque);
				}
			}
			Task::Update {
				node,
				weight_diff,
			} => {
				self.weighted_size.fetch_add(weight_diff as i64, Ordering::Relaxed);
				Self::apply_read(deque, &node);
				self.evict(deque);
			}
			Task::Remove {
				node,
			} => {
				// The matching add may not have been replayed yet.
				deque.unlink(&node);
				self.make_dead(&node);
			}
		}
	}

	fn has_overflowed(&self) -> bool {
		self.weighted_size.load(Ordering::Relaxed) > self.capacity.load(Ordering::Relaxed) as i64
	}

	/// Evicts from the deque head until the weighted size complies with the
	/// capacity. The victim is unlinked before the table removal, so a
	/// concurrent removal of the same entry cancels the eviction and a new
	/// victim is chosen on the next iteration.
	fn evict(&self, deque: &mut AccessDeque<K, V>) {
		while self.has_overflowed() {
			let Some(node) = deque.pop_front() else {
				// Pending tasks will settle the weighted size.
				return;
			};
			if self.data.remove_if(&node.key, |_, current| Arc::ptr_eq(current, &node)).is_some() {
				self.evictions.fetch_add(1, Ordering::Relaxed);
				trace!(
					weighted_size = self.weighted_size.load(Ordering::Relaxed),
					capacity = self.capacity.load(Ordering::Relaxed),
					"evicted least recently used entry"
				);
				if self.listener.is_some() {
					self.pending_notifications.push(node.clone());
				}
			}
			self.make_dead(&node);
		}
	}

	/// Kills the node and settles the weighted-size accounting. Caller must
	/// hold the eviction lock.
	fn make_dead(&self, node: &Arc<Node<K, V>>) {
		let replaced = node::make_dead(node);
		self.weighted_size
			.fetch_sub(replaced.weight().unsigned_abs() as i64, Ordering::Relaxed);
	}

	/// Reports evicted entries to the listener. Runs on the calling thread
	/// with no locks held; a panicking listener propagates to whichever
	/// thread happened to drain the queue.
	fn notify_listener(&self) {
		if let Some(listener) = &self.listener {
			while let Some(node) = self.pending_notifications.pop() {
				listener.on_evict(&node.key, node.current_value());
			}
		}
	}
}
