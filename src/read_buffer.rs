//! Striped, lossy buffers recording read accesses.
//!
//! A read never touches the eviction lock. It records the touched node in
//! one of N ring buffers (N = next power of two at or above the CPU count)
//! and moves on; the deque reordering happens later, when some thread drains
//! the buffers under the lock. Recording is allowed to lose events: when a
//! stripe overflows, the oldest recorded access is displaced. A lost event
//! only costs a missed reordering, never correctness.
//!
//! Stripes are selected by a per-thread index so that a hot entry does not
//! funnel every thread onto one buffer.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_queue::ArrayQueue;

use crate::node::Node;

/// Pending reads in a stripe before a drain is no longer delayable.
pub(crate) const READ_BUFFER_THRESHOLD: usize = 32;

/// Maximum reads replayed per stripe in one amortized drain.
pub(crate) const READ_BUFFER_DRAIN_THRESHOLD: usize = 2 * READ_BUFFER_THRESHOLD;

/// Capacity of each stripe.
pub(crate) const READ_BUFFER_SIZE: usize = 2 * READ_BUFFER_DRAIN_THRESHOLD;

static NEXT_THREAD_INDEX: AtomicUsize = AtomicUsize::new(0);

thread_local! {
	static THREAD_INDEX: usize = NEXT_THREAD_INDEX.fetch_add(1, Ordering::Relaxed);
}

/// A dense process-wide index for the calling thread, assigned on first use.
/// Unique for the thread's lifetime, unlike OS thread ids which may be
/// recycled.
pub(crate) fn thread_index() -> usize {
	THREAD_INDEX.with(|index| *index)
}

pub(crate) struct ReadBuffers<K, V> {
	stripes: Box<[ArrayQueue<Arc<Node<K, V>>>]>,
	mask: usize,
}

impl<K, V> ReadBuffers<K, V> {
	pub(crate) fn new(parallelism: usize) -> Self {
		let stripe_count = parallelism.max(1).next_power_of_two();
		let stripes = (0..stripe_count)
			.map(|_| ArrayQueue::new(READ_BUFFER_SIZE))
			.collect::<Vec<_>>()
			.into_boxed_slice();
		Self {
			stripes,
			mask: stripe_count - 1,
		}
	}

	pub(crate) fn stripe_count(&self) -> usize {
		self.stripes.len()
	}

	pub(crate) fn mask(&self) -> usize {
		self.mask
	}

	/// Records a read in the calling thread's stripe, displacing the oldest
	/// recorded access on overflow. Returns the stripe's pending count.
	pub(crate) fn record(&self, node: &Arc<Node<K, V>>) -> usize {
		let stripe = &self.stripes[thread_index() & self.mask];
		let _displaced = stripe.force_push(node.clone());
		stripe.len()
	}

	/// Takes one recorded access from the given stripe.
	pub(crate) fn pop(&self, stripe: usize) -> Option<Arc<Node<K, V>>> {
		self.stripes[stripe].pop()
	}

	/// Discards every recorded access. Used by `clear`.
	pub(crate) fn discard_all(&self) {
		for stripe in self.stripes.iter() {
			while stripe.pop().is_some() {}
		}
	}
}
