use std::sync::Arc;

use linked_cache::CacheBuilder;

/// Example demonstrating a byte-weighted cache with an eviction listener.

#[derive(Clone, Debug)]
struct Document {
	title: String,
	body: String,
}

fn main() {
	// Bound the cache by total document bytes rather than entry count.
	let cache = CacheBuilder::new(1_000)
		.weigher(|doc: &Document| (doc.title.len() + doc.body.len()).max(1) as u32)
		.listener(|key: &String, doc: Arc<Document>| {
			println!("evicted {key} ({} bytes of body)", doc.body.len());
		})
		.build();

	cache.insert(
		"hot".to_string(),
		Document {
			title: "Pinned by access".to_string(),
			body: "short".to_string(),
		},
	);

	// Fill the cache well past its weighted capacity, touching the hot
	// document between inserts so it keeps being promoted.
	for i in 0..20 {
		cache.get(&"hot".to_string());
		cache.insert(
			format!("doc-{i}"),
			Document {
				title: format!("Document {i}"),
				body: "x".repeat(100),
			},
		);
	}

	if cache.contains_key(&"hot".to_string()) {
		println!("the frequently read document survived");
	}

	let coldest = cache.ascending_key_set_with_limit(3);
	println!("next eviction candidates: {coldest:?}");

	let metrics = cache.metrics();
	println!(
		"entries={} weighted={}/{} hit_rate={:.0}%",
		metrics.len,
		metrics.weighted_size,
		metrics.capacity,
		metrics.hit_rate() * 100.0
	);
}
