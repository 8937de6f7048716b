//! Latest-snapshot selection for stock data.
//!
//! The stock file accumulates timestamped snapshots; only the most recent
//! snapshot per (product, location) describes current stock, and everything
//! downstream operates on that reduced set.

use std::collections::HashMap;

use crate::loader::RawStockRecord;
use crate::types::ProductId;

/// Collapse stock snapshots to the single latest-dated row per
/// (product id, location) pair.
///
/// When several rows share the maximum date for a key, the first one in
/// input order wins; the reduction is deterministic for identical input
/// ordering. Output preserves the input's first-seen key order.
pub fn latest_snapshots(records: Vec<RawStockRecord>) -> Vec<RawStockRecord> {
    // key -> index into `latest`, so one pass suffices.
    let mut index: HashMap<(ProductId, String), usize> = HashMap::new();
    let mut latest: Vec<RawStockRecord> = Vec::new();

    for record in records {
        let key = (record.product_id, record.location.clone());
        match index.get(&key) {
            Some(&slot) => {
                if record.reference_date > latest[slot].reference_date {
                    latest[slot] = record;
                }
            }
            None => {
                index.insert(key, latest.len());
                latest.push(record);
            }
        }
    }

    latest
}
