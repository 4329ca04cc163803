//! Insertion-ordered bucket accumulation with stable top-N selection

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Accumulated metrics for one dimension value
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BucketStats {
    pub key: String,
    pub count: usize,
    pub revenue: f64,
    pub quantity: i64,
}

impl BucketStats {
    fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ..Self::default()
        }
    }

    /// Revenue per sale, zero for an empty bucket
    pub fn average_ticket(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.revenue / self.count as f64
        }
    }
}

/// Buckets keyed by dimension value, remembering first-encounter order
#[derive(Debug, Clone, Default)]
pub struct BucketMap {
    buckets: Vec<BucketStats>,
    index: HashMap<String, usize>,
}

impl BucketMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: &str, revenue: f64, quantity: i64) {
        let idx = match self.index.get(key) {
            Some(&idx) => idx,
            None => {
                self.buckets.push(BucketStats::new(key));
                self.index.insert(key.to_string(), self.buckets.len() - 1);
                self.buckets.len() - 1
            }
        };
        let bucket = &mut self.buckets[idx];
        bucket.count += 1;
        bucket.revenue += revenue;
        bucket.quantity = bucket.quantity.saturating_add(quantity);
    }

    pub fn get(&self, key: &str) -> Option<&BucketStats> {
        self.index.get(key).map(|&idx| &self.buckets[idx])
    }

    /// Buckets in first-encounter order
    pub fn iter(&self) -> impl Iterator<Item = &BucketStats> {
        self.buckets.iter()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// All buckets by descending revenue; equal revenue keeps encounter order
    pub fn ranked(&self) -> Vec<BucketStats> {
        let mut ranked = self.buckets.clone();
        ranked.sort_by(|a, b| b.revenue.partial_cmp(&a.revenue).unwrap_or(Ordering::Equal));
        ranked
    }

    pub fn top_n(&self, n: usize) -> Vec<BucketStats> {
        let mut ranked = self.ranked();
        ranked.truncate(n);
        ranked
    }

    /// Buckets sorted by key ascending (for `YYYY-MM` keys: chronological)
    pub fn sorted_by_key(&self) -> Vec<BucketStats> {
        let mut sorted = self.buckets.clone();
        sorted.sort_by(|a, b| a.key.cmp(&b.key));
        sorted
    }
}
