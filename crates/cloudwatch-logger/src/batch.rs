// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory batch of formatted records waiting for remote delivery.
//!
//! # Ordering
//!
//! Records are delivered in insertion order; the remote service requires
//! events within one stream to be written in sequence, so the batch never
//! reorders or deduplicates.
//!
//! # Size Accounting
//!
//! `current_bytes` is the exact sum of [`WireRecord::wire_size`] over the
//! records held. It is only ever changed together with the record list:
//! [`Batch::append`] adds one record and its size, [`Batch::drain`] hands out
//! every record and zeroes the counter in the same `&mut self` call.
//!
//! # Thresholds
//!
//! The batch does not flush itself. The dispatcher asks
//! [`Batch::would_overflow_bytes`] and [`Batch::would_overflow_count`] before
//! appending and drains first when either is true, so a record that would
//! cross a threshold always starts the next batch.

use crate::record::WireRecord;

#[derive(Debug, Clone, Default)]
pub struct Batch {
    /// Records in delivery order.
    records: Vec<WireRecord>,
    /// Sum of wire sizes of `records`.
    current_bytes: usize,
}

impl Batch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `record` at the end of the batch.
    pub fn append(&mut self, record: WireRecord) {
        self.current_bytes += record.wire_size();
        self.records.push(record);
    }

    /// True when adding `record` would make the byte total reach or exceed
    /// `byte_limit`.
    #[must_use]
    pub fn would_overflow_bytes(&self, record: &WireRecord, byte_limit: usize) -> bool {
        self.current_bytes + record.wire_size() >= byte_limit
    }

    /// True when the batch already holds `count_limit` records.
    #[must_use]
    pub fn would_overflow_count(&self, count_limit: usize) -> bool {
        self.records.len() >= count_limit
    }

    /// True when appending `record` would break either threshold.
    #[must_use]
    pub fn would_overflow(&self, record: &WireRecord, byte_limit: usize, count_limit: usize) -> bool {
        self.would_overflow_bytes(record, byte_limit) || self.would_overflow_count(count_limit)
    }

    /// Takes every record out of the batch and resets the byte counter.
    pub fn drain(&mut self) -> Vec<WireRecord> {
        self.current_bytes = 0;
        std::mem::take(&mut self.records)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn current_bytes(&self) -> usize {
        self.current_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(message: &str) -> WireRecord {
        WireRecord {
            message: message.to_string(),
            timestamp: 1,
        }
    }

    #[test]
    fn test_new_batch_is_empty() {
        let batch = Batch::new();
        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
        assert_eq!(batch.current_bytes(), 0);
    }

    #[test]
    fn test_append_tracks_bytes_and_order() {
        let mut batch = Batch::new();
        batch.append(record("first"));
        batch.append(record("second"));

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.current_bytes(), (5 + 26) + (6 + 26));

        let drained = batch.drain();
        let messages: Vec<&str> = drained.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[test]
    fn test_drain_resets_counter_and_next_append_starts_fresh() {
        let mut batch = Batch::new();
        batch.append(record("a"));
        batch.append(record("b"));

        let drained = batch.drain();
        assert_eq!(drained.len(), 2);
        assert!(batch.is_empty());
        assert_eq!(batch.current_bytes(), 0);

        batch.append(record("c"));
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.current_bytes(), 1 + 26);
    }

    #[test]
    fn test_drain_empty_batch() {
        let mut batch = Batch::new();
        assert!(batch.drain().is_empty());
        assert_eq!(batch.current_bytes(), 0);
    }

    #[test]
    fn test_would_overflow_bytes_at_reaching_limit() {
        let mut batch = Batch::new();
        batch.append(record("0123456789")); // 36 bytes

        let next = record("abcd"); // 30 bytes
        assert!(!batch.would_overflow_bytes(&next, 67));
        assert!(batch.would_overflow_bytes(&next, 66));
        assert!(batch.would_overflow_bytes(&next, 10));
    }

    #[test]
    fn test_would_overflow_count_when_full() {
        let mut batch = Batch::new();
        batch.append(record("a"));
        assert!(!batch.would_overflow_count(2));
        batch.append(record("b"));
        assert!(batch.would_overflow_count(2));
    }

    #[test]
    fn test_would_overflow_either_threshold() {
        let mut batch = Batch::new();
        batch.append(record("a"));
        let next = record("b");
        assert!(!batch.would_overflow(&next, 1_000, 10));
        assert!(batch.would_overflow(&next, 1_000, 1));
        assert!(batch.would_overflow(&next, 54, 10));
    }
}
