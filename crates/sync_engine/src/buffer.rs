//! Timestamp-ordered measurement buffer.
//!
//! Uses index-based separation:
//! - HeapRb stores lightweight metadata (timestamp + slab key)
//! - Slab stores the actual payloads
//!
//! Entries are kept in insertion order, which is also timestamp order:
//! an arrival older than the newest entry is rejected. `clean` raises a
//! watermark, so once the buffer is emptied an arrival at or before the last
//! cutoff is still rejected.

use std::fmt;

use ringbuf::{traits::*, HeapRb};
use slab::Slab;

/// Lightweight metadata stored in ring buffer
#[derive(Debug, Clone, Copy)]
struct EntryMeta {
    /// Timestamp for ordering
    timestamp: f64,
    /// Key into the slab storage
    slab_key: usize,
}

/// What [`TimedBuffer::add_measurement`] did with a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// Appended
    Appended,
    /// Appended after dropping the oldest entry (buffer was full)
    EvictedOldest,
    /// Same timestamp as the newest entry, which was replaced
    Replaced,
    /// Older than the newest entry, or at/before an earlier `clean` cutoff; discarded
    RejectedOutOfOrder,
}

/// Borrowed view of one buffered entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedEntry<'a, T> {
    pub timestamp: f64,
    pub value: &'a T,
}

/// Bounded, timestamp-ordered buffer for one sensor stream
///
/// Backpressure: when full, the oldest entry is dropped and counted. The
/// buffer is not synchronized; the scheduler owning it provides exclusion.
pub struct TimedBuffer<T> {
    /// Ring buffer of metadata (timestamp + slab key)
    index: HeapRb<EntryMeta>,
    /// Actual payload storage
    storage: Slab<T>,
    capacity: usize,
    newest: Option<EntryMeta>,
    /// Highest cutoff passed to `clean`
    cleaned_until: Option<f64>,
    dropped_count: u64,
    out_of_order_count: u64,
}

impl<T> fmt::Debug for TimedBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimedBuffer")
            .field("len", &self.index.occupied_len())
            .field("capacity", &self.capacity)
            .field("newest", &self.newest.map(|m| m.timestamp))
            .field("cleaned_until", &self.cleaned_until)
            .field("dropped", &self.dropped_count)
            .finish()
    }
}

impl<T> TimedBuffer<T> {
    /// Create a buffer holding at most `capacity` entries (at least one)
    #[inline]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            index: HeapRb::new(capacity),
            storage: Slab::with_capacity(capacity),
            capacity,
            newest: None,
            cleaned_until: None,
            dropped_count: 0,
            out_of_order_count: 0,
        }
    }

    /// Insert `value` at `timestamp`
    #[inline]
    pub fn add_measurement(&mut self, value: T, timestamp: f64) -> Insertion {
        if self.cleaned_until.is_some_and(|cutoff| timestamp <= cutoff) {
            self.out_of_order_count += 1;
            return Insertion::RejectedOutOfOrder;
        }
        if let Some(newest) = self.newest {
            if timestamp < newest.timestamp {
                self.out_of_order_count += 1;
                return Insertion::RejectedOutOfOrder;
            }
            if timestamp == newest.timestamp {
                if let Some(slot) = self.storage.get_mut(newest.slab_key) {
                    *slot = value;
                }
                return Insertion::Replaced;
            }
        }

        let mut outcome = Insertion::Appended;
        if self.index.is_full() {
            if let Some(old_meta) = self.index.try_pop() {
                self.storage.remove(old_meta.slab_key);
            }
            self.dropped_count += 1;
            outcome = Insertion::EvictedOldest;
        }

        let slab_key = self.storage.insert(value);
        let meta = EntryMeta {
            timestamp,
            slab_key,
        };
        let _ = self.index.try_push(meta);
        self.newest = Some(meta);
        outcome
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.occupied_len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Timestamp of the newest entry
    #[inline]
    pub fn most_recent_timestamp(&self) -> Option<f64> {
        self.newest.map(|meta| meta.timestamp)
    }

    /// Payload of the newest entry
    #[inline]
    pub fn most_recent_value(&self) -> Option<&T> {
        self.newest
            .and_then(|meta| self.storage.get(meta.slab_key))
    }

    /// Newest entry as a whole
    #[inline]
    pub fn most_recent(&self) -> Option<TimedEntry<'_, T>> {
        self.newest.and_then(|meta| self.entry(meta))
    }

    /// First entry with timestamp strictly greater than `timestamp`
    #[inline]
    pub fn first_entry_after(&self, timestamp: f64) -> Option<TimedEntry<'_, T>> {
        self.index
            .iter()
            .find(|meta| meta.timestamp > timestamp)
            .and_then(|meta| self.entry(*meta))
    }

    /// All entries with timestamp strictly greater than `timestamp`, oldest first
    pub fn entries_after(&self, timestamp: f64) -> impl Iterator<Item = TimedEntry<'_, T>> + '_ {
        self.index
            .iter()
            .skip_while(move |meta| meta.timestamp <= timestamp)
            .filter_map(|meta| self.entry(*meta))
    }

    /// Remove every entry with timestamp `<= cutoff`; returns how many were removed
    #[inline]
    pub fn clean(&mut self, cutoff: f64) -> usize {
        self.cleaned_until = Some(self.cleaned_until.map_or(cutoff, |c| c.max(cutoff)));

        let stale = self
            .index
            .iter()
            .take_while(|meta| meta.timestamp <= cutoff)
            .count();

        for _ in 0..stale {
            if let Some(meta) = self.index.try_pop() {
                self.storage.remove(meta.slab_key);
            }
        }

        if self.index.is_empty() {
            self.newest = None;
        }
        stale
    }

    /// Entries dropped because the buffer was full
    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }

    /// Entries rejected for arriving older than the newest entry or the clean watermark
    #[inline]
    pub fn out_of_order_count(&self) -> u64 {
        self.out_of_order_count
    }

    fn entry(&self, meta: EntryMeta) -> Option<TimedEntry<'_, T>> {
        self.storage.get(meta.slab_key).map(|value| TimedEntry {
            timestamp: meta.timestamp,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(timestamps: &[f64]) -> TimedBuffer<u32> {
        let mut buffer = TimedBuffer::new(16);
        for (i, t) in timestamps.iter().enumerate() {
            buffer.add_measurement(i as u32, *t);
        }
        buffer
    }

    fn timestamps(buffer: &TimedBuffer<u32>) -> Vec<f64> {
        buffer
            .entries_after(f64::NEG_INFINITY)
            .map(|e| e.timestamp)
            .collect()
    }

    #[test]
    fn test_most_recent() {
        let mut buffer = TimedBuffer::new(4);
        assert!(buffer.most_recent_timestamp().is_none());
        assert!(buffer.most_recent_value().is_none());

        buffer.add_measurement("a", 1.0);
        buffer.add_measurement("b", 2.0);

        assert_eq!(buffer.most_recent_timestamp(), Some(2.0));
        assert_eq!(buffer.most_recent_value(), Some(&"b"));
    }

    #[test]
    fn test_buffer_capacity_drops_oldest() {
        let mut buffer = TimedBuffer::new(3);

        assert_eq!(buffer.add_measurement(1, 1.0), Insertion::Appended);
        buffer.add_measurement(2, 2.0);
        buffer.add_measurement(3, 3.0);
        assert_eq!(buffer.add_measurement(4, 4.0), Insertion::EvictedOldest);

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.dropped_count(), 1);
        assert_eq!(buffer.first_entry_after(0.0).unwrap().timestamp, 2.0);
        assert_eq!(buffer.most_recent_value(), Some(&4));
    }

    #[test]
    fn test_out_of_order_rejected() {
        let mut buffer = filled(&[1.0, 3.0]);

        assert_eq!(
            buffer.add_measurement(9, 2.0),
            Insertion::RejectedOutOfOrder
        );

        assert_eq!(buffer.out_of_order_count(), 1);
        assert_eq!(timestamps(&buffer), vec![1.0, 3.0]);
    }

    #[test]
    fn test_duplicate_timestamp_replaces_newest() {
        let mut buffer = filled(&[1.0, 2.0]);

        assert_eq!(buffer.add_measurement(42, 2.0), Insertion::Replaced);

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.most_recent_value(), Some(&42));
    }

    #[test]
    fn test_first_entry_after_is_strict() {
        let buffer = filled(&[1.0, 1.05, 1.1]);

        assert_eq!(buffer.first_entry_after(1.0).unwrap().timestamp, 1.05);
        assert_eq!(buffer.first_entry_after(0.5).unwrap().timestamp, 1.0);
        assert_eq!(*buffer.first_entry_after(1.07).unwrap().value, 2);
        assert!(buffer.first_entry_after(1.1).is_none());
    }

    #[test]
    fn test_clean_removes_at_or_before_cutoff() {
        let mut buffer = filled(&[0.1, 0.2, 0.3, 0.4]);

        assert_eq!(buffer.clean(0.2), 2);
        assert_eq!(timestamps(&buffer), vec![0.3, 0.4]);

        // idempotent, and safe with non-decreasing cutoffs
        assert_eq!(buffer.clean(0.2), 0);
        assert_eq!(buffer.clean(0.25), 0);
        assert_eq!(buffer.clean(0.4), 2);
        assert!(buffer.is_empty());
        assert!(buffer.most_recent_timestamp().is_none());
        assert_eq!(buffer.clean(0.5), 0);
    }

    #[test]
    fn test_clean_never_leaves_stale_entries() {
        let mut buffer = TimedBuffer::new(64);
        for i in 0..50 {
            buffer.add_measurement(i, i as f64 * 0.01);
        }

        for cutoff in [0.0, 0.105, 0.2, 0.2, 0.33, 0.49] {
            buffer.clean(cutoff);
            assert!(
                buffer.entries_after(f64::NEG_INFINITY).all(|e| e.timestamp > cutoff),
                "entry at or before {cutoff} survived clean"
            );
        }
    }

    #[test]
    fn test_late_arrival_after_clean_to_empty_is_rejected() {
        let mut buffer = filled(&[1.0, 2.0]);
        assert_eq!(buffer.clean(2.0), 2);
        assert!(buffer.is_empty());

        assert_eq!(buffer.add_measurement(7, 0.5), Insertion::RejectedOutOfOrder);
        assert_eq!(buffer.add_measurement(8, 2.0), Insertion::RejectedOutOfOrder);
        assert_eq!(buffer.out_of_order_count(), 2);
        assert!(buffer.is_empty());

        assert_eq!(buffer.add_measurement(9, 2.5), Insertion::Appended);
        assert_eq!(buffer.most_recent_timestamp(), Some(2.5));
    }

    #[test]
    fn test_clean_watermark_never_moves_back() {
        let mut buffer = filled(&[1.0, 2.0, 3.0]);
        buffer.clean(2.0);
        buffer.clean(1.0);

        assert_eq!(buffer.add_measurement(7, 1.5), Insertion::RejectedOutOfOrder);
        assert_eq!(timestamps(&buffer), vec![3.0]);
    }
}
