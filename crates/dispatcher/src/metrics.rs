//! Per-sink counters

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

const NO_SCAN: u64 = u64::MAX;

/// Counters for a single sink worker
#[derive(Debug)]
pub struct SinkMetrics {
    queue_len: AtomicUsize,
    write_count: AtomicU64,
    failure_count: AtomicU64,
    /// Frames dropped because the sink queue was full
    dropped_count: AtomicU64,
    last_scan_index: AtomicU64,
}

impl Default for SinkMetrics {
    fn default() -> Self {
        Self {
            queue_len: AtomicUsize::new(0),
            write_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            dropped_count: AtomicU64::new(0),
            last_scan_index: AtomicU64::new(NO_SCAN),
        }
    }
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    /// Count a successful write of scan `scan_index`
    pub fn record_written(&self, scan_index: u64) {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        self.last_scan_index.store(scan_index, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    pub fn inc_dropped_count(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Scan index of the most recent successful write
    pub fn last_scan_index(&self) -> Option<u64> {
        match self.last_scan_index.load(Ordering::Relaxed) {
            NO_SCAN => None,
            index => Some(index),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            write_count: self.write_count(),
            failure_count: self.failure_count(),
            dropped_count: self.dropped_count(),
            last_scan_index: self.last_scan_index(),
        }
    }
}

/// Snapshot of sink metrics (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub write_count: u64,
    pub failure_count: u64,
    pub dropped_count: u64,
    pub last_scan_index: Option<u64>,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "written={} failed={} dropped={}",
            self.write_count, self.failure_count, self.dropped_count
        )?;
        if let Some(index) = self.last_scan_index {
            write!(f, " last_scan={index}")?;
        }
        Ok(())
    }
}
