//! Pipeline statistics and end-of-run summary.

use std::fmt;
use std::time::Duration;

use contracts::StreamKind;
use dispatcher::MetricsSnapshot as SinkSnapshot;
use ingestion::MetricsSnapshot as IngestionSnapshot;
use observability::FusionMetricsAggregator;
use sync_engine::{SyncEngine, SyncStats};

/// Why the consumer loop ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StopReason {
    /// Every source finished and the channel drained
    #[default]
    EndOfStream,
    /// Ctrl-C / SIGTERM
    Shutdown,
    /// `--timeout` elapsed
    Timeout,
    /// `--max-frames` reached
    MaxFrames,
    /// Dispatcher went away
    DispatcherClosed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::EndOfStream => "end of stream",
            Self::Shutdown => "shutdown signal",
            Self::Timeout => "timeout",
            Self::MaxFrames => "max frames",
            Self::DispatcherClosed => "dispatcher closed",
        };
        f.write_str(label)
    }
}

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Events taken off the ingestion channel
    pub events_received: u64,

    /// Frames handed to the dispatcher
    pub frames_published: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    pub active_sources: usize,
    pub active_sinks: usize,

    pub stop_reason: StopReason,

    /// Scans still buffered when the run ended
    pub pending_scans: usize,

    /// Estimator time at shutdown
    pub final_cursor: f64,

    /// Scheduler counters
    pub sync: SyncStats,

    /// Per-scan aggregates
    pub fusion: FusionMetricsAggregator,

    /// Ingestion channel counters
    pub ingestion: IngestionSnapshot,

    /// Per-sink counters
    pub sinks: Vec<(String, SinkSnapshot)>,
}

impl RunStats {
    /// Collect the final counters once every component has stopped
    pub fn finish(
        &mut self,
        engine: &SyncEngine,
        ingestion: IngestionSnapshot,
        sinks: Vec<(String, SinkSnapshot)>,
        duration: Duration,
    ) {
        let (dropped, out_of_order) = engine.drop_totals();
        self.fusion.set_drop_totals(dropped, out_of_order);
        self.sync = *engine.stats();
        self.pending_scans = engine.buffer_depth(StreamKind::Scan);
        self.final_cursor = engine.cursor();
        self.ingestion = ingestion;
        self.sinks = sinks;
        self.duration = duration;
    }

    /// Frames per second of wall-clock time
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.frames_published as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Fusion Run Summary                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Stopped by: {}", self.stop_reason);
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Events received: {}", self.events_received);
        println!("   ├─ Frames published: {}", self.frames_published);
        println!("   ├─ FPS: {:.2}", self.fps());
        println!("   ├─ Final estimator time: {:.3}", self.final_cursor);
        println!("   └─ Scans left unconsumed: {}", self.pending_scans);

        let summary = self.fusion.summary();
        println!("\n📈 Scheduler");
        println!("   ├─ Scans consumed: {}", self.sync.scans_consumed);
        println!("   ├─ IMU steps: {}", self.sync.imu_steps);
        println!("   ├─ Stalls: {}", self.sync.stalls);
        println!("   ├─ Pairing mismatches: {}", self.sync.pairing_mismatches);
        println!(
            "   ├─ Buffer drops: {} (out-of-order: {})",
            summary.total_dropped, summary.total_out_of_order
        );
        println!("   ├─ Path length: {:.3} m", summary.path_length);
        println!("   ├─ Scan processing (ms): {}", summary.processing_ms);
        println!("   └─ Scan interval (s): {}", summary.scan_interval_s);

        if !summary.stall_counts.is_empty() {
            println!("\n⏸  Stall Reasons");
            for (reason, count) in &summary.stall_counts {
                println!("   ├─ {}: {}", reason, count);
            }
        }

        println!("\n📥 Ingestion ({} sources)", self.active_sources);
        println!("   ├─ IMU samples: {}", self.ingestion.imu_received);
        println!("   ├─ Scan events: {}", self.ingestion.scan_events_received);
        println!("   └─ Dropped: {}", self.ingestion.events_dropped);

        if !self.sinks.is_empty() {
            println!("\n📤 Sinks ({})", self.active_sinks);
            for (i, (name, snapshot)) in self.sinks.iter().enumerate() {
                let prefix = if i == self.sinks.len() - 1 { "└─" } else { "├─" };
                println!("   {} {}: {}", prefix, name, snapshot);
            }
        }

        println!();
    }
}
