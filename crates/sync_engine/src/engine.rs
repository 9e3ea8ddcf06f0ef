//! Scan-driven synchronization of the inertial and lidar streams.

use std::time::Instant;

use contracts::{
    InertialSample, OdometryFrame, PointCloudData, ScanFrame, ScanInfo, SensorEvent,
    SensorPayload, SideChannelPairing, StreamKind,
};
use estimator::{InertialOnly, MeasurementUpdate, StateEstimator};
use tracing::instrument;

use crate::buffer::{Insertion, TimedBuffer};
use crate::SyncEngineConfig;

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No scan consumed yet
    Uninitialized,
    /// Following the scan stream
    Tracking,
}

/// Why a call to [`SyncEngine::process`] stopped before catching up
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NotReady {
    /// No scan after the cursor
    NoScan,
    /// Bootstrap needs one entry in every buffer
    AwaitingBootstrap { missing: StreamKind },
    /// Inertial coverage ends before the next scan
    AwaitingImu {
        imu_until: Option<f64>,
        scan_time: f64,
    },
    /// A side-channel payload for the next scan has not arrived
    MissingSideChannel { stream: StreamKind, scan_time: f64 },
}

impl NotReady {
    /// Short label for logs and metrics
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NoScan => "no_scan",
            Self::AwaitingBootstrap { .. } => "awaiting_bootstrap",
            Self::AwaitingImu { .. } => "awaiting_imu",
            Self::MissingSideChannel { .. } => "missing_side_channel",
        }
    }

    /// Whether tracking was held up; waiting for the first scan set is not a stall
    pub fn is_stall(&self) -> bool {
        !matches!(self, Self::AwaitingBootstrap { .. })
    }
}

/// Outcome of one scheduling pass
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// One frame per consumed scan, in scan order
    pub frames: Vec<OdometryFrame>,
    /// Inertial steps integrated during the pass
    pub imu_steps: usize,
    /// Set when the pass stopped with scans still pending
    pub stall: Option<NotReady>,
}

/// Running counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub scans_consumed: u64,
    pub imu_steps: u64,
    /// Passes held up after bootstrap
    pub stalls: u64,
    pub pairing_mismatches: u64,
}

/// Synchronization scheduler
///
/// Buffers the four input streams and, each time an inertial sample arrives,
/// advances the estimator through every scan the buffered data can support.
#[derive(Debug)]
pub struct SyncEngine<U = InertialOnly> {
    config: SyncEngineConfig,
    imu_buf: TimedBuffer<InertialSample>,
    scan_buf: TimedBuffer<PointCloudData>,
    info_buf: TimedBuffer<ScanInfo>,
    outlier_buf: TimedBuffer<PointCloudData>,
    estimator: StateEstimator<U>,
    stats: SyncStats,
    /// Scan time of the last ordering-guard warning
    stalled_scan: Option<f64>,
}

impl SyncEngine<InertialOnly> {
    /// Create a sync engine with the inertial-only correction
    pub fn new(config: SyncEngineConfig) -> Self {
        Self::with_update(config, InertialOnly)
    }
}

impl<U: MeasurementUpdate> SyncEngine<U> {
    /// Create a sync engine with a custom correction step
    pub fn with_update(config: SyncEngineConfig, updater: U) -> Self {
        let capacities = &config.buffers;
        Self {
            imu_buf: TimedBuffer::new(capacities.imu),
            scan_buf: TimedBuffer::new(capacities.scan),
            info_buf: TimedBuffer::new(capacities.scan_info),
            outlier_buf: TimedBuffer::new(capacities.outlier),
            estimator: StateEstimator::with_update(config.estimator, updater),
            config,
            stats: SyncStats::default(),
            stalled_scan: None,
        }
    }

    /// Buffer one event; inertial arrivals also trigger [`process`](Self::process)
    #[instrument(
        level = "trace",
        name = "sync_engine_push",
        skip(self, event),
        fields(stream = %event.kind(), timestamp = event.timestamp)
    )]
    pub fn push(&mut self, event: SensorEvent) -> SyncReport {
        let SensorEvent { timestamp, payload } = event;
        match payload {
            SensorPayload::Imu(sample) => {
                self.add_imu(InertialSample { timestamp, ..sample });
                return self.process();
            }
            SensorPayload::Scan(cloud) => self.add_scan(timestamp, cloud),
            SensorPayload::ScanInfo(info) => self.add_scan_info(timestamp, info),
            SensorPayload::Outlier(cloud) => self.add_outlier(timestamp, cloud),
        }
        SyncReport::default()
    }

    pub fn add_imu(&mut self, sample: InertialSample) {
        let insertion = self.imu_buf.add_measurement(sample, sample.timestamp);
        Self::note_insertion(StreamKind::Imu, sample.timestamp, insertion);
    }

    pub fn add_scan(&mut self, timestamp: f64, cloud: PointCloudData) {
        let insertion = self.scan_buf.add_measurement(cloud, timestamp);
        Self::note_insertion(StreamKind::Scan, timestamp, insertion);
    }

    pub fn add_scan_info(&mut self, timestamp: f64, info: ScanInfo) {
        let insertion = self.info_buf.add_measurement(info, timestamp);
        Self::note_insertion(StreamKind::ScanInfo, timestamp, insertion);
    }

    pub fn add_outlier(&mut self, timestamp: f64, cloud: PointCloudData) {
        let insertion = self.outlier_buf.add_measurement(cloud, timestamp);
        Self::note_insertion(StreamKind::Outlier, timestamp, insertion);
    }

    fn note_insertion(kind: StreamKind, timestamp: f64, insertion: Insertion) {
        match insertion {
            Insertion::Appended | Insertion::Replaced => {}
            Insertion::EvictedOldest => {
                tracing::debug!(stream = %kind, timestamp, "buffer full, oldest entry dropped");
                observability::record_buffer_drop(kind, "capacity");
            }
            Insertion::RejectedOutOfOrder => {
                tracing::warn!(stream = %kind, timestamp, "out-of-order sample rejected");
                observability::record_buffer_drop(kind, "out_of_order");
            }
        }
    }

    /// Advance the estimator as far as the buffered data allows
    #[instrument(
        name = "sync_engine_process",
        level = "debug",
        skip(self),
        fields(cursor = self.estimator.current_time())
    )]
    pub fn process(&mut self) -> SyncReport {
        let mut report = SyncReport::default();

        if !self.estimator.is_initialized() {
            match self.bootstrap() {
                Ok(frame) => report.frames.push(frame),
                Err(stall) => {
                    self.note_stall(&stall);
                    report.stall = Some(stall);
                }
            }
            self.record_depths();
            return report;
        }

        let Some(last_scan_time) = self.scan_buf.most_recent_timestamp() else {
            return report;
        };

        while !self.scan_buf.is_empty() && self.estimator.current_time() < last_scan_time {
            match self.advance_one_scan() {
                Ok((frame, steps)) => {
                    report.imu_steps += steps;
                    report.frames.push(frame);
                }
                Err(stall) => {
                    self.note_stall(&stall);
                    report.stall = Some(stall);
                    break;
                }
            }
        }

        self.record_depths();
        report
    }

    /// Consume the newest scan regardless of inertial coverage
    fn bootstrap(&mut self) -> Result<OdometryFrame, NotReady> {
        let missing = |stream| NotReady::AwaitingBootstrap { missing: stream };

        let latest_imu = *self
            .imu_buf
            .most_recent_value()
            .ok_or(missing(StreamKind::Imu))?;
        let scan = self.scan_buf.most_recent().ok_or(missing(StreamKind::Scan))?;
        let info = self
            .info_buf
            .most_recent()
            .ok_or(missing(StreamKind::ScanInfo))?;
        let outlier = self
            .outlier_buf
            .most_recent()
            .ok_or(missing(StreamKind::Outlier))?;

        let scan_time = scan.timestamp;
        let side_times = [
            (StreamKind::ScanInfo, info.timestamp),
            (StreamKind::Outlier, outlier.timestamp),
        ];
        let frame = ScanFrame {
            timestamp: scan_time,
            scan: scan.value.clone(),
            info: info.value.clone(),
            outlier: outlier.value.clone(),
        };

        self.check_pairing(scan_time, &side_times);
        let started = Instant::now();
        let odometry = self.estimator.process_pcl(scan_time, &latest_imu, frame);
        self.finish_scan(&odometry, 0, started);

        tracing::info!(scan_time, "sync engine tracking");
        Ok(odometry)
    }

    /// Integrate up to the next scan and consume it
    fn advance_one_scan(&mut self) -> Result<(OdometryFrame, usize), NotReady> {
        let cursor = self.estimator.current_time();

        let (scan_time, scan) = self
            .scan_buf
            .first_entry_after(cursor)
            .map(|entry| (entry.timestamp, entry.value.clone()))
            .ok_or(NotReady::NoScan)?;

        let imu_until = self.imu_buf.most_recent_timestamp();
        let latest_imu = match (imu_until, self.imu_buf.most_recent_value()) {
            (Some(until), Some(sample)) if until >= scan_time => *sample,
            _ => {
                return Err(NotReady::AwaitingImu {
                    imu_until,
                    scan_time,
                })
            }
        };

        let info = self.info_buf.first_entry_after(cursor).ok_or(
            NotReady::MissingSideChannel {
                stream: StreamKind::ScanInfo,
                scan_time,
            },
        )?;
        let outlier = self.outlier_buf.first_entry_after(cursor).ok_or(
            NotReady::MissingSideChannel {
                stream: StreamKind::Outlier,
                scan_time,
            },
        )?;
        let side_times = [
            (StreamKind::ScanInfo, info.timestamp),
            (StreamKind::Outlier, outlier.timestamp),
        ];
        let frame = ScanFrame {
            timestamp: scan_time,
            scan,
            info: info.value.clone(),
            outlier: outlier.value.clone(),
        };
        self.check_pairing(scan_time, &side_times);

        let started = Instant::now();
        let steps = self.integrate_until(scan_time);
        let odometry = self.estimator.process_pcl(scan_time, &latest_imu, frame);
        self.finish_scan(&odometry, steps, started);

        Ok((odometry, steps))
    }

    /// Feed inertial samples after the cursor until it reaches `scan_time`
    ///
    /// The sample straddling `scan_time` is applied with a clipped step and
    /// stays buffered, so it also opens the next interval.
    fn integrate_until(&mut self, scan_time: f64) -> usize {
        let mut steps = 0;
        let mut cursor = self.estimator.current_time();
        while cursor < scan_time {
            let Some(next) = self.imu_buf.first_entry_after(cursor) else {
                break;
            };
            let sample = *next.value;
            let until = next.timestamp.min(scan_time);

            let before = self.estimator.current_time();
            self.estimator
                .process_imu(until - cursor, &sample.acc, &sample.gyr);
            steps += 1;

            if self.estimator.current_time() <= before {
                tracing::warn!(cursor, until, "inertial step rejected, interval cut short");
                break;
            }
            cursor = until;
        }
        steps
    }

    fn finish_scan(&mut self, odometry: &OdometryFrame, steps: usize, started: Instant) {
        let cursor = self.estimator.current_time();
        self.imu_buf.clean(cursor);
        self.scan_buf.clean(cursor);
        self.info_buf.clean(cursor);
        self.outlier_buf.clean(cursor);

        self.stats.scans_consumed += 1;
        self.stats.imu_steps += steps as u64;
        self.stalled_scan = None;

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        observability::record_scan_consumed(odometry, elapsed_ms, steps);
        tracing::debug!(
            scan_time = odometry.timestamp,
            scan_index = odometry.scan_index,
            imu_steps = steps,
            elapsed_ms,
            "scan processed"
        );
    }

    fn check_pairing(&mut self, scan_time: f64, side_times: &[(StreamKind, f64)]) {
        if self.config.pairing != SideChannelPairing::Checked {
            return;
        }
        for (stream, timestamp) in side_times {
            let skew = (timestamp - scan_time).abs();
            if skew > self.config.max_skew_s {
                self.stats.pairing_mismatches += 1;
                tracing::warn!(
                    stream = %stream,
                    scan_time,
                    side_time = timestamp,
                    skew,
                    max_skew = self.config.max_skew_s,
                    "side-channel payload does not match scan timestamp"
                );
            }
        }
    }

    fn note_stall(&mut self, stall: &NotReady) {
        if stall.is_stall() {
            self.stats.stalls += 1;
            observability::record_stall(stall.reason());
        }

        match *stall {
            NotReady::AwaitingImu {
                imu_until,
                scan_time,
            } => {
                if self.stalled_scan != Some(scan_time) {
                    self.stalled_scan = Some(scan_time);
                    tracing::warn!(
                        scan_time,
                        imu_until = ?imu_until,
                        "scan ahead of inertial coverage, waiting"
                    );
                } else {
                    tracing::trace!(scan_time, imu_until = ?imu_until, "still waiting for imu");
                }
            }
            NotReady::MissingSideChannel { stream, scan_time } => {
                tracing::debug!(stream = %stream, scan_time, "waiting for side-channel payload");
            }
            NotReady::NoScan => {}
            NotReady::AwaitingBootstrap { missing } => {
                tracing::trace!(missing = %missing, "waiting for first complete scan set");
            }
        }
    }

    fn record_depths(&self) {
        for kind in StreamKind::ALL {
            observability::record_buffer_depth(kind, self.buffer_depth(kind));
        }
    }

    pub fn state(&self) -> SyncState {
        if self.estimator.is_initialized() {
            SyncState::Tracking
        } else {
            SyncState::Uninitialized
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.estimator.is_initialized()
    }

    /// Estimator cursor (seconds)
    pub fn cursor(&self) -> f64 {
        self.estimator.current_time()
    }

    pub fn estimator(&self) -> &StateEstimator<U> {
        &self.estimator
    }

    pub fn estimator_mut(&mut self) -> &mut StateEstimator<U> {
        &mut self.estimator
    }

    pub fn imu_buffer(&self) -> &TimedBuffer<InertialSample> {
        &self.imu_buf
    }

    pub fn buffer_depth(&self, kind: StreamKind) -> usize {
        match kind {
            StreamKind::Imu => self.imu_buf.len(),
            StreamKind::Scan => self.scan_buf.len(),
            StreamKind::ScanInfo => self.info_buf.len(),
            StreamKind::Outlier => self.outlier_buf.len(),
        }
    }

    /// Totals over all buffers: (dropped for capacity, rejected out of order)
    pub fn drop_totals(&self) -> (u64, u64) {
        let dropped = self.imu_buf.dropped_count()
            + self.scan_buf.dropped_count()
            + self.info_buf.dropped_count()
            + self.outlier_buf.dropped_count();
        let out_of_order = self.imu_buf.out_of_order_count()
            + self.scan_buf.out_of_order_count()
            + self.info_buf.out_of_order_count()
            + self.outlier_buf.out_of_order_count();
        (dropped, out_of_order)
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    pub fn config(&self) -> &SyncEngineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use contracts::{PointXYZI, Vector3};

    fn imu(timestamp: f64) -> SensorEvent {
        imu_with_acc(timestamp, Vector3::new(0.0, 0.0, 9.8))
    }

    fn imu_with_acc(timestamp: f64, acc: Vector3) -> SensorEvent {
        SensorEvent::imu(InertialSample::new(timestamp, acc, Vector3::ZERO))
    }

    fn push_scan_set(engine: &mut SyncEngine, timestamp: f64) {
        let cloud = PointCloudData::from_points(&[PointXYZI::new(1.0, 0.0, 0.0, 1.0)]);
        engine.push(SensorEvent::scan(timestamp, cloud.clone()));
        engine.push(SensorEvent::scan_info(timestamp, ScanInfo::default()));
        engine.push(SensorEvent::outlier(timestamp, PointCloudData::empty()));
    }

    fn bootstrapped_at(timestamp: f64) -> SyncEngine {
        let mut engine = SyncEngine::new(SyncEngineConfig::default());
        push_scan_set(&mut engine, timestamp);
        let report = engine.push(imu(timestamp));
        assert_eq!(report.frames.len(), 1, "bootstrap scan should be consumed");
        engine
    }

    #[test]
    fn test_bootstrap_requires_every_stream() {
        let mut engine = SyncEngine::new(SyncEngineConfig::default());
        engine.push(SensorEvent::scan(0.0, PointCloudData::empty()));
        engine.push(SensorEvent::scan_info(0.0, ScanInfo::default()));

        let report = engine.push(imu(0.0));

        assert!(report.frames.is_empty());
        assert_eq!(
            report.stall,
            Some(NotReady::AwaitingBootstrap {
                missing: StreamKind::Outlier
            })
        );
        assert_eq!(engine.state(), SyncState::Uninitialized);
    }

    #[test]
    fn test_bootstrap_uses_latest_scan_and_cleans() {
        let mut engine = SyncEngine::new(SyncEngineConfig::default());
        push_scan_set(&mut engine, 0.1);
        push_scan_set(&mut engine, 0.2);
        engine.push(SensorEvent::imu(InertialSample::new(
            0.15,
            Vector3::ZERO,
            Vector3::ZERO,
        )));
        // first imu triggered bootstrap on the newest scan (0.2)
        assert_eq!(engine.state(), SyncState::Tracking);
        assert_eq!(engine.cursor(), 0.2);
        assert_eq!(engine.buffer_depth(StreamKind::Scan), 0);
        assert_eq!(engine.buffer_depth(StreamKind::ScanInfo), 0);
        assert_eq!(engine.buffer_depth(StreamKind::Outlier), 0);
        assert_eq!(engine.buffer_depth(StreamKind::Imu), 0);
    }

    #[test]
    fn test_ordering_guard_blocks_until_covered() {
        let mut engine = bootstrapped_at(0.0);
        for i in 1..=50 {
            let report = engine.push(imu(i as f64 * 0.01));
            assert!(report.frames.is_empty());
        }

        push_scan_set(&mut engine, 1.0);
        let report = engine.push(imu(0.51));

        assert!(report.frames.is_empty());
        assert_eq!(report.imu_steps, 0);
        assert_eq!(
            report.stall,
            Some(NotReady::AwaitingImu {
                imu_until: Some(0.51),
                scan_time: 1.0
            })
        );
        assert_eq!(engine.cursor(), 0.0);
        assert!(engine.estimator().preintegration().unwrap().is_empty());

        let mut consumed = 0;
        for i in 52..=100 {
            let report = engine.push(imu(i as f64 * 0.01));
            consumed += report.frames.len();
            if i < 100 {
                assert!(report.frames.is_empty(), "scan consumed early at {i}");
            }
        }
        assert_eq!(consumed, 1);
        assert_eq!(engine.cursor(), 1.0);
        assert_eq!(engine.stats().scans_consumed, 2);
    }

    #[test]
    fn test_straddling_sample_is_reused() {
        let mut engine = bootstrapped_at(0.9);
        engine.push(imu_with_acc(0.95, Vector3::new(1.0, 0.0, 0.0)));
        push_scan_set(&mut engine, 1.0);
        let report = engine.push(imu_with_acc(1.05, Vector3::new(2.0, 0.0, 0.0)));

        assert_eq!(report.frames.len(), 1);
        assert_eq!(report.imu_steps, 2);
        assert_eq!(engine.cursor(), 1.0);
        let closed = engine.estimator().last_interval().unwrap();
        let steps: Vec<(f64, f64)> = closed.samples().map(|(dt, acc, _)| (dt, acc.x)).collect();
        assert_eq!(steps.len(), 2);
        assert!((steps[1].0 - 0.05).abs() < 1e-12);
        assert_eq!(steps[1].1, 2.0);

        // still buffered after cleaning at the cursor
        let kept = engine.imu_buffer().first_entry_after(1.0).unwrap();
        assert_eq!(kept.timestamp, 1.05);

        engine.push(imu_with_acc(1.15, Vector3::new(3.0, 0.0, 0.0)));
        push_scan_set(&mut engine, 1.2);
        let report = engine.push(imu_with_acc(1.25, Vector3::new(4.0, 0.0, 0.0)));

        assert_eq!(report.frames.len(), 1);
        let closed = engine.estimator().last_interval().unwrap();
        let steps: Vec<(f64, f64)> = closed.samples().map(|(dt, acc, _)| (dt, acc.x)).collect();
        assert_eq!(steps.len(), 3);
        assert!((steps[0].0 - 0.05).abs() < 1e-12);
        assert_eq!(steps[0].1, 2.0);
        assert!((closed.sum_dt() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_gravity_only_interval() {
        let mut engine = bootstrapped_at(0.0);
        let mut frames = Vec::new();
        for i in 1..=100 {
            if i == 100 {
                push_scan_set(&mut engine, 1.0);
            }
            frames.extend(engine.push(imu(i as f64 * 0.01)).frames);
        }

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].scan_index, 1);
        assert_eq!(engine.cursor(), 1.0);

        let closed = engine.estimator().last_interval().unwrap();
        assert_eq!(closed.len(), 100);
        assert_relative_eq!(closed.sum_dt(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(closed.delta_v().z, 9.8, epsilon = 1e-9);
        assert_relative_eq!(closed.delta_p().z, 4.9, epsilon = 1e-9);

        // gravity removed by the prediction: 9.81 world minus 9.8 measured
        let velocity = &frames[0].velocity;
        assert_relative_eq!(velocity.z, -0.01, epsilon = 1e-9);
        assert_eq!(engine.stats().imu_steps, 100);
    }

    #[test]
    fn test_queued_scans_consumed_in_one_pass() {
        let mut engine = bootstrapped_at(0.0);
        for i in 1..=25 {
            engine.add_imu(InertialSample::new(
                i as f64 * 0.01,
                Vector3::new(0.0, 0.0, 9.8),
                Vector3::ZERO,
            ));
        }
        push_scan_set(&mut engine, 0.1);
        push_scan_set(&mut engine, 0.2);

        let report = engine.push(imu(0.26));

        assert_eq!(report.frames.len(), 2);
        assert_eq!(report.frames[0].timestamp, 0.1);
        assert_eq!(report.frames[1].timestamp, 0.2);
        assert_eq!(report.imu_steps, 20);
        assert!(report.stall.is_none());
        assert_eq!(engine.cursor(), 0.2);
    }

    #[test]
    fn test_missing_side_channel_defers() {
        let mut engine = bootstrapped_at(0.0);
        engine.push(SensorEvent::scan(0.1, PointCloudData::empty()));
        engine.push(SensorEvent::scan_info(0.1, ScanInfo::default()));

        let report = engine.push(imu(0.1));
        assert_eq!(
            report.stall,
            Some(NotReady::MissingSideChannel {
                stream: StreamKind::Outlier,
                scan_time: 0.1
            })
        );
        assert_eq!(engine.cursor(), 0.0);

        engine.push(SensorEvent::outlier(0.1, PointCloudData::empty()));
        let report = engine.push(imu(0.11));
        assert_eq!(report.frames.len(), 1);
        assert_eq!(engine.cursor(), 0.1);
    }

    #[test]
    fn test_checked_pairing_counts_skew() {
        let config = SyncEngineConfig {
            pairing: SideChannelPairing::Checked,
            max_skew_s: 0.001,
            ..Default::default()
        };
        let mut engine = SyncEngine::new(config);
        engine.push(SensorEvent::scan(0.0, PointCloudData::empty()));
        engine.push(SensorEvent::scan_info(0.0, ScanInfo::default()));
        engine.push(SensorEvent::outlier(0.01, PointCloudData::empty()));

        let report = engine.push(imu(0.0));

        assert_eq!(report.frames.len(), 1, "mismatch is reported, not fatal");
        assert_eq!(engine.stats().pairing_mismatches, 1);
    }

    #[test]
    fn test_waiting_for_bootstrap_is_not_a_stall() {
        let mut engine = SyncEngine::new(SyncEngineConfig::default());
        for i in 0..20 {
            let report = engine.push(imu(i as f64 * 0.01));
            assert_eq!(
                report.stall,
                Some(NotReady::AwaitingBootstrap {
                    missing: StreamKind::Scan
                })
            );
        }
        assert_eq!(engine.stats().stalls, 0);

        push_scan_set(&mut engine, 0.2);
        let report = engine.push(imu(0.2));
        assert_eq!(report.frames.len(), 1);
        assert_eq!(engine.stats().stalls, 0);

        // after bootstrap, waiting on inertial coverage does count
        push_scan_set(&mut engine, 0.5);
        let report = engine.push(imu(0.3));
        assert!(matches!(report.stall, Some(NotReady::AwaitingImu { .. })));
        assert_eq!(engine.stats().stalls, 1);
    }

    #[test]
    fn test_scan_events_do_not_trigger_processing() {
        let mut engine = SyncEngine::new(SyncEngineConfig::default());
        engine.push(imu(0.0));
        let report = engine.push(SensorEvent::scan(0.0, PointCloudData::empty()));
        assert!(report.frames.is_empty());
        assert!(report.stall.is_none());
    }
}
