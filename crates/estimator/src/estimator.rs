//! State estimator orchestration

use std::time::Instant;

use contracts::{FeatureClouds, ImuConfig, InertialSample, OdometryFrame, ScanFrame, Vector3};
use nalgebra::Vector3 as NVector3;
use observability::RunningStats;
use preintegration::{ImuBias, ImuNoise, PreintegratedDelta};
use tracing::instrument;

use crate::{InertialOnly, MeasurementUpdate, NavState};

/// Estimator parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorConfig {
    pub noise: ImuNoise,
    /// Bias used at bootstrap
    pub init_bias: ImuBias,
    /// World-frame gravity vector
    pub gravity: NVector3<f64>,
}

impl EstimatorConfig {
    pub fn from_imu_config(config: &ImuConfig) -> Self {
        Self {
            noise: ImuNoise::from_config(config),
            init_bias: ImuBias::from_config(config),
            gravity: NVector3::new(0.0, 0.0, -config.gravity),
        }
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self::from_imu_config(&ImuConfig::default())
    }
}

/// Owns the filter state and the live preintegration.
///
/// The cursor (`current_time`) only moves forward: by `dt` on every accepted
/// inertial step and to the scan time on every consumed scan.
#[derive(Debug)]
pub struct StateEstimator<U = InertialOnly> {
    config: EstimatorConfig,
    updater: U,
    state: NavState,
    time: f64,
    initialized: bool,
    preintegration: Option<PreintegratedDelta>,
    last_interval: Option<PreintegratedDelta>,
    scan_counter: u64,
    correction_stats: RunningStats,
}

impl StateEstimator<InertialOnly> {
    /// Estimator without a lidar correction (dead reckoning between scans)
    pub fn new(config: EstimatorConfig) -> Self {
        Self::with_update(config, InertialOnly)
    }
}

impl<U: MeasurementUpdate> StateEstimator<U> {
    pub fn with_update(config: EstimatorConfig, updater: U) -> Self {
        Self {
            config,
            updater,
            state: NavState::at_rest(config.init_bias),
            time: 0.0,
            initialized: false,
            preintegration: None,
            last_interval: None,
            scan_counter: 0,
            correction_stats: RunningStats::default(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Estimator cursor (seconds)
    pub fn current_time(&self) -> f64 {
        self.time
    }

    pub fn state(&self) -> &NavState {
        &self.state
    }

    /// Preintegration accumulating since the last consumed scan
    pub fn preintegration(&self) -> Option<&PreintegratedDelta> {
        self.preintegration.as_ref()
    }

    /// Preintegration retired by the last consumed scan
    pub fn last_interval(&self) -> Option<&PreintegratedDelta> {
        self.last_interval.as_ref()
    }

    /// Scans consumed so far, bootstrap included
    pub fn scan_counter(&self) -> u64 {
        self.scan_counter
    }

    /// Wall-clock duration of scan processing (ms)
    pub fn correction_stats(&self) -> &RunningStats {
        &self.correction_stats
    }

    pub fn updater(&self) -> &U {
        &self.updater
    }

    pub fn updater_mut(&mut self) -> &mut U {
        &mut self.updater
    }

    /// Fold one inertial step into the live preintegration and advance the cursor
    pub fn process_imu(&mut self, dt: f64, acc: &Vector3, gyr: &Vector3) {
        let Some(delta) = self.preintegration.as_mut() else {
            tracing::debug!(dt, "inertial step before initialization ignored");
            return;
        };

        if delta.integrate(dt, (*acc).into(), (*gyr).into()) {
            self.time += dt;
            tracing::trace!(dt, time = self.time, "inertial step integrated");
        }
    }

    /// Consume one scan at `scan_time`
    ///
    /// The first call bootstraps the state. Later calls predict with the live
    /// preintegration, run the correction, archive the retired delta and start
    /// a new one at `latest_imu` with the corrected biases.
    ///
    /// # Panics
    /// In debug builds, if `scan_time` is behind the cursor.
    #[instrument(
        name = "estimator_process_pcl",
        skip(self, latest_imu, frame),
        fields(scan_index = self.scan_counter)
    )]
    pub fn process_pcl(
        &mut self,
        scan_time: f64,
        latest_imu: &InertialSample,
        frame: ScanFrame,
    ) -> OdometryFrame {
        let started = Instant::now();

        if self.initialized {
            debug_assert!(
                scan_time >= self.time,
                "scan at {scan_time} is behind the estimator cursor {}",
                self.time
            );
            self.correct(&frame);
        } else {
            self.bootstrap(scan_time);
        }

        self.time = scan_time;
        self.preintegration = Some(PreintegratedDelta::new(
            latest_imu.acc.into(),
            latest_imu.gyr.into(),
            self.state.bias,
            self.config.noise,
        ));

        let odometry = self.odometry(scan_time, frame);
        self.scan_counter += 1;

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.correction_stats.push(elapsed_ms);
        tracing::debug!(
            scan_time,
            elapsed_ms,
            mean_ms = self.correction_stats.mean(),
            "scan consumed"
        );

        odometry
    }

    /// Rebase the live preintegration and the state on refined biases
    pub fn refine_bias(&mut self, acc_bias: NVector3<f64>, gyr_bias: NVector3<f64>) {
        self.state.bias = ImuBias::new(acc_bias, gyr_bias);
        if let Some(delta) = self.preintegration.as_mut() {
            delta.reset_bias(acc_bias, gyr_bias);
        }
    }

    fn bootstrap(&mut self, scan_time: f64) {
        self.state = NavState::at_rest(self.config.init_bias);
        self.initialized = true;
        tracing::info!(
            scan_time,
            update = self.updater.name(),
            "estimator initialized from first scan"
        );
    }

    fn correct(&mut self, frame: &ScanFrame) {
        let Some(mut delta) = self.preintegration.take() else {
            return;
        };

        let predicted = self.state.predict(&delta, &self.config.gravity);
        let corrected = self.updater.correct(predicted, &delta, frame);

        delta.reset_bias(corrected.bias.acc, corrected.bias.gyr);
        tracing::debug!(
            steps = delta.len(),
            sum_dt = delta.sum_dt(),
            update = self.updater.name(),
            "interval closed"
        );

        self.state = corrected;
        self.last_interval = Some(delta);
    }

    fn odometry(&self, scan_time: f64, frame: ScanFrame) -> OdometryFrame {
        OdometryFrame {
            timestamp: scan_time,
            scan_index: self.scan_counter,
            orientation: self.state.rotation.into(),
            position: self.state.position.into(),
            velocity: self.state.velocity.into(),
            acc_bias: self.state.bias.acc.into(),
            gyr_bias: self.state.bias.gyr.into(),
            features: Some(FeatureClouds {
                scan: frame.scan,
                outlier: frame.outlier,
            }),
        }
    }
}
