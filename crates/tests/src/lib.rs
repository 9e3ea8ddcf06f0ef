//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试（配置 / 录制格式）
//! - 合成场景 e2e 测试：MockScenario -> SyncEngine -> Dispatcher
//! - 乱序到达与停顿恢复

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{FusionConfig, InertialSample, SensorEvent, Vector3};
    use ingestion::RecordedEvent;

    #[test]
    fn test_config_survives_toml_round_trip() {
        let mut config = FusionConfig::default();
        config.imu.gravity = 9.8;
        config.buffers.imu = 200;

        let toml = ConfigLoader::to_toml(&config).unwrap();
        let loaded = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();

        assert_eq!(loaded.imu.gravity, 9.8);
        assert_eq!(loaded.buffers.imu, 200);
        assert_eq!(loaded.buffers.scan, config.buffers.scan);
        assert_eq!(loaded.publish.frame, config.publish.frame);
    }

    #[test]
    fn test_recording_line_format() {
        let event = SensorEvent::imu(InertialSample::new(
            1.5,
            Vector3::new(0.0, 0.0, 9.81),
            Vector3::new(0.0, 0.0, 0.1),
        ));
        let recorded = RecordedEvent::from_event(&event).unwrap();
        let line = serde_json::to_string(&recorded).unwrap();

        assert_eq!(
            line,
            r#"{"kind":"imu","t":1.5,"acc":[0.0,0.0,9.81],"gyr":[0.0,0.0,0.1]}"#
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::fs;

    use approx::assert_relative_eq;
    use contracts::{
        FrameConventionKind, OdometryFrame, PublishConfig, SensorEvent, SinkConfig, SinkType,
        StreamKind, Vector3,
    };
    use dispatcher::create_dispatcher;
    use ingestion::{
        write_recording, IngestionPipeline, MockScenario, MockScenarioConfig, ReplaySource,
    };
    use observability::FusionMetricsAggregator;
    use sync_engine::{NotReady, SyncEngine, SyncEngineConfig};
    use tokio::sync::mpsc;

    fn run_engine(events: Vec<SensorEvent>) -> (SyncEngine, Vec<OdometryFrame>) {
        let mut engine = SyncEngine::new(SyncEngineConfig::default());
        let mut frames = Vec::new();
        for event in events {
            frames.extend(engine.push(event).frames);
        }
        (engine, frames)
    }

    fn yaw(frame: &OdometryFrame) -> f64 {
        let q = frame.orientation;
        (2.0 * (q.w * q.z + q.x * q.y)).atan2(1.0 - 2.0 * (q.y * q.y + q.z * q.z))
    }

    #[test]
    fn test_stationary_scenario_holds_pose() {
        let (engine, frames) = run_engine(MockScenario::stationary(2.0).events());

        // scans at 0.0, 0.1, ..., 2.0
        assert_eq!(frames.len(), 21);
        assert_eq!(engine.stats().scans_consumed, 21);

        let last = frames.last().unwrap();
        assert_relative_eq!(last.timestamp, 2.0, epsilon = 1e-9);
        assert_relative_eq!(last.position.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(last.position.z, 0.0, epsilon = 1e-9);
        assert_relative_eq!(last.velocity.z, 0.0, epsilon = 1e-9);
        assert_relative_eq!(last.orientation.w, 1.0, epsilon = 1e-9);

        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.scan_index, i as u64);
        }
    }

    #[test]
    fn test_constant_yaw_rate_rotates_heading() {
        let config = MockScenarioConfig {
            duration_s: 2.0,
            angular_rate: Vector3::new(0.0, 0.0, 0.5),
            ..Default::default()
        };
        let dt = 1.0 / config.imu_hz;
        let scenario = MockScenario::new(config.clone());
        let (_, frames) = run_engine(scenario.events());

        let first = frames.first().unwrap();
        let last = frames.last().unwrap();
        let elapsed = last.timestamp - first.timestamp;
        // 一阶四元数增量 (1, ω·dt/2) 归一化后每步转 2·atan(ω·dt/2)
        let steps = (elapsed / dt).round();
        let expected = steps * 2.0 * (0.5 * dt / 2.0).atan();
        assert_relative_eq!(yaw(last) - yaw(first), expected, epsilon = 1e-9);
        assert_relative_eq!(yaw(last) - yaw(first), 0.5 * elapsed, epsilon = 1e-5);
        // rotation about the gravity axis leaves the specific force balanced
        assert_relative_eq!(last.position.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(last.position.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_constant_acceleration_follows_kinematics() {
        let scenario = MockScenario::new(MockScenarioConfig {
            duration_s: 1.0,
            specific_force: Vector3::new(1.0, 0.0, 9.81),
            ..Default::default()
        });
        let (_, frames) = run_engine(scenario.events());

        let last = frames.last().unwrap();
        assert_relative_eq!(last.position.x, 0.5, epsilon = 1e-6);
        assert_relative_eq!(last.velocity.x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_scans_ahead_of_imu_give_identical_result() {
        let events = MockScenario::stationary(1.0).events();
        let (ordered_engine, ordered) = run_engine(events.clone());

        // deliver each scan set five inertial samples early
        let mut early = Vec::with_capacity(events.len());
        let mut pending_imu: Vec<SensorEvent> = Vec::new();
        for event in events {
            if event.kind() == StreamKind::Imu {
                pending_imu.push(event);
            } else {
                let keep = pending_imu.len().saturating_sub(5);
                let late: Vec<_> = pending_imu.drain(keep..).collect();
                early.append(&mut pending_imu);
                early.push(event);
                pending_imu = late;
            }
        }
        early.extend(pending_imu);

        let (early_engine, reordered) = run_engine(early);

        assert_eq!(reordered.len(), ordered.len());
        assert!(early_engine.stats().stalls > ordered_engine.stats().stalls);
        for (a, b) in ordered.iter().zip(reordered.iter()) {
            assert_eq!(a.timestamp, b.timestamp);
            assert_relative_eq!(a.position.z, b.position.z, epsilon = 1e-12);
            assert_relative_eq!(a.velocity.z, b.velocity.z, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_scan_without_inertial_coverage_waits() {
        let mut events = MockScenario::stationary(0.3).events();
        // drop the last inertial sample so the scan at 0.3 is never covered
        let last_imu = events
            .iter()
            .rposition(|e| e.kind() == StreamKind::Imu)
            .unwrap();
        events.remove(last_imu);

        let (mut engine, frames) = run_engine(events);
        assert_eq!(frames.len(), 3);

        // the scan set at 0.3 arrived after the last inertial sample
        let report = engine.process();
        assert!(report.frames.is_empty());
        assert!(matches!(
            report.stall,
            Some(NotReady::AwaitingImu { scan_time, .. }) if (scan_time - 0.3).abs() < 1e-9
        ));
        assert_eq!(engine.buffer_depth(StreamKind::Scan), 1);
    }

    #[test]
    fn test_aggregator_tracks_path_length() {
        let scenario = MockScenario::new(MockScenarioConfig {
            duration_s: 1.0,
            specific_force: Vector3::new(1.0, 0.0, 9.81),
            ..Default::default()
        });
        let (engine, frames) = run_engine(scenario.events());

        let mut aggregator = FusionMetricsAggregator::new();
        for frame in &frames {
            aggregator.update_scan(frame, 0.0, 10);
        }
        let (dropped, out_of_order) = engine.drop_totals();
        aggregator.set_drop_totals(dropped, out_of_order);
        let summary = aggregator.summary();

        assert_eq!(summary.total_scans, 11);
        assert_eq!(summary.total_out_of_order, 0);
        assert_relative_eq!(summary.path_length, 0.5, epsilon = 1e-6);
        assert_relative_eq!(summary.scan_interval_s.mean, 0.1, epsilon = 1e-9);
    }

    /// End-to-end test: ReplaySource -> IngestionPipeline -> SyncEngine -> Dispatcher
    ///
    /// 验证完整的数据流：
    /// 1. 录制文件经回放数据源进入 ingestion 通道
    /// 2. SyncEngine 逐帧输出位姿
    /// 3. Dispatcher 按 yzx 约定写出 TUM 轨迹
    #[tokio::test]
    async fn test_e2e_replay_to_trajectory_file() {
        let dir = tempfile::tempdir().unwrap();
        let recording = dir.path().join("session.jsonl");
        let trajectory = dir.path().join("traj.txt");

        let scenario = MockScenario::new(MockScenarioConfig {
            duration_s: 1.0,
            specific_force: Vector3::new(1.0, 0.0, 9.81),
            ..Default::default()
        });
        write_recording(fs::File::create(&recording).unwrap(), &scenario.events()).unwrap();

        // Setup: ingestion
        let mut ingestion = IngestionPipeline::new(64);
        let source = ReplaySource::open(&recording).unwrap();
        ingestion
            .register_source("session".to_string(), Box::new(source), None)
            .unwrap();

        // Setup: dispatcher
        let (frame_tx, frame_rx) = mpsc::channel::<OdometryFrame>(64);
        let sink_configs = vec![SinkConfig {
            name: "trajectory".to_string(),
            sink_type: SinkType::File,
            queue_capacity: 64,
            params: HashMap::from([("path".to_string(), trajectory.display().to_string())]),
        }];
        let publish = PublishConfig {
            frame: FrameConventionKind::Yzx,
            attach_features: false,
        };
        let dispatcher = create_dispatcher(sink_configs, publish, frame_rx).unwrap();
        let dispatcher_handle = dispatcher.spawn();

        // Run: single consumer owns the engine
        ingestion.start_all();
        let events = ingestion.take_receiver().unwrap();
        let mut engine = SyncEngine::new(SyncEngineConfig::default());
        let consumer = async {
            let mut published = 0;
            while let Ok(event) = events.recv().await {
                for frame in engine.push(event).frames {
                    frame_tx.send(frame).await.unwrap();
                    published += 1;
                }
            }
            published
        };
        let published = tokio::time::timeout(std::time::Duration::from_secs(5), consumer)
            .await
            .expect("pipeline timed out");

        drop(frame_tx);
        dispatcher_handle.await.unwrap();

        assert_eq!(published, 11);
        assert_eq!(ingestion.metrics().snapshot().imu_received, 101);

        let content = fs::read_to_string(&trajectory).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 11);

        // x = 0.5 m forward, published as z under yzx
        let fields: Vec<f64> = lines[10]
            .split_whitespace()
            .map(|f| f.parse().unwrap())
            .collect();
        assert_relative_eq!(fields[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(fields[1], 0.0, epsilon = 1e-6);
        assert_relative_eq!(fields[2], 0.0, epsilon = 1e-6);
        assert_relative_eq!(fields[3], 0.5, epsilon = 1e-5);
    }
}
