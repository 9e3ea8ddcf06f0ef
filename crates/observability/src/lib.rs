//! # Observability
//!
//! 日志与指标的统一入口。
//!
//! - `tracing` 订阅器：json / pretty / compact 三种输出，`RUST_LOG` 优先于默认级别
//! - Prometheus 导出：可选，按端口开启
//! - 估计链路的指标记录函数与运行期统计，见 [`metrics`]

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    record_buffer_depth, record_buffer_drop, record_event_received, record_frame_dispatched,
    record_scan_consumed, record_stall, FusionMetricsAggregator, MetricsSummary, RunningStats,
    StatsSummary,
};

/// 日志输出格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
    Compact,
}

#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// `None` 表示不开启 Prometheus
    pub metrics_port: Option<u16>,
    /// 未设置 `RUST_LOG` 时使用
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: None,
            default_log_level: "info".to_string(),
        }
    }
}

type BoxedFmtLayer = Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>;

fn fmt_layer(format: LogFormat) -> BoxedFmtLayer {
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the global subscriber and, when a port is given, the Prometheus recorder.
///
/// Fails if a global subscriber is already set.
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt_layer(config.log_format))
        .with(env_filter(&config.default_log_level))
        .try_init()
        .context("tracing subscriber already installed")?;

    if let Some(port) = config.metrics_port {
        install_prometheus(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "observability ready"
    );
    Ok(())
}

/// Prometheus only, for callers whose tracing is already set up
pub fn init_metrics_only(port: u16) -> Result<()> {
    install_prometheus(port)
}

fn install_prometheus(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("cannot serve Prometheus metrics on port {port}"))?;
    tracing::info!(port, "Prometheus endpoint listening");
    Ok(())
}
