//! SensorSource trait - Sensor data source abstraction
//!
//! Decouples the producers of sensor events (recordings, synthetic scenarios)
//! from the single consumer that owns the fusion state.

use std::sync::Arc;

use crate::SensorEvent;

/// Sensor event callback type
///
/// Sources may call it from their own threads; the callback must hand the
/// event over to the consumer (typically through a channel).
pub type SensorEventCallback = Arc<dyn Fn(SensorEvent) + Send + Sync>;

/// Sensor data source trait
///
/// # Example
///
/// ```ignore
/// let source: Box<dyn SensorSource> = get_source();
/// source.listen(Arc::new(|event| {
///     println!("{} at {}", event.kind(), event.timestamp);
/// }));
/// source.stop();
/// ```
pub trait SensorSource: Send + Sync {
    /// Source name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Register callback and start producing
    ///
    /// Repeated calls while listening are ignored.
    fn listen(&self, callback: SensorEventCallback);

    /// Stop producing
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}
