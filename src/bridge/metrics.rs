//! Turn telemetry for the session bridge
//!
//! Tracks each turn from start to completion or error, labeled by
//! outcome so dashboards can separate upstream failures from model and
//! tool failures.
//!
//! # Metrics
//!
//! - `bridge_turns_total`: Counter of started turns
//! - `bridge_turn_duration_seconds`: Histogram of turn duration
//! - `bridge_tool_rounds_used`: Histogram of tool-call rounds per turn
//! - `bridge_tokens_consumed`: Histogram of provider-reported tokens
//! - `bridge_turn_completions_total`: Counter of completions by status
//! - `bridge_turn_errors_total`: Counter of errors by type
//! - `bridge_active_turns`: Gauge of turns currently in flight

use metrics::{decrement_gauge, histogram, increment_counter, increment_gauge};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Metrics collection for a single turn
///
/// Created when a turn starts and recorded exactly once, on completion
/// or error. Uses an atomic flag so recording works through shared
/// references inside `Send` futures, and the drop guard keeps the active
/// gauge accurate even if the turn panics.
#[derive(Debug)]
pub struct TurnMetrics {
    /// When the turn started
    start: Instant,

    /// Whether metrics have been recorded, to prevent double-recording
    recorded: AtomicBool,
}

impl TurnMetrics {
    /// Starts tracking a new turn
    pub fn new() -> Self {
        increment_counter!("bridge_turns_total");
        increment_gauge!("bridge_active_turns", 1.0);

        Self {
            start: Instant::now(),
            recorded: AtomicBool::new(false),
        }
    }

    /// Records successful completion of the turn
    ///
    /// # Arguments
    ///
    /// * `tool_rounds` - Number of tool-call rounds executed
    /// * `tokens` - Provider-reported tokens consumed (0 if unreported)
    pub fn record_completion(&self, tool_rounds: usize, tokens: usize) {
        if self.recorded.swap(true, Ordering::SeqCst) {
            return;
        }

        let duration = self.start.elapsed();

        histogram!(
            "bridge_turn_duration_seconds",
            duration.as_secs_f64(),
            "status" => "success"
        );
        histogram!("bridge_tool_rounds_used", tool_rounds as f64);
        histogram!("bridge_tokens_consumed", tokens as f64);
        increment_counter!("bridge_turn_completions_total", "status" => "success");
        decrement_gauge!("bridge_active_turns", 1.0);
    }

    /// Records a turn failure
    ///
    /// # Arguments
    ///
    /// * `error_type` - Failure class ("upstream_unavailable", "provider",
    ///   "tool", "tool_rounds_exceeded", "other")
    pub fn record_error(&self, error_type: &str) {
        if self.recorded.swap(true, Ordering::SeqCst) {
            return;
        }

        increment_counter!(
            "bridge_turn_errors_total",
            "error_type" => error_type.to_string()
        );
        decrement_gauge!("bridge_active_turns", 1.0);
    }

    /// Returns elapsed time since the turn started
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Default for TurnMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TurnMetrics {
    fn drop(&mut self) {
        if !self.recorded.load(Ordering::SeqCst) {
            decrement_gauge!("bridge_active_turns", 1.0);
        }
    }
}

/// Initializes the metrics exporter for Prometheus
///
/// Only has an effect when compiled with the `prometheus` feature
/// enabled; otherwise it is a safe no-op.
pub fn init_metrics_exporter() {
    #[cfg(feature = "prometheus")]
    {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let _ = builder.install().map_err(|e| {
            tracing::warn!("Failed to install Prometheus exporter: {}", e);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_metrics_creation() {
        let metrics = TurnMetrics::new();
        assert!(metrics.elapsed().as_millis() < 100);
    }

    #[test]
    fn test_record_completion_sets_flag() {
        let metrics = TurnMetrics::new();
        metrics.record_completion(1, 150);
        assert!(metrics.recorded.load(Ordering::SeqCst));
    }

    #[test]
    fn test_record_error_sets_flag() {
        let metrics = TurnMetrics::new();
        metrics.record_error("upstream_unavailable");
        assert!(metrics.recorded.load(Ordering::SeqCst));
    }

    #[test]
    fn test_double_record_prevention() {
        let metrics = TurnMetrics::new();
        metrics.record_completion(0, 0);
        // Second call is ignored
        metrics.record_error("provider");
        assert!(metrics.recorded.load(Ordering::SeqCst));
    }

    #[test]
    fn test_drop_without_recording() {
        {
            let _metrics = TurnMetrics::new();
            // Active gauge is decremented on drop
        }
    }

    #[test]
    fn test_elapsed_increases() {
        let metrics = TurnMetrics::new();
        let t1 = metrics.elapsed();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(metrics.elapsed() > t1);
    }

    #[test]
    fn test_init_metrics_exporter() {
        init_metrics_exporter();
        // Should not panic
    }
}
