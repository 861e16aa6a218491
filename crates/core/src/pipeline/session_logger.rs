use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for encode-session events.
///
/// The session reports per-frame progress, per-stage durations
/// (`convert`, `package`, `encode`, `mux`) and packet sizes through this
/// trait so hosts can choose how, or whether, to surface them.
pub trait SessionLogger {
    /// `frames` is the number of frames submitted so far.
    fn progress(&mut self, frames: u64);

    fn timing(&mut self, stage: &str, duration_ms: f64);

    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// End-of-session report. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. Used by default and in tests.
pub struct NullSessionLogger;

impl SessionLogger for NullSessionLogger {
    fn progress(&mut self, _frames: u64) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Collects stage timings and metrics and logs a summary at the end.
///
/// Progress lines are throttled to every `throttle_frames` frames.
pub struct StdoutSessionLogger {
    throttle_frames: u64,
    timings: BTreeMap<String, Vec<f64>>,
    metrics: BTreeMap<String, Vec<f64>>,
    start_time: Instant,
    frames: u64,
}

impl StdoutSessionLogger {
    pub fn new(throttle_frames: u64) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            start_time: Instant::now(),
            frames: 0,
        }
    }

    /// Formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Session summary ({} frames, {:.1}s total):",
            self.frames,
            elapsed_ms / 1000.0
        )];

        for (stage, durations) in &self.timings {
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = mean(durations);
            let pct = if elapsed_ms > 0.0 {
                total_ms / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "  {stage:8}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms  ({pct:4.1}%)"
            ));
        }

        for (name, values) in &self.metrics {
            lines.push(format!("  {name}: avg {:.1}", mean(values)));
        }

        if self.frames > 0 && elapsed_ms > 0.0 {
            let fps = self.frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl Default for StdoutSessionLogger {
    fn default() -> Self {
        Self::new(10)
    }
}

impl SessionLogger for StdoutSessionLogger {
    fn progress(&mut self, frames: u64) {
        self.frames = frames;
        if frames % self.throttle_frames == 0 {
            log::info!("Encoded {frames} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().push(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_accepts_everything() {
        let mut logger = NullSessionLogger;
        logger.progress(1);
        logger.timing("encode", 5.0);
        logger.metric("packet_bytes", 3.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_records_values() {
        let mut logger = StdoutSessionLogger::new(10);
        logger.timing("encode", 20.0);
        logger.timing("encode", 30.0);
        logger.timing("mux", 5.0);

        assert_eq!(logger.timings_for("encode").unwrap(), &[20.0, 30.0]);
        assert_eq!(logger.timings_for("mux").unwrap(), &[5.0]);
        assert!(logger.timings_for("convert").is_none());
    }

    #[test]
    fn test_metric_average_in_summary() {
        let mut logger = StdoutSessionLogger::new(10);
        logger.progress(2);
        logger.metric("packet_bytes", 3.0);
        logger.metric("packet_bytes", 4.0);

        assert_relative_eq!(mean(logger.metrics_for("packet_bytes").unwrap()), 3.5);
        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("packet_bytes: avg 3.5"));
        assert!(summary.contains("Session summary (2 frames"));
    }

    #[test]
    fn test_summary_lists_stages_and_throughput() {
        let mut logger = StdoutSessionLogger::new(10);
        logger.progress(100);
        logger.timing("convert", 10.0);
        logger.timing("encode", 10.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("convert"));
        assert!(summary.contains("encode"));
        assert!(summary.contains("fps"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(StdoutSessionLogger::new(10).summary_string().is_none());
    }

    #[test]
    fn test_zero_throttle_is_clamped() {
        let mut logger = StdoutSessionLogger::new(0);
        logger.progress(3);
        assert_eq!(logger.throttle_frames, 1);
    }
}
