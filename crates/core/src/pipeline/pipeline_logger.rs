use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

/// Cross-cutting logger for acquisition events.
///
/// Decouples the pipeline from specific output mechanisms so a caller can
/// observe cycle behavior without changing the orchestration code.
pub trait PipelineLogger: Send {
    /// A redacted pair was handed to the caller.
    fn frame_delivered(&mut self, sequence: u64);

    /// A cycle produced nothing; `reason` is a short tag such as `"timeout"`.
    fn frame_skipped(&mut self, reason: &str);

    /// Record how long a named stage took for one cycle.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. faces per frame).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn frame_delivered(&mut self, _sequence: u64) {}
    fn frame_skipped(&mut self, _reason: &str) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Running count, sum and maximum of one recorded series.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SampleStats {
    pub count: u64,
    pub sum: f64,
    pub max: f64,
}

impl SampleStats {
    fn record(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.max = if self.count == 1 { value } else { self.max.max(value) };
    }

    pub fn avg(&self) -> f64 {
        self.sum / self.count.max(1) as f64
    }
}

/// Aggregates per-stage timings and metrics and reports through `log`.
///
/// Only running totals are kept, so memory stays flat however long the
/// session runs. A progress line is written every `throttle_frames`
/// delivered frames.
pub struct StdoutPipelineLogger {
    throttle_frames: u64,
    timings: HashMap<String, SampleStats>,
    metrics: HashMap<String, SampleStats>,
    skipped: BTreeMap<String, u64>,
    delivered: u64,
    start_time: Instant,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: u64) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            skipped: BTreeMap::new(),
            delivered: 0,
            start_time: Instant::now(),
        }
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn skipped(&self, reason: &str) -> u64 {
        self.skipped.get(reason).copied().unwrap_or(0)
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.delivered == 0 && self.skipped.is_empty() && self.timings.is_empty() {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Acquisition summary ({} frames, {elapsed_s:.1}s):",
            self.delivered
        )];

        for (reason, count) in &self.skipped {
            lines.push(format!("  skipped ({reason}): {count}"));
        }

        let mut stages: Vec<_> = self.timings.iter().collect();
        stages.sort_by(|a, b| a.0.cmp(b.0));
        for (stage, stats) in stages {
            lines.push(format!(
                "  {stage:10}: avg {:6.1}ms  max {:6.1}ms",
                stats.avg(),
                stats.max
            ));
        }

        let mut names: Vec<_> = self.metrics.iter().collect();
        names.sort_by(|a, b| a.0.cmp(b.0));
        for (name, stats) in names {
            lines.push(format!("  {name}: avg {:.1}", stats.avg()));
        }

        if self.delivered > 0 && elapsed_s > 0.0 {
            lines.push(format!(
                "  Throughput: {:.1} fps",
                self.delivered as f64 / elapsed_s
            ));
        }
        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<SampleStats> {
        self.timings.get(stage).copied()
    }

    pub fn metrics_for(&self, name: &str) -> Option<SampleStats> {
        self.metrics.get(name).copied()
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn frame_delivered(&mut self, sequence: u64) {
        self.delivered += 1;
        if self.delivered % self.throttle_frames == 0 {
            log::info!("Acquired {} frames (sequence {sequence})", self.delivered);
        }
    }

    fn frame_skipped(&mut self, reason: &str) {
        *self.skipped.entry(reason.to_string()).or_default() += 1;
        log::debug!("cycle skipped: {reason}");
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().record(value);
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
