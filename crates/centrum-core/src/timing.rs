//! Per-stage wall-clock timing for one pipeline run.
//!
//! Collection is off by default. When enabled, [`timed`] records one sample
//! per call into a thread-local buffer and [`collect_report`] drains it in
//! recording order.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde_json::json;

/// Ordered stage timings collected on the current thread.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimingReport {
    pub stages: Vec<StageTiming>,
}

/// Duration of one named stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTiming {
    pub name: String,
    pub elapsed: Duration,
}

thread_local! {
    static SAMPLES: RefCell<Vec<StageTiming>> = const { RefCell::new(Vec::new()) };
}

static TIMING_ENABLED: AtomicBool = AtomicBool::new(false);

/// Returns true when `CENTRUM_TIMING` enables timing collection.
///
/// Supported truthy values: `1`, `true`, `yes`, `on` (case-insensitive).
#[must_use]
pub fn timing_enabled_from_env() -> bool {
    std::env::var("CENTRUM_TIMING")
        .ok()
        .is_some_and(|value| is_truthy(value.as_str()))
}

/// Enable or disable timing collection.
pub fn set_timing_enabled(enabled: bool) {
    TIMING_ENABLED.store(enabled, Ordering::Relaxed);
    if !enabled {
        clear_timings();
    }
}

#[must_use]
pub fn is_timing_enabled() -> bool {
    TIMING_ENABLED.load(Ordering::Relaxed)
}

/// Clears all recorded timings for the current thread.
pub fn clear_timings() {
    SAMPLES.with(|samples| samples.borrow_mut().clear());
}

/// Execute a closure while recording its duration under `name`.
pub fn timed<R>(name: &str, f: impl FnOnce() -> R) -> R {
    if !is_timing_enabled() {
        return f();
    }

    let started = Instant::now();
    let result = f();
    record_sample(name, started.elapsed());
    result
}

/// Drain the current thread's samples into a report.
#[must_use]
pub fn collect_report() -> TimingReport {
    let stages = SAMPLES.with(|samples| std::mem::take(&mut *samples.borrow_mut()));
    TimingReport { stages }
}

impl TimingReport {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Sum of all stage durations.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.stages.iter().map(|stage| stage.elapsed).sum()
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let stages = self
            .stages
            .iter()
            .map(|stage| {
                json!({
                    "name": stage.name,
                    "elapsed_us": stage.elapsed.as_micros(),
                })
            })
            .collect::<Vec<_>>();

        json!({ "stages": stages, "total_us": self.total().as_micros() })
    }

    /// Render the report as a two-column table for stderr.
    #[must_use]
    pub fn display_table(&self) -> String {
        if self.stages.is_empty() {
            return "No timing samples recorded.".to_string();
        }

        let mut out = String::new();
        out.push_str("stage                        elapsed\n");
        out.push_str("------------------------------------\n");
        for stage in &self.stages {
            let _ = writeln!(out, "{:<28} {:>7}", stage.name, format_duration(stage.elapsed));
        }
        let _ = writeln!(out, "{:<28} {:>7}", "total", format_duration(self.total()));
        out
    }
}

fn record_sample(name: &str, elapsed: Duration) {
    SAMPLES.with(|samples| {
        samples.borrow_mut().push(StageTiming {
            name: name.to_string(),
            elapsed,
        });
    });
}

fn format_duration(duration: Duration) -> String {
    let micros = duration.as_micros();

    if micros >= 1_000_000 {
        let secs = micros / 1_000_000;
        let millis = (micros % 1_000_000) / 1_000;
        format!("{secs}.{millis:03}s")
    } else if micros >= 1_000 {
        let millis = micros / 1_000;
        let rem = micros % 1_000;
        format!("{millis}.{rem:03}ms")
    } else {
        format!("{micros}µs")
    }
}

const fn is_truthy(value: &str) -> bool {
    value.eq_ignore_ascii_case("1")
        || value.eq_ignore_ascii_case("true")
        || value.eq_ignore_ascii_case("yes")
        || value.eq_ignore_ascii_case("on")
}

#[cfg(test)]
mod tests {
    use super::*;

    static TEST_GUARD: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[test]
    fn timed_does_not_record_when_disabled() {
        let _guard = TEST_GUARD.lock().expect("test guard lock");
        set_timing_enabled(false);

        let value = timed("disabled", || 7_u8);
        assert_eq!(value, 7);
        assert!(collect_report().is_empty());
    }

    #[test]
    fn timed_records_stages_in_order() {
        let _guard = TEST_GUARD.lock().expect("test guard lock");
        set_timing_enabled(true);
        clear_timings();

        timed("build", || ());
        timed("compute", || ());

        let report = collect_report();
        let names: Vec<&str> = report.stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["build", "compute"]);

        set_timing_enabled(false);
    }

    #[test]
    fn table_and_json_include_total() {
        let _guard = TEST_GUARD.lock().expect("test guard lock");
        clear_timings();

        record_sample("serialize", Duration::from_micros(1_500));
        record_sample("map", Duration::from_micros(500));

        let report = collect_report();
        assert_eq!(report.total(), Duration::from_micros(2_000));

        let table = report.display_table();
        assert!(table.contains("serialize"));
        assert!(table.contains("1.500ms"));
        assert!(table.contains("total"));

        let json = report.to_json();
        assert_eq!(json["total_us"], serde_json::Value::from(2_000));
        assert_eq!(json["stages"][1]["name"], "map");
    }

    #[test]
    fn truthy_parser_is_case_insensitive() {
        assert!(is_truthy("TrUe"));
        assert!(is_truthy("on"));
        assert!(!is_truthy("0"));
    }
}
