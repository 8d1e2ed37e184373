//! Opt-in per-operation latency sampling for `qd --timing`.
//!
//! Samples live in a thread-local buffer; the CLI drains them into a
//! [`TimingReport`] once the command finishes.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

static ENABLED: AtomicBool = AtomicBool::new(false);

thread_local! {
    static SAMPLES: RefCell<Vec<(&'static str, Duration)>> = const { RefCell::new(Vec::new()) };
}

/// Latency summary for one operation name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpTiming {
    pub name: String,
    pub count: usize,
    #[serde(rename = "p50_us", serialize_with = "as_micros")]
    pub p50: Duration,
    #[serde(rename = "p95_us", serialize_with = "as_micros")]
    pub p95: Duration,
    #[serde(rename = "p99_us", serialize_with = "as_micros")]
    pub p99: Duration,
    #[serde(rename = "total_us", serialize_with = "as_micros")]
    pub total: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimingReport {
    pub operations: Vec<OpTiming>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn as_micros<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_micros())
}

/// `QUICKDESK_TIMING` set to `1`, `true`, `yes` or `on`.
#[must_use]
pub fn enabled_from_env() -> bool {
    std::env::var("QUICKDESK_TIMING").is_ok_and(|v| is_truthy(&v))
}

fn is_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub fn set_enabled(on: bool) {
    ENABLED.store(on, Ordering::Relaxed);
    if !on {
        SAMPLES.with(|s| s.borrow_mut().clear());
    }
}

#[must_use]
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Run `f`, recording its wall time under `name` when sampling is on.
pub fn timed<R>(name: &'static str, f: impl FnOnce() -> R) -> R {
    if !is_enabled() {
        return f();
    }
    let started = Instant::now();
    let out = f();
    let elapsed = started.elapsed();
    SAMPLES.with(|s| s.borrow_mut().push((name, elapsed)));
    out
}

/// Drain this thread's samples into a report, grouped by name.
#[must_use]
pub fn collect_report() -> TimingReport {
    let samples = SAMPLES.with(|s| std::mem::take(&mut *s.borrow_mut()));
    let mut grouped: BTreeMap<&'static str, Vec<Duration>> = BTreeMap::new();
    for (name, elapsed) in samples {
        grouped.entry(name).or_default().push(elapsed);
    }

    let operations = grouped
        .into_iter()
        .map(|(name, mut values)| {
            values.sort_unstable();
            OpTiming {
                name: name.to_string(),
                count: values.len(),
                p50: nearest_rank(&values, 50),
                p95: nearest_rank(&values, 95),
                p99: nearest_rank(&values, 99),
                total: values.iter().sum(),
            }
        })
        .collect();
    TimingReport { operations }
}

fn nearest_rank(sorted: &[Duration], pct: usize) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let rank = (pct.min(100) * sorted.len()).div_ceil(100).max(1);
    sorted[rank.min(sorted.len()) - 1]
}

impl TimingReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Plain-text table for stderr.
    #[must_use]
    pub fn display_table(&self) -> String {
        if self.operations.is_empty() {
            return "no timing samples recorded".to_string();
        }
        let mut out = format!(
            "{:<24} {:>5} {:>10} {:>10} {:>10}\n",
            "operation", "count", "p50", "p95", "p99"
        );
        for op in &self.operations {
            let _ = writeln!(
                out,
                "{:<24} {:>5} {:>10} {:>10} {:>10}",
                op.name,
                op.count,
                human(op.p50),
                human(op.p95),
                human(op.p99)
            );
        }
        out
    }
}

fn human(d: Duration) -> String {
    let us = d.as_micros();
    match us {
        0..1_000 => format!("{us}us"),
        1_000..1_000_000 => format!("{:.2}ms", d.as_secs_f64() * 1_000.0),
        _ => format!("{:.3}s", d.as_secs_f64()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The enable switch is process-wide, so the on/off cases share a test.
    #[test]
    fn records_only_while_enabled() {
        set_enabled(false);
        assert_eq!(timed("cmd.list", || 7), 7);
        assert!(collect_report().is_empty());

        set_enabled(true);
        timed("cmd.vote", || ());
        timed("cmd.vote", || ());
        timed("cmd.show", || ());
        let report = collect_report();
        set_enabled(false);

        let names: Vec<_> = report
            .operations
            .iter()
            .map(|o| (o.name.as_str(), o.count))
            .collect();
        assert_eq!(names, vec![("cmd.show", 1), ("cmd.vote", 2)]);
        assert!(collect_report().is_empty());
    }

    #[test]
    fn percentiles_use_nearest_rank() {
        let values: Vec<Duration> = (1..=100).map(Duration::from_millis).collect();
        assert_eq!(nearest_rank(&values, 50), Duration::from_millis(50));
        assert_eq!(nearest_rank(&values, 99), Duration::from_millis(99));
        assert_eq!(nearest_rank(&values[..1], 95), Duration::from_millis(1));
        assert_eq!(nearest_rank(&[], 50), Duration::ZERO);
    }

    #[test]
    fn truthy_values() {
        for v in ["1", "TRUE", " yes ", "On"] {
            assert!(is_truthy(v), "{v}");
        }
        for v in ["0", "false", "", "nope"] {
            assert!(!is_truthy(v), "{v}");
        }
    }

    #[test]
    fn report_renders_table_and_json() {
        let report = TimingReport {
            operations: vec![OpTiming {
                name: "cmd.create".into(),
                count: 1,
                p50: Duration::from_micros(1_500),
                p95: Duration::from_micros(1_500),
                p99: Duration::from_micros(1_500),
                total: Duration::from_micros(1_500),
            }],
        };
        assert!(report.display_table().contains("cmd.create"));
        assert!(report.display_table().contains("1.50ms"));
        let json = serde_json::to_value(&report).expect("serialize");
        assert_eq!(json["operations"][0]["p50_us"], 1_500);
    }
}
