// crates/cli/src/summary.rs
//! Final report and persisted-state rendering.

use guild_sweep_core::{Category, JobReport};
use guild_sweep_jobs::PersistedState;

fn label(key: &str) -> &str {
    Category::parse_str(key)
        .map(|c| c.display_label())
        .unwrap_or(key)
}

fn rows<'a>(counts: impl Iterator<Item = (&'a str, u64)>) -> String {
    counts
        .map(|(key, count)| format!("    {:<26}{count:>8}\n", label(key)))
        .collect()
}

pub fn render_report(report: &JobReport) -> String {
    let (mark, verb) = if report.is_cancelled() {
        ("\u{2717}", "cancelled")
    } else {
        ("\u{2713}", "complete")
    };
    let mut out = format!(
        "  {mark} Sweep {verb} for target {} in {:.2}s\n\n",
        report.job_id,
        report.elapsed().as_secs_f64()
    );
    out.push_str(&rows(
        report.categories.iter().map(|c| (c.category.as_str(), c.count)),
    ));
    out.push_str(&format!("    {:<26}{:>8}\n", "Total", report.total()));
    out
}

pub fn render_report_json(report: &JobReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

pub fn render_persisted(state: &PersistedState) -> String {
    let header = match (state.in_progress, state.started_at) {
        (true, Some(started)) => {
            let minutes = (chrono::Utc::now() - started).num_minutes();
            format!(
                "Target {}: sweep in progress (started {}, {minutes}m ago)\n",
                state.job_id,
                started.to_rfc3339()
            )
        }
        (true, None) => format!("Target {}: sweep in progress\n", state.job_id),
        (false, _) => format!("Target {}: no sweep running\n", state.job_id),
    };
    let mut out = header;
    out.push_str(&rows(state.counts.iter().map(|(k, v)| (k.as_str(), *v))));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use guild_sweep_core::{CategoryCount, JobOutcome};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn report(outcome: JobOutcome) -> JobReport {
        let started_at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        JobReport {
            job_id: 77,
            outcome,
            started_at,
            finished_at: started_at,
            elapsed_ms: 3_250,
            categories: vec![
                CategoryCount {
                    category: "channels".into(),
                    count: 12,
                },
                CategoryCount {
                    category: "custom".into(),
                    count: 1,
                },
            ],
        }
    }

    #[test]
    fn test_render_report_table() {
        let out = render_report(&report(JobOutcome::Completed));
        let expected = format!(
            "  \u{2713} Sweep complete for target 77 in 3.25s\n\n    {:<26}{:>8}\n    {:<26}{:>8}\n    {:<26}{:>8}\n",
            "Channels", 12, "custom", 1, "Total", 13
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn test_render_cancelled_report() {
        let out = render_report(&report(JobOutcome::Cancelled));
        assert!(out.starts_with("  \u{2717} Sweep cancelled for target 77"));
    }

    #[test]
    fn test_render_report_json_uses_camel_case() {
        let json = render_report_json(&report(JobOutcome::Completed)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["jobId"], 77);
        assert_eq!(value["elapsedMs"], 3250);
        assert_eq!(value["categories"][0]["count"], 12);
    }

    #[test]
    fn test_render_persisted_idle() {
        let state = PersistedState {
            job_id: 5,
            in_progress: false,
            started_at: None,
            counts: BTreeMap::from([("roles".to_string(), 4)]),
        };
        let out = render_persisted(&state);
        assert!(out.starts_with("Target 5: no sweep running\n"));
        assert!(out.contains("Roles"));
    }
}
