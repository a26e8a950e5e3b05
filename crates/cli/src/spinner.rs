// crates/cli/src/spinner.rs
//! Terminal spinner fed by progress updates.

use std::time::Duration;

use async_trait::async_trait;
use guild_sweep_core::{JobId, ProgressSnapshot, SinkError};
use guild_sweep_jobs::ProgressSink;
use indicatif::{ProgressBar, ProgressStyle};

pub struct SpinnerSink {
    bar: ProgressBar,
}

impl SpinnerSink {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Draws nothing. Used for `--json` output and in tests.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn message(&self) -> String {
        self.bar.message()
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for SpinnerSink {
    fn default() -> Self {
        Self::new()
    }
}

/// `"Deleting channels: 12 done (channels 7, roles 5)"`; zero counts are left out.
pub fn format_progress(status: &str, snapshot: &ProgressSnapshot) -> String {
    let parts: Vec<String> = snapshot
        .counts
        .iter()
        .filter(|c| c.count > 0)
        .map(|c| format!("{} {}", c.category, c.count))
        .collect();
    if parts.is_empty() {
        format!("{status}: {} done", snapshot.total())
    } else {
        format!("{status}: {} done ({})", snapshot.total(), parts.join(", "))
    }
}

#[async_trait]
impl ProgressSink for SpinnerSink {
    async fn emit(
        &self,
        _job_id: JobId,
        snapshot: &ProgressSnapshot,
        status: &str,
    ) -> Result<(), SinkError> {
        self.bar.set_message(format_progress(status, snapshot));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guild_sweep_core::CategoryCount;

    fn snapshot(counts: &[(&str, u64)]) -> ProgressSnapshot {
        ProgressSnapshot {
            counts: counts
                .iter()
                .map(|(category, count)| CategoryCount {
                    category: category.to_string(),
                    count: *count,
                })
                .collect(),
        }
    }

    #[test]
    fn test_format_progress_skips_zero_counts() {
        let snap = snapshot(&[("channels", 7), ("webhooks", 0), ("roles", 5)]);
        assert_eq!(
            format_progress("Deleting roles", &snap),
            "Deleting roles: 12 done (channels 7, roles 5)"
        );
        assert_eq!(format_progress("Starting", &snapshot(&[("channels", 0)])), "Starting: 0 done");
    }

    #[tokio::test]
    async fn test_emit_updates_message() {
        let sink = SpinnerSink::hidden();
        sink.emit(1, &snapshot(&[("emojis", 3)]), "Deleting emojis")
            .await
            .unwrap();
        assert_eq!(sink.message(), "Deleting emojis: 3 done (emojis 3)");
        sink.finish();
    }
}
