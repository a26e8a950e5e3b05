// crates/cli/src/commands.rs
//! `run`, `status` and `reset`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use guild_sweep_core::{JobId, JobReport, SweepConfig};
use guild_sweep_jobs::{CountStore, JobController, JsonFileStore, MemoryStore, PersistedState, ProgressSink};

use crate::auth::{authorize, check_permissions};
use crate::fixture::Fixture;
use crate::spinner::SpinnerSink;

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// Target server id
    #[arg(long)]
    pub target: JobId,
    /// Simulated target (JSON)
    #[arg(long)]
    pub fixture: PathBuf,
    /// Id of the user requesting the sweep
    #[arg(long)]
    pub user: u64,
    /// Print the final report as JSON
    #[arg(long)]
    pub json: bool,
    /// Start even if persisted state says a sweep is still running
    #[arg(long)]
    pub force: bool,
}

/// Config from `path`, else `<config dir>/guild-sweep/config.toml` if it
/// exists, else defaults. Env overrides apply in every case.
pub fn load_config(path: Option<&Path>) -> Result<SweepConfig> {
    let fallback = dirs::config_dir()
        .map(|dir| dir.join("guild-sweep").join("config.toml"))
        .filter(|p| p.exists());
    let path = path.map(Path::to_path_buf).or(fallback);
    tracing::debug!(path = ?path, "Loading config");
    SweepConfig::load(path.as_deref()).context("loading config")
}

/// `state_dir` from config, else the platform data dir. Falls back to an
/// in-memory store when neither is available.
pub fn state_dir(config: &SweepConfig) -> Option<PathBuf> {
    config
        .state_dir
        .clone()
        .or_else(|| dirs::data_local_dir().map(|dir| dir.join("guild-sweep")))
}

pub fn open_store(config: &SweepConfig) -> Result<Arc<dyn CountStore>> {
    match state_dir(config) {
        Some(dir) => {
            let store = JsonFileStore::open(&dir)
                .with_context(|| format!("opening state dir {}", dir.display()))?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("No state directory available; counters will not survive a crash");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Run a full sweep of the fixture's target.
///
/// Ctrl-C requests a cooperative stop; the sweep then finishes the calls
/// already in flight and returns a cancelled report.
pub async fn run(config: &SweepConfig, args: &RunArgs, spinner: Arc<SpinnerSink>) -> Result<JobReport> {
    authorize(config, args.user)?;
    let fixture = Fixture::load(&args.fixture)?;
    check_permissions(&fixture.permissions)?;

    let store = open_store(config)?;
    if let Some(state) = store.load(args.target)? {
        if state.in_progress && !args.force {
            bail!(
                "A sweep is already in progress for target {} (pass --force if the previous run crashed)",
                args.target
            );
        }
    }

    tracing::info!(
        target_id = args.target,
        target_name = %fixture.name,
        user_id = args.user,
        "Starting sweep"
    );
    let sink: Arc<dyn ProgressSink> = spinner.clone();
    let controller = JobController::new(config, store, sink);
    let pipeline = fixture.pipeline(&config.settings);

    let sweep = controller.start(args.target, pipeline);
    tokio::pin!(sweep);
    let mut listen = true;
    let report = loop {
        tokio::select! {
            result = &mut sweep => break result?,
            signal = tokio::signal::ctrl_c(), if listen => {
                if let Err(e) = signal {
                    tracing::warn!(error = %e, "Ctrl-C handler unavailable");
                    listen = false;
                    continue;
                }
                if let Some(snapshot) = controller.stop(args.target) {
                    tracing::warn!(target_id = args.target, done = snapshot.total(), "Stopping sweep");
                }
            }
        }
    };
    spinner.finish();
    Ok(report)
}

pub fn status(config: &SweepConfig, target: JobId) -> Result<Option<PersistedState>> {
    Ok(open_store(config)?.load(target)?)
}

pub fn reset(config: &SweepConfig, target: JobId) -> Result<()> {
    open_store(config)?.clear(target)?;
    tracing::info!(target_id = target, "Cleared persisted sweep state");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use guild_sweep_core::JobOutcome;

    const FIXTURE: &str = r#"{
        "name": "Test Server",
        "permissions": [
            "manage_channels", "manage_roles", "manage_emojis_and_stickers",
            "manage_webhooks", "manage_guild", "manage_messages"
        ],
        "categories": {
            "channels": { "items": [{ "name": "a" }, { "name": "b" }, { "name": "c" }] },
            "emojis": { "items": [{ "name": "wave" }, { "name": "gone", "fail": "missing" }] }
        }
    }"#;

    struct Env {
        _dir: tempfile::TempDir,
        config: SweepConfig,
        args: RunArgs,
    }

    fn env(fixture: &str) -> Env {
        let dir = tempfile::tempdir().unwrap();
        let fixture_path = dir.path().join("target.json");
        std::fs::write(&fixture_path, fixture).unwrap();
        let config = SweepConfig {
            state_dir: Some(dir.path().join("state")),
            allowed_users: vec![7],
            ..SweepConfig::default()
        };
        let args = RunArgs {
            target: 900,
            fixture: fixture_path,
            user: 7,
            json: false,
            force: false,
        };
        Env {
            _dir: dir,
            config,
            args,
        }
    }

    #[tokio::test]
    async fn test_run_sweeps_fixture() {
        let env = env(FIXTURE);
        let report = run(&env.config, &env.args, Arc::new(SpinnerSink::hidden()))
            .await
            .unwrap();
        assert_eq!(report.outcome, JobOutcome::Completed);
        assert_eq!(report.count("channels"), 3);
        assert_eq!(report.count("emojis"), 1);
        assert_eq!(report.count("guild_settings"), 1);
        assert_eq!(status(&env.config, 900).unwrap(), None);
    }

    #[tokio::test]
    async fn test_run_rejects_unlisted_user() {
        let mut env = env(FIXTURE);
        env.args.user = 8;
        let err = run(&env.config, &env.args, Arc::new(SpinnerSink::hidden()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not allowed"));
    }

    #[tokio::test]
    async fn test_run_requires_bot_permissions() {
        let env = env(r#"{ "name": "x", "permissions": ["manage_channels"] }"#);
        let err = run(&env.config, &env.args, Arc::new(SpinnerSink::hidden()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("manage_roles"));
    }

    #[tokio::test]
    async fn test_stale_in_progress_blocks_until_forced_or_reset() {
        let mut env = env(FIXTURE);
        open_store(&env.config)
            .unwrap()
            .set_in_progress(900, true, None)
            .unwrap();

        let err = run(&env.config, &env.args, Arc::new(SpinnerSink::hidden()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already in progress"));
        assert!(status(&env.config, 900).unwrap().unwrap().in_progress);

        env.args.force = true;
        let report = run(&env.config, &env.args, Arc::new(SpinnerSink::hidden()))
            .await
            .unwrap();
        assert_eq!(report.count("channels"), 3);
    }

    #[test]
    fn test_reset_clears_state() {
        let env = env(FIXTURE);
        let store = open_store(&env.config).unwrap();
        store.persist_count(900, "roles", 2).unwrap();
        assert_eq!(status(&env.config, 900).unwrap().unwrap().total(), 2);

        reset(&env.config, 900).unwrap();
        assert_eq!(status(&env.config, 900).unwrap(), None);
    }

    #[test]
    fn test_explicit_config_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "allowed_users = [1, 2]\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.allowed_users, vec![1, 2]);
    }
}
