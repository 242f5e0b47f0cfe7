//! `netintent apply` - make devices match the intent

use anyhow::{Context as _, Result};
use chrono::Utc;
use dialoguer::Confirm;
use intent::NetworkIntent;
use reconcile::{ApplySummary, EngineOptions, IntentEngine, LogSink, PlanOutcome};
use restconf::DeviceConfigClient;
use std::path::Path;

use super::{Outcome, connect, ensure_reachable, load_intent};
use crate::Context;
use crate::cli::{ApplyArgs, ControllerArgs};
use crate::config::{ApplyDefaults, NetintentConfig};
use crate::display;
use crate::journal::{ApplyRecord, Journal};
use crate::ui;

pub fn run(ctx: &Context, controller: &ControllerArgs, args: &ApplyArgs) -> Result<Outcome> {
    let config = NetintentConfig::resolve(controller)?;
    let Some(intent) = load_intent(&args.intent, &args.devices)? else {
        return Ok(Outcome::NoMatchingDevice);
    };

    let mut client = connect(&config);
    let journal = Journal::default_path()?;
    let result = ensure_reachable(&client, client.base_url()).and_then(|()| {
        execute(
            ctx,
            &client,
            &intent,
            args,
            engine_options(&config.apply, args),
            Some(&journal),
        )
    });
    client.close();
    result
}

/// Flags win over the `[apply]` section of the config file
pub(crate) fn engine_options(defaults: &ApplyDefaults, args: &ApplyArgs) -> EngineOptions {
    EngineOptions {
        jobs: args.jobs.unwrap_or(defaults.jobs).max(1),
        track_rollback: args.track_rollback || defaults.track_rollback,
        verify: defaults.verify && !args.no_verify,
    }
}

/// Plan, confirm and apply against an already-open client
pub(crate) fn execute(
    ctx: &Context,
    client: &dyn DeviceConfigClient,
    intent: &NetworkIntent,
    args: &ApplyArgs,
    options: EngineOptions,
    journal: Option<&Path>,
) -> Result<Outcome> {
    let engine = IntentEngine::new(client, &LogSink).with_options(options);
    let interactive = !args.json && !ctx.quiet;

    if interactive {
        ui::header(if args.dry_run {
            "Apply (dry run)"
        } else {
            "Apply"
        });
        ui::kv("Intent", &args.intent.display().to_string());
        ui::kv("Devices", &intent.devices().len().to_string());
    }

    let changes = engine.plan(intent);
    if interactive {
        display::display_plan(&changes, &[]);
    }

    let ask = !args.dry_run && !args.yes && !args.json;
    let mut started_at = Utc::now();
    let outcome = engine.execute_plan(&changes, args.dry_run, |plan| -> Result<bool> {
        if !ask {
            return Ok(true);
        }
        let confirmed = Confirm::new()
            .with_prompt(format!("Apply {} change(s)?", plan.total()))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        started_at = Utc::now();
        Ok(confirmed)
    })?;

    let summary = match outcome {
        PlanOutcome::Applied(summary) => summary,
        PlanOutcome::NoChanges => {
            if args.json {
                ui::json(&ApplySummary::new(args.dry_run))?;
            }
            return Ok(Outcome::Success);
        }
        PlanOutcome::Declined => {
            ui::info("Aborted, nothing was changed");
            return Ok(Outcome::Success);
        }
    };

    if let Some(path) = journal.filter(|_| !args.dry_run) {
        let record = ApplyRecord::from_summary(&args.intent, started_at, &summary);
        if let Err(e) = Journal::append(path, record) {
            ui::warn(&format!("Could not record run in journal: {e:#}"));
        }
    }

    if args.json {
        ui::json(&summary)?;
    } else if !ctx.quiet {
        display::display_summary(&summary);
        if let Some(first) = summary.rollback_ids().first() {
            ui::dim(&format!(
                "Undo with: netintent rollback {first} --fixed"
            ));
        }
    }

    Ok(Outcome::from_success(summary.is_success()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{INTENT, intent_file};
    use restconf::{LoopbackSnapshot, MockClient};
    use std::path::PathBuf;

    const QUIET: Context = Context {
        verbose: 0,
        quiet: true,
    };

    fn args(dry_run: bool) -> ApplyArgs {
        ApplyArgs {
            intent: PathBuf::from("lab.yaml"),
            dry_run,
            json: false,
            yes: true,
            devices: Vec::new(),
            jobs: None,
            track_rollback: false,
            no_verify: false,
        }
    }

    fn intent() -> NetworkIntent {
        let file = intent_file(INTENT, "yaml");
        NetworkIntent::load(file.path()).unwrap()
    }

    fn lab() -> MockClient {
        let client = MockClient::new();
        client.add_device("r1");
        client.add_device("r2");
        client.add_loopback(
            "r1",
            "999",
            LoopbackSnapshot::new("10.9.9.9", "255.255.255.255", None),
        );
        client.add_loopback(
            "r2",
            "999",
            LoopbackSnapshot::new("10.9.9.9", "255.255.255.255", None),
        );
        client
    }

    #[test]
    fn test_options_from_flags_and_config() {
        let defaults = ApplyDefaults {
            jobs: 4,
            track_rollback: true,
            verify: true,
        };
        let mut flags = args(false);
        let options = engine_options(&defaults, &flags);
        assert_eq!(options.jobs, 4);
        assert!(options.track_rollback);
        assert!(options.verify);

        flags.jobs = Some(0);
        flags.no_verify = true;
        let options = engine_options(&defaults, &flags);
        assert_eq!(options.jobs, 1);
        assert!(!options.verify);
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let client = lab();
        let dir = tempfile::tempdir().unwrap();
        let journal = dir.path().join("journal.toml");

        let outcome = execute(
            &QUIET,
            &client,
            &intent(),
            &args(true),
            EngineOptions::default(),
            Some(&journal),
        )
        .unwrap();

        assert_eq!(outcome, Outcome::Success);
        assert!(client.mutations().is_empty());
        assert!(!journal.exists());
    }

    #[test]
    fn test_apply_converges_and_records_journal() {
        let client = lab();
        let dir = tempfile::tempdir().unwrap();
        let journal = dir.path().join("journal.toml");
        let options = EngineOptions {
            track_rollback: true,
            ..EngineOptions::default()
        };

        let outcome = execute(
            &QUIET,
            &client,
            &intent(),
            &args(false),
            options.clone(),
            Some(&journal),
        )
        .unwrap();
        assert_eq!(outcome, Outcome::Success);

        // r1 keeps its unmanaged loopback, r2 loses it
        assert!(client.loopbacks("r1").contains_key("999"));
        assert!(!client.loopbacks("r2").contains_key("999"));
        assert!(client.loopbacks("r1").contains_key("100"));

        let recorded = Journal::load_from(&journal).unwrap();
        assert_eq!(recorded.runs.len(), 1);
        assert_eq!(recorded.runs[0].succeeded, 3);
        assert_eq!(recorded.runs[0].rollback_ids.len(), 2);

        // Second run has nothing to do and records nothing
        let before = client.mutations().len();
        let outcome = execute(&QUIET, &client, &intent(), &args(false), options, Some(&journal))
            .unwrap();
        assert_eq!(outcome, Outcome::Success);
        assert_eq!(client.mutations().len(), before);
        assert_eq!(Journal::load_from(&journal).unwrap().runs.len(), 1);
    }

    #[test]
    fn test_partial_failure_exits_failed() {
        let client = lab();
        client.fail_loopback("r1", "100");

        let outcome = execute(
            &QUIET,
            &client,
            &intent(),
            &args(false),
            EngineOptions::default(),
            None,
        )
        .unwrap();

        assert_eq!(outcome, Outcome::Failed);
        assert!(client.loopbacks("r2").contains_key("100"));
    }
}
