//! `netintent rollback` - apply or list NSO rollback files
//!
//! Rollback only ever happens here, on request. A failed apply leaves the
//! devices as they are.

use anyhow::{Context as _, Result, bail};
use colored::Colorize;
use dialoguer::Confirm;
use reconcile::{IntentEngine, LogSink};
use restconf::{DeviceConfigClient, RollbackFile, RollbackTarget};

use super::{Outcome, connect, ensure_reachable};
use crate::Context;
use crate::cli::{ControllerArgs, RollbackArgs};
use crate::config::NetintentConfig;
use crate::ui;

pub fn run(ctx: &Context, controller: &ControllerArgs, args: &RollbackArgs) -> Result<Outcome> {
    let config = NetintentConfig::resolve(controller)?;
    let mut client = connect(&config);
    let result = ensure_reachable(&client, client.base_url()).and_then(|()| {
        if args.list {
            list(ctx, &client)
        } else {
            let target = target(args.id, args.fixed)?;
            if !args.yes && !confirm(target)? {
                ui::info("Aborted, nothing was changed");
                return Ok(Outcome::Success);
            }
            execute(ctx, &client, target)
        }
    });
    client.close();
    result
}

/// Without an id, roll back the most recent commit
pub(crate) fn target(id: Option<u64>, fixed: bool) -> Result<RollbackTarget> {
    match (id, fixed) {
        (None, _) => Ok(RollbackTarget::default()),
        (Some(id), true) => Ok(RollbackTarget::Fixed(id)),
        (Some(id), false) => match u32::try_from(id) {
            Ok(offset) => Ok(RollbackTarget::Relative(offset)),
            Err(_) => bail!("rollback offset {id} is too large; did you mean --fixed?"),
        },
    }
}

fn confirm(target: RollbackTarget) -> Result<bool> {
    Confirm::new()
        .with_prompt(format!("Apply {target}?"))
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}

pub(crate) fn execute(
    ctx: &Context,
    client: &dyn DeviceConfigClient,
    target: RollbackTarget,
) -> Result<Outcome> {
    let engine = IntentEngine::new(client, &LogSink);
    match engine.rollback(target) {
        Ok(()) => {
            if !ctx.quiet {
                ui::success(&format!("Applied {target}"));
            }
            Ok(Outcome::Success)
        }
        Err(e) => {
            ui::error(&e.to_string());
            Ok(Outcome::Failed)
        }
    }
}

fn list(ctx: &Context, client: &dyn DeviceConfigClient) -> Result<Outcome> {
    let files = client.rollback_files()?;
    if files.is_empty() {
        ui::info("No rollback files");
        return Ok(Outcome::Success);
    }

    if !ctx.quiet {
        ui::header(&format!("Rollback files ({})", files.len()));
    }
    for file in &files {
        println!("{}", format_file(file));
    }
    Ok(Outcome::Success)
}

fn format_file(file: &RollbackFile) -> String {
    let mut line = format!(
        "  {:>3}  {:<8} {}",
        file.id,
        file.fixed_number.to_string().bold(),
        file.date.as_deref().unwrap_or("-")
    );
    for part in [&file.creator, &file.via].into_iter().flatten() {
        line.push_str(&format!("  {}", part.dimmed()));
    }
    if let Some(label) = file.label.as_deref().filter(|l| !l.is_empty()) {
        line.push_str(&format!("  [{label}]"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use restconf::{LoopbackConfig, LoopbackSnapshot, MockClient};

    const QUIET: Context = Context {
        verbose: 0,
        quiet: true,
    };

    #[test]
    fn test_target_selection() {
        assert_eq!(target(None, false).unwrap(), RollbackTarget::Relative(0));
        assert_eq!(target(Some(2), false).unwrap(), RollbackTarget::Relative(2));
        assert_eq!(target(Some(10_042), true).unwrap(), RollbackTarget::Fixed(10_042));
        assert!(target(Some(u64::from(u32::MAX) + 1), false).is_err());
    }

    #[test]
    fn test_fixed_rollback_restores_state() {
        let client = MockClient::new();
        client.add_device("r1");
        client.add_loopback(
            "r1",
            "1",
            LoopbackSnapshot::new("10.0.0.1", "255.255.255.255", None),
        );
        let id = client
            .configure_loopback_tracked("r1", &LoopbackConfig::new(2, "10.0.0.2", "255.255.255.255"))
            .unwrap()
            .unwrap();
        assert!(client.loopbacks("r1").contains_key("2"));

        let outcome = execute(&QUIET, &client, RollbackTarget::Fixed(id)).unwrap();
        assert_eq!(outcome, Outcome::Success);
        assert!(!client.loopbacks("r1").contains_key("2"));
        assert!(client.loopbacks("r1").contains_key("1"));
    }

    #[test]
    fn test_unknown_rollback_fails() {
        let client = MockClient::new();
        let outcome = execute(&QUIET, &client, RollbackTarget::Fixed(1)).unwrap();
        assert_eq!(outcome, Outcome::Failed);
    }

    #[test]
    fn test_format_file() {
        let file = RollbackFile {
            id: 0,
            fixed_number: 10_042,
            creator: Some("developer".to_string()),
            date: Some("2026-10-17 09:12:44".to_string()),
            via: Some("rest".to_string()),
            label: None,
            comment: None,
        };
        let line = format_file(&file);
        assert!(line.contains("10042"));
        assert!(line.contains("2026-10-17 09:12:44"));
        assert!(line.contains("developer"));
    }
}
