//! `netintent diff` - show what apply would change

use anyhow::Result;
use intent::NetworkIntent;
use reconcile::{Change, EngineOptions, IntentEngine, LogSink, PlanSummary};
use restconf::DeviceConfigClient;
use serde::Serialize;
use serde_json::Value;

use super::{Outcome, connect, ensure_reachable, load_intent};
use crate::Context;
use crate::cli::{ControllerArgs, DiffArgs};
use crate::config::NetintentConfig;
use crate::display;
use crate::ui;

#[derive(Debug, Serialize)]
struct DiffReport<'a> {
    summary: PlanSummary,
    changes: &'a [Change],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    native: Vec<NativePreview>,
}

#[derive(Debug, Serialize)]
struct NativePreview {
    device: String,
    loopback: String,
    cli: String,
}

pub fn run(ctx: &Context, controller: &ControllerArgs, args: &DiffArgs) -> Result<Outcome> {
    let config = NetintentConfig::resolve(controller)?;
    let Some(intent) = load_intent(&args.intent, &args.devices)? else {
        return Ok(Outcome::NoMatchingDevice);
    };

    let options = EngineOptions {
        jobs: args.jobs.unwrap_or(config.apply.jobs).max(1),
        ..EngineOptions::default()
    };
    let mut client = connect(&config);
    let result = ensure_reachable(&client, client.base_url())
        .and_then(|()| execute(ctx, &client, &intent, args, options));
    client.close();
    result
}

pub(crate) fn execute(
    ctx: &Context,
    client: &dyn DeviceConfigClient,
    intent: &NetworkIntent,
    args: &DiffArgs,
    options: EngineOptions,
) -> Result<Outcome> {
    let engine = IntentEngine::new(client, &LogSink).with_options(options);
    let changes = engine.plan(intent);

    let mut native = Vec::new();
    let mut failed = false;
    if args.native {
        for (index, change) in changes.iter().enumerate() {
            match engine.preview(change) {
                Ok(Some(result)) => {
                    if let Some(cli) = native_cli(&result, change.device()) {
                        native.push((index, cli));
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    failed = true;
                    ui::warn(&format!("No native preview for {e}"));
                }
            }
        }
    }

    if args.json {
        let report = DiffReport {
            summary: PlanSummary::from_changes(&changes),
            changes: &changes,
            native: native
                .iter()
                .map(|(i, cli)| NativePreview {
                    device: changes[*i].device().to_string(),
                    loopback: changes[*i].resource_id().to_string(),
                    cli: cli.clone(),
                })
                .collect(),
        };
        ui::json(&report)?;
    } else if !ctx.quiet {
        display::display_plan(&changes, &native);
    }

    Ok(Outcome::from_success(!failed))
}

/// Device CLI from a `dry-run=native` result, for one device
///
/// The controller answers with
/// `{"dry-run-result": {"native": {"device": [{"name": .., "data": ..}]}}}`.
pub(crate) fn native_cli(result: &Value, device: &str) -> Option<String> {
    result
        .pointer("/dry-run-result/native/device")?
        .as_array()?
        .iter()
        .find(|d| d.get("name").and_then(Value::as_str) == Some(device))?
        .get("data")?
        .as_str()
        .map(str::to_string)
}
