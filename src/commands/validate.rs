//! `netintent validate` - check an intent file offline

use anyhow::Result;
use colored::Colorize;
use intent::{IntentError, NetworkIntent, ServiceDeploymentIntent};
use serde::Serialize;
use std::path::Path;

use super::Outcome;
use crate::Context;
use crate::cli::ValidateArgs;
use crate::ui;

/// Result of validating one file
#[derive(Debug, Serialize)]
pub(crate) struct ValidationReport {
    pub file: String,
    pub valid: bool,
    /// `network` or `service`
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ReportedError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub devices: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loopbacks: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReportedError {
    pub path: String,
    pub message: String,
}

impl ValidationReport {
    fn invalid(file: &Path, kind: &'static str, err: &IntentError) -> Self {
        let errors = match err.violations() {
            Some(violations) => violations
                .iter()
                .map(|v| ReportedError {
                    path: v.path.clone(),
                    message: v.message.clone(),
                })
                .collect(),
            None => vec![ReportedError {
                path: String::new(),
                message: err.to_string(),
            }],
        };
        Self {
            file: file.display().to_string(),
            valid: false,
            kind,
            errors,
            devices: None,
            loopbacks: None,
        }
    }
}

pub(crate) fn check(path: &Path, service: bool) -> ValidationReport {
    if service {
        return match ServiceDeploymentIntent::load(path) {
            Ok(deployment) => ValidationReport {
                file: path.display().to_string(),
                valid: true,
                kind: "service",
                errors: Vec::new(),
                devices: Some(deployment.target_devices().len()),
                loopbacks: None,
            },
            Err(e) => ValidationReport::invalid(path, "service", &e),
        };
    }

    match NetworkIntent::load(path) {
        Ok(intent) => ValidationReport {
            file: path.display().to_string(),
            valid: true,
            kind: "network",
            errors: Vec::new(),
            devices: Some(intent.devices().len()),
            loopbacks: Some(intent.loopback_count()),
        },
        Err(e) => ValidationReport::invalid(path, "network", &e),
    }
}

pub fn run(ctx: &Context, args: &ValidateArgs) -> Result<Outcome> {
    let report = check(&args.intent, args.service);

    if args.json {
        ui::json(&report)?;
    } else if report.valid {
        if !ctx.quiet {
            let mut detail = format!("{} device(s)", report.devices.unwrap_or_default());
            if let Some(loopbacks) = report.loopbacks {
                detail.push_str(&format!(", {loopbacks} loopback(s)"));
            }
            ui::success(&format!("{} is valid ({detail})", report.file));
        }
    } else {
        ui::error(&format!(
            "{} is invalid: {} error(s)",
            report.file,
            report.errors.len()
        ));
        for error in &report.errors {
            if error.path.is_empty() {
                eprintln!("  {} {}", "•".red(), error.message);
            } else {
                eprintln!("  {} {}: {}", "•".red(), error.path.bold(), error.message);
            }
        }
    }

    Ok(Outcome::from_success(report.valid))
}
