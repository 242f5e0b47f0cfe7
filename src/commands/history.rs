//! `netintent history` - recorded apply runs

use anyhow::Result;
use chrono::Local;
use colored::Colorize;
use std::path::Path;

use super::Outcome;
use crate::Context;
use crate::journal::{ApplyRecord, Journal};
use crate::ui;

pub fn run(ctx: &Context, limit: usize) -> Result<Outcome> {
    show(ctx, &Journal::default_path()?, limit)
}

pub(crate) fn show(ctx: &Context, path: &Path, limit: usize) -> Result<Outcome> {
    let journal = Journal::load_from(path)?;
    if journal.runs.is_empty() {
        ui::info("No apply runs recorded yet");
        return Ok(Outcome::Success);
    }

    ui::header(&format!("Apply history ({} of {})", journal.runs.len().min(limit), journal.runs.len()));
    for record in journal.recent(limit) {
        println!("{}", format_record(record));
        if ctx.verbose > 0 && !record.devices.is_empty() {
            ui::kv("devices", &record.devices.join(", "));
        }
        if let Some(id) = record.undo_id() {
            ui::dim(&format!("undo: netintent rollback {id} --fixed"));
        }
    }
    Ok(Outcome::Success)
}

fn format_record(record: &ApplyRecord) -> String {
    let when = record
        .started_at
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S");
    let result = if record.failed == 0 {
        format!("{} applied", record.succeeded).green()
    } else {
        format!("{} applied, {} failed", record.succeeded, record.failed).yellow()
    };
    format!(
        "  {}  {}  {}  ({} device(s))",
        when.to_string().dimmed(),
        record.intent.bold(),
        result,
        record.devices.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_show_empty_and_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.toml");
        let ctx = Context {
            verbose: 1,
            quiet: false,
        };
        assert_eq!(show(&ctx, &path, 5).unwrap(), Outcome::Success);

        let record = ApplyRecord {
            started_at: Utc::now(),
            intent: "lab.yaml".to_string(),
            devices: vec!["r1".to_string()],
            succeeded: 2,
            failed: 1,
            rollback_ids: vec![10_001],
        };
        let line = format_record(&record);
        assert!(line.contains("lab.yaml"));
        assert!(line.contains("2 applied, 1 failed"));

        Journal::append(&path, record).unwrap();
        assert_eq!(show(&ctx, &path, 5).unwrap(), Outcome::Success);
    }
}
