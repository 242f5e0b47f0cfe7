//! Plan and result rendering

use colored::Colorize;
use reconcile::{Action, ApplySummary, Change, PlanSummary, group_by_device};
use restconf::LoopbackSnapshot;

/// `ip/netmask "description"`, with `-` for unknown fields
fn snapshot_text(snapshot: &LoopbackSnapshot) -> String {
    let mut text = format!(
        "{}/{}",
        snapshot.ip.as_deref().unwrap_or("-"),
        snapshot.netmask.as_deref().unwrap_or("-")
    );
    if let Some(description) = &snapshot.description {
        text.push_str(&format!(" \"{description}\""));
    }
    text
}

/// One-line description of what a change does to the loopback
pub fn describe(change: &Change) -> String {
    match change.action() {
        Action::Create => change
            .desired()
            .map(|d| format!("(absent) → {}", snapshot_text(d)))
            .unwrap_or_default(),
        Action::Delete => change
            .current()
            .map(|c| format!("{} → (will remove)", snapshot_text(c)))
            .unwrap_or_default(),
        Action::Update => change
            .changed_fields()
            .iter()
            .map(|f| {
                format!(
                    "{}: {} → {}",
                    f.field,
                    f.from.as_deref().unwrap_or("(none)"),
                    f.to.as_deref().unwrap_or("(none)")
                )
            })
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn symbol(action: Action) -> colored::ColoredString {
    match action {
        Action::Create => "+".green(),
        Action::Update => "~".yellow(),
        Action::Delete => "-".red(),
    }
}

/// Display planned changes grouped by device
///
/// `native` pairs a change index with the device CLI NSO would push for it.
pub fn display_plan(changes: &[Change], native: &[(usize, String)]) {
    if changes.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Loopback Plan".bold()
    );
    println!("│");

    for (device, group) in group_by_device(changes) {
        println!("│ {}", device.bold());
        for change in group {
            println!(
                "│   {} {:<12} {}",
                symbol(change.action()),
                format!("Loopback{}", change.resource_id()),
                describe(change).dimmed()
            );
            let index = changes.iter().position(|c| std::ptr::eq(c, change));
            if let Some((_, cli)) = native.iter().find(|(i, _)| Some(*i) == index) {
                for line in cli.lines().filter(|l| !l.trim().is_empty()) {
                    println!("│       {}", line.cyan());
                }
            }
        }
        println!("│");
    }

    let summary = PlanSummary::from_changes(changes);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Plan: {} on {} device(s): {} create, {} update, {} delete",
        summary.total().to_string().bold(),
        summary.devices,
        summary.creates.to_string().green(),
        summary.updates.to_string().yellow(),
        summary.deletes.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

/// Display the outcome of an apply run
pub fn display_summary(summary: &ApplySummary) {
    println!();
    for result in &summary.results {
        let mark = if result.success {
            "✓".green()
        } else {
            "✗".red()
        };
        match (&result.error, result.rollback_id) {
            (Some(error), _) => println!("  {} {} {}", mark, result.change, error.red()),
            (None, Some(id)) => println!(
                "  {} {} {}",
                mark,
                result.change,
                format!("(rollback fixed-number {id})").dimmed()
            ),
            (None, None) => println!("  {} {}", mark, result.change),
        }
    }

    println!();
    if summary.dry_run {
        println!(
            "{} Dry run: {} change(s) would be applied",
            "ℹ".blue(),
            summary.succeeded.to_string().bold()
        );
    } else if summary.is_success() {
        println!(
            "{} Applied {} change(s)",
            "✓".green(),
            summary.succeeded.to_string().bold()
        );
    } else {
        println!(
            "{} {} succeeded, {} failed",
            "⚠".yellow(),
            summary.succeeded.to_string().green(),
            summary.failed.to_string().red()
        );
    }
}
