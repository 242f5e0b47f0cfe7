//! `netintent devices` - list devices NSO manages

use anyhow::{Context as _, Result};
use restconf::DeviceConfigClient;

use super::{Outcome, connect};
use crate::Context;
use crate::cli::ControllerArgs;
use crate::config::NetintentConfig;
use crate::ui;

pub fn run(ctx: &Context, controller: &ControllerArgs) -> Result<Outcome> {
    let config = NetintentConfig::resolve(controller)?;
    let mut client = connect(&config);
    let devices = client
        .devices()
        .with_context(|| format!("Failed to list devices from {}", client.base_url()));
    client.close();
    let devices = devices?;

    if ctx.quiet {
        for device in &devices {
            println!("{device}");
        }
        return Ok(Outcome::Success);
    }

    ui::header(&format!("Devices ({})", devices.len()));
    for device in &devices {
        println!("  {device}");
    }
    Ok(Outcome::Success)
}
