//! `netintent sync` - pull device configuration into NSO

use anyhow::Result;
use restconf::DeviceConfigClient;

use super::{Outcome, connect, ensure_reachable};
use crate::Context;
use crate::cli::{ControllerArgs, SyncArgs};
use crate::config::NetintentConfig;
use crate::ui;

pub fn run(ctx: &Context, controller: &ControllerArgs, args: &SyncArgs) -> Result<Outcome> {
    let config = NetintentConfig::resolve(controller)?;
    let mut client = connect(&config);
    let result = ensure_reachable(&client, client.base_url())
        .and_then(|()| execute(ctx, &client, &args.devices));
    client.close();
    result
}

/// Sync the named devices, or every device NSO manages when none are named
pub(crate) fn execute(
    ctx: &Context,
    client: &dyn DeviceConfigClient,
    devices: &[String],
) -> Result<Outcome> {
    let devices = if devices.is_empty() {
        client.devices()?
    } else {
        devices.to_vec()
    };
    if devices.is_empty() {
        ui::warn("NSO manages no devices");
        return Ok(Outcome::Success);
    }

    let mut failed = 0;
    for device in &devices {
        if client.sync_from_device(device) {
            if !ctx.quiet {
                ui::success(&format!("{device}: in sync"));
            }
        } else {
            failed += 1;
            ui::error(&format!("{device}: sync-from-device failed"));
        }
    }

    if !ctx.quiet {
        ui::info(&format!(
            "Synced {} of {} device(s)",
            devices.len() - failed,
            devices.len()
        ));
    }
    Ok(Outcome::from_success(failed == 0))
}
