//! `netintent health` - is the controller answering?

use anyhow::Result;
use restconf::DeviceConfigClient;

use super::{Outcome, connect};
use crate::Context;
use crate::cli::ControllerArgs;
use crate::config::NetintentConfig;
use crate::ui;

pub fn run(ctx: &Context, controller: &ControllerArgs) -> Result<Outcome> {
    let config = NetintentConfig::resolve(controller)?;
    let mut client = connect(&config);
    let reachable = client.health_check();

    if reachable {
        if !ctx.quiet {
            ui::success(&format!("NSO at {} is reachable", client.base_url()));
        }
    } else {
        ui::error(&format!("NSO at {} is not reachable", client.base_url()));
        ui::dim("Check --host/--port, credentials, and --https/--insecure");
    }

    client.close();
    Ok(Outcome::from_success(reachable))
}
