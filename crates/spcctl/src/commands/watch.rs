//! Long-running poll with the background scheduler.

use std::time::Duration;

use tracing::{debug, info};

use spc_core::{Controller, PanelConfig, PanelSnapshot};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    args: WatchArgs,
    mut config: PanelConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(secs) = args.interval {
        config.poll_interval = Duration::from_secs(secs);
    }

    let controller = Controller::new(config);
    controller.connect().await?;

    let color = output::should_color(global.color);
    let mut updates = controller.subscribe();
    let mut last = None;
    print_change(&controller, &updates.borrow_and_update(), &mut last, global, color)?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, stopping watch");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                print_change(&controller, &snapshot, &mut last, global, color)?;
            }
        }
    }

    controller.disconnect().await;
    Ok(())
}

/// Print a line when the effective state (or availability) changes.
fn print_change(
    controller: &Controller,
    snapshot: &PanelSnapshot,
    last: &mut Option<(spc_core::PanelState, bool)>,
    global: &GlobalOpts,
    color: bool,
) -> Result<(), CliError> {
    let key = (snapshot.effective_state(), snapshot.available);
    if *last == Some(key) {
        debug!(failures = snapshot.consecutive_failures, "no visible change");
        return Ok(());
    }
    *last = Some(key);

    let line = match global.output {
        OutputFormat::Table => format!(
            "{}  {}  {}",
            chrono::Local::now().format("%H:%M:%S"),
            controller.panel_info().display_name(),
            output::state_label(snapshot.effective_state(), color)
        ),
        OutputFormat::Json | OutputFormat::JsonCompact => serde_json::to_string(snapshot)?,
        OutputFormat::Plain => snapshot.effective_state().to_string(),
    };
    output::print_output(&line, global.quiet);
    Ok(())
}
