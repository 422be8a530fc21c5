use serde::Serialize;

use spc_core::{Controller, PanelCommand, PanelConfig, PanelState};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct AckView {
    command: PanelCommand,
    state: PanelState,
    polls: u32,
}

pub async fn handle(
    command: PanelCommand,
    config: PanelConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let ack = Controller::oneshot(config, |controller| async move {
        controller.set_state(command).await
    })
    .await?;

    let view = AckView {
        command,
        state: ack.state,
        polls: ack.polls,
    };
    let color = output::should_color(global.color);
    let rendered = output::render(
        global.output,
        &view,
        |v| {
            format!(
                "All Areas: {} (confirmed after {} poll{})",
                output::state_label(v.state, color),
                v.polls,
                if v.polls == 1 { "" } else { "s" }
            )
        },
        |v| v.state.to_string(),
    )?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
