use serde::Serialize;

use spc_core::{AlarmState, Controller, PanelConfig, PanelInfo, PanelSnapshot};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct StatusView {
    panel: PanelInfo,
    alarm_state: Option<AlarmState>,
    #[serde(flatten)]
    snapshot: PanelSnapshot,
}

pub async fn handle(config: PanelConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let view = Controller::oneshot(config, |controller| async move {
        // The connect-time poll may have failed; one more read surfaces why.
        if !controller.snapshot().available {
            controller.refresh().await?;
        }
        let snapshot = controller.snapshot();
        Ok(StatusView {
            panel: controller.panel_info(),
            alarm_state: snapshot.alarm_state(),
            snapshot,
        })
    })
    .await?;

    let color = output::should_color(global.color);
    let rendered = output::render(
        global.output,
        &view,
        |v| output::snapshot_detail(&v.panel, &v.snapshot, color),
        |v| v.snapshot.effective_state().to_string(),
    )?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
