use spc_core::{Controller, PanelConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle(config: PanelConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let info = Controller::oneshot(config, |controller| async move {
        Ok(controller.panel_info())
    })
    .await?;

    let rendered = output::render(global.output, &info, output::info_detail, |i| {
        i.display_name().to_owned()
    })?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
