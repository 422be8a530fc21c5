//! Command handlers. Each talks to the panel through `spc_core::Controller`.

pub mod config_cmd;
pub mod control;
pub mod info;
pub mod status;
pub mod watch;

use spc_core::{PanelCommand, PanelConfig};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a panel command to its handler.
pub async fn dispatch(
    cmd: Command,
    config: PanelConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(config, global).await,
        Command::Arm => control::handle(PanelCommand::Arm, config, global).await,
        Command::Disarm => control::handle(PanelCommand::Disarm, config, global).await,
        Command::Watch(args) => watch::handle(args, config, global).await,
        Command::Info => info::handle(config, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "handled without a panel connection".into(),
        }),
    }
}
