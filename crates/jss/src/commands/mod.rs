//! Command dispatch: bridges CLI args to the connectors and prints results.

pub mod config_cmd;
pub mod resource;
pub mod session;

use jss_api::ConnectorConfig;

use crate::cli::Command;
use crate::error::CliError;

/// Dispatch a server-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, config: ConnectorConfig) -> Result<(), CliError> {
    match cmd {
        Command::Get(args) => resource::get(config, args).await,
        Command::Post(args) => resource::post(config, args).await,
        Command::Put(args) => resource::put(config, args).await,
        Command::Delete(args) => resource::delete(config, args).await,
        Command::Token => session::token(config).await,
        Command::Login(args) => session::login(config, args).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
