//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::active_profile_name;
use crate::error::CliError;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            println!("{}", jss_config::config_path().display());
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = jss_config::load_config_or_default();
            let active = active_profile_name(global, &cfg);
            let mut names: Vec<&String> = cfg.profiles.keys().collect();
            names.sort_unstable();
            for name in names {
                let marker = if *name == active { "*" } else { " " };
                println!("{marker} {name}\t{}", cfg.profiles[name].url);
            }
            Ok(())
        }

        ConfigCommand::SetPassword { profile } => {
            let cfg = jss_config::load_config_or_default();
            let name = profile.unwrap_or_else(|| active_profile_name(global, &cfg));
            let password =
                rpassword::prompt_password(format!("Password for '{name}': ")).map_err(|e| {
                    CliError::Validation {
                        field: "interactive".into(),
                        reason: format!("prompt failed: {e}"),
                    }
                })?;
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "password cannot be empty".into(),
                });
            }
            jss_config::store_password(&name, &password)?;
            eprintln!("Stored password for profile '{name}' in the system keyring");
            Ok(())
        }
    }
}
