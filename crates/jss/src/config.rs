//! Resolve the active profile plus global flags into a `ConnectorConfig`.

use std::time::Duration;

use secrecy::SecretString;
use tracing::debug;

use jss_api::{ConnectorConfig, JssPrefs};
use jss_config::{Config, ConfigError, Profile};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.profile_name(global.profile.as_deref()).to_owned()
}

/// Build the connector settings shared by every server command.
///
/// Flags beat the profile; without a profile, `--url` and `--user` must
/// carry everything.
pub fn connector_config(global: &GlobalOpts) -> Result<ConnectorConfig, CliError> {
    let cfg = jss_config::load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    let (prefs, jss_migrated) = match cfg.profiles.get(&profile_name) {
        Some(profile) => (
            prefs_from_profile(profile, &profile_name, &cfg, global)?,
            profile.jss_migrated,
        ),
        None if global.profile.is_some() => {
            let mut available: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
            available.sort_unstable();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available.join(", "),
            });
        }
        None => (prefs_from_flags(&profile_name, &cfg, global)?, false),
    };

    debug!(profile = %profile_name, url = %prefs.url, "resolved server settings");
    let config = ConnectorConfig::from_prefs(&prefs)
        .map_err(|e| CliError::Validation {
            field: "url".into(),
            reason: e.to_string(),
        })?
        .with_verbose(global.verbose > 0)
        .with_jss_migrated(jss_migrated);
    Ok(config)
}

fn prefs_from_profile(
    profile: &Profile,
    profile_name: &str,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<JssPrefs, CliError> {
    let username = match global.user {
        Some(ref user) => user.clone(),
        None => jss_config::resolve_username(profile, profile_name)?,
    };
    let password = match jss_config::resolve_password(profile, profile_name) {
        Ok(pw) => pw,
        Err(ConfigError::NoCredentials { .. }) => prompt_password(profile_name)?,
        Err(e) => return Err(e.into()),
    };

    let mut prefs = jss_config::profile_to_prefs(profile, &cfg.defaults, username, password)?;
    apply_overrides(&mut prefs, global);
    Ok(prefs)
}

fn prefs_from_flags(
    profile_name: &str,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<JssPrefs, CliError> {
    let url = global.url.clone().ok_or_else(|| CliError::NoConfig {
        path: jss_config::config_path().display().to_string(),
    })?;
    let username = global.user.clone().ok_or_else(|| CliError::NoCredentials {
        profile: profile_name.into(),
    })?;
    let password = match std::env::var("JSS_PASSWORD") {
        Ok(pw) => SecretString::from(pw),
        Err(_) => prompt_password(profile_name)?,
    };

    let profile = Profile {
        url,
        ..Profile::default()
    };
    let mut prefs = jss_config::profile_to_prefs(&profile, &cfg.defaults, username, password)?;
    apply_overrides(&mut prefs, global);
    Ok(prefs)
}

fn apply_overrides(prefs: &mut JssPrefs, global: &GlobalOpts) {
    if let Some(ref url) = global.url {
        prefs.url.clone_from(url);
    }
    if global.insecure {
        prefs.verify = false;
    }
    if let Some(secs) = global.timeout {
        prefs.timeout = Some(Duration::from_secs(secs));
    }
}

/// Ask on the terminal. Fails when there is no terminal to ask on.
fn prompt_password(profile_name: &str) -> Result<SecretString, CliError> {
    rpassword::prompt_password("Password: ")
        .map(SecretString::from)
        .map_err(|_| CliError::NoCredentials {
            profile: profile_name.into(),
        })
}
