// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, StampedeError};
use crate::types::BuildMode;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = StampedeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.session, raw.target))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_targets(cfg)?;
    validate_session(cfg)?;
    validate_no_self_dependency(cfg)?;
    Ok(())
}

fn ensure_has_targets(cfg: &RawConfigFile) -> Result<()> {
    if cfg.target.is_empty() {
        return Err(StampedeError::ConfigError(
            "session file must contain at least one [target.\"<name>\"] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_session(cfg: &RawConfigFile) -> Result<()> {
    let session = &cfg.session;

    if session.roots.is_empty() {
        return Err(StampedeError::ConfigError(
            "[session].roots must name at least one target".to_string(),
        ));
    }

    if session.max_units_per_request == 0 {
        return Err(StampedeError::ConfigError(
            "[session].max_units_per_request must be >= 1 (got 0)".to_string(),
        ));
    }

    if session.poll_interval_ms == 0 {
        return Err(StampedeError::ConfigError(
            "[session].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    // An idle remote minion must get one more poll in before we exit.
    if session.mode == BuildMode::Coordinator && session.linger_ms < session.poll_interval_ms {
        return Err(StampedeError::ConfigError(format!(
            "[session].linger_ms must be >= poll_interval_ms in coordinator mode (got {} < {})",
            session.linger_ms, session.poll_interval_ms
        )));
    }

    if session.mode == BuildMode::Minion && session.coordinator_address.is_none() {
        return Err(StampedeError::ConfigError(
            "minion mode requires [session].coordinator_address".to_string(),
        ));
    }

    Ok(())
}

fn validate_no_self_dependency(cfg: &RawConfigFile) -> Result<()> {
    for (name, target) in cfg.target.iter() {
        let runtime = target.runtime_deps.iter().flatten();
        if target.deps.iter().chain(runtime).any(|dep| dep == name) {
            return Err(StampedeError::ConfigError(format!(
                "target '{}' cannot depend on itself",
                name
            )));
        }
    }
    Ok(())
}
