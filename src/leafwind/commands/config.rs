//! `leafwind config`: read or change the settings file.
//!
//! Every change goes through [`LeafwindConfig::set`], so a rejected value
//! never reaches disk. Bad keys and values come back as error messages;
//! `Err` is kept for IO failures and a settings file that does not parse.

use crate::commands::{CmdMessage, CmdResult};
use crate::config::{LeafwindConfig, KEYS};
use crate::error::Result;
use log::debug;
use std::path::Path;

#[derive(Debug, Clone)]
pub enum ConfigAction {
    List,
    Get(String),
    Set { key: String, value: String },
}

pub fn run(path: &Path, action: ConfigAction) -> Result<CmdResult> {
    let mut config = LeafwindConfig::load(path)?;

    let (key, value) = match action {
        ConfigAction::List => return Ok(CmdResult::default().with_config(config)),
        ConfigAction::Get(key) => return Ok(lookup(&config, &key)),
        ConfigAction::Set { key, value } => (key, value),
    };

    if config.get(&key).is_none() {
        return Ok(rejected(unknown_key(&key)));
    }
    if let Err(reason) = config.set(&key, &value) {
        return Ok(rejected(reason));
    }

    debug!("writing {}={} to {}", key, value, path.display());
    config.save(path)?;

    let stored = config.get(&key).unwrap_or(value);
    Ok(CmdResult::default()
        .with_config(config)
        .with_message(CmdMessage::success(format!("{} set to {}", key, stored))))
}

fn lookup(config: &LeafwindConfig, key: &str) -> CmdResult {
    match config.get(key) {
        Some(value) => CmdResult::default().with_message(CmdMessage::info(value)),
        None => rejected(unknown_key(key)),
    }
}

fn unknown_key(key: &str) -> String {
    format!("Unknown config key: {} (known keys: {})", key, KEYS.join(", "))
}

fn rejected(reason: String) -> CmdResult {
    CmdResult::default().with_message(CmdMessage::error(reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::MessageLevel;
    use crate::config::CONFIG_FILENAME;
    use crate::error::LeafwindError;
    use std::fs;
    use tempfile::tempdir;

    fn set(key: &str, value: &str) -> ConfigAction {
        ConfigAction::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    #[test]
    fn test_list_without_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let res = run(&dir.path().join(CONFIG_FILENAME), ConfigAction::List).unwrap();
        assert_eq!(res.config, Some(LeafwindConfig::default()));
        assert!(res.messages.is_empty());
    }

    #[test]
    fn test_set_persists_and_keeps_other_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);

        let res = run(&path, set("primary_color", "#336699")).unwrap();
        assert_eq!(res.messages[0].level, MessageLevel::Success);
        assert_eq!(res.messages[0].content, "primary_color set to #336699");

        run(&path, set("link_style", "cid")).unwrap();

        let res = run(&path, ConfigAction::Get("primary_color".into())).unwrap();
        assert_eq!(res.messages[0].level, MessageLevel::Info);
        assert_eq!(res.messages[0].content, "#336699");
        let res = run(&path, ConfigAction::Get("link_style".into())).unwrap();
        assert_eq!(res.messages[0].content, "cid");
    }

    #[test]
    fn test_rejected_value_leaves_file_alone() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);

        let res = run(&path, set("show_comments", "sometimes")).unwrap();
        assert!(res.has_errors());
        assert!(res.config.is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_unknown_key_names_the_known_ones() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);

        let res = run(&path, ConfigAction::Get("nope".into())).unwrap();
        assert!(res.has_errors());
        assert!(res.messages[0].content.contains("max_list_depth"));

        let res = run(&path, set("nope", "1")).unwrap();
        assert!(res.has_errors());
        assert!(!path.exists());
    }

    #[test]
    fn test_unreadable_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "{ not json").unwrap();

        let err = run(&path, ConfigAction::List).unwrap_err();
        assert!(matches!(err, LeafwindError::Config(_)));
        let err = run(&path, set("show_comments", "false")).unwrap_err();
        assert!(matches!(err, LeafwindError::Config(_)));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }
}
