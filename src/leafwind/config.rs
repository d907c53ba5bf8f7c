use crate::blob::LinkStyle;
use crate::color::hex_to_rgb;
use crate::error::{LeafwindError, Result};
use crate::markdown::{ParseOptions, DEFAULT_IMAGE_SIZE, DEFAULT_MAX_LIST_DEPTH};
use crate::probe::fs::LocalBlobProbe;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "leafwind.json";
const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 10_000;

pub const KEYS: &[&str] = &[
    "primary_color",
    "background_color",
    "page_background",
    "show_page_background",
    "show_in_discover",
    "show_comments",
    "link_style",
    "default_image_size",
    "lookup_timeout_ms",
    "max_list_depth",
    "blob_dir",
];

/// Defaults for conversions, stored in `leafwind.json`.
///
/// Publication settings given on the command line override these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LeafwindConfig {
    pub primary_color: String,
    pub background_color: String,
    pub page_background: String,
    pub show_page_background: bool,
    pub show_in_discover: bool,
    pub show_comments: bool,
    pub link_style: LinkStyle,
    /// Square edge used for images whose dimensions cannot be found.
    pub default_image_size: u32,
    pub lookup_timeout_ms: u64,
    pub max_list_depth: usize,
    /// Directory of downloaded blobs used to measure images.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_dir: Option<PathBuf>,
}

impl Default for LeafwindConfig {
    fn default() -> Self {
        Self {
            primary_color: "#000000".to_string(),
            background_color: "#ffffff".to_string(),
            page_background: "#ffffff".to_string(),
            show_page_background: false,
            show_in_discover: true,
            show_comments: true,
            link_style: LinkStyle::AtUri,
            default_image_size: DEFAULT_IMAGE_SIZE,
            lookup_timeout_ms: DEFAULT_LOOKUP_TIMEOUT_MS,
            max_list_depth: DEFAULT_MAX_LIST_DEPTH,
            blob_dir: None,
        }
    }
}

fn parse_bool(key: &str, value: &str) -> std::result::Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(format!("{} expects true or false, got '{}'", key, value)),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> std::result::Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("{} expects a positive number, got '{}'", key, value))
}

fn parse_color(key: &str, value: &str) -> std::result::Result<String, String> {
    match hex_to_rgb(value) {
        Some(_) => Ok(value.to_string()),
        None => Err(format!("{} expects a #rrggbb color, got '{}'", key, value)),
    }
}

impl LeafwindConfig {
    /// Load config from `path`, or return defaults if it does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| LeafwindError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "primary_color" => self.primary_color.clone(),
            "background_color" => self.background_color.clone(),
            "page_background" => self.page_background.clone(),
            "show_page_background" => self.show_page_background.to_string(),
            "show_in_discover" => self.show_in_discover.to_string(),
            "show_comments" => self.show_comments.to_string(),
            "link_style" => match self.link_style {
                LinkStyle::AtUri => "at-uri".to_string(),
                LinkStyle::Cid => "cid".to_string(),
            },
            "default_image_size" => self.default_image_size.to_string(),
            "lookup_timeout_ms" => self.lookup_timeout_ms.to_string(),
            "max_list_depth" => self.max_list_depth.to_string(),
            "blob_dir" => self
                .blob_dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            _ => return None,
        };
        Some(value)
    }

    /// Set a key from its string form. The error is a user-facing message.
    pub fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), String> {
        match key {
            "primary_color" => self.primary_color = parse_color(key, value)?,
            "background_color" => self.background_color = parse_color(key, value)?,
            "page_background" => self.page_background = parse_color(key, value)?,
            "show_page_background" => self.show_page_background = parse_bool(key, value)?,
            "show_in_discover" => self.show_in_discover = parse_bool(key, value)?,
            "show_comments" => self.show_comments = parse_bool(key, value)?,
            "link_style" => {
                self.link_style = match value {
                    "at-uri" => LinkStyle::AtUri,
                    "cid" => LinkStyle::Cid,
                    _ => return Err(format!("link_style expects at-uri or cid, got '{}'", value)),
                }
            }
            "default_image_size" => {
                let size: u32 = parse_number(key, value)?;
                if size == 0 {
                    return Err("default_image_size must be greater than 0".to_string());
                }
                self.default_image_size = size;
            }
            "lookup_timeout_ms" => self.lookup_timeout_ms = parse_number(key, value)?,
            "max_list_depth" => {
                let depth: usize = parse_number(key, value)?;
                if depth == 0 {
                    return Err("max_list_depth must be at least 1".to_string());
                }
                self.max_list_depth = depth;
            }
            "blob_dir" => {
                self.blob_dir = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                }
            }
            _ => return Err(format!("Unknown config key: {}", key)),
        }
        Ok(())
    }

    /// Parser settings for converting posts by `author_did`.
    pub fn parse_options(&self, author_did: &str) -> ParseOptions {
        let options = ParseOptions::new(author_did)
            .link_style(self.link_style)
            .default_image_size(self.default_image_size)
            .max_list_depth(self.max_list_depth)
            .lookup_timeout(Duration::from_millis(self.lookup_timeout_ms));
        match &self.blob_dir {
            Some(dir) => options.probe(Arc::new(LocalBlobProbe::new(dir))),
            None => options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = LeafwindConfig::default();
        assert_eq!(config.primary_color, "#000000");
        assert_eq!(config.default_image_size, 512);
        assert_eq!(config.link_style, LinkStyle::AtUri);
        assert!(config.show_in_discover);
        assert!(!config.show_page_background);
    }

    #[test]
    fn test_load_missing_config() {
        let dir = tempdir().unwrap();
        let config = LeafwindConfig::load(dir.path().join(CONFIG_FILENAME)).unwrap();
        assert_eq!(config, LeafwindConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILENAME);

        let mut config = LeafwindConfig::default();
        config.set("link_style", "cid").unwrap();
        config.set("blob_dir", "/tmp/blobs").unwrap();
        config.save(&path).unwrap();

        let loaded = LeafwindConfig::load(&path).unwrap();
        assert_eq!(loaded.link_style, LinkStyle::Cid);
        assert_eq!(loaded.blob_dir, Some(PathBuf::from("/tmp/blobs")));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, r#"{ "show_comments": false }"#).unwrap();

        let config = LeafwindConfig::load(&path).unwrap();
        assert!(!config.show_comments);
        assert_eq!(config.max_list_depth, 32);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "{ nope").unwrap();

        assert!(matches!(
            LeafwindConfig::load(&path),
            Err(LeafwindError::Config(_))
        ));
    }

    #[test]
    fn test_get_every_key() {
        let config = LeafwindConfig::default();
        for key in KEYS {
            assert!(config.get(key).is_some(), "{}", key);
        }
        assert_eq!(config.get("link_style").as_deref(), Some("at-uri"));
        assert_eq!(config.get("nope"), None);
    }

    #[test]
    fn test_set_validates() {
        let mut config = LeafwindConfig::default();
        assert!(config.set("primary_color", "#12345").is_err());
        assert!(config.set("show_comments", "maybe").is_err());
        assert!(config.set("default_image_size", "0").is_err());
        assert!(config.set("max_list_depth", "-1").is_err());
        assert!(config.set("link_style", "https").is_err());
        assert!(config.set("colour", "#000000").is_err());
        assert_eq!(config, LeafwindConfig::default());

        config.set("primary_color", "ff8000").unwrap();
        config.set("show_comments", "no").unwrap();
        assert_eq!(config.primary_color, "ff8000");
        assert!(!config.show_comments);
    }

    #[test]
    fn test_parse_options_follow_config() {
        let mut config = LeafwindConfig::default();
        config.set("default_image_size", "300").unwrap();
        config.set("lookup_timeout_ms", "250").unwrap();
        let options = config.parse_options("did:plc:me");
        assert_eq!(options.author_did, "did:plc:me");
        assert_eq!(options.default_image_size, 300);
        assert_eq!(options.lookup_timeout, Duration::from_millis(250));
        assert!(options.probe.is_none());

        config.set("blob_dir", "/tmp").unwrap();
        assert!(config.parse_options("did:plc:me").probe.is_some());
    }
}
