//! # API Facade
//!
//! A thin facade over the command layer and the single entry point for
//! clients. It owns the loaded configuration and the dimension probe, turns
//! them into parser options, and dispatches to `commands/*.rs`.
//!
//! No stdout, no stderr, no exit codes: everything comes back as
//! `Result<CmdResult>`.
//!
//! ## Generic Over DimensionProbe
//!
//! `LeafwindApi<P: DimensionProbe>`:
//! - Production: `LeafwindApi<LocalBlobProbe>`
//! - Testing: `LeafwindApi<InMemoryProbe>`
//!
//! Without an explicit probe the `blob_dir` config key decides whether images
//! are measured at all.

use crate::commands::{self, CmdResult, LeafletBundle, PublicationSettings};
use crate::config::LeafwindConfig;
use crate::error::Result;
use crate::markdown::ParseOptions;
use crate::model::BlobMeta;
use crate::probe::DimensionProbe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct LeafwindApi<P: DimensionProbe + 'static> {
    config: LeafwindConfig,
    config_path: PathBuf,
    probe: Option<Arc<P>>,
}

impl<P: DimensionProbe + 'static> LeafwindApi<P> {
    pub fn new(config: LeafwindConfig, config_path: impl Into<PathBuf>) -> Self {
        Self {
            config,
            config_path: config_path.into(),
            probe: None,
        }
    }

    /// Load the config file at `config_path` (defaults if it is missing).
    pub fn open(config_path: impl Into<PathBuf>) -> Result<Self> {
        let config_path = config_path.into();
        let config = LeafwindConfig::load(&config_path)?;
        Ok(Self::new(config, config_path))
    }

    pub fn with_probe(mut self, probe: P) -> Self {
        self.probe = Some(Arc::new(probe));
        self
    }

    pub fn config(&self) -> &LeafwindConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn parse_options(&self, author_did: &str) -> ParseOptions {
        let options = self.config.parse_options(author_did);
        match &self.probe {
            Some(probe) => options.probe(probe.clone()),
            None => options,
        }
    }

    pub fn convert(
        &self,
        entries_json: &str,
        settings: &PublicationSettings,
        blobs: Vec<BlobMeta>,
    ) -> Result<CmdResult> {
        let entries = commands::convert::parse_entries(entries_json)?;
        let options = self.parse_options(&settings.author_did).blobs(blobs);
        let bundle = commands::convert::convert_entries(&entries, settings, &self.config, &options)?;
        commands::convert::report(entries.len(), bundle)
    }

    pub fn parse(&self, markdown: &str, author_did: &str, blobs: Vec<BlobMeta>) -> Result<CmdResult> {
        let options = self.parse_options(author_did).blobs(blobs);
        commands::parse::run(markdown, &options)
    }

    pub fn generate_tids(&self, count: usize) -> Result<CmdResult> {
        commands::tid::generate(count)
    }

    pub fn inspect_tid(&self, tid: &str) -> Result<CmdResult> {
        commands::tid::inspect(tid)
    }

    pub fn export(&self, bundle: &LeafletBundle, dest: &Path) -> Result<CmdResult> {
        commands::export::run(bundle, dest)
    }

    pub fn publish<T: commands::publish::Publisher>(
        &self,
        publisher: &mut T,
        bundle: &LeafletBundle,
    ) -> Result<CmdResult> {
        commands::publish::run(publisher, bundle)
    }

    pub fn config_action(&mut self, action: commands::config::ConfigAction) -> Result<CmdResult> {
        let result = commands::config::run(&self.config_path, action)?;
        if let Some(config) = &result.config {
            self.config = config.clone();
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::config::ConfigAction;
    use crate::commands::publish::DirPublisher;
    use crate::config::CONFIG_FILENAME;
    use crate::model::{AspectRatio, Block};
    use crate::probe::memory::InMemoryProbe;
    use crate::probe::ImageInfo;
    use tempfile::tempdir;

    const DID: &str = "did:plc:me";

    fn settings() -> PublicationSettings {
        PublicationSettings {
            name: "Blog".into(),
            author_did: DID.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_convert_dispatches() {
        let api: LeafwindApi<InMemoryProbe> =
            LeafwindApi::new(LeafwindConfig::default(), "unused.json");
        let res = api
            .convert(r#"[{"content": "hello"}]"#, &settings(), vec![])
            .unwrap();
        let bundle = res.bundle.unwrap();
        assert_eq!(bundle.documents.len(), 1);
        assert_eq!(bundle.publication.name, "Blog");
    }

    #[test]
    fn test_probe_reaches_parser() {
        let probe = InMemoryProbe::new().with(
            "bafkreiabc",
            ImageInfo {
                aspect_ratio: AspectRatio {
                    width: 3,
                    height: 2,
                },
                mime_type: None,
                size: None,
            },
        );
        let api = LeafwindApi::new(LeafwindConfig::default(), "unused.json").with_probe(probe);
        let res = api
            .parse("![](https://cdn.example/bafkreiabc)", DID, vec![])
            .unwrap();
        assert!(matches!(
            &res.blocks[0],
            Block::Image(img) if img.aspect_ratio == AspectRatio { width: 3, height: 2 }
        ));
    }

    #[test]
    fn test_config_action_updates_loaded_config() {
        let dir = tempdir().unwrap();
        let mut api: LeafwindApi<InMemoryProbe> =
            LeafwindApi::open(dir.path().join(CONFIG_FILENAME)).unwrap();
        api.config_action(ConfigAction::Set {
            key: "default_image_size".into(),
            value: "128".into(),
        })
        .unwrap();
        assert_eq!(api.config().default_image_size, 128);

        let res = api.parse("![](https://cdn.example/bafkreiabc)", DID, vec![]).unwrap();
        assert!(matches!(
            &res.blocks[0],
            Block::Image(img) if img.aspect_ratio == AspectRatio::square(128)
        ));
    }

    #[test]
    fn test_export_and_publish_dispatch() {
        let dir = tempdir().unwrap();
        let api: LeafwindApi<InMemoryProbe> =
            LeafwindApi::new(LeafwindConfig::default(), "unused.json");
        let bundle = api
            .convert(r#"[{"content": "a"}, {"content": "b"}]"#, &settings(), vec![])
            .unwrap()
            .bundle
            .unwrap();

        let dest = dir.path().join("out.tar.gz");
        api.export(&bundle, &dest).unwrap();
        assert!(dest.exists());

        let mut publisher = DirPublisher::new(dir.path().join("repo"), DID);
        let res = api.publish(&mut publisher, &bundle).unwrap();
        assert!(!res.has_errors());
        assert_eq!(publisher.written().len(), 3);
    }

    #[test]
    fn test_tids() {
        let api: LeafwindApi<InMemoryProbe> =
            LeafwindApi::new(LeafwindConfig::default(), "unused.json");
        let res = api.generate_tids(3).unwrap();
        assert_eq!(res.tids.len(), 3);
        assert!(api.inspect_tid(&res.tids[0]).is_ok());
    }
}
