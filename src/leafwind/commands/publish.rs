//! Handing converted records to a repository.
//!
//! The transport (an authenticated PDS session, a local directory, ...) sits
//! behind [`Publisher`]. The publication goes first since every document
//! points at it; if it cannot be written nothing else is attempted. Document
//! failures are collected and reported, not fatal.

use crate::commands::convert::{DOCUMENT_COLLECTION, PUBLICATION_COLLECTION};
use crate::commands::{CmdMessage, CmdResult, LeafletBundle};
use crate::error::{LeafwindError, Result};
use crate::model::{DocumentRecord, PublicationRecord};
use crate::tid::Tid;
use log::{info, warn};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

pub trait Publisher {
    /// Create or replace the publication record. Returns its AT-URI.
    fn put_publication(&mut self, rkey: &Tid, record: &PublicationRecord) -> Result<String>;

    /// Create a document record. Returns its AT-URI.
    fn create_document(&mut self, rkey: &Tid, record: &DocumentRecord) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct DocumentError {
    pub rkey: Tid,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct PublishReport {
    pub publication_uri: String,
    pub documents: Vec<String>,
    pub errors: Vec<DocumentError>,
}

pub fn publish_leaflet<P: Publisher>(
    publisher: &mut P,
    bundle: &LeafletBundle,
) -> Result<PublishReport> {
    let publication_uri = publisher
        .put_publication(&bundle.publication_rkey, &bundle.publication)
        .map_err(|e| LeafwindError::Publish(format!("publication not written: {}", e)))?;
    info!("published {}", publication_uri);

    let mut report = PublishReport {
        publication_uri,
        ..Default::default()
    };
    for doc in &bundle.documents {
        match publisher.create_document(&doc.rkey, &doc.record) {
            Ok(uri) => report.documents.push(uri),
            Err(e) => {
                warn!("document {} failed: {}", doc.rkey, e);
                report.errors.push(DocumentError {
                    rkey: doc.rkey,
                    message: e.to_string(),
                });
            }
        }
    }
    Ok(report)
}

pub fn run<P: Publisher>(publisher: &mut P, bundle: &LeafletBundle) -> Result<CmdResult> {
    let report = publish_leaflet(publisher, bundle)?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Publication: {}",
        report.publication_uri
    )));
    for error in &report.errors {
        result.add_message(CmdMessage::error(format!(
            "Document {}: {}",
            error.rkey, error.message
        )));
    }
    result.add_message(CmdMessage::info(format!(
        "Published {} of {} document(s)",
        report.documents.len(),
        bundle.documents.len()
    )));
    Ok(result)
}

/// Writes records as `<root>/<collection>/<rkey>.json`, the layout of a
/// repository export.
#[derive(Debug, Clone)]
pub struct DirPublisher {
    root: PathBuf,
    author_did: String,
    written: Vec<PathBuf>,
}

impl DirPublisher {
    pub fn new(root: impl Into<PathBuf>, author_did: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            author_did: author_did.into(),
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn write<T: Serialize>(&mut self, collection: &str, rkey: &Tid, record: &T) -> Result<String> {
        let dir = self.root.join(collection);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.json", rkey));
        fs::write(&path, serde_json::to_string_pretty(record)?)?;
        self.written.push(path);
        Ok(format!("at://{}/{}/{}", self.author_did, collection, rkey))
    }
}

impl Publisher for DirPublisher {
    fn put_publication(&mut self, rkey: &Tid, record: &PublicationRecord) -> Result<String> {
        self.write(PUBLICATION_COLLECTION, rkey, record)
    }

    fn create_document(&mut self, rkey: &Tid, record: &DocumentRecord) -> Result<String> {
        let path = self
            .root
            .join(DOCUMENT_COLLECTION)
            .join(format!("{}.json", rkey));
        if path.exists() {
            return Err(LeafwindError::Publish(format!(
                "{} already exists",
                path.display()
            )));
        }
        self.write(DOCUMENT_COLLECTION, rkey, record)
    }
}
