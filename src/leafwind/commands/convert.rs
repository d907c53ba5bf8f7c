//! WhiteWind entries → one Leaflet publication plus a document per entry.
//!
//! Entries are converted independently: an entry that is malformed or has no
//! content is recorded as an [`EntryFailure`] and the rest of the batch
//! carries on.

use crate::color::hex_to_rgb;
use crate::commands::{CmdMessage, CmdResult};
use crate::config::LeafwindConfig;
use crate::error::{LeafwindError, Result};
use crate::markdown::{self, ParseOptions};
use crate::model::{
    BlobMeta, DocumentRecord, LinearDocument, Preferences, PublicationRecord, Rgb, Theme,
    WhiteWindEntry,
};
use crate::tid::Tid;
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

pub const PUBLICATION_COLLECTION: &str = "pub.leaflet.publication";
pub const DOCUMENT_COLLECTION: &str = "pub.leaflet.document";
const DEFAULT_TITLE: &str = "Untitled Post";

/// Publication details supplied by the user. Unset options fall back to the
/// config file.
#[derive(Debug, Clone, Default)]
pub struct PublicationSettings {
    pub name: String,
    pub author_did: String,
    pub base_path: Option<String>,
    pub description: Option<String>,
    pub show_in_discover: Option<bool>,
    pub show_comments: Option<bool>,
    pub primary_color: Option<String>,
    pub background_color: Option<String>,
    pub page_background: Option<String>,
    pub show_page_background: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ConvertedDocument {
    pub rkey: Tid,
    /// AT-URI of the WhiteWind entry this came from, when known.
    pub source_uri: Option<String>,
    pub record: DocumentRecord,
}

#[derive(Debug, Clone)]
pub struct EntryFailure {
    pub index: usize,
    pub source_uri: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct LeafletBundle {
    pub author_did: String,
    pub publication_rkey: Tid,
    pub publication: PublicationRecord,
    pub documents: Vec<ConvertedDocument>,
    pub failures: Vec<EntryFailure>,
    /// Non-fatal remarks, such as colors that could not be parsed.
    pub notes: Vec<String>,
}

impl LeafletBundle {
    pub fn publication_uri(&self) -> String {
        publication_uri(&self.author_did, &self.publication_rkey)
    }
}

pub fn publication_uri(author_did: &str, rkey: &Tid) -> String {
    format!("at://{}/{}/{}", author_did, PUBLICATION_COLLECTION, rkey)
}

/// Accepts a JSON array of entries or a `listRecords` response
/// (`{"records": [...]}`).
///
/// Only the outer shape is checked here. Each element is decoded on its own
/// by [`convert_entries`], so one bad entry cannot sink the batch.
pub fn parse_entries(json: &str) -> Result<Vec<Value>> {
    let value: Value = serde_json::from_str(json)?;
    let list = match value {
        list @ Value::Array(_) => list,
        Value::Object(mut map) => match map.remove("records") {
            Some(records @ Value::Array(_)) => records,
            _ => {
                return Err(LeafwindError::InvalidInput(
                    "expected an object with a \"records\" array".to_string(),
                ))
            }
        },
        _ => {
            return Err(LeafwindError::InvalidInput(
                "expected a JSON array of entries or an object with a \"records\" array"
                    .to_string(),
            ))
        }
    };
    Ok(serde_json::from_value(list)?)
}

/// Decode one raw entry. Non-objects and wrong-typed fields are rejected.
fn decode_entry(raw: &Value, index: usize) -> Result<WhiteWindEntry> {
    WhiteWindEntry::deserialize(raw).map_err(|e| {
        LeafwindError::InvalidInput(format!("entry {} is not a WhiteWind entry: {}", index, e))
    })
}

/// Parse the optional blob metadata list `[{cid, mimeType, size, width, height}]`.
pub fn parse_blob_meta(json: &str) -> Result<Vec<BlobMeta>> {
    Ok(serde_json::from_str(json)?)
}

fn theme_color(label: &str, value: &str, notes: &mut Vec<String>) -> Option<Rgb> {
    if value.is_empty() {
        return None;
    }
    let rgb = hex_to_rgb(value);
    if rgb.is_none() {
        notes.push(format!("Ignoring {} '{}': not a #rrggbb color", label, value));
    }
    rgb
}

pub fn build_publication(
    settings: &PublicationSettings,
    config: &LeafwindConfig,
    notes: &mut Vec<String>,
) -> PublicationRecord {
    let pick = |given: &Option<String>, fallback: &str| {
        given.clone().unwrap_or_else(|| fallback.to_string())
    };
    let primary = pick(&settings.primary_color, &config.primary_color);
    let background = pick(&settings.background_color, &config.background_color);
    let page = pick(&settings.page_background, &config.page_background);

    PublicationRecord {
        name: settings.name.clone(),
        base_path: settings.base_path.clone().filter(|s| !s.is_empty()),
        description: settings.description.clone().filter(|s| !s.is_empty()),
        preferences: Preferences {
            show_in_discover: settings
                .show_in_discover
                .unwrap_or(config.show_in_discover),
            show_comments: settings.show_comments.unwrap_or(config.show_comments),
        },
        theme: Theme {
            primary: theme_color("primary color", &primary, notes),
            background_color: theme_color("background color", &background, notes),
            page_background: theme_color("page background", &page, notes),
            show_page_background: settings
                .show_page_background
                .unwrap_or(config.show_page_background),
        },
    }
}

/// Convert one entry. `index` is only used to label the error.
pub fn convert_entry(
    entry: &WhiteWindEntry,
    index: usize,
    publication_uri: &str,
    options: &ParseOptions,
) -> Result<DocumentRecord> {
    let content = entry
        .content()
        .ok_or(LeafwindError::MissingContent { index })?;

    let blocks = markdown::parse_with(content, options);
    debug!("entry {}: {} block(s)", index, blocks.len());

    Ok(DocumentRecord {
        title: entry.title().unwrap_or(DEFAULT_TITLE).to_string(),
        description: entry.subtitle().map(str::to_string),
        author: options.author_did.clone(),
        publication: publication_uri.to_string(),
        published_at: entry.created_at().map(str::to_string),
        pages: vec![LinearDocument::new(blocks)],
    })
}

/// A TID not yet used in this batch.
fn fresh_tid(used: &mut HashSet<Tid>) -> Tid {
    loop {
        let tid = Tid::now();
        if used.insert(tid) {
            return tid;
        }
    }
}

pub fn convert_entries(
    entries: &[Value],
    settings: &PublicationSettings,
    config: &LeafwindConfig,
    options: &ParseOptions,
) -> Result<LeafletBundle> {
    if settings.name.trim().is_empty() {
        return Err(LeafwindError::InvalidInput(
            "publication name is required".to_string(),
        ));
    }
    if !settings.author_did.starts_with("did:") {
        return Err(LeafwindError::InvalidInput(format!(
            "'{}' is not a DID",
            settings.author_did
        )));
    }

    let mut notes = Vec::new();
    let publication = build_publication(settings, config, &mut notes);
    let mut used = HashSet::new();
    let publication_rkey = fresh_tid(&mut used);
    let pub_uri = publication_uri(&settings.author_did, &publication_rkey);

    let mut documents = Vec::with_capacity(entries.len());
    let mut failures = Vec::new();
    for (index, raw) in entries.iter().enumerate() {
        let source_uri = raw.get("uri").and_then(Value::as_str).map(str::to_string);
        let converted = decode_entry(raw, index)
            .and_then(|entry| convert_entry(&entry, index, &pub_uri, options));
        match converted {
            Ok(record) => documents.push(ConvertedDocument {
                rkey: fresh_tid(&mut used),
                source_uri,
                record,
            }),
            Err(e) => {
                debug!("entry {} skipped: {}", index, e);
                failures.push(EntryFailure {
                    index,
                    source_uri,
                    reason: e.to_string(),
                })
            }
        }
    }

    info!(
        "converted {} of {} entries into {}",
        documents.len(),
        entries.len(),
        pub_uri
    );
    Ok(LeafletBundle {
        author_did: settings.author_did.clone(),
        publication_rkey,
        publication,
        documents,
        failures,
        notes,
    })
}

/// Convert a JSON document of entries and report the outcome.
pub fn run(
    entries_json: &str,
    settings: &PublicationSettings,
    config: &LeafwindConfig,
    blobs: Vec<BlobMeta>,
) -> Result<CmdResult> {
    let entries = parse_entries(entries_json)?;
    let options = config.parse_options(&settings.author_did).blobs(blobs);
    let bundle = convert_entries(&entries, settings, config, &options)?;
    report(entries.len(), bundle)
}

/// Turn a converted bundle into user-facing messages.
pub fn report(total: usize, bundle: LeafletBundle) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    if total == 0 {
        result.add_message(CmdMessage::info("No entries to convert."));
    }
    for note in &bundle.notes {
        result.add_message(CmdMessage::warning(note.clone()));
    }
    for failure in &bundle.failures {
        let label = failure
            .source_uri
            .clone()
            .unwrap_or_else(|| format!("entry {}", failure.index));
        result.add_message(CmdMessage::error(format!(
            "Skipped {}: {}",
            label, failure.reason
        )));
    }
    if total > 0 {
        result.add_message(CmdMessage::success(format!(
            "Converted {} of {} entries into publication {}",
            bundle.documents.len(),
            total,
            bundle.publication_rkey
        )));
    }

    Ok(result.with_bundle(bundle))
}
