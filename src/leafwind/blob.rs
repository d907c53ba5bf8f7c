//! Blob URL handling.
//!
//! WhiteWind embeds images as PDS `getBlob` URLs
//! (`…/xrpc/com.atproto.sync.getBlob?did=<did>&cid=<cid>`), and occasionally as
//! gateway URLs that merely contain a CID. Both forms are recognised here.
//! The patterns and the AT-URI templates are what existing Leaflet records
//! were produced with, so they must not drift.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static GET_BLOB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"xrpc/com\.atproto\.sync\.getBlob\?did=([^&]+)&cid=([^&\s]+)")
        .expect("getBlob pattern is valid")
});

static CID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(bafk[a-z0-9]+|bafyb[a-z0-9]+)").expect("cid pattern is valid"));

const ENTRY_NAMESPACE: &str = "com.whtwnd.blog.entry";
const BLOB_NAMESPACE: &str = "com.atproto.blob";

/// How blob URLs are rewritten when they appear as link targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkStyle {
    /// Rewrite to `at://<did>/<namespace>/<cid>`.
    #[default]
    AtUri,
    /// Replace the URL by the bare CID.
    Cid,
}

/// The pieces recovered from a blob URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobMatch {
    /// A `getBlob` URL; `did` is percent-decoded.
    GetBlob { did: String, cid: String },
    /// Any other URL containing a CID-shaped substring.
    Bare { cid: String },
}

impl BlobMatch {
    pub fn cid(&self) -> &str {
        match self {
            BlobMatch::GetBlob { cid, .. } | BlobMatch::Bare { cid } => cid,
        }
    }
}

pub fn match_blob_url(url: &str) -> Option<BlobMatch> {
    if let Some(caps) = GET_BLOB_RE.captures(url) {
        let raw_did = &caps[1];
        let did = urlencoding::decode(raw_did)
            .map(|d| d.into_owned())
            .unwrap_or_else(|_| raw_did.to_string());
        return Some(BlobMatch::GetBlob {
            did,
            cid: caps[2].to_string(),
        });
    }

    if url.contains("bafk") || url.contains("bafyb") {
        if let Some(m) = CID_RE.find(url) {
            return Some(BlobMatch::Bare {
                cid: m.as_str().to_string(),
            });
        }
    }

    None
}

/// Extract the content identifier from a blob URL, if it has one.
pub fn extract_cid(url: &str) -> Option<String> {
    match_blob_url(url).map(|m| m.cid().to_string())
}

/// Rewrite a link target. URLs that are not blob URLs come back unchanged.
pub fn normalize_link(url: &str, author_did: &str, style: LinkStyle) -> String {
    let Some(found) = match_blob_url(url) else {
        return url.to_string();
    };

    match (style, found) {
        (LinkStyle::Cid, found) => found.cid().to_string(),
        (LinkStyle::AtUri, BlobMatch::GetBlob { did, cid }) => {
            format!("at://{}/{}/{}", did, ENTRY_NAMESPACE, cid)
        }
        (LinkStyle::AtUri, BlobMatch::Bare { cid }) => {
            format!("at://{}/{}/{}", author_did, BLOB_NAMESPACE, cid)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTHOR: &str = "did:plc:author";

    #[test]
    fn get_blob_url_yields_cid() {
        let url = "https://pds.example/xrpc/com.atproto.sync.getBlob?did=did:plc:abc&cid=bafkreiXYZ";
        assert_eq!(extract_cid(url).as_deref(), Some("bafkreiXYZ"));
    }

    #[test]
    fn get_blob_did_is_percent_decoded() {
        let url = "https://pds.example/xrpc/com.atproto.sync.getBlob?did=did%3Aplc%3Aabc&cid=bafkreiabc";
        assert_eq!(
            normalize_link(url, AUTHOR, LinkStyle::AtUri),
            "at://did:plc:abc/com.whtwnd.blog.entry/bafkreiabc"
        );
    }

    #[test]
    fn cid_stops_at_next_query_param() {
        let url = "https://x/xrpc/com.atproto.sync.getBlob?did=did:plc:abc&cid=bafkreiabc&size=2";
        assert_eq!(extract_cid(url).as_deref(), Some("bafkreiabc"));
    }

    #[test]
    fn bare_cid_uses_author_did() {
        let url = "https://cdn.example/img/bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi/full";
        assert_eq!(
            normalize_link(url, AUTHOR, LinkStyle::AtUri),
            "at://did:plc:author/com.atproto.blob/bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi"
        );
    }

    #[test]
    fn bare_cid_pattern_is_lowercase_only() {
        let url = "https://cdn.example/bafkREI";
        assert_eq!(extract_cid(url), None);
        assert_eq!(normalize_link(url, AUTHOR, LinkStyle::AtUri), url);
    }

    #[test]
    fn cid_style_returns_bare_identifier() {
        let url = "https://pds.example/xrpc/com.atproto.sync.getBlob?did=did:plc:abc&cid=bafkreiabc";
        assert_eq!(normalize_link(url, AUTHOR, LinkStyle::Cid), "bafkreiabc");
    }

    #[test]
    fn ordinary_urls_are_untouched() {
        let url = "https://example.com/x";
        assert_eq!(normalize_link(url, AUTHOR, LinkStyle::AtUri), url);
        assert_eq!(normalize_link(url, AUTHOR, LinkStyle::Cid), url);
        assert_eq!(extract_cid(url), None);
    }
}
