use crate::commands::{CmdMessage, CmdResult, LeafletBundle};
use crate::error::Result;
use chrono::Utc;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const PUBLICATION_ENTRY: &str = "00.json";

/// Default archive name, timestamped so repeated exports do not collide.
pub fn default_archive_name() -> PathBuf {
    PathBuf::from(format!(
        "leaflet-records-{}.tar.gz",
        Utc::now().format("%Y-%m-%d_%H-%M-%S")
    ))
}

/// Write the bundle as a gzipped tar: the publication as `00.json`, then
/// documents as `1.json`, `2.json`, ...
pub fn run(bundle: &LeafletBundle, dest: &Path) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    if bundle.documents.is_empty() {
        result.add_message(CmdMessage::warning(
            "No documents converted; archive holds only the publication.",
        ));
    }

    let file = File::create(dest)?;
    write_archive(file, bundle)?;

    result.add_message(CmdMessage::success(format!(
        "Exported {} record(s) to {}",
        bundle.documents.len() + 1,
        dest.display()
    )));
    Ok(result.with_written_paths(vec![dest.to_path_buf()]))
}

fn append_json<W: Write, T: Serialize>(
    tar: &mut tar::Builder<W>,
    name: &str,
    record: &T,
) -> Result<()> {
    let content = serde_json::to_vec_pretty(record)?;

    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(Utc::now().timestamp().max(0) as u64);
    header.set_cksum();

    tar.append_data(&mut header, name, content.as_slice())?;
    Ok(())
}

pub fn write_archive<W: Write>(writer: W, bundle: &LeafletBundle) -> Result<()> {
    let enc = GzEncoder::new(writer, Compression::default());
    let mut tar = tar::Builder::new(enc);

    append_json(&mut tar, PUBLICATION_ENTRY, &bundle.publication)?;
    for (i, doc) in bundle.documents.iter().enumerate() {
        append_json(&mut tar, &format!("{}.json", i + 1), &doc.record)?;
    }

    tar.into_inner()?.finish()?;
    Ok(())
}
