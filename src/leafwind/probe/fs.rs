use super::{DimensionProbe, ImageInfo, ImageRequest};
use crate::model::AspectRatio;
use image::ImageReader;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Measures blobs previously downloaded into `dir`, stored as `<cid>` or
/// `<cid>.<ext>`.
#[derive(Debug, Clone)]
pub struct LocalBlobProbe {
    dir: PathBuf,
}

impl LocalBlobProbe {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn locate(&self, cid: &str) -> Option<PathBuf> {
        let exact = self.dir.join(cid);
        if exact.is_file() {
            return Some(exact);
        }

        fs::read_dir(&self.dir)
            .ok()?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .find(|path| path.is_file() && path.file_stem().is_some_and(|stem| stem == cid))
    }
}

fn measure(path: &Path) -> Option<ImageInfo> {
    let reader = ImageReader::open(path).ok()?.with_guessed_format().ok()?;
    let mime_type = reader.format().map(|f| f.to_mime_type().to_string());
    let (width, height) = reader.into_dimensions().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    let size = fs::metadata(path).ok().map(|m| m.len());

    Some(ImageInfo {
        aspect_ratio: AspectRatio { width, height },
        mime_type,
        size,
    })
}

impl DimensionProbe for LocalBlobProbe {
    fn probe(&self, request: &ImageRequest) -> Option<ImageInfo> {
        let Some(path) = self.locate(&request.cid) else {
            debug!("blob {} not found in {}", request.cid, self.dir.display());
            return None;
        };
        measure(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn request(cid: &str) -> ImageRequest {
        ImageRequest {
            cid: cid.to_string(),
            url: String::new(),
        }
    }

    #[test]
    fn measures_png_with_extension() {
        let dir = tempdir().unwrap();
        image::RgbImage::new(30, 20)
            .save(dir.path().join("bafkreiabc.png"))
            .unwrap();

        let probe = LocalBlobProbe::new(dir.path());
        let info = probe.probe(&request("bafkreiabc")).unwrap();
        assert_eq!(
            info.aspect_ratio,
            AspectRatio {
                width: 30,
                height: 20
            }
        );
        assert_eq!(info.mime_type.as_deref(), Some("image/png"));
        assert!(info.size.unwrap() > 0);
    }

    #[test]
    fn measures_extensionless_blob_by_content() {
        let dir = tempdir().unwrap();
        let staged = dir.path().join("staged.png");
        image::RgbImage::new(4, 9).save(&staged).unwrap();
        fs::rename(&staged, dir.path().join("bafkreixyz")).unwrap();

        let info = LocalBlobProbe::new(dir.path())
            .probe(&request("bafkreixyz"))
            .unwrap();
        assert_eq!(info.aspect_ratio.width, 4);
        assert_eq!(info.aspect_ratio.height, 9);
    }

    #[test]
    fn missing_or_garbage_is_unknown() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("bafkreibad"), b"not an image").unwrap();

        let probe = LocalBlobProbe::new(dir.path());
        assert!(probe.probe(&request("bafkreibad")).is_none());
        assert!(probe.probe(&request("bafkreimissing")).is_none());
    }
}
