use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Number of hex characters of the source digest used as the image tag.
const TAG_LENGTH: usize = 12;

/// A container image built from a local context directory and published to a
/// registry by an external image builder. The graph only carries the
/// resulting image URI; the build itself happens outside of synthesis.
#[derive(Debug, Clone, Serialize)]
pub struct ImageAsset {
    pub id: String,
    pub repository: String,
    pub tag: String,
    pub context: PathBuf,
    pub image_uri: String,
}

/// Build plan for all image assets of a deployment, written next to the
/// template for the image builder to consume.
#[derive(Debug, Default, Serialize)]
pub struct AssetManifest {
    pub images: Vec<ImageAsset>,
}

impl AssetManifest {
    pub fn push(&mut self, asset: ImageAsset) {
        self.images.push(asset);
    }

    pub fn get(&self, id: &str) -> Option<&ImageAsset> {
        self.images.iter().find(|asset| asset.id == id)
    }

    pub fn write(&self, path: &Path) -> crate::Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}

/// Digest of a build context directory, usable as an image tag.
///
/// Walks the tree in path order and digests each file's relative path and
/// contents, so the tag changes exactly when the context changes and is
/// byte-identical across re-synthesis of an unchanged context.
pub fn source_hash(context: &Path) -> crate::Result<String> {
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(context) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();

    let mut hasher = Sha256::new();
    for path in &files {
        let relative = path.strip_prefix(context).unwrap_or(path);
        hasher.update(relative.to_string_lossy().as_bytes());
        hasher.update(std::fs::read(path)?);
    }
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(TAG_LENGTH);
    Ok(digest)
}
