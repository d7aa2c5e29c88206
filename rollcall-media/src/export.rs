//! Writing sampled frames to disk and reading them back
//!
//! Frames are named after their wall-clock second (see
//! [`FileStemNamer`](crate::timestamp::FileStemNamer)) and listed in a
//! `manifest.json` next to them, so an exported session can be inspected or
//! submitted later.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::error::{MediaError, MediaResult};
use crate::sampler::SampleSet;
use crate::timestamp::FileStemNamer;

/// Manifest file name inside an export directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// Description of an exported sample set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameManifest {
    pub session_id: Uuid,
    pub frame_count: usize,
    pub captured: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_mode: Option<String>,
    pub mime_type: String,
    /// File names relative to the export directory
    pub files: Vec<String>,
    pub labels: Vec<String>,
    pub stems: Vec<String>,
    /// Labels with the same-second counter appended
    pub modified_labels: Vec<String>,
}

/// Frames read back from an export directory
#[derive(Debug, Clone)]
pub struct ExportedFrames {
    pub manifest: FrameManifest,
    /// Images as data URLs, in manifest order
    pub image_urls: Vec<String>,
}

fn extension_for(mime_type: &str) -> &str {
    mime_type.split('/').nth(1).unwrap_or("bin")
}

/// Resolve a manifest file name, which must be a single plain component
fn frame_path(dir: &Path, file: &str) -> MediaResult<PathBuf> {
    let mut components = Path::new(file).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(dir.join(file)),
        _ => Err(MediaError::InvalidConfiguration {
            message: format!("Manifest file name {:?} leaves the export directory", file),
        }),
    }
}

/// Write every sample of `set` into `dir` and return the manifest
pub async fn export_samples(
    set: &SampleSet,
    dir: &Path,
    processing_mode: Option<&str>,
) -> MediaResult<FrameManifest> {
    tokio::fs::create_dir_all(dir).await?;

    let mime_type = set
        .samples()
        .first()
        .map(|s| s.image.mime_type.clone())
        .unwrap_or_else(|| "image/jpeg".to_string());
    let extension = extension_for(&mime_type).to_string();

    let mut namer = FileStemNamer::new();
    let mut manifest = FrameManifest {
        session_id: set.session_id(),
        frame_count: set.len(),
        captured: set.captured(),
        processing_mode: processing_mode.map(str::to_string),
        mime_type,
        files: Vec::with_capacity(set.len()),
        labels: Vec::with_capacity(set.len()),
        stems: Vec::with_capacity(set.len()),
        modified_labels: Vec::with_capacity(set.len()),
    };

    for sample in set.samples() {
        let (stem, modified) = namer.next(&sample.wall_clock, &sample.label);
        let file_name = format!("{}.{}", stem, extension);
        tokio::fs::write(dir.join(&file_name), &sample.image.data).await?;

        manifest.files.push(file_name);
        manifest.labels.push(sample.label.clone());
        manifest.stems.push(stem);
        manifest.modified_labels.push(modified);
    }

    let json = serde_json::to_vec_pretty(&manifest)?;
    tokio::fs::write(dir.join(MANIFEST_FILE), json).await?;
    info!("Exported {} frames to {:?}", manifest.frame_count, dir);

    Ok(manifest)
}

/// Read an export directory back
pub async fn load_exported(dir: &Path) -> MediaResult<ExportedFrames> {
    let raw = tokio::fs::read(dir.join(MANIFEST_FILE)).await?;
    let manifest: FrameManifest = serde_json::from_slice(&raw)?;

    if manifest.files.len() != manifest.frame_count || manifest.labels.len() != manifest.frame_count
    {
        return Err(MediaError::InvalidConfiguration {
            message: format!(
                "Manifest lists {} files and {} labels for {} frames",
                manifest.files.len(),
                manifest.labels.len(),
                manifest.frame_count
            ),
        });
    }

    let mut image_urls = Vec::with_capacity(manifest.files.len());
    for file in &manifest.files {
        let path = frame_path(dir, file)?;
        let data = tokio::fs::read(&path).await?;
        image_urls.push(format!(
            "data:{};base64,{}",
            manifest.mime_type,
            STANDARD.encode(data)
        ));
    }

    Ok(ExportedFrames {
        manifest,
        image_urls,
    })
}
