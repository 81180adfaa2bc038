use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::batch::state::{PairFailure, PairResult, ResultSlot};
use crate::errors::{HighlightError, HighlightResult};

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedImage {
    pub name: String,
    pub file: String,
    pub width: u32,
    pub height: u32,
}

/// Written next to the images as `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportManifest {
    pub export_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub images: Vec<ExportedImage>,
    #[serde(default)]
    pub failed: Vec<PairFailure>,
}

fn file_stem_for(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    if stem.is_empty() {
        "unnamed".to_string()
    } else {
        stem
    }
}

/// First free `<stem>.png`, then `<stem>-2.png`, `<stem>-3.png`, ...
fn unique_file_name(stem: &str, taken: &mut HashSet<String>) -> String {
    let mut file = format!("{stem}.png");
    let mut n = 2;
    while !taken.insert(file.clone()) {
        file = format!("{stem}-{n}.png");
        n += 1;
    }
    file
}

/// Write every ready image as `<name>.png` plus a manifest into `out_dir`.
pub fn export_results(results: &[PairResult], out_dir: &Path) -> HighlightResult<ExportManifest> {
    if !results
        .iter()
        .any(|r| matches!(r.slot, ResultSlot::Ready(_)))
    {
        return Err(HighlightError::NothingToExport);
    }

    std::fs::create_dir_all(out_dir).map_err(|e| {
        HighlightError::Export(format!("cannot create {}: {e}", out_dir.display()))
    })?;

    let mut images = Vec::new();
    let mut failed = Vec::new();
    let mut taken = HashSet::new();
    for result in results {
        match &result.slot {
            ResultSlot::Ready(img) => {
                let file = unique_file_name(&file_stem_for(&result.name), &mut taken);
                let path: PathBuf = out_dir.join(&file);
                std::fs::write(&path, &img.png)?;
                tracing::debug!(path = %path.display(), "highlight image written");
                images.push(ExportedImage {
                    name: result.name.clone(),
                    file,
                    width: img.width,
                    height: img.height,
                });
            }
            ResultSlot::Failed(reason) => failed.push(PairFailure {
                name: result.name.clone(),
                reason: reason.clone(),
            }),
            ResultSlot::Loading => {}
        }
    }

    let manifest = ExportManifest {
        export_id: uuid::Uuid::new_v4().to_string(),
        created_at: chrono::Utc::now(),
        images,
        failed,
    };
    let manifest_path = out_dir.join(MANIFEST_FILE);
    std::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;
    tracing::info!(
        path = %out_dir.display(),
        images = manifest.images.len(),
        failed = manifest.failed.len(),
        "highlights exported"
    );
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::AnnotatedImage;

    fn ready(name: &str) -> PairResult {
        PairResult {
            name: name.into(),
            slot: ResultSlot::Ready(AnnotatedImage {
                width: 3,
                height: 2,
                png: vec![1, 2, 3],
            }),
        }
    }

    #[test]
    fn writes_images_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let results = vec![
            ready("home"),
            ready("nested/settings"),
            PairResult {
                name: "broken".into(),
                slot: ResultSlot::Failed("decode".into()),
            },
            PairResult {
                name: "pending".into(),
                slot: ResultSlot::Loading,
            },
        ];

        let manifest = export_results(&results, &out).unwrap();
        assert_eq!(manifest.images.len(), 2);
        assert_eq!(manifest.images[1].file, "nested_settings.png");
        assert_eq!(manifest.failed, vec![PairFailure { name: "broken".into(), reason: "decode".into() }]);
        assert_eq!(std::fs::read(out.join("home.png")).unwrap(), vec![1, 2, 3]);

        let on_disk: ExportManifest =
            serde_json::from_str(&std::fs::read_to_string(out.join(MANIFEST_FILE)).unwrap()).unwrap();
        assert_eq!(on_disk.export_id, manifest.export_id);
        assert_eq!(on_disk.images[0].width, 3);
    }

    #[test]
    fn colliding_names_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut b = ready("a_b");
        if let ResultSlot::Ready(img) = &mut b.slot {
            img.png = vec![9];
        }
        let results = vec![ready("a/b"), b, ready("a\\b"), ready("a_b-2")];

        let manifest = export_results(&results, dir.path()).unwrap();
        let files: Vec<&str> = manifest.images.iter().map(|i| i.file.as_str()).collect();
        assert_eq!(files, vec!["a_b.png", "a_b-2.png", "a_b-3.png", "a_b-2-2.png"]);
        assert_eq!(std::fs::read(dir.path().join("a_b.png")).unwrap(), vec![1, 2, 3]);
        assert_eq!(std::fs::read(dir.path().join("a_b-2.png")).unwrap(), vec![9]);
    }

    #[test]
    fn nothing_ready_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let results = vec![PairResult {
            name: "a".into(),
            slot: ResultSlot::Loading,
        }];
        assert!(matches!(
            export_results(&results, dir.path()),
            Err(HighlightError::NothingToExport)
        ));
    }
}
