//! Batch decoding
//!
//! Finds asset files under a directory and decodes them in parallel. Each
//! file is handled independently: one malformed file is logged and counted,
//! the rest carry on.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::Result;
use crate::formats::{self, Asset, AssetKind};

/// Extensions searched when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &["aqp", "aqo", "trp", "trn", "afp", "bin", "njm"];

/// Options for finding and processing asset files.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// File extensions to include, compared case-insensitively.
    pub extensions: Vec<String>,
    /// Re-encode each decoded file and check it decodes to the same asset.
    pub verify: bool,
    pub follow_symlinks: bool,
    pub max_depth: Option<usize>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().copied().map(String::from).collect(),
            verify: false,
            follow_symlinks: true,
            max_depth: None,
        }
    }
}

impl BatchOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the extension filter.
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .is_some_and(|ext| self.extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
    }
}

/// Progress information during a batch run
#[derive(Debug, Clone)]
pub struct BatchProgress {
    /// Current item number (1-indexed)
    pub current: usize,
    pub total: usize,
    pub current_file: Option<String>,
}

impl BatchProgress {
    #[must_use]
    pub fn new(current: usize, total: usize) -> Self {
        Self {
            current,
            total,
            current_file: None,
        }
    }

    #[must_use]
    pub fn with_file(current: usize, total: usize, file: impl Into<String>) -> Self {
        Self {
            current,
            total,
            current_file: Some(file.into()),
        }
    }

    /// Get the progress percentage (0.0 - 1.0)
    #[must_use]
    pub fn percentage(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.current as f32 / self.total as f32
        }
    }
}

/// What happened to one file.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub path: PathBuf,
    /// Detected kind, when decoding succeeded.
    pub kind: Option<AssetKind>,
    /// Error message, when it did not.
    pub error: Option<String>,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of a batch run
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub success_count: usize,
    pub fail_count: usize,
    /// One outcome per input file, in input order.
    pub outcomes: Vec<FileOutcome>,
}

/// Find asset files under `dir`, sorted.
pub fn find_asset_files<P: AsRef<Path>>(dir: P, options: &BatchOptions) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(dir).follow_links(options.follow_symlinks);
    if let Some(depth) = options.max_depth {
        walker = walker.max_depth(depth);
    }

    let mut files: Vec<_> = walker
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.path().is_file() && options.matches(e.path()))
        .map(|e| e.path().to_path_buf())
        .collect();

    files.sort();
    files
}

/// Decode one file, optionally verifying it re-encodes faithfully.
pub fn process_file(path: &Path, verify: bool) -> Result<AssetKind> {
    let data = std::fs::read(path)?;
    if verify {
        let (asset, _) = formats::round_trip(&data)?;
        Ok(asset.kind())
    } else {
        Ok(Asset::decode(&data)?.kind())
    }
}

/// Decode `files` in parallel.
///
/// `progress` is called once per file as it starts, from worker threads.
pub fn batch_process<F>(files: &[PathBuf], options: &BatchOptions, progress: F) -> BatchResult
where
    F: Fn(&BatchProgress) + Send + Sync,
{
    let success_counter = AtomicUsize::new(0);
    let fail_counter = AtomicUsize::new(0);
    let processed = AtomicUsize::new(0);
    let total = files.len();

    let outcomes: Vec<FileOutcome> = files
        .par_iter()
        .map(|path| {
            let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
            progress(&BatchProgress::with_file(current, total, path.to_string_lossy()));

            match process_file(path, options.verify) {
                Ok(kind) => {
                    success_counter.fetch_add(1, Ordering::SeqCst);
                    debug!("{}: {kind}", path.display());
                    FileOutcome {
                        path: path.clone(),
                        kind: Some(kind),
                        error: None,
                    }
                }
                Err(e) => {
                    fail_counter.fetch_add(1, Ordering::SeqCst);
                    warn!(category = ?e.category(), "{}: {e}", path.display());
                    FileOutcome {
                        path: path.clone(),
                        kind: None,
                        error: Some(e.to_string()),
                    }
                }
            }
        })
        .collect();

    BatchResult {
        success_count: success_counter.load(Ordering::SeqCst),
        fail_count: fail_counter.load(Ordering::SeqCst),
        outcomes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::event::{serialize_event, EventContainer, EventFile, Payload, Script};
    use crate::formats::model::{serialize_model, FaceSet, Model, Topology, VertexSet};
    use glam::Vec3;
    use tempfile::TempDir;

    fn model_bytes() -> Vec<u8> {
        let model = Model {
            vertex_sets: vec![VertexSet::from_positions(vec![Vec3::ZERO, Vec3::X, Vec3::Y])],
            face_sets: vec![FaceSet {
                topology: Topology::TriangleList,
                indices: vec![0, 1, 2],
            }],
            ..Model::default()
        };
        serialize_model(&model).unwrap()
    }

    fn event_bytes() -> Vec<u8> {
        serialize_event(&EventFile {
            containers: vec![EventContainer {
                scripts: vec![Script::new("set_bgm", Payload::Short(3)).unwrap()],
                ..EventContainer::default()
            }],
        })
        .unwrap()
    }

    #[test]
    fn test_find_asset_files_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("b.AQP"), b"").unwrap();
        std::fs::write(dir.path().join("a.bin"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();
        std::fs::write(dir.path().join("sub/c.trp"), b"").unwrap();

        let files = find_asset_files(dir.path(), &BatchOptions::default());
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a.bin", "b.AQP", "sub/c.trp"]);

        let shallow = find_asset_files(dir.path(), &BatchOptions::new().with_max_depth(1));
        assert_eq!(shallow.len(), 2);

        let only_bin = find_asset_files(dir.path(), &BatchOptions::new().with_extensions(["bin"]));
        assert_eq!(only_bin.len(), 1);
    }

    #[test]
    fn test_batch_isolates_failures() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("good.aqo"), model_bytes()).unwrap();
        std::fs::write(dir.path().join("event.bin"), event_bytes()).unwrap();
        let mut truncated = model_bytes();
        truncated.truncate(0x30);
        std::fs::write(dir.path().join("broken.aqo"), truncated).unwrap();

        let options = BatchOptions::new().with_verify(true);
        let files = find_asset_files(dir.path(), &options);
        let calls = AtomicUsize::new(0);
        let result = batch_process(&files, &options, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.success_count, 2);
        assert_eq!(result.fail_count, 1);
        // Input order is preserved: broken, event, good.
        assert!(!result.outcomes[0].is_success());
        assert_eq!(result.outcomes[1].kind, Some(AssetKind::Event));
        assert_eq!(result.outcomes[2].kind, Some(AssetKind::Model));
    }

    #[test]
    fn test_progress_percentage() {
        assert!((BatchProgress::new(1, 4).percentage() - 0.25).abs() < f32::EPSILON);
        assert!((BatchProgress::new(0, 0).percentage() - 1.0).abs() < f32::EPSILON);
    }
}
