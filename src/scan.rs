use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::models::Candidate;

const MATROSKA_EXTENSIONS: &[&str] = &["mka", "mkv", "mk3d"];

/// Check if a path has a Matroska file extension.
pub fn is_matroska_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| MATROSKA_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Audio-only containers are expected to carry at least one audio track.
pub fn expects_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("mka"))
        .unwrap_or(false)
}

fn candidate(path: PathBuf, size: u64, min_size: u64) -> Option<Candidate> {
    if size < min_size {
        tracing::info!(
            "Skipping {}, {} bytes is below the minimum size of {} bytes",
            path.display(),
            size,
            min_size
        );
        return None;
    }
    Some(Candidate { path, size })
}

/// Lazily enumerate candidates under each root.
///
/// Directories are walked recursively, files are taken as given. Only
/// Matroska extensions at or above `min_size` bytes are yielded.
pub fn candidates(roots: &[PathBuf], min_size: u64) -> impl Iterator<Item = Candidate> + '_ {
    roots.iter().flat_map(move |root| -> Box<dyn Iterator<Item = Candidate>> {
        if root.is_dir() {
            Box::new(
                WalkDir::new(root)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(|entry| match entry {
                        Ok(entry) => Some(entry),
                        Err(e) => {
                            tracing::warn!("Could not read directory entry: {}", e);
                            None
                        }
                    })
                    .filter(|entry| entry.path().is_file() && is_matroska_file(entry.path()))
                    .filter_map(move |entry| {
                        // Follows symlinks, unlike `DirEntry::metadata`.
                        let size = std::fs::metadata(entry.path()).map(|m| m.len()).unwrap_or(0);
                        candidate(entry.into_path(), size, min_size)
                    }),
            )
        } else if root.is_file() {
            if !is_matroska_file(root) {
                tracing::info!("Skipping {}, not a matroska file extension", root.display());
                return Box::new(std::iter::empty());
            }
            let size = std::fs::metadata(root).map(|m| m.len()).unwrap_or(0);
            Box::new(candidate(root.clone(), size, min_size).into_iter())
        } else {
            tracing::warn!("This does not look like a valid path: {}", root.display());
            Box::new(std::iter::empty())
        }
    })
}
