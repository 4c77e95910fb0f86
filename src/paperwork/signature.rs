//! Signature image lookup.

use crate::model::RANDOM_SIGNATURE;
use rand::seq::SliceRandom;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

fn is_signature_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

fn images_in(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_signature_image(path))
        .collect()
}

/// Sorted file names of the images available in one signature slot.
pub fn list_signatures(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = images_in(dir)
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Resolves a signature reference for one slot.
///
/// `random` picks any image in `slot_dir`. Anything else is treated as a
/// path; relative paths resolve inside `slot_dir` and the result must stay
/// under `signatures_root`.
pub fn select_signature(requested: &str, slot_dir: &Path, signatures_root: &Path) -> Option<PathBuf> {
    let requested = requested.trim();
    if requested.is_empty() {
        return None;
    }

    if requested == RANDOM_SIGNATURE {
        let candidates = images_in(slot_dir);
        return candidates.choose(&mut rand::thread_rng()).cloned();
    }

    let candidate = slot_dir.join(requested);
    let resolved = candidate.canonicalize().ok()?;
    let root = signatures_root.canonicalize().ok()?;
    if !resolved.starts_with(&root) {
        tracing::warn!(
            requested,
            "signature path escapes the signatures directory; ignoring"
        );
        return None;
    }
    resolved.is_file().then_some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn signature_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let sig1 = dir.path().join("sig1");
        fs::create_dir_all(&sig1).unwrap();
        fs::write(sig1.join("b.PNG"), b"x").unwrap();
        fs::write(sig1.join("a.jpg"), b"x").unwrap();
        fs::write(sig1.join("notes.txt"), b"x").unwrap();
        fs::create_dir_all(dir.path().join("sig2")).unwrap();
        dir
    }

    #[test]
    fn lists_only_images_sorted() {
        let dir = signature_tree();
        assert_eq!(
            list_signatures(&dir.path().join("sig1")),
            vec!["a.jpg".to_string(), "b.PNG".to_string()]
        );
        assert!(list_signatures(&dir.path().join("sig2")).is_empty());
        assert!(list_signatures(&dir.path().join("missing")).is_empty());
    }

    #[test]
    fn random_picks_an_image() {
        let dir = signature_tree();
        let picked = select_signature("random", &dir.path().join("sig1"), dir.path()).unwrap();
        assert!(is_signature_image(&picked));
    }

    #[test]
    fn random_from_empty_slot_is_none() {
        let dir = signature_tree();
        assert!(select_signature("random", &dir.path().join("sig2"), dir.path()).is_none());
    }

    #[test]
    fn named_file_resolves_inside_slot() {
        let dir = signature_tree();
        let picked = select_signature("a.jpg", &dir.path().join("sig1"), dir.path()).unwrap();
        assert!(picked.ends_with("sig1/a.jpg"));
    }

    #[test]
    fn paths_outside_root_are_refused() {
        let dir = signature_tree();
        let outside = tempfile::NamedTempFile::new().unwrap();
        let requested = outside.path().to_str().unwrap();
        assert!(select_signature(requested, &dir.path().join("sig1"), dir.path()).is_none());
        assert!(select_signature("../../etc/passwd", &dir.path().join("sig1"), dir.path()).is_none());
    }

    #[test]
    fn missing_file_is_none() {
        let dir = signature_tree();
        assert!(select_signature("nobody.png", &dir.path().join("sig1"), dir.path()).is_none());
        assert!(select_signature("", &dir.path().join("sig1"), dir.path()).is_none());
    }
}
