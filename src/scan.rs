//! Input discovery for the CLI.
//!
//! Paths given on the command line may be files or directories.
//! Directories are walked recursively with `walkdir`. Every candidate with
//! a PNG, GIF or JPEG extension is sniffed: the leading bytes must agree
//! with the extension, otherwise the file is skipped with a warning. Empty
//! files are skipped silently.
//!
//! The result is deduplicated and sorted, ready for
//! [`Optimizer::optimize_all`](crate::batch::Optimizer::optimize_all).

use crate::types::ImageKind;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Path does not exist: {0}")]
    NotFound(PathBuf),
    #[error("Failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),
}

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const GIF_SIGNATURE: &[u8] = b"GIF8";
const JPEG_SIGNATURE: &[u8] = b"\xFF\xD8\xFF";

/// Collect optimizable images under `paths`.
pub fn discover(paths: &[PathBuf]) -> Result<Vec<PathBuf>, ScanError> {
    let mut found = BTreeSet::new();
    for path in paths {
        if !path.exists() {
            return Err(ScanError::NotFound(path.clone()));
        }
        if path.is_dir() {
            for entry in WalkDir::new(path).follow_links(true) {
                let entry = entry?;
                if entry.file_type().is_file() {
                    consider(entry.path(), &mut found)?;
                }
            }
        } else {
            consider(path, &mut found)?;
        }
    }
    debug!(count = found.len(), "discovered images");
    Ok(found.into_iter().collect())
}

fn consider(path: &Path, found: &mut BTreeSet<PathBuf>) -> Result<(), ScanError> {
    let Some(kind) = ImageKind::from_path(path).filter(|k| k.is_optimizable()) else {
        return Ok(());
    };
    match sniff(path)? {
        Content::Empty => {}
        Content::Image(actual) if actual == kind => {
            found.insert(path.to_path_buf());
        }
        content => warn!(
            file = %path.display(),
            extension = %kind,
            ?content,
            "content does not match extension, skipping"
        ),
    }
    Ok(())
}

/// What a file's leading bytes say it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Content {
    Empty,
    Image(ImageKind),
    Unknown,
}

/// Identify a file by its leading bytes.
pub fn sniff(path: &Path) -> io::Result<Content> {
    let mut head = [0u8; 8];
    let mut file = File::open(path)?;
    let mut len = 0;
    while len < head.len() {
        let n = file.read(&mut head[len..])?;
        if n == 0 {
            break;
        }
        len += n;
    }
    Ok(classify(&head[..len]))
}

fn classify(head: &[u8]) -> Content {
    if head.is_empty() {
        Content::Empty
    } else if head.starts_with(PNG_SIGNATURE) {
        Content::Image(ImageKind::Png)
    } else if head.starts_with(GIF_SIGNATURE) {
        Content::Image(ImageKind::Gif)
    } else if head.starts_with(JPEG_SIGNATURE) {
        Content::Image(ImageKind::Jpeg)
    } else {
        Content::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn classify_signatures() {
        assert_eq!(classify(b"\x89PNG\r\n\x1a\n...."), Content::Image(ImageKind::Png));
        assert_eq!(classify(b"GIF89a"), Content::Image(ImageKind::Gif));
        assert_eq!(classify(b"GIF87a"), Content::Image(ImageKind::Gif));
        assert_eq!(classify(b"\xFF\xD8\xFF\xE0"), Content::Image(ImageKind::Jpeg));
        assert_eq!(classify(b""), Content::Empty);
        assert_eq!(classify(b"hello"), Content::Unknown);
    }

    #[test]
    fn walks_directories_and_sorts() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        write_png(&nested.join("z.png"), &checkerboard(2, 2), 0);
        write_gif(&tmp.path().join("m.GIF"), &checkerboard(2, 2), 0);
        write_jpeg(&tmp.path().join("a/photo.jpeg"), 4, 4, 0);
        fs::write(tmp.path().join("notes.txt"), "hi").unwrap();

        let found = discover(&[tmp.path().to_path_buf()]).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(tmp.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a/b/z.png"),
                PathBuf::from("a/photo.jpeg"),
                PathBuf::from("m.GIF"),
            ]
        );
    }

    #[test]
    fn deduplicates_overlapping_inputs() {
        let tmp = TempDir::new().unwrap();
        let png = tmp.path().join("x.png");
        write_png(&png, &checkerboard(2, 2), 0);
        let found = discover(&[tmp.path().to_path_buf(), png.clone()]).unwrap();
        assert_eq!(found, vec![png]);
    }

    #[test]
    fn mismatched_and_empty_files_are_skipped() {
        let tmp = TempDir::new().unwrap();
        write_png(&tmp.path().join("really-png.gif"), &checkerboard(2, 2), 0);
        fs::write(tmp.path().join("empty.png"), b"").unwrap();
        fs::write(tmp.path().join("text.jpg"), b"not a jpeg").unwrap();
        assert!(discover(&[tmp.path().to_path_buf()]).unwrap().is_empty());
    }

    #[test]
    fn missing_path_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = discover(&[tmp.path().join("gone")]).unwrap_err();
        assert!(matches!(err, ScanError::NotFound(_)));
    }

    #[test]
    fn explicit_file_with_other_extension_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let txt = tmp.path().join("readme.txt");
        fs::write(&txt, "x").unwrap();
        assert!(discover(&[txt]).unwrap().is_empty());
    }
}
