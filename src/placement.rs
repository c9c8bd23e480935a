//! Result placement and conflict resolution.
//!
//! Winning files are copied under a results root that mirrors each
//! original's absolute path:
//!
//! ```text
//! /home/ann/site/img/logo.gif   ──▶   <work_dir>/final/home/ann/site/img/logo.png
//! ```
//!
//! Placement never overwrites. The destination is opened with create-new
//! semantics, so when two work items race for the same path the first
//! writer wins and the others abstain with `None`. For a type change the
//! placer also abstains when a file with the new extension already sits
//! next to the original, since copying the result back would shadow it.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Placement {
    root: PathBuf,
}

impl Placement {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where `original` lands under the results root.
    pub fn destination(&self, original: &Path) -> io::Result<PathBuf> {
        let absolute = std::path::absolute(original)?;
        let relative: PathBuf = absolute
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect();
        Ok(self.root.join(relative))
    }

    /// Copy `winning` to the mirrored destination of `original`.
    ///
    /// Returns `Ok(None)` when the destination (or, on a type change, a
    /// sibling of the original) already exists. Existing files are never
    /// modified.
    pub fn place(
        &self,
        original: &Path,
        winning: &Path,
        file_type_changed: bool,
    ) -> io::Result<Option<PathBuf>> {
        let mut destination = self.destination(original)?;
        if file_type_changed {
            let extension = winning.extension().unwrap_or_default();
            destination.set_extension(extension);
            let sibling = original.with_extension(extension);
            if sibling.exists() {
                warn!(
                    original = %original.display(),
                    sibling = %sibling.display(),
                    "a file with the new extension already exists next to the original, not placing"
                );
                return Ok(None);
            }
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut target = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&destination)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                warn!(destination = %destination.display(), "destination already exists, not placing");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let copied = File::open(winning).and_then(|mut source| io::copy(&mut source, &mut target));
        if let Err(e) = copied {
            drop(target);
            let _ = fs::remove_file(&destination);
            return Err(e);
        }
        Ok(Some(destination))
    }
}
