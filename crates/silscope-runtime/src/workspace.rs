//! Request-scoped scratch workspace.
//!
//! One fresh private directory per request holding the materialized source
//! and whatever the toolchain writes next to it. The directory is removed
//! when the workspace is dropped, so every exit path of a request (normal
//! completion, validation after creation, cancellation) reclaims it.
//! [`ScratchWorkspace::close`] removes it eagerly and reports failures.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use silscope_core::stages::SOURCE_FILE_NAME;
use tempfile::TempDir;

const WORKSPACE_PREFIX: &str = "silscope-";

#[derive(Debug)]
pub struct ScratchWorkspace {
    dir: TempDir,
    source_path: PathBuf,
}

impl ScratchWorkspace {
    /// Create a workspace under `scratch_root` (or the system temp directory)
    /// and write `source` into it.
    pub fn create(scratch_root: Option<&Path>, source: &str) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let dir = match scratch_root {
            Some(root) => {
                fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };

        let source_path = dir.path().join(SOURCE_FILE_NAME);
        fs::write(&source_path, source)?;
        Ok(Self { dir, source_path })
    }

    /// Directory the stages run in.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Remove the workspace now, surfacing any cleanup error.
    pub fn close(self) -> io::Result<()> {
        self.dir.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn materializes_source_under_fixed_name() {
        let root = tempfile::tempdir().unwrap();
        let workspace = ScratchWorkspace::create(Some(root.path()), "print(1)\n").unwrap();
        assert!(workspace.path().starts_with(root.path()));
        assert_eq!(workspace.source_path(), workspace.path().join("main.swift"));
        assert_eq!(
            fs::read_to_string(workspace.source_path()).unwrap(),
            "print(1)\n"
        );
    }

    #[test]
    fn close_removes_everything() {
        let root = tempfile::tempdir().unwrap();
        let workspace = ScratchWorkspace::create(Some(root.path()), "let x = 1").unwrap();
        let path = workspace.path().to_path_buf();
        fs::write(path.join("main.o"), b"\x7fELF").unwrap();

        workspace.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn drop_removes_everything() {
        let workspace = ScratchWorkspace::create(None, "let x = 1").unwrap();
        let path = workspace.path().to_path_buf();
        assert!(path.exists());
        drop(workspace);
        assert!(!path.exists());
    }

    #[test]
    fn workspaces_are_never_shared() {
        let root = tempfile::tempdir().unwrap();
        let a = ScratchWorkspace::create(Some(root.path()), "a").unwrap();
        let b = ScratchWorkspace::create(Some(root.path()), "b").unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn creates_missing_scratch_root() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("var").join("silscope");
        let workspace = ScratchWorkspace::create(Some(&nested), "a").unwrap();
        assert!(workspace.path().starts_with(&nested));
    }
}
