use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

const PREFIX: &str = "dualboot-";

/// Temporary directories created during one run.
///
/// Dropping the workspace removes every directory, so early returns clean up on their own.
/// [`Workspace::close`] does the same but reports failures.
#[derive(Debug, Default)]
pub struct Workspace {
    root: Option<PathBuf>,
    dirs: Vec<TempDir>,
}

impl Workspace {
    pub fn new(root: Option<&Path>) -> Self {
        Self {
            root: root.map(Path::to_path_buf),
            dirs: Vec::new(),
        }
    }

    pub fn create_dir(&mut self) -> Result<PathBuf> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(PREFIX);
        let dir = match &self.root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .context("creating temporary directory")?;
        let path = dir.path().to_path_buf();
        debug!(path = %path.display(), "created temporary directory");
        self.dirs.push(dir);
        Ok(path)
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn close(mut self) -> Result<()> {
        let mut first_error = None;
        for dir in self.dirs.drain(..) {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                first_error.get_or_insert(
                    anyhow::Error::new(e).context(format!("removing {}", path.display())),
                );
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
