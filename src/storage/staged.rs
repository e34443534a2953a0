use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// A file that only appears at its final path once `commit` succeeds.
///
/// Bytes go to a hidden sibling (`.<name>.partial`) in the same directory so
/// that the final `rename` stays on one filesystem. Dropping an uncommitted
/// file removes the partial copy.
#[derive(Debug)]
pub struct StagedFile {
    final_path: PathBuf,
    partial_path: PathBuf,
    file: Option<File>,
}

impl StagedFile {
    pub fn create(final_path: &Path) -> io::Result<Self> {
        let partial_path = partial_path_for(final_path)?;

        if let Some(parent) = final_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&partial_path)
            .map_err(|e| {
                io::Error::new(
                    e.kind(),
                    format!("failed to create '{}': {}", partial_path.display(), e),
                )
            })?;

        Ok(Self {
            final_path: final_path.to_path_buf(),
            partial_path,
            file: Some(file),
        })
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    pub fn partial_path(&self) -> &Path {
        &self.partial_path
    }

    /// Flush to disk and atomically move the file into place.
    pub fn commit(mut self) -> io::Result<PathBuf> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
            file.sync_all()?;
        }
        fs::rename(&self.partial_path, &self.final_path).map_err(|e| {
            let _ = fs::remove_file(&self.partial_path);
            io::Error::new(
                e.kind(),
                format!(
                    "failed to publish '{}' as '{}': {}",
                    self.partial_path.display(),
                    self.final_path.display(),
                    e
                ),
            )
        })?;
        Ok(self.final_path.clone())
    }

    fn file_mut(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "staged file already closed"))
    }
}

impl Write for StagedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file_mut()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file_mut()?.flush()
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.file.take().is_some() {
            if let Err(e) = fs::remove_file(&self.partial_path) {
                tracing::warn!(
                    path = %self.partial_path.display(),
                    error = %e,
                    "Failed to remove uncommitted partial file"
                );
            }
        }
    }
}

fn partial_path_for(final_path: &Path) -> io::Result<PathBuf> {
    let name = final_path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("output path '{}' has no file name", final_path.display()),
        )
    })?;
    Ok(final_path.with_file_name(format!(".{}.partial", name.to_string_lossy())))
}
