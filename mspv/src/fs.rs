//! Whole-file reads and writes that report which path failed.

use std::{
    error::Error,
    ffi::OsString,
    fmt::{Display, Error as FmtError, Formatter},
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    process,
    sync::atomic::{AtomicUsize, Ordering},
};

/// Reads a whole file into memory.
pub fn read(path: impl AsRef<Path>) -> Result<Vec<u8>, IoError> {
    let path = path.as_ref();
    fs::read(path).map_err(|err| IoError::new(IoOperation::Read, path, err))
}

/// Reads a whole file as UTF-8 text.
pub fn read_to_string(path: impl AsRef<Path>) -> Result<String, IoError> {
    let path = path.as_ref();
    fs::read_to_string(path).map_err(|err| IoError::new(IoOperation::Read, path, err))
}

/// Writes `data` to `path` so that `path` either keeps its previous content or holds all of
/// `data`, never a prefix of it.
///
/// Missing parent directories are created. The data is written to a temporary file next to
/// `path`, named after the process and the call so that concurrent writers never share one, and
/// then renamed over `path`. If anything fails, the temporary file is removed.
pub fn write_atomic(path: impl AsRef<Path>, data: &[u8]) -> Result<(), IoError> {
    static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

    let path = path.as_ref();

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        create_dir_all(parent)?;
    }

    let tmp_path = sibling_path(
        path,
        &format!(
            ".{}-{}.tmp",
            process::id(),
            NEXT_ID.fetch_add(1, Ordering::Relaxed),
        ),
    );

    let result = write_and_sync(&tmp_path, data).and_then(|()| {
        fs::rename(&tmp_path, path).map_err(|err| IoError::new(IoOperation::Rename, path, err))
    });

    if result.is_err() {
        remove_if_exists(&tmp_path);
    } else {
        log::debug!("wrote {} bytes to {}", data.len(), path.display());
    }

    result
}

fn write_and_sync(path: &Path, data: &[u8]) -> Result<(), IoError> {
    let mut file =
        File::create(path).map_err(|err| IoError::new(IoOperation::Write, path, err))?;
    file.write_all(data)
        .and_then(|()| file.sync_all())
        .map_err(|err| IoError::new(IoOperation::Write, path, err))
}

/// Creates `path` and all of its missing parents.
pub fn create_dir_all(path: impl AsRef<Path>) -> Result<(), IoError> {
    let path = path.as_ref();
    fs::create_dir_all(path).map_err(|err| IoError::new(IoOperation::CreateDir, path, err))
}

/// Removes a file, ignoring a file that's already gone. Other failures are logged, since this is
/// only used to clean up scratch files.
pub(crate) fn remove_if_exists(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => log::warn!("{}", IoError::new(IoOperation::Remove, path, err)),
    }
}

/// Returns `path` with `suffix` appended to its file name.
pub(crate) fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(ToOwned::to_owned)
        .unwrap_or_else(OsString::new);
    name.push(suffix);

    path.with_file_name(name)
}

/// What was being done with a file when an [`IoError`] happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IoOperation {
    Read,
    Write,
    Rename,
    Remove,
    CreateDir,
    /// Running the file as a program.
    Execute,
}

/// Error that can happen when reading or writing a file.
#[derive(Debug)]
pub struct IoError {
    pub operation: IoOperation,
    pub path: PathBuf,
    pub source: io::Error,
}

impl IoError {
    pub fn new(operation: IoOperation, path: impl Into<PathBuf>, source: io::Error) -> Self {
        IoError {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Returns the kind of the underlying I/O error.
    #[inline]
    pub fn kind(&self) -> io::ErrorKind {
        self.source.kind()
    }
}

impl Error for IoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

impl Display for IoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        let action = match self.operation {
            IoOperation::Read => "read",
            IoOperation::Write => "write",
            IoOperation::Rename => "move a finished file to",
            IoOperation::Remove => "remove",
            IoOperation::CreateDir => "create the directory",
            IoOperation::Execute => "run",
        };

        write!(f, "failed to {} `{}`", action, self.path.display())
    }
}
