//! On-disk storage of uploaded files

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use crate::wf::error::StoreError;

/// Writes uploads into one directory
///
/// Only the last path component of the client's filename is used. Inside a
/// batch, a name that was already stored gets a ` (n)` suffix instead of
/// overwriting the earlier file; across batches the newest upload wins.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

/// Names stored so far in the current batch
#[derive(Debug, Default)]
pub struct BatchNames {
    taken: HashSet<String>,
}

impl UploadStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })
    }

    /// Write the upload, returning where it landed and its size on disk
    pub fn store(&self, names: &mut BatchNames, filename: &str, bytes: &[u8]) -> Result<(PathBuf, u64), StoreError> {
        let name = names.claim(sanitize(filename)?);
        let path = self.dir.join(name);
        let io_err = |source: std::io::Error| StoreError::Io { path: path.clone(), source };

        self.ensure_dir()?;
        fs::write(&path, bytes).map_err(io_err)?;
        let size = fs::metadata(&path).map_err(io_err)?.len();
        Ok((path, size))
    }
}

impl BatchNames {
    fn claim(&mut self, name: String) -> String {
        if self.taken.insert(name.clone()) {
            return name;
        }
        let (stem, extension) = match name.rfind('.') {
            Some(dot) if dot > 0 => (&name[..dot], &name[dot..]),
            _ => (name.as_str(), ""),
        };
        let mut n = 1;
        loop {
            let candidate = format!("{} ({}){}", stem, n, extension);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Reduce a client-supplied name to a bare file name
fn sanitize(filename: &str) -> Result<String, StoreError> {
    let invalid = || StoreError::InvalidFilename(filename.to_string());
    // Clients on Windows send backslashes
    let last = filename.rsplit(['/', '\\']).next().ok_or_else(invalid)?.trim();
    if last.is_empty() || last == "." || last == ".." {
        return Err(invalid());
    }
    Ok(last.to_string())
}
