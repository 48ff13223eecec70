use std::fs;
use std::path::{Path, PathBuf};

use ghpi_domain::is_package_file;

use crate::RelayError;

/// Regular files in `dir` with a recognised package suffix, sorted by name.
pub fn collect_package_files(dir: &Path) -> Result<Vec<PathBuf>, RelayError> {
    let entries = fs::read_dir(dir).map_err(|err| RelayError::io("read", dir, err))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|err| RelayError::io("read", dir, err))?.path();
        if path.is_file() && is_package_file(&path) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
