/// State file IO.
///
/// Saves are atomic: the new JSON goes to `<file>.tmp` and is renamed over the
/// old file, which is first copied to `<file>.bak`.
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tierpick_core::EngineState;

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

pub fn backup_path(path: &Path) -> PathBuf {
    with_suffix(path, ".bak")
}

/// Reads a state file. `Ok(None)` if it does not exist yet.
pub fn load_state(path: &Path) -> io::Result<Option<EngineState>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

pub fn save_state(path: &Path, state: &EngineState) -> io::Result<()> {
    let bytes = serde_json::to_vec_pretty(state)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = with_suffix(path, ".tmp");
    fs::write(&tmp_path, bytes)?;
    if path.exists() {
        fs::copy(path, backup_path(path))?;
    }
    fs::rename(&tmp_path, path)?;
    log::debug!("saved state to {} (round {})", path.display(), state.round_index);
    Ok(())
}
