use crate::error::{ProvisionError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

const MAX_NAME_BUMPS: u64 = 1000;

/// Open `path` for writing only if it does not exist yet
pub fn create_new_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

/// Write `data` as pretty JSON into a freshly created `file` at `path`
///
/// A failed write removes the file so no truncated artifact is left behind.
pub fn write_json_into<T: Serialize>(file: File, path: &Path, data: &T) -> Result<()> {
    let written = write_pretty(file, data);
    if written.is_err() {
        let _ = fs::remove_file(path);
    }
    written
}

fn write_pretty<T: Serialize>(file: File, data: &T) -> Result<()> {
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, data)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Write `data` as pretty JSON to a file that must not exist yet
///
/// Fails with `AlreadyExists` instead of truncating a previous artifact.
pub fn write_json_new<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let file = create_new_file(path)?;
    write_json_into(file, path, data)
}

/// Write `data` to `<dir>/<prefix>_<stamp>.json`, bumping the stamp until the
/// name is free. Returns the path and the stamp actually used.
pub fn write_json_unique<T: Serialize>(
    dir: &Path,
    prefix: &str,
    stamp: u64,
    data: &T,
) -> Result<(PathBuf, u64)> {
    let mut stamp = stamp;
    for _ in 0..MAX_NAME_BUMPS {
        let path = dir.join(format!("{prefix}_{stamp}.json"));
        match create_new_file(&path) {
            Ok(file) => {
                write_json_into(file, &path, data)?;
                return Ok((path, stamp));
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => stamp += 1,
            Err(e) => return Err(e.into()),
        }
    }
    Err(ProvisionError::Io(format!(
        "No free {prefix}_*.json name in {}",
        dir.display()
    )))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
