//! Snapshot load/dump

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::config::DumpStrategy;
use crate::error::{Result, SnapError};
use crate::store::Records;

/// Encode records as a flat JSON object with sorted keys
pub fn encode(records: &Records) -> Result<Vec<u8>> {
    let sorted: BTreeMap<&str, &str> = records
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    let json = serde_json::to_string(&sorted)?;
    Ok(escape_html_chars(&json).into_bytes())
}

/// Decode a flat JSON object of string values.
///
/// `null` and non-string values are rejected.
pub fn decode(bytes: &[u8]) -> Result<Records> {
    let parsed: Option<Records> = serde_json::from_slice(bytes)?;
    parsed.ok_or_else(|| SnapError::Serialization("expected a JSON object, got null".to_string()))
}

/// Load the snapshot at `path`.
///
/// Never fails: an absent, unreadable or undecodable file yields an empty
/// mapping.
pub fn load(path: &Path) -> Records {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!("No snapshot at {}, starting empty", path.display());
            return Records::new();
        }
        Err(e) => {
            tracing::warn!("Could not read snapshot {}: {}", path.display(), e);
            return Records::new();
        }
    };

    match decode(&content) {
        Ok(records) => {
            tracing::info!("Loaded {} records from {}", records.len(), path.display());
            records
        }
        Err(e) => {
            tracing::warn!(
                "Snapshot {} is not a valid record object ({}), starting empty",
                path.display(),
                e
            );
            Records::new()
        }
    }
}

/// Rewrite the snapshot at `path` with the whole mapping
pub fn dump(path: &Path, records: &Records, strategy: DumpStrategy) -> Result<()> {
    let bytes = encode(records)?;

    match strategy {
        DumpStrategy::Truncate => write_file(path, &bytes),
        DumpStrategy::AtomicRename => {
            let tmp_path = tmp_path_for(path);
            write_file(&tmp_path, &bytes)?;
            fs::rename(&tmp_path, path)?;
            Ok(())
        }
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("database.json"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// These characters only ever appear inside JSON strings, so a plain
/// character substitution is safe.
fn escape_html_chars(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(c),
        }
    }
    out
}
