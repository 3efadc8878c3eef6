//! Asset directory enumeration

use std::fs;
use std::path::Path;

use crate::errors::{Result, SessionError};
use crate::types::{Gender, Slot};

/// Parse `{gender}_{slot}_{n}.png` into its gender and slot.
///
/// Logo artwork and names that do not split into exactly three parts are
/// not outfit assets.
pub fn parse_asset_name(name: &str) -> Option<(Gender, Slot)> {
    if name.contains("Logo") {
        return None;
    }
    let stem = name.strip_suffix(".png")?;
    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() != 3 {
        return None;
    }
    let gender = parts[0].parse::<Gender>().ok()?;
    let slot = parts[1].parse::<Slot>().ok()?;
    Some((gender, slot))
}

/// Names of the `.png` files directly inside `dir`
pub(crate) fn list_png_files(dir: &Path) -> Result<Vec<String>> {
    let to_error = |source: std::io::Error| SessionError::CatalogLoad {
        path: dir.display().to_string(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(to_error)? {
        let entry = entry.map_err(to_error)?;
        if !entry.file_type().map_err(to_error)?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if name.ends_with(".png") {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}
