use std::path::Path;

use crate::alloc::*;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Empty cells count as no experience. Spreadsheets may hold whole numbers as floats.
pub fn parse_experience(cell: &str, lineno: usize) -> AllocResult<u32> {
    let s = cell.trim();
    if s.is_empty() {
        return Ok(0);
    }
    if let Ok(x) = s.parse::<u32>() {
        return Ok(x);
    }
    match s.parse::<f64>() {
        Ok(f) if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => Ok(f as u32),
        _ => InvalidExperienceSnafu {
            lineno,
            content: s.to_string(),
        }
        .fail(),
    }
}

/// The stated preferences, in order. Blank cells are skipped.
pub fn assemble_preferences<'a>(cells: impl Iterator<Item = &'a str>) -> Vec<String> {
    cells
        .take(MAX_PREFERENCES)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

pub fn non_empty(cell: Option<&str>) -> Option<String> {
    cell.map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}
