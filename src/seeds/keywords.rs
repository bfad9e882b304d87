use crate::seeds::SeedError;
use std::collections::HashSet;
use std::path::Path;

/// Reads search keywords from a file, one per line
///
/// # Returns
///
/// * `Ok(Vec<String>)` - Keywords in file order, see [`parse_keywords`]
/// * `Err(SeedError)` - The file could not be read
pub fn load_keywords(path: &Path) -> Result<Vec<String>, SeedError> {
    let content = std::fs::read_to_string(path).map_err(|source| SeedError::Keywords {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_keywords(&content))
}

/// Parses keyword file content
///
/// Lines are trimmed; blank lines and `#` comments are skipped; repeated
/// keywords keep their first position.
pub fn parse_keywords(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| seen.insert(line.to_string()))
        .map(String::from)
        .collect()
}
