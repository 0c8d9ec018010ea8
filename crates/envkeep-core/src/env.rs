//! Environment variable and `.env` file handling.

use std::env;
use std::path::Path;

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Interpret a string as a boolean flag.
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parse `.env` formatted content into ordered `(key, value)` pairs.
///
/// Blank lines and `#` comments are skipped, an optional `export ` prefix is
/// accepted, and one level of matching single or double quotes is stripped
/// from values. Later duplicates are kept; applying the pairs in order makes
/// the last one win.
pub fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
            .unwrap_or(value);

        pairs.push((key.to_string(), value.to_string()));
    }

    pairs
}

/// Read and parse a `.env` file.
pub fn read_dotenv(path: &Path) -> Result<Vec<(String, String)>, std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_dotenv(&content))
}
