use crate::storage::ArchiveItem;
use std::fs;
use std::io;
use std::path::PathBuf;
use tabled::settings::Style;
use tabled::Table;

/// Expands `~` and `$VAR` in a configured directory, canonicalizing it when it
/// already exists.
pub fn resolve_path(raw: &str) -> Result<PathBuf, String> {
    let expanded = shellexpand::full(raw)
        .map_err(|e| format!("Could not expand {}: {}", raw, e))?;
    let path = PathBuf::from(expanded.into_owned());

    match fs::canonicalize(&path) {
        Ok(canonical) => Ok(canonical),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(path),
        Err(e) => Err(format!("Could not canonicalize {}: {}", path.display(), e)),
    }
}

pub fn render_archives(items: &[ArchiveItem]) -> String {
    if items.is_empty() {
        return "No archives found".to_string();
    }
    Table::new(items).with(Style::modern()).to_string()
}
