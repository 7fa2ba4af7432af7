use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const IMPACT_DIR: &str = ".impact";
pub const CONFIG_FILE: &str = ".impact/config.yaml";
pub const DB_FILE: &str = ".impact/impact.db";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn impact_dir(root: &Path) -> PathBuf {
    root.join(IMPACT_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Resolve a configured path against the project root. Absolute paths are
/// returned unchanged.
pub fn resolve(root: &Path, configured: &Path) -> PathBuf {
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        root.join(configured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_under_impact_dir() {
        let root = Path::new("/srv/impact");
        assert_eq!(
            config_path(root),
            PathBuf::from("/srv/impact/.impact/config.yaml")
        );
    }

    #[test]
    fn resolve_keeps_absolute_paths() {
        let root = Path::new("/srv/impact");
        assert_eq!(
            resolve(root, Path::new("/var/lib/impact.db")),
            PathBuf::from("/var/lib/impact.db")
        );
        assert_eq!(
            resolve(root, Path::new(DB_FILE)),
            PathBuf::from("/srv/impact/.impact/impact.db")
        );
    }
}
