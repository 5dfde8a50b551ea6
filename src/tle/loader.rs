use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::tle::error::LoadError;
use crate::tle::types::TleSource;

/// Reads TLE files from a directory and groups them by constellation.
///
/// The constellation is the lower-cased file-stem prefix before the first
/// `_` or `-`, so `starlink_20240409.tle` lands under `starlink`.
pub struct TleLoader {
    tle_dir: PathBuf,
}

impl TleLoader {
    pub fn new(tle_dir: PathBuf) -> Self {
        Self { tle_dir }
    }

    /// Load all `.tle` / `.txt` files, in file-name order.
    pub fn load_all(&self) -> Result<BTreeMap<String, Vec<TleSource>>, LoadError> {
        if !self.tle_dir.exists() {
            return Err(LoadError::DirectoryNotFound(
                self.tle_dir.display().to_string(),
            ));
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.tle_dir)? {
            let path = entry?.path();
            if path.is_file() && has_tle_extension(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut grouped: BTreeMap<String, Vec<TleSource>> = BTreeMap::new();
        for path in paths {
            let Some(constellation) = constellation_of(&path) else {
                log::warn!("Skipping TLE file without a usable name: {}", path.display());
                continue;
            };
            let text = fs::read_to_string(&path)?;
            let name = path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();
            log::debug!("Loaded {} for constellation {}", name, constellation);
            grouped
                .entry(constellation)
                .or_default()
                .push(TleSource::new(name, text));
        }

        Ok(grouped)
    }
}

fn has_tle_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == "tle" || ext == "txt")
        .unwrap_or(false)
}

fn constellation_of(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let prefix = stem.split(['_', '-']).next()?.trim();
    if prefix.is_empty() {
        None
    } else {
        Some(prefix.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_groups_files_by_prefix() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("starlink_20240409.tle"), "a").unwrap();
        fs::write(dir.path().join("Starlink-extra.txt"), "b").unwrap();
        fs::write(dir.path().join("oneweb.tle"), "c").unwrap();
        fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let loaded = TleLoader::new(dir.path().to_path_buf()).load_all().unwrap();

        assert_eq!(loaded.keys().collect::<Vec<_>>(), vec!["oneweb", "starlink"]);
        let starlink: Vec<&str> = loaded["starlink"].iter().map(|s| s.name.as_str()).collect();
        assert_eq!(starlink, vec!["Starlink-extra.txt", "starlink_20240409.tle"]);
        assert_eq!(loaded["oneweb"][0].text, "c");
    }

    #[test]
    fn test_missing_directory() {
        let loader = TleLoader::new(PathBuf::from("/definitely/not/here"));
        assert!(matches!(
            loader.load_all(),
            Err(LoadError::DirectoryNotFound(_))
        ));
    }
}
