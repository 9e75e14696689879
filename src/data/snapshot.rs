//! World Snapshot Module
//! Saves the loaded towers to JSON so later runs skip the CSV ingest.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::loader::{DoveLoader, LoaderError};
use crate::config::Settings;
use crate::model::{Tower, World};

pub const SNAPSHOT_FILE: &str = "Bellpedia_All.json";
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Snapshot I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Snapshot {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Snapshot version {found} is not supported (expected {expected})", expected = SNAPSHOT_VERSION)]
    Version { found: u32 },
    #[error(transparent)]
    Loader(#[from] LoaderError),
}

#[derive(Deserialize)]
struct Snapshot {
    version: u32,
    towers: Vec<Tower>,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    towers: &'a [Tower],
}

/// Write `towers` to `path`, overwriting any existing snapshot.
pub fn save(path: &Path, towers: &[Tower]) -> Result<(), SnapshotError> {
    let io_err = |source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = File::create(path).map_err(io_err)?;
    let snapshot = SnapshotRef {
        version: SNAPSHOT_VERSION,
        towers,
    };
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &snapshot).map_err(|source| SnapshotError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(io_err)?;
    log::info!("Saved {} towers to {}", towers.len(), path.display());
    Ok(())
}

pub fn load(path: &Path) -> Result<Vec<Tower>, SnapshotError> {
    let file = File::open(path).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let snapshot: Snapshot =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| SnapshotError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::Version {
            found: snapshot.version,
        });
    }
    log::info!("Loaded {} towers from {}", snapshot.towers.len(), path.display());
    Ok(snapshot.towers)
}

/// Produces the [`World`] either from the Dove CSVs or from the snapshot.
pub struct WorldLoader<'a> {
    settings: &'a Settings,
}

impl<'a> WorldLoader<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.settings.snapshot_dir().join(SNAPSHOT_FILE)
    }

    /// Rebuild from CSV when `dove_data_refresh` is set, else read the snapshot.
    pub fn generate(&self) -> Result<World, SnapshotError> {
        self.generate_with(self.settings.dove_refresh)
    }

    pub fn generate_with(&self, refresh: bool) -> Result<World, SnapshotError> {
        let towers = if refresh {
            let towers = self.from_dove()?;
            save(&self.snapshot_path(), &towers)?;
            towers
        } else {
            load(&self.snapshot_path())?
        };
        Ok(World::new(towers))
    }

    pub fn from_dove(&self) -> Result<Vec<Tower>, SnapshotError> {
        let dove_dir = self.settings.dove_dir();
        log::info!("Reading Dove data from {}", dove_dir.display());
        Ok(DoveLoader::new(&self.settings.ring_type).load_dir(&dove_dir)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bell, BellRole, Coords, Weight};

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world").join(SNAPSHOT_FILE);

        let mut tower = Tower::new(7, "S Andrew", "Somewhere");
        tower.coordinates = Some(Coords::new(51.0, 0.5));
        tower.add_bell(Bell {
            role: Some(BellRole::Numbered(1)),
            weight: Weight::from_cwt_text("5-2-10").unwrap(),
            dated: Some(1911),
            ..Default::default()
        });

        save(&path, std::slice::from_ref(&tower)).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, vec![tower]);
    }

    #[test]
    fn test_version_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SNAPSHOT_FILE);
        std::fs::write(&path, r#"{"version": 99, "towers": []}"#).unwrap();
        assert!(matches!(load(&path), Err(SnapshotError::Version { found: 99 })));
    }

    #[test]
    fn test_missing_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load(&dir.path().join(SNAPSHOT_FILE)),
            Err(SnapshotError::Io { .. })
        ));
    }
}
