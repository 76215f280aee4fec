//! Grid source backed by pre-scraped JSON files.
//!
//! Each clinic's grid lives in `<dir>/<clinic name>.json` and deserializes
//! directly into a [`RawGrid`].

use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

use crate::config::ClinicConfig;
use crate::error::SourceError;
use crate::models::{RawGrid, SourceSystem};
use crate::services::source::GridSource;

/// Reads grids of one booking system from a directory.
#[derive(Debug, Clone)]
pub struct FileGridSource {
    system: SourceSystem,
    dir: PathBuf,
}

impl FileGridSource {
    pub fn new(system: SourceSystem, dir: impl Into<PathBuf>) -> Self {
        Self {
            system,
            dir: dir.into(),
        }
    }

    pub fn grid_path(&self, clinic_name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", clinic_name))
    }

    /// Parse grid JSON, reporting the failing field path on error.
    pub fn parse_grid(content: &str, origin: &Path) -> Result<RawGrid, SourceError> {
        let mut deserializer = serde_json::Deserializer::from_str(content);
        serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
            SourceError::Parse(format!("{}: at '{}': {}", origin.display(), e.path(), e.inner()))
        })
    }
}

#[async_trait]
impl GridSource for FileGridSource {
    fn system(&self) -> SourceSystem {
        self.system
    }

    async fn fetch_grid(&self, clinic: &ClinicConfig, _date: NaiveDate) -> Result<RawGrid, SourceError> {
        let path = self.grid_path(&clinic.name);
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SourceError::Unavailable(format!("no grid file at {}", path.display()))
            } else {
                SourceError::Io(e)
            }
        })?;
        log::debug!("{}: read {} bytes from {}", clinic.name, content.len(), path.display());
        Self::parse_grid(&content, &path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellState;
    use std::fs;
    use tempfile::tempdir;

    const GRID: &str = r#"{
        "clinic": "南口院",
        "system": "stransa",
        "rows": [
            {"index": 0, "label": "14:00"},
            {"index": 1}
        ],
        "staff": [
            {
                "staff_id": "DH中山",
                "cells": [
                    {"row_index": 0, "state": "free", "staff_id": "DH中山"},
                    {"row_index": 1, "state": "booked", "staff_id": "DH中山"}
                ]
            }
        ]
    }"#;

    fn clinic(name: &str) -> ClinicConfig {
        ClinicConfig {
            name: name.to_string(),
            system: SourceSystem::Stransa,
            url: String::new(),
            enabled: true,
            settings: None,
        }
    }

    #[tokio::test]
    async fn test_reads_grid_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("南口院.json"), GRID).unwrap();
        let source = FileGridSource::new(SourceSystem::Stransa, dir.path());

        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let grid = source.fetch_grid(&clinic("南口院"), date).await.unwrap();

        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.rows[1].label, None);
        assert_eq!(grid.staff[0].cells[1].state, CellState::Booked);
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let dir = tempdir().unwrap();
        let source = FileGridSource::new(SourceSystem::Stransa, dir.path());
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();

        let result = source.fetch_grid(&clinic("本院"), date).await;
        assert!(matches!(result, Err(SourceError::Unavailable(_))));
    }

    #[test]
    fn test_parse_error_names_the_field() {
        let broken = GRID.replace("\"booked\"", "\"reserved\"");
        let err = FileGridSource::parse_grid(&broken, Path::new("南口院.json")).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("staff[0].cells[1].state"), "{}", message);
    }
}
