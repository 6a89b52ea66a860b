//! Persisted search state: a config snapshot and a population snapshot.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use super::SearchError;
use crate::schema::{GastopConfig, Truss};

/// Locations of the two files that make up a saved search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateArchive {
    config_path: PathBuf,
    population_path: PathBuf,
}

impl StateArchive {
    /// Create an archive from explicit file paths.
    pub fn new(config_path: impl AsRef<Path>, population_path: impl AsRef<Path>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            population_path: population_path.as_ref().to_path_buf(),
        }
    }

    /// `<prefix>config.json` and `<prefix>population.json`.
    pub fn with_prefix(prefix: &str) -> Self {
        Self::new(
            format!("{prefix}config.json"),
            format!("{prefix}population.json"),
        )
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn population_path(&self) -> &Path {
        &self.population_path
    }

    /// Write both snapshots as pretty JSON.
    pub fn save(&self, config: &GastopConfig, population: &[Truss]) -> Result<(), SearchError> {
        fs::write(&self.config_path, serde_json::to_string_pretty(config)?)?;
        fs::write(&self.population_path, serde_json::to_string_pretty(population)?)?;
        info!(
            "Saved {} trusses to {} and config to {}",
            population.len(),
            self.population_path.display(),
            self.config_path.display()
        );
        Ok(())
    }

    /// Read both snapshots back.
    pub fn load(&self) -> Result<(GastopConfig, Vec<Truss>), SearchError> {
        let config: GastopConfig = serde_json::from_str(&fs::read_to_string(&self.config_path)?)?;
        let population: Vec<Truss> =
            serde_json::from_str(&fs::read_to_string(&self.population_path)?)?;
        Ok((config, population))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let archive = StateArchive::new(dir.path().join("c.json"), dir.path().join("p.json"));

        let config = GastopConfig::default();
        let mut truss = Truss::new(
            DMatrix::from_row_slice(1, 3, &[0.1, 0.2, 0.3]),
            DMatrix::from_row_slice(1, 3, &[1.0 / 3.0, 2.0, 3.0]),
            DMatrix::from_row_slice(1, 2, &[0, 1]),
            DMatrix::from_row_slice(1, 1, &[2]),
        );
        truss.fitness_score = Some(0.1 + 0.2);
        archive.save(&config, &[truss.clone()]).unwrap();

        let (loaded_config, population) = archive.load().unwrap();
        assert_eq!(population, vec![truss]);
        assert_eq!(loaded_config.random_params.rng_seed, config.random_params.rng_seed);
        assert_eq!(
            loaded_config.evaluator_params.boundary_conditions,
            config.evaluator_params.boundary_conditions
        );
    }

    #[test]
    fn test_prefix_paths() {
        let archive = StateArchive::with_prefix("run7_");
        assert_eq!(archive.config_path(), Path::new("run7_config.json"));
        assert_eq!(archive.population_path(), Path::new("run7_population.json"));
    }

    #[test]
    fn test_missing_files_are_io_errors() {
        let dir = tempdir().unwrap();
        let archive = StateArchive::new(dir.path().join("none.json"), dir.path().join("p.json"));
        assert!(matches!(archive.load(), Err(SearchError::Io(_))));
    }
}
