//! Per-generation progress records.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::Truss;

/// Summary of one scored and sorted generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub generation: usize,
    pub best_truss: Truss,
    pub best_fitness_score: f64,
    pub population_median_fitness_score: f64,
    /// Worst minus best score.
    pub population_fitness_score_range: f64,
}

impl GenerationReport {
    /// Summarise a population sorted best first.
    ///
    /// Returns `None` for an empty population. Unscored individuals count as
    /// infinitely unfit.
    pub fn from_sorted(generation: usize, population: &[Truss]) -> Option<Self> {
        let best_truss = population.first()?.clone();
        let scores: Vec<f64> = population
            .iter()
            .map(|truss| truss.fitness_score.unwrap_or(f64::INFINITY))
            .collect();
        let mid = scores.len() / 2;
        let median = if scores.len() % 2 == 0 {
            (scores[mid - 1] + scores[mid]) / 2.0
        } else {
            scores[mid]
        };
        let best = scores[0];
        let worst = scores[scores.len() - 1];
        Some(Self {
            generation,
            best_truss,
            best_fitness_score: best,
            population_median_fitness_score: median,
            population_fitness_score_range: worst - best,
        })
    }
}

/// Reports of every generation of a run, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressHistory {
    pub generations: Vec<GenerationReport>,
}

impl ProgressHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, report: GenerationReport) {
        self.generations.push(report);
    }

    pub fn len(&self) -> usize {
        self.generations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    /// Best score of every generation.
    pub fn best_scores(&self) -> Vec<f64> {
        self.generations
            .iter()
            .map(|report| report.best_fitness_score)
            .collect()
    }

    /// Save the history to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)
    }

    /// Load a history from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}
