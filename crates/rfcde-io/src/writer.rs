//! JSON result writer for forest weights, conditional densities and OOB summaries.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{ExperimentName, RowId};

/// Writes rfcde results to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_{kind}.json` with kind one of
/// `weights`, `predict`, `oob` or `importance`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Return the path of the artifact of the given kind.
    #[must_use]
    pub fn artifact_path(&self, kind: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{kind}.json", self.experiment.as_str()))
    }

    /// Write per-query observation weights to `{experiment}_weights.json`.
    ///
    /// `weights[q][j]` is the weight of training row `training_ids[j]` for
    /// query `query_ids[q]`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::LengthMismatch`] | `weights` does not match the id lists |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip_all, fields(n_queries = query_ids.len()))]
    pub fn write_weights(
        &self,
        query_ids: &[RowId],
        training_ids: &[RowId],
        weights: &[Vec<f64>],
    ) -> Result<PathBuf, IoError> {
        check_len("weights rows", query_ids.len(), weights.len())?;
        for row in weights {
            check_len("weights columns", training_ids.len(), row.len())?;
        }

        let artifact = WeightsArtifact {
            experiment: self.experiment.as_str(),
            n_queries: query_ids.len(),
            n_training: training_ids.len(),
            training_ids: training_ids.iter().map(RowId::as_str).collect(),
            queries: query_ids
                .iter()
                .zip(weights)
                .map(|(id, row)| WeightEntry {
                    id: id.as_str(),
                    weights: row,
                })
                .collect(),
        };

        let path = self.artifact_path("weights");
        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "weights written");
        Ok(path)
    }

    /// Write conditional densities to `{experiment}_predict.json`.
    ///
    /// `grid` holds one point per density value, each with one coordinate
    /// per entry of `response_names`. Each query carries its density on
    /// `grid`, its conditional mean per response dimension and, when
    /// `quantile` is `Some((q, values))`, its marginal `q`-quantiles.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::LengthMismatch`] | Per-query arrays disagree with `query_ids`, a density row with `grid`, or a point, mean or quantile row with `response_names` |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip_all, fields(n_queries = query_ids.len(), n_grid = grid.len(), n_dims = response_names.len()))]
    pub fn write_predictions(
        &self,
        query_ids: &[RowId],
        response_names: &[String],
        grid: &[Vec<f64>],
        densities: &[Vec<f64>],
        means: &[Vec<f64>],
        quantile: Option<(f64, &[Vec<f64>])>,
    ) -> Result<PathBuf, IoError> {
        let n_dims = response_names.len();
        check_len("densities", query_ids.len(), densities.len())?;
        check_len("means", query_ids.len(), means.len())?;
        for point in grid {
            check_len("grid point dimensions", n_dims, point.len())?;
        }
        for row in means {
            check_len("mean dimensions", n_dims, row.len())?;
        }
        if let Some((_, values)) = quantile {
            check_len("quantiles", query_ids.len(), values.len())?;
            for row in values {
                check_len("quantile dimensions", n_dims, row.len())?;
            }
        }
        for row in densities {
            check_len("density grid", grid.len(), row.len())?;
        }

        let predictions = query_ids
            .iter()
            .enumerate()
            .map(|(q, id)| PredictionEntry {
                id: id.as_str(),
                mean: &means[q],
                quantile: quantile.map(|(_, values)| values[q].as_slice()),
                density: &densities[q],
            })
            .collect();

        let artifact = PredictArtifact {
            experiment: self.experiment.as_str(),
            n_queries: query_ids.len(),
            response_names: response_names.iter().map(String::as_str).collect(),
            quantile_level: quantile.map(|(level, _)| level),
            grid,
            predictions,
        };

        let path = self.artifact_path("predict");
        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "predictions written");
        Ok(path)
    }

    /// Write the out-of-bag summary to `{experiment}_oob.json`.
    ///
    /// `n_oob_trees[i]` counts the trees for which row `ids[i]` was out of
    /// bag; `uncovered` lists row indices with no such tree. `cde_loss` is
    /// `None` when no row was covered.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::LengthMismatch`] | `n_oob_trees` does not match `ids`, or an uncovered index is out of range |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip_all, fields(n_rows = ids.len(), n_uncovered = uncovered.len()))]
    pub fn write_oob(
        &self,
        ids: &[RowId],
        cde_loss: Option<f64>,
        n_oob_trees: &[usize],
        uncovered: &[usize],
    ) -> Result<PathBuf, IoError> {
        check_len("oob tree counts", ids.len(), n_oob_trees.len())?;
        if let Some(&index) = uncovered.iter().find(|&&i| i >= ids.len()) {
            return Err(IoError::LengthMismatch {
                what: "uncovered row index",
                expected: ids.len(),
                got: index,
            });
        }

        let artifact = OobArtifact {
            experiment: self.experiment.as_str(),
            n_rows: ids.len(),
            n_covered: ids.len() - uncovered.len(),
            cde_loss,
            uncovered: uncovered.iter().map(|&i| ids[i].as_str()).collect(),
            rows: ids
                .iter()
                .zip(n_oob_trees)
                .map(|(id, &n_trees)| OobEntry {
                    id: id.as_str(),
                    n_oob_trees: n_trees,
                })
                .collect(),
        };

        let path = self.artifact_path("oob");
        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "oob summary written");
        Ok(path)
    }

    /// Write covariate-group importances to `{experiment}_importance.json`.
    ///
    /// `names`, `importances` and `ranks` are parallel, one entry per group.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::LengthMismatch`] | The three slices differ in length |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip_all, fields(n_groups = names.len()))]
    pub fn write_importances(
        &self,
        names: &[String],
        importances: &[f64],
        ranks: &[usize],
    ) -> Result<PathBuf, IoError> {
        check_len("importances", names.len(), importances.len())?;
        check_len("ranks", names.len(), ranks.len())?;

        let artifact = ImportanceArtifact {
            experiment: self.experiment.as_str(),
            feature_importances: names
                .iter()
                .zip(importances)
                .zip(ranks)
                .map(|((name, &importance), &rank)| FeatureEntry {
                    name: name.as_str(),
                    importance,
                    rank,
                })
                .collect(),
        };

        let path = self.artifact_path("importance");
        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "importances written");
        Ok(path)
    }

    fn write_json<T: Serialize>(&self, path: &Path, artifact: &T) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(artifact).expect("serialization cannot fail");
        fs::write(path, json).map_err(|e| IoError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

fn check_len(what: &'static str, expected: usize, got: usize) -> Result<(), IoError> {
    if expected == got {
        Ok(())
    } else {
        Err(IoError::LengthMismatch { what, expected, got })
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct WeightsArtifact<'a> {
    experiment: &'a str,
    n_queries: usize,
    n_training: usize,
    training_ids: Vec<&'a str>,
    queries: Vec<WeightEntry<'a>>,
}

#[derive(Serialize)]
struct WeightEntry<'a> {
    id: &'a str,
    weights: &'a [f64],
}

#[derive(Serialize)]
struct PredictArtifact<'a> {
    experiment: &'a str,
    n_queries: usize,
    response_names: Vec<&'a str>,
    quantile_level: Option<f64>,
    grid: &'a [Vec<f64>],
    predictions: Vec<PredictionEntry<'a>>,
}

#[derive(Serialize)]
struct PredictionEntry<'a> {
    id: &'a str,
    mean: &'a [f64],
    quantile: Option<&'a [f64]>,
    density: &'a [f64],
}

#[derive(Serialize)]
struct OobArtifact<'a> {
    experiment: &'a str,
    n_rows: usize,
    n_covered: usize,
    cde_loss: Option<f64>,
    uncovered: Vec<&'a str>,
    rows: Vec<OobEntry<'a>>,
}

#[derive(Serialize)]
struct OobEntry<'a> {
    id: &'a str,
    n_oob_trees: usize,
}

#[derive(Serialize)]
struct ImportanceArtifact<'a> {
    experiment: &'a str,
    feature_importances: Vec<FeatureEntry<'a>>,
}

#[derive(Serialize)]
struct FeatureEntry<'a> {
    name: &'a str,
    importance: f64,
    rank: usize,
}
