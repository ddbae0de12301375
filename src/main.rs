use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use rfcde_density::{
    Bandwidth, BasisSystem, DensityError, ResponseBox, cde_loss_joint, joint_bandwidths, kde_joint, tensor_grid,
    weighted_mean, weighted_quantile,
};
use rfcde_forest::{Bootstrap, CdeForest, ForestConfig, ForestFitResult, Mtry, OobMode};
use rfcde_io::{AlignedData, ExperimentName, Matrix, MatrixReader, ResultWriter, RowId, align};

#[derive(Parser)]
#[command(name = "rfcde")]
#[command(about = "Random forests for conditional density estimation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Training data and output location shared by every subcommand.
#[derive(Args, Debug, Clone)]
struct DataArgs {
    /// Covariate CSV: id column, then one column per covariate
    #[arg(long)]
    covariates: PathBuf,

    /// Response CSV: id column, then one column per response dimension
    #[arg(long)]
    responses: PathBuf,

    /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long)]
    experiment: String,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

/// Forest tuning parameters.
#[derive(Args, Debug, Clone)]
struct ForestArgs {
    /// Number of trees
    #[arg(long, default_value_t = 100)]
    n_trees: usize,

    /// Covariate groups tried per split: "sqrt", "log2", "all", a count, or a fraction in (0, 1]
    #[arg(long, default_value = "sqrt")]
    mtry: String,

    /// Minimum in-bag weight on each side of a split
    #[arg(long, default_value_t = 5)]
    node_size: usize,

    /// Minimum CDE loss decrease for a split to be kept
    #[arg(long, default_value_t = 0.0)]
    min_loss_delta: f64,

    /// Strength of the random direction added to functional projections
    #[arg(long, default_value_t = 1.0)]
    flambda: f64,

    /// Covariate group lengths, comma separated (default: every column alone)
    #[arg(long, value_delimiter = ',')]
    lens: Option<Vec<usize>>,

    /// Maximum tree depth (unlimited if not set)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Bootstrap scheme: "multinomial", "poisson", or "none"
    #[arg(long, default_value = "multinomial")]
    bootstrap: String,

    /// Cosine basis functions per response dimension
    #[arg(long, default_value_t = 31)]
    n_basis: usize,
}

/// Density evaluation parameters.
#[derive(Args, Debug, Clone)]
struct DensityArgs {
    /// KDE bandwidth: "scott", "silverman", or a positive number; comma
    /// separate one per response dimension for joint densities
    #[arg(long, default_value = "scott", value_delimiter = ',')]
    bandwidth: Vec<String>,

    /// Number of grid points per response dimension
    #[arg(long, default_value_t = 200)]
    n_grid: usize,

    /// Lower end of the density grid in every dimension (defaults to the smallest training response)
    #[arg(long, allow_negative_numbers = true)]
    grid_min: Option<f64>,

    /// Upper end of the density grid in every dimension (defaults to the largest training response)
    #[arg(long, allow_negative_numbers = true)]
    grid_max: Option<f64>,
}

#[derive(Subcommand)]
enum Command {
    /// Train a forest and write observation weights for each query
    Weights {
        #[command(flatten)]
        data: DataArgs,

        /// Query covariate CSV (defaults to the training covariates)
        #[arg(long)]
        queries: Option<PathBuf>,

        #[command(flatten)]
        forest: ForestArgs,
    },

    /// Train a forest and write conditional densities, means and quantiles
    Predict {
        #[command(flatten)]
        data: DataArgs,

        /// Query covariate CSV (defaults to the training covariates)
        #[arg(long)]
        queries: Option<PathBuf>,

        /// Also report this conditional quantile, in [0, 1]
        #[arg(long)]
        quantile: Option<f64>,

        #[command(flatten)]
        forest: ForestArgs,

        #[command(flatten)]
        density: DensityArgs,
    },

    /// Train with out-of-bag tracking and score OOB densities on the training data
    Oob {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        forest: ForestArgs,

        #[command(flatten)]
        density: DensityArgs,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct WeightsOutput {
    experiment: String,
    n_training: usize,
    n_queries: usize,
    n_trees: usize,
    n_groups: usize,
    mtry: usize,
    mean_leaves: f64,
}

#[derive(Serialize)]
struct PredictOutput {
    experiment: String,
    n_training: usize,
    n_queries: usize,
    n_response_dims: usize,
    n_grid: usize,
    n_trees: usize,
    quantile: Option<f64>,
}

#[derive(Serialize)]
struct OobOutput {
    experiment: String,
    n_training: usize,
    n_covered: usize,
    n_trees: usize,
    oob_cde_loss: Option<f64>,
}

fn parse_mtry(s: &str) -> Result<Mtry> {
    match s {
        "sqrt" => Ok(Mtry::Sqrt),
        "log2" => Ok(Mtry::Log2),
        "all" => Ok(Mtry::All),
        other => {
            if let Ok(count) = other.parse::<usize>() {
                return Ok(Mtry::Fixed(count));
            }
            match other.parse::<f64>() {
                Ok(fraction) if fraction > 0.0 && fraction <= 1.0 => Ok(Mtry::Fraction(fraction)),
                _ => anyhow::bail!(
                    "unknown mtry: {other} (expected sqrt, log2, all, a count, or a fraction in (0, 1])"
                ),
            }
        }
    }
}

/// Clamp a fixed mtry to the number of covariate groups.
fn clamp_mtry(mtry: Mtry, n_groups: usize) -> Mtry {
    match mtry {
        Mtry::Fixed(count) if count > n_groups => {
            warn!(mtry = count, n_groups, "mtry exceeds the number of covariate groups; using all");
            Mtry::All
        }
        other => other,
    }
}

fn parse_bootstrap(s: &str) -> Result<Bootstrap> {
    match s {
        "multinomial" => Ok(Bootstrap::Multinomial),
        "poisson" => Ok(Bootstrap::Poisson),
        "none" => Ok(Bootstrap::Disabled),
        other => anyhow::bail!("unknown bootstrap: {other} (expected multinomial, poisson, or none)"),
    }
}

fn parse_bandwidths(values: &[String]) -> Result<Vec<Bandwidth>> {
    values.iter().map(|s| parse_bandwidth(s.trim())).collect()
}

fn parse_bandwidth(s: &str) -> Result<Bandwidth> {
    match s {
        "scott" => Ok(Bandwidth::Scott),
        "silverman" => Ok(Bandwidth::Silverman),
        other => match other.parse::<f64>() {
            Ok(h) if h.is_finite() && h > 0.0 => Ok(Bandwidth::Fixed(h)),
            _ => anyhow::bail!("unknown bandwidth: {other} (expected scott, silverman, or a positive number)"),
        },
    }
}

fn read_training(data: &DataArgs) -> Result<AlignedData> {
    let covariates = MatrixReader::new(&data.covariates)
        .read()
        .context("failed to read covariates CSV")?;
    let responses = MatrixReader::new(&data.responses)
        .read()
        .context("failed to read responses CSV")?;
    let aligned = align(&covariates, &responses).context("failed to align responses with covariates")?;
    info!(
        n_samples = aligned.n_samples(),
        n_covariates = aligned.covariate_names().len(),
        n_response_dims = aligned.response_names().len(),
        "training data loaded"
    );
    Ok(aligned)
}

fn read_queries(path: Option<&Path>, training: &AlignedData) -> Result<(Vec<RowId>, Vec<Vec<f64>>)> {
    let Some(path) = path else {
        return Ok((training.ids().to_vec(), training.covariates().to_vec()));
    };
    let queries: Matrix = MatrixReader::new(path)
        .read()
        .context("failed to read queries CSV")?;
    if queries.n_columns() != training.covariate_names().len() {
        anyhow::bail!(
            "queries have {} covariate columns, training data has {}",
            queries.n_columns(),
            training.covariate_names().len()
        );
    }
    info!(n_queries = queries.n_rows(), "queries loaded");
    Ok((queries.ids().to_vec(), queries.rows().to_vec()))
}

fn train(
    training: &AlignedData,
    args: &ForestArgs,
    oob_mode: OobMode,
    seed: u64,
) -> Result<ForestFitResult> {
    let unit_box = ResponseBox::fit(training.responses()).context("invalid responses")?;
    let scaled = unit_box.scale(training.responses())?;
    let basis = BasisSystem::Cosine
        .evaluate(&scaled, args.n_basis)
        .context("basis evaluation failed")?;
    debug!(n_basis = basis.first().map_or(0, Vec::len), "basis evaluated");

    let n_groups = args
        .lens
        .as_ref()
        .map_or(training.covariate_names().len(), Vec::len);
    let mtry = clamp_mtry(parse_mtry(&args.mtry)?, n_groups);

    let mut config = ForestConfig::new(args.n_trees)?
        .with_mtry(mtry)
        .with_node_size(args.node_size)
        .with_min_loss_delta(args.min_loss_delta)
        .with_flambda(args.flambda)
        .with_max_depth(args.max_depth)
        .with_bootstrap(parse_bootstrap(&args.bootstrap)?)
        .with_oob_mode(oob_mode)
        .with_seed(seed);
    if let Some(lens) = &args.lens {
        config = config.with_lens(lens.clone());
    }

    config
        .fit(training.covariates(), &basis)
        .context("forest training failed")
}

/// Evenly spaced axis per response dimension.
///
/// Each axis spans that dimension's training range unless `--grid-min` or
/// `--grid-max` override it; a constant dimension gets a unit-wide axis.
fn build_axes(responses: &[Vec<f64>], args: &DensityArgs) -> Result<Vec<Vec<f64>>> {
    if args.n_grid < 2 {
        anyhow::bail!("n_grid must be at least 2, got {}", args.n_grid);
    }
    let n_dims = responses.first().map_or(0, Vec::len);
    let axes = (0..n_dims)
        .map(|d| {
            let column = || responses.iter().map(|row| row[d]);
            let lo = args.grid_min.unwrap_or_else(|| column().fold(f64::INFINITY, f64::min));
            let hi = args.grid_max.unwrap_or_else(|| column().fold(f64::NEG_INFINITY, f64::max));
            let (lo, hi) = if hi > lo { (lo, hi) } else { (lo - 0.5, lo + 0.5) };
            let step = (hi - lo) / (args.n_grid - 1) as f64;
            (0..args.n_grid).map(|i| lo + step * i as f64).collect()
        })
        .collect();
    Ok(axes)
}

/// Weighted product-kernel KDE for every weight row.
///
/// Rows whose weighted responses have no spread fall back to the bandwidths
/// of the unweighted training responses.
fn densities(
    responses: &[Vec<f64>],
    grid: &[Vec<f64>],
    weight_rows: &[Vec<f64>],
    bandwidths: &[Bandwidth],
) -> Result<Vec<Vec<f64>>> {
    let uniform = vec![1.0; responses.len()];
    let fallback: Vec<Bandwidth> = joint_bandwidths(responses, &uniform, bandwidths)
        .context("cannot resolve a bandwidth for the training responses")?
        .into_iter()
        .map(Bandwidth::Fixed)
        .collect();

    let rows = weight_rows
        .par_iter()
        .map(|weights| match kde_joint(responses, grid, weights, bandwidths) {
            Err(DensityError::DegenerateBandwidth) => kde_joint(responses, grid, weights, &fallback),
            other => other,
        })
        .collect::<Result<Vec<_>, _>>()
        .context("density estimation failed")?;
    Ok(rows)
}

/// Apply a weighted summary to every response dimension of every weight row.
fn marginal_summaries<F>(responses: &[Vec<f64>], weight_rows: &[Vec<f64>], summary: F) -> Result<Vec<Vec<f64>>>
where
    F: Fn(&[f64], &[f64]) -> Result<f64, DensityError>,
{
    let n_dims = responses.first().map_or(0, Vec::len);
    let columns: Vec<Vec<f64>> = (0..n_dims)
        .map(|d| responses.iter().map(|row| row[d]).collect())
        .collect();
    let rows = weight_rows
        .iter()
        .map(|weights| {
            columns
                .iter()
                .map(|column| summary(column.as_slice(), weights.as_slice()))
                .collect::<Result<Vec<f64>, DensityError>>()
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn group_names(forest: &CdeForest, columns: &[String]) -> Vec<String> {
    let layout = forest.layout();
    (0..layout.n_groups())
        .map(|g| {
            let range = layout.group(g);
            if range.len() == 1 {
                columns[range.start].clone()
            } else {
                format!("{}..{}", columns[range.start], columns[range.end - 1])
            }
        })
        .collect()
}

fn write_importances(writer: &ResultWriter, forest: &CdeForest, columns: &[String]) -> Result<()> {
    let names = group_names(forest, columns);
    let ranked = forest.feature_importances();
    let ordered_names: Vec<String> = ranked.iter().map(|f| names[f.group].clone()).collect();
    let importances: Vec<f64> = ranked.iter().map(|f| f.importance).collect();
    let ranks: Vec<usize> = ranked.iter().map(|f| f.rank).collect();
    writer.write_importances(&ordered_names, &importances, &ranks)?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Weights { data, queries, forest } => {
            let experiment_name = ExperimentName::new(data.experiment.clone())?;
            let training = read_training(&data)?;
            let (query_ids, query_rows) = read_queries(queries.as_deref(), &training)?;

            let result = train(&training, &forest, OobMode::Disabled, cli.seed)?;
            let model = result.forest();
            let weights = model
                .weights_batch(&query_rows)
                .context("weight computation failed")?;

            let writer = ResultWriter::new(&data.output_dir, experiment_name)?;
            writer.write_weights(&query_ids, training.ids(), &weights)?;
            write_importances(&writer, model, training.covariate_names())?;

            let output = WeightsOutput {
                experiment: data.experiment,
                n_training: training.n_samples(),
                n_queries: query_ids.len(),
                n_trees: model.n_trees(),
                n_groups: model.n_groups(),
                mtry: model.mtry(),
                mean_leaves: result.metadata().mean_leaves,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Predict {
            data,
            queries,
            quantile,
            forest,
            density,
        } => {
            let experiment_name = ExperimentName::new(data.experiment.clone())?;
            let bandwidths = parse_bandwidths(&density.bandwidth)?;
            let training = read_training(&data)?;
            let responses = training.responses();
            let grid = tensor_grid(&build_axes(responses, &density)?).context("invalid density grid")?;
            let (query_ids, query_rows) = read_queries(queries.as_deref(), &training)?;

            let result = train(&training, &forest, OobMode::Disabled, cli.seed)?;
            let model = result.forest();
            let weights = model
                .weights_batch(&query_rows)
                .context("weight computation failed")?;

            let rows = densities(responses, &grid, &weights, &bandwidths)?;
            let means =
                marginal_summaries(responses, &weights, weighted_mean).context("conditional mean failed")?;
            let quantiles = quantile
                .map(|q| marginal_summaries(responses, &weights, |values, w| weighted_quantile(values, w, q)))
                .transpose()
                .context("conditional quantile failed")?;
            info!(n_queries = query_ids.len(), n_grid = grid.len(), "densities computed");

            let writer = ResultWriter::new(&data.output_dir, experiment_name)?;
            writer.write_predictions(
                &query_ids,
                training.response_names(),
                &grid,
                &rows,
                &means,
                quantile.zip(quantiles.as_deref()),
            )?;
            write_importances(&writer, model, training.covariate_names())?;

            let output = PredictOutput {
                experiment: data.experiment,
                n_training: training.n_samples(),
                n_queries: query_ids.len(),
                n_response_dims: training.response_names().len(),
                n_grid: grid.len(),
                n_trees: model.n_trees(),
                quantile,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Oob { data, forest, density } => {
            let experiment_name = ExperimentName::new(data.experiment.clone())?;
            let bandwidths = parse_bandwidths(&density.bandwidth)?;
            let training = read_training(&data)?;
            let responses = training.responses();
            let axes = build_axes(responses, &density)?;
            let grid = tensor_grid(&axes).context("invalid density grid")?;

            let result = train(&training, &forest, OobMode::Enabled, cli.seed)?;
            let model = result.forest();
            let oob = model.oob_weights().context("OOB weight computation failed")?;
            let uncovered = oob.uncovered();
            if !uncovered.is_empty() {
                warn!(n_uncovered = uncovered.len(), "rows never out of bag; excluded from OOB loss");
            }

            let covered: Vec<usize> = (0..training.n_samples()).filter(|&i| oob.is_covered(i)).collect();
            let oob_loss = if covered.is_empty() {
                None
            } else {
                let covered_weights: Vec<Vec<f64>> = covered.iter().map(|&i| oob.row(i).to_vec()).collect();
                let truth: Vec<Vec<f64>> = covered.iter().map(|&i| responses[i].clone()).collect();
                let rows = densities(responses, &grid, &covered_weights, &bandwidths)?;
                Some(cde_loss_joint(&rows, &axes, &truth).context("OOB CDE loss failed")?)
            };
            info!(oob_cde_loss = ?oob_loss, n_covered = covered.len(), "OOB evaluation complete");

            let writer = ResultWriter::new(&data.output_dir, experiment_name)?;
            writer.write_oob(training.ids(), oob_loss, oob.n_oob_trees(), &uncovered)?;
            write_importances(&writer, model, training.covariate_names())?;

            let output = OobOutput {
                experiment: data.experiment,
                n_training: training.n_samples(),
                n_covered: covered.len(),
                n_trees: model.n_trees(),
                oob_cde_loss: oob_loss,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
