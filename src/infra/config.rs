use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::{AppContext, InitArgs};
use crate::core::cluster::{ClusterConfig, ClusterMode, DEFAULT_THRESHOLD};
use crate::core::sampler::SamplerConfig;
use crate::core::similarity::{CodeWeights, RecordWeights, SimilarityWeights};

/// Config files looked up in the working directory, first match wins
pub const CONFIG_FILES: [&str; 4] = ["cedup.toml", "cedup.yaml", "cedup.json", ".cedup.toml"];

/// Tolerance when checking that a weight group sums to one
const WEIGHT_EPSILON: f64 = 1e-6;

/// Invalid configuration values, caught before any scoring runs
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError
{
    #[error("{name} must be within [0, 1], got {value}")]
    OutOfUnitRange
    {
        name: &'static str,
        value: f64,
    },

    #[error("{group}.{name} must not be negative, got {value}")]
    NegativeWeight
    {
        group: &'static str,
        name: &'static str,
        value: f64,
    },

    #[error("{group} weights must sum to 1.0, got {sum}")]
    WeightSum
    {
        group: &'static str,
        sum: f64,
    },

    #[error("sampling.sample_size must be at least 1")]
    EmptySample,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Scoring weights and clustering threshold
    pub similarity: SimilarityConfig,

    /// Distribution sampling
    pub sampling: SamplerConfig,

    /// Bucket clustering strategy
    pub clustering: ClusteringConfig,

    /// Where `find` writes its documents
    pub output: OutputConfig,

    /// Defaults for `dedupe`
    pub dedupe: DedupeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig
{
    pub threshold: f64,
    pub code_weights: CodeWeights,
    pub record_weights: RecordWeights,
}

impl Default for SimilarityConfig
{
    fn default() -> Self
    {
        Self {
            threshold: DEFAULT_THRESHOLD,
            code_weights: CodeWeights::default(),
            record_weights: RecordWeights::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig
{
    pub parallel: bool,
    pub mode: ClusterMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig
{
    pub dir: PathBuf,
    pub base_name: String,
}

impl Default for OutputConfig
{
    fn default() -> Self
    {
        Self {
            dir: PathBuf::from("./similar_errors_output"),
            base_name: "compile_errors".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupeConfig
{
    pub suffix: String,
}

impl Default for DedupeConfig
{
    fn default() -> Self
    {
        Self { suffix: "_deduplicated".to_string() }
    }
}

impl Config
{
    /// Weight set for the scorer
    pub fn weights(&self) -> SimilarityWeights
    {
        SimilarityWeights {
            code: self
                .similarity
                .code_weights,
            record: self
                .similarity
                .record_weights,
        }
    }

    /// Clustering settings for the corpus driver
    pub fn cluster_config(&self) -> ClusterConfig
    {
        ClusterConfig {
            threshold: self
                .similarity
                .threshold,
            mode: self
                .clustering
                .mode,
            parallel: self
                .clustering
                .parallel,
        }
    }

    /// Reject values the core would silently misbehave on
    pub fn validate(&self) -> Result<(), ConfigError>
    {
        unit_range("similarity.threshold", self.similarity.threshold)?;
        unit_range("sampling.example_floor", self.sampling.example_floor)?;

        let code = &self
            .similarity
            .code_weights;
        check_group(
            "code_weights",
            &[("tfidf", code.tfidf), ("sequence", code.sequence), ("structure", code.structure)],
        )?;

        let record = &self
            .similarity
            .record_weights;
        check_group(
            "record_weights",
            &[("code", record.code), ("detail", record.detail), ("category", record.category)],
        )?;

        if self
            .sampling
            .sample_size
            == 0
        {
            return Err(ConfigError::EmptySample);
        }

        Ok(())
    }
}

fn unit_range(
    name: &'static str,
    value: f64,
) -> Result<(), ConfigError>
{
    // NaN fails the contains check too
    if (0.0..=1.0).contains(&value)
    {
        Ok(())
    }
    else
    {
        Err(ConfigError::OutOfUnitRange { name, value })
    }
}

fn check_group(
    group: &'static str,
    weights: &[(&'static str, f64)],
) -> Result<(), ConfigError>
{
    for &(name, value) in weights
    {
        if value < 0.0 || value.is_nan()
        {
            return Err(ConfigError::NegativeWeight { group, name, value });
        }
    }

    let sum: f64 = weights
        .iter()
        .map(|(_, w)| w)
        .sum();
    if (sum - 1.0).abs() > WEIGHT_EPSILON
    {
        return Err(ConfigError::WeightSum { group, sum });
    }

    Ok(())
}

/// Load configuration from the working directory and `CEDUP_*` variables
pub fn load_config() -> Result<Config>
{
    load_config_from(Path::new("."))
}

/// Load configuration with config files resolved against `dir`
pub fn load_config_from(dir: &Path) -> Result<Config>
{
    let mut builder = config::Config::builder();

    // Load from config files in priority order
    for name in &CONFIG_FILES
    {
        let path = dir.join(name);
        if path.exists()
        {
            debug!(path = %path.display(), "loading config file");
            builder = builder.add_source(config::File::from(path));
            break;
        }
    }

    // CEDUP_SIMILARITY__THRESHOLD=0.95 -> similarity.threshold
    builder = builder.add_source(
        config::Environment::with_prefix("CEDUP")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join(CONFIG_FILES[0]);

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    if ctx.dry_run
    {
        if !ctx.quiet
        {
            println!("DRY RUN: would write {}", config_path.display());
            print!("{toml_string}");
        }
        return Ok(());
    }

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}
