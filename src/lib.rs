//! **cedup** - near-duplicate detection for (source code, compiler error) corpora
//!
//! Records are bucketed by error category, scored with a blend of TF-IDF,
//! sequence and structural similarity, and grouped greedily around seed
//! records. A sampled similarity distribution helps pick the threshold.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Core pipeline - scoring, bucketing, clustering and the commands built on them
pub mod core {
    /// Corpus record and its external JSON schema
    pub mod record;
    pub use record::Record;

    /// Token and structural feature extraction
    pub mod features;
    pub use features::{FeatureExtractor, StructuralVector, StructureExtractor};

    /// TF-IDF vectors and cosine similarity
    pub mod tfidf;
    pub use tfidf::{SparseVector, TfidfModel, TfidfVectorizer, cosine_similarity};

    /// Composite code/record similarity and bucket matrices
    pub mod similarity;
    pub use similarity::{SimilarityMatrix, SimilarityScorer, SimilarityWeights};

    /// Exact (category, subcategory) partitioning
    pub mod bucket;
    pub use bucket::{Bucket, Bucketer};

    /// Seed-based greedy clustering, sequential or on rayon
    pub mod cluster;
    pub use cluster::{
        BucketProgress, Cluster, ClusterBuilder, ClusterConfig, ClusterMode, Clustering,
        PairwiseSimilarity, find_clusters, find_clusters_with_progress,
    };

    /// Windowed similarity distribution over a random sample
    pub mod sampler;
    pub use sampler::{Distribution, DistributionSampler, DistributionStats, SamplerConfig};

    /// Summary and report documents
    pub mod report;

    /// `find` and `analyze` commands
    pub mod find;
    pub use find::{analyze as analyze_run, run as find_run};

    /// `dedupe` command
    pub mod dedupe;
    pub use dedupe::run as dedupe_run;

    /// `sample` command
    pub mod sample;
    pub use sample::run as sample_run;
}

/// Infrastructure - configuration, corpus I/O and logging
pub mod infra {
    /// Layered configuration (file + CEDUP_* environment) and `init`
    pub mod config;
    pub use config::{Config, ConfigError, init as config_init, load_config};

    /// JSON corpus loading with memory mapping for large files (>1MB)
    pub mod io;
    pub use io::{InputError, load_corpus, load_records, save_json};

    /// tracing subscriber setup
    pub mod logging;
    pub use logging::init_tracing;
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use core::{analyze_run, dedupe_run, find_run, sample_run};
pub use infra::{Config, init_tracing, load_config};

// Core types for external consumers
pub use core::{Cluster, ClusterConfig, Clustering, Record, SimilarityScorer};
