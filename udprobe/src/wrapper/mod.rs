//! High-level wrappers for preprocessing and probing experiments.
//!
//! `Preprocessor` samples treebanks and caches their word
//! representations. `ProbeExperiment` trains and evaluates all probes
//! on the cached data of a language.

mod config;
pub use self::config::{
    Config, EmbeddingAlloc, Input, ProbeConfig, TomlRead, SMALL_SAMPLE_THRESHOLD,
};

mod experiment;
pub use self::experiment::{LanguageResult, ProbeExperiment};

mod preprocess;
pub use self::preprocess::{
    language_dirs, representations_filename, PrepareOutcome, Preprocessor, PREPROCESSED_JSON,
};
