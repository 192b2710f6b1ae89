use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use failure::{format_err, Fallible, ResultExt};
use finalfusion::prelude::*;
use serde_derive::{Deserialize, Serialize};
use tracing::info;

use crate::align::{Aligner, BertTokenizer, EmbeddingEncoder, SpecialTokens, DEFAULT_MAX_LEN};
use crate::classifier::{ClassifierType, TrainConfig};
use crate::corpus::Sampling;
use crate::probe::ProbeError;
use crate::property::Property;

/// The minimum number of training sentences of a language before its
/// results are no longer marked as a small sample.
pub const SMALL_SAMPLE_THRESHOLD: usize = 500;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub input: Input,

    #[serde(default)]
    pub sampling: Sampling,

    pub probe: ProbeConfig,
}

impl Config {
    /// Make configuration paths relative to the configuration file.
    pub fn relativize_paths<P>(&mut self, config_path: P) -> Fallible<()>
    where
        P: AsRef<Path>,
    {
        let config_path = config_path.as_ref();

        self.input.tokenizer = relativize_path(config_path, &self.input.tokenizer)?;
        self.input.embeddings = relativize_path(config_path, &self.input.embeddings)?;

        Ok(())
    }
}

pub trait TomlRead {
    fn from_toml_read<R>(read: R) -> Fallible<Config>
    where
        R: Read;
}

impl TomlRead for Config {
    fn from_toml_read<R>(mut read: R) -> Fallible<Self>
    where
        R: Read,
    {
        let mut data = String::new();
        read.read_to_string(&mut data)?;
        let config: Config = toml::from_str(&data)?;

        // Fail early on unknown probe settings.
        config.probe.property()?;
        config.probe.classifier_type()?;
        config.probe.train.lr.to_schedule()?;

        Ok(config)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingAlloc {
    Mmap,
    Read,
}

impl Default for EmbeddingAlloc {
    fn default() -> Self {
        EmbeddingAlloc::Mmap
    }
}

/// Input configuration
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Input {
    /// Tokenizer in Hugging Face `tokenizer.json` format.
    pub tokenizer: String,

    /// Sub-word embeddings in finalfusion format.
    pub embeddings: String,

    #[serde(default)]
    pub alloc: EmbeddingAlloc,

    /// Maximum encoder input length, including the start and end token.
    #[serde(default = "default_max_len")]
    pub max_len: usize,

    #[serde(default)]
    pub special_tokens: SpecialTokens,
}

fn default_max_len() -> usize {
    DEFAULT_MAX_LEN
}

impl Input {
    pub fn aligner(&self) -> Aligner {
        Aligner::new(self.max_len)
    }

    pub fn load_tokenizer(&self) -> Fallible<BertTokenizer> {
        info!(tokenizer = %self.tokenizer, "loading tokenizer");

        BertTokenizer::from_file(&self.tokenizer, self.special_tokens.clone())
    }

    /// Load the encoder with embeddings for the tokenizer vocabulary.
    pub fn load_encoder(&self, tokenizer: &BertTokenizer) -> Fallible<EmbeddingEncoder> {
        info!(embeddings = %self.embeddings, "loading embeddings");

        let f = File::open(&self.embeddings)
            .with_context(|e| format!("Cannot open embeddings {}: {}", self.embeddings, e))?;
        let mut reader = BufReader::new(f);
        let embeddings: Embeddings<VocabWrap, StorageWrap> = match self.alloc {
            EmbeddingAlloc::Read => ReadEmbeddings::read_embeddings(&mut reader)?,
            EmbeddingAlloc::Mmap => MmapEmbeddings::mmap_embeddings(&mut reader)?,
        };

        Ok(EmbeddingEncoder::from_embeddings(&embeddings, tokenizer))
    }
}

/// Probe configuration.
///
/// The property and classifier are kept as names, so that they can be
/// reported as they were configured.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeConfig {
    pub property: String,

    pub classifier: String,

    #[serde(default = "default_small_sample")]
    pub small_sample: usize,

    #[serde(default)]
    pub train: TrainConfig,
}

fn default_small_sample() -> usize {
    SMALL_SAMPLE_THRESHOLD
}

impl ProbeConfig {
    pub fn property(&self) -> Result<Property, ProbeError> {
        self.property.parse()
    }

    pub fn classifier_type(&self) -> Result<ClassifierType, ProbeError> {
        self.classifier.parse()
    }
}

fn relativize_path(config_path: &Path, filename: &str) -> Fallible<String> {
    if filename.is_empty() {
        return Ok(filename.to_owned());
    }

    let path = Path::new(&filename);

    // Don't touch absolute paths.
    if path.is_absolute() {
        return Ok(filename.to_owned());
    }

    let abs_config_path = config_path.canonicalize()?;
    Ok(abs_config_path
        .parent()
        .ok_or_else(|| {
            format_err!(
                "Cannot get parent path of the configuration file: {}",
                abs_config_path.to_string_lossy()
            )
        })?
        .join(path)
        .to_str()
        .ok_or_else(|| {
            format_err!(
                "Cannot convert parent path to string: {}",
                abs_config_path.to_string_lossy()
            )
        })?
        .to_owned())
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use lazy_static::lazy_static;

    use super::{Config, EmbeddingAlloc, Input, ProbeConfig, TomlRead};
    use crate::align::{SpecialTokens, SubwordTokenizer};
    use crate::classifier::{ClassifierType, LrScheduleConfig, TrainConfig};
    use crate::corpus::Sampling;
    use crate::probe::ProbeError;
    use crate::property::Property;

    lazy_static! {
        static ref BASIC_PROBE_CHECK: Config = Config {
            input: Input {
                tokenizer: "tokenizer.json".to_owned(),
                embeddings: "mbert-embeddings.fifu".to_owned(),
                alloc: EmbeddingAlloc::Read,
                max_len: 256,
                special_tokens: SpecialTokens::default(),
            },
            sampling: Sampling::strict(1000, 42),
            probe: ProbeConfig {
                property: "Number".to_owned(),
                classifier: "MLP".to_owned(),
                small_sample: 500,
                train: TrainConfig {
                    max_epochs: 20,
                    hidden_units: 4,
                    lr: LrScheduleConfig::Plateau {
                        initial_lr: 0.1,
                        scale: 0.5,
                        patience: 3,
                        warmup_steps: 0,
                    },
                    ..TrainConfig::default()
                },
            },
        };
    }

    #[test]
    fn test_parse_config() {
        let f = File::open("testdata/udprobe.conf").unwrap();
        let config = Config::from_toml_read(f).unwrap();
        assert_eq!(*BASIC_PROBE_CHECK, config);
        assert_eq!(config.probe.property().unwrap(), Property::Number);
        assert_eq!(config.probe.classifier_type().unwrap(), ClassifierType::Mlp);
        assert_eq!(config.input.aligner().max_len(), 256);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::from_toml_read(
            "[input]
tokenizer = \"tokenizer.json\"
embeddings = \"embeddings.fifu\"

[probe]
property = \"upos\"
classifier = \"SGD\"
"
            .as_bytes(),
        )
        .unwrap();

        assert_eq!(config.input.alloc, EmbeddingAlloc::Mmap);
        assert_eq!(config.input.max_len, 512);
        assert_eq!(config.sampling, Sampling::default());
        assert_eq!(config.probe.small_sample, 500);
        assert_eq!(config.probe.train, TrainConfig::default());
    }

    #[test]
    fn unknown_probe_settings_are_rejected() {
        let err = Config::from_toml_read(
            "[input]
tokenizer = \"tokenizer.json\"
embeddings = \"embeddings.fifu\"

[probe]
property = \"deprel\"
classifier = \"SGD\"
"
            .as_bytes(),
        )
        .unwrap_err()
        .downcast::<ProbeError>()
        .unwrap();

        assert_eq!(
            err,
            ProbeError::InvalidProperty {
                property: "deprel".to_owned()
            }
        );
    }

    #[test]
    fn relativize_config_paths() {
        let f = File::open("testdata/udprobe.conf").unwrap();
        let mut config = Config::from_toml_read(f).unwrap();
        config.relativize_paths("testdata/udprobe.conf").unwrap();

        assert!(config.input.tokenizer.ends_with("testdata/tokenizer.json"));
        assert!(std::path::Path::new(&config.input.tokenizer).is_absolute());
    }

    #[test]
    fn tokenizer_from_config() {
        let f = File::open("testdata/udprobe.conf").unwrap();
        let mut config = Config::from_toml_read(f).unwrap();
        config.relativize_paths("testdata/udprobe.conf").unwrap();

        let tokenizer = config.input.load_tokenizer().unwrap();
        assert_eq!(tokenizer.tokenize("Dogs").unwrap(), vec!["dog", "##s"]);
    }

    #[test]
    fn out_of_range_learning_rates_are_rejected() {
        let probe_section = "[input]
tokenizer = \"tokenizer.json\"
embeddings = \"embeddings.fifu\"

[probe]
property = \"upos\"
classifier = \"SGD\"
";

        let exponential = format!(
            "{}
[probe.train.lr]
schedule = \"exponential\"
initial_lr = 0.1
decay_rate = 0.5
decay_epochs = 0
",
            probe_section
        );
        assert!(Config::from_toml_read(exponential.as_bytes()).is_err());

        let constant = format!(
            "{}
[probe.train.lr]
schedule = \"constant\"
lr = 0.0
",
            probe_section
        );
        assert!(Config::from_toml_read(constant.as_bytes()).is_err());
    }
}
