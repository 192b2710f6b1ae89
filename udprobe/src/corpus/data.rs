use std::borrow::Cow;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use failure::{format_err, Error, Fallible, ResultExt};
use rand::seq::index;
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

use super::{Reader, SamplingError, Sentence};

/// Corpus split.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Split {
    Train,
    Dev,
    Test,
}

impl Split {
    /// All splits, in the order in which they are stored.
    pub const ALL: [Split; 3] = [Split::Train, Split::Dev, Split::Test];

    pub fn as_str(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Dev => "dev",
            Split::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(Split::Train),
            "dev" => Ok(Split::Dev),
            "test" => Ok(Split::Test),
            unknown => Err(format_err!("Unknown split: {}", unknown)),
        }
    }
}

/// Sampling of sentences from a split.
///
/// When `strict` is set and a `sample_size` is given, exactly
/// `sample_size` sentences are drawn without replacement. Otherwise
/// the complete split is used and `sample_size` is only a target.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Sampling {
    pub sample_size: Option<usize>,
    pub seed: Option<u64>,
    #[serde(default)]
    pub strict: bool,
}

impl Sampling {
    /// Sample exactly `sample_size` sentences using `seed`.
    pub fn strict(sample_size: usize, seed: u64) -> Self {
        Sampling {
            sample_size: Some(sample_size),
            seed: Some(seed),
            strict: true,
        }
    }

    fn apply<'a>(&self, sentences: Cow<'a, [Sentence]>) -> Result<Cow<'a, [Sentence]>, SamplingError> {
        let sample_size = match self.sample_size {
            Some(sample_size) if self.strict => sample_size,
            _ => return Ok(sentences),
        };

        if sample_size > sentences.len() {
            return Err(SamplingError::InsufficientPopulation {
                sample_size,
                population: sentences.len(),
            });
        }

        let mut rng = match self.seed {
            Some(seed) => XorShiftRng::seed_from_u64(seed),
            None => XorShiftRng::from_entropy(),
        };

        Ok(Cow::Owned(
            index::sample(&mut rng, sentences.len(), sample_size)
                .into_iter()
                .map(|idx| sentences[idx].clone())
                .collect(),
        ))
    }
}

/// JSON representation of the splits of a language.
#[derive(Debug, Default, Deserialize, Serialize)]
struct SplitsDocument {
    train: Vec<Vec<String>>,
    dev: Vec<Vec<String>>,
    test: Vec<Vec<String>>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
struct Splits {
    train: Vec<Sentence>,
    dev: Vec<Sentence>,
    test: Vec<Sentence>,
}

impl Splits {
    fn split(&self, split: Split) -> &[Sentence] {
        match split {
            Split::Train => &self.train,
            Split::Dev => &self.dev,
            Split::Test => &self.test,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Source {
    Directory(PathBuf),
    Splits(Splits),
}

/// The train, development, and test data of a single language.
///
/// The data is either backed by a directory of CoNLL-U files, which
/// are read when a split is requested, or by sentences that were
/// parsed before (typically restored from JSON).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Data {
    source: Source,
}

impl Data {
    /// Data backed by a directory of CoNLL-U files.
    ///
    /// A file belongs to a split when its name contains `train`, `dev`,
    /// or `test`. The files of a split are concatenated in filename
    /// order.
    pub fn from_dir(path: impl Into<PathBuf>) -> Fallible<Self> {
        let path = path.into();
        if !path.is_dir() {
            return Err(format_err!(
                "Not a treebank directory: {}",
                path.to_string_lossy()
            ));
        }

        Ok(Data {
            source: Source::Directory(path),
        })
    }

    /// Data backed by parsed sentences.
    pub fn from_splits(train: Vec<Sentence>, dev: Vec<Sentence>, test: Vec<Sentence>) -> Self {
        Data {
            source: Source::Splits(Splits { train, dev, test }),
        }
    }

    /// Restore data from its JSON representation.
    pub fn from_json(doc: &Value) -> Fallible<Self> {
        let doc: SplitsDocument = serde_json::from_value(doc.clone())?;
        Self::from_document(doc)
    }

    /// Read data from a JSON file.
    pub fn from_json_read<R>(read: R) -> Fallible<Self>
    where
        R: Read,
    {
        let doc: SplitsDocument = serde_json::from_reader(read)?;
        Self::from_document(doc)
    }

    fn from_document(doc: SplitsDocument) -> Fallible<Self> {
        let parse = |sents: Vec<Vec<String>>| {
            sents
                .iter()
                .map(|lines| Sentence::from_json(lines))
                .collect::<Fallible<Vec<_>>>()
        };

        Ok(Self::from_splits(
            parse(doc.train)?,
            parse(doc.dev)?,
            parse(doc.test)?,
        ))
    }

    /// Serialize all splits to JSON.
    ///
    /// Each split is a list of sentences, each sentence a list of
    /// tab-joined word lines.
    pub fn to_json(&self) -> Fallible<Value> {
        Ok(serde_json::to_value(self.to_document()?)?)
    }

    /// Write all splits as JSON.
    pub fn to_json_write<W>(&self, write: W) -> Fallible<()>
    where
        W: Write,
    {
        serde_json::to_writer(write, &self.to_document()?)?;
        Ok(())
    }

    fn to_document(&self) -> Fallible<SplitsDocument> {
        let unsampled = Sampling::default();

        Ok(SplitsDocument {
            train: sentences_to_json(&self.train(&unsampled)?),
            dev: sentences_to_json(&self.dev(&unsampled)?),
            test: sentences_to_json(&self.test(&unsampled)?),
        })
    }

    pub fn train(&self, sampling: &Sampling) -> Fallible<Cow<[Sentence]>> {
        self.split(Split::Train, sampling)
    }

    pub fn dev(&self, sampling: &Sampling) -> Fallible<Cow<[Sentence]>> {
        self.split(Split::Dev, sampling)
    }

    pub fn test(&self, sampling: &Sampling) -> Fallible<Cow<[Sentence]>> {
        self.split(Split::Test, sampling)
    }

    /// Get the sentences of a split.
    pub fn split(&self, split: Split, sampling: &Sampling) -> Fallible<Cow<[Sentence]>> {
        let sentences = match &self.source {
            Source::Directory(path) => Cow::Owned(read_split(path, split)?),
            Source::Splits(splits) => Cow::Borrowed(splits.split(split)),
        };

        Ok(sampling.apply(sentences)?)
    }
}

fn sentences_to_json(sentences: &[Sentence]) -> Vec<Vec<String>> {
    sentences.iter().map(Sentence::to_json).collect()
}

/// Files of a split in a treebank directory, sorted by filename.
fn split_files(path: &Path, split: Split) -> Fallible<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        if entry.file_name().to_string_lossy().contains(split.as_str()) {
            files.push(entry.path());
        }
    }

    files.sort();

    Ok(files)
}

fn read_split(path: &Path, split: Split) -> Fallible<Vec<Sentence>> {
    let mut sentences = Vec::new();

    for file_path in split_files(path, split)? {
        let f = File::open(&file_path)
            .context(format!("Cannot open '{}'", file_path.to_string_lossy()))?;
        for sentence in Reader::new(BufReader::new(f)) {
            let sentence = sentence
                .context(format!("Cannot read '{}'", file_path.to_string_lossy()))?;
            sentences.push(sentence);
        }
    }

    Ok(sentences)
}
