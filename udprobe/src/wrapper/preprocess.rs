use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use failure::{Fallible, ResultExt};
use itertools::Itertools;
use tracing::{info, warn};

use crate::align::{Aligner, SubwordTokenizer, WordEncoder};
use crate::corpus::{Data, ParseError, Sampling, SamplingError, Sentence, Split};
use crate::repr::Representations;

/// File name of the serialized splits of a language.
pub const PREPROCESSED_JSON: &str = "preprocessed.json";

/// File name of the representations of a split.
pub fn representations_filename(split: Split) -> String {
    format!("{}.npz", split)
}

/// Result of preparing a language.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PrepareOutcome {
    /// The sentences and representations were written.
    Prepared,

    /// The output directory already exists.
    Exists,

    /// The language was skipped.
    Skipped { reason: String },
}

/// Subdirectories of `dir`, sorted by name.
pub fn language_dirs(dir: impl AsRef<Path>) -> Fallible<Vec<(String, PathBuf)>> {
    let dir = dir.as_ref();
    let mut languages = Vec::new();
    for entry in fs::read_dir(dir).context(format!("Cannot read '{}'", dir.to_string_lossy()))? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            languages.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
        }
    }

    Ok(languages.into_iter().sorted().collect())
}

fn staging_dir(out_dir: &Path) -> PathBuf {
    let mut name = out_dir
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    out_dir.with_file_name(name)
}

/// Fill `out_dir` through a staging directory.
///
/// `write` receives the staging directory. On success the staging
/// directory is renamed to `out_dir`, on failure it is removed.
fn write_staged<F>(out_dir: &Path, write: F) -> Fallible<()>
where
    F: FnOnce(&Path) -> Fallible<()>,
{
    let staging = staging_dir(out_dir);
    if staging.exists() {
        fs::remove_dir_all(&staging).context(format!(
            "Cannot remove stale '{}'",
            staging.to_string_lossy()
        ))?;
    }
    fs::create_dir_all(&staging)
        .context(format!("Cannot create '{}'", staging.to_string_lossy()))?;

    if let Err(err) = write(&staging) {
        if let Err(remove_err) = fs::remove_dir_all(&staging) {
            warn!(
                staging = %staging.to_string_lossy(),
                "cannot remove staging directory: {}",
                remove_err
            );
        }
        return Err(err);
    }

    fs::rename(&staging, out_dir).context(format!(
        "Cannot move '{}' to '{}'",
        staging.to_string_lossy(),
        out_dir.to_string_lossy()
    ))?;

    Ok(())
}

/// Sampling, alignment, and encoding of treebanks.
pub struct Preprocessor<'a, T: ?Sized, E: ?Sized> {
    aligner: Aligner,
    tokenizer: &'a T,
    encoder: &'a E,
    sampling: Sampling,
}

impl<'a, T, E> Preprocessor<'a, T, E>
where
    T: ?Sized + SubwordTokenizer,
    E: ?Sized + WordEncoder,
{
    /// Construct a preprocessor.
    ///
    /// `sampling` is applied to the training split only.
    pub fn new(aligner: Aligner, tokenizer: &'a T, encoder: &'a E, sampling: Sampling) -> Self {
        Preprocessor {
            aligner,
            tokenizer,
            encoder,
            sampling,
        }
    }

    /// Compute the word representations of sentences.
    pub fn represent(&self, sentences: &[Sentence]) -> Fallible<Representations> {
        let mut representations = Representations::new();
        for sentence in sentences {
            representations.push(self.aligner.represent(
                &sentence.forms(),
                self.tokenizer,
                self.encoder,
            )?);
        }

        Ok(representations)
    }

    /// Prepare the treebank in `treebank_dir`, writing to `out_dir`.
    ///
    /// Nothing is done when `out_dir` exists. The output is written to
    /// a staging directory that is moved to `out_dir` once all files
    /// are written, so `out_dir` is either complete or absent.
    pub fn prepare_language(
        &self,
        treebank_dir: impl AsRef<Path>,
        out_dir: impl AsRef<Path>,
    ) -> Fallible<PrepareOutcome> {
        let out_dir = out_dir.as_ref();
        if out_dir.exists() {
            return Ok(PrepareOutcome::Exists);
        }

        let data = Data::from_dir(treebank_dir.as_ref())?;
        let unsampled = Sampling::default();

        let train = match data.train(&self.sampling) {
            Ok(train) => train.into_owned(),
            Err(err) => match err.downcast::<SamplingError>() {
                Ok(err) => {
                    return Ok(PrepareOutcome::Skipped {
                        reason: err.to_string(),
                    })
                }
                Err(err) => return Err(err),
            },
        };
        let test = data.test(&unsampled)?.into_owned();
        let dev = data.dev(&unsampled)?.into_owned();

        let train_repr = self.represent(&train)?;
        let test_repr = self.represent(&test)?;
        let dev_repr = self.represent(&dev)?;

        write_staged(out_dir, |dir| {
            let json_path = dir.join(PREPROCESSED_JSON);
            let f = File::create(&json_path)
                .context(format!("Cannot create '{}'", json_path.to_string_lossy()))?;
            Data::from_splits(train, dev, test).to_json_write(BufWriter::new(f))?;

            train_repr.save(dir.join(representations_filename(Split::Train)))?;
            test_repr.save(dir.join(representations_filename(Split::Test)))?;
            dev_repr.save(dir.join(representations_filename(Split::Dev)))
        })?;

        Ok(PrepareOutcome::Prepared)
    }

    /// Prepare a language, converting failures into skips.
    pub fn prepare_or_skip(
        &self,
        language: &str,
        treebank_dir: impl AsRef<Path>,
        out_dir: impl AsRef<Path>,
    ) -> PrepareOutcome {
        let out_dir = out_dir.as_ref();
        let outcome = match self.prepare_language(treebank_dir, out_dir) {
            Ok(outcome) => outcome,
            Err(err) => {
                let reason = match err.find_root_cause().downcast_ref::<ParseError>() {
                    Some(parse_err) => format!("malformed treebank: {}", parse_err),
                    None => err.iter_chain().map(ToString::to_string).join(": "),
                };
                PrepareOutcome::Skipped { reason }
            }
        };

        match &outcome {
            PrepareOutcome::Prepared => info!(language, "prepared"),
            PrepareOutcome::Exists => info!(
                language,
                out_dir = %out_dir.to_string_lossy(),
                "skipped, output directory already exists"
            ),
            PrepareOutcome::Skipped { reason } => warn!(language, %reason, "skipped"),
        }

        outcome
    }
}
