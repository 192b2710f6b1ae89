//! Cached word representations.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use failure::{Fallible, ResultExt};
use ndarray::{Array2, ArrayView2};
use ndarray_npy::{NpzReader, NpzWriter};

const NPY_SUFFIX: &str = ".npy";

/// Word representations of the sentences of one split.
///
/// Representations are keyed by the index of the sentence in the
/// split. The representation of a sentence has one row per aligned
/// word, which may be fewer rows than the sentence has words.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Representations {
    sentences: HashMap<String, Array2<f32>>,
}

impl Representations {
    pub fn new() -> Self {
        Representations::default()
    }

    /// Construct representations from matrices in sentence order.
    pub fn from_matrices(matrices: impl IntoIterator<Item = Array2<f32>>) -> Self {
        Representations {
            sentences: matrices
                .into_iter()
                .enumerate()
                .map(|(idx, matrix)| (idx.to_string(), matrix))
                .collect(),
        }
    }

    /// Add the representation of the next sentence.
    pub fn push(&mut self, matrix: Array2<f32>) {
        let idx = self.sentences.len();
        self.sentences.insert(idx.to_string(), matrix);
    }

    /// Get the representation of the sentence with index `idx`.
    pub fn get(&self, idx: usize) -> Option<ArrayView2<f32>> {
        self.sentences.get(&idx.to_string()).map(Array2::view)
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Dimensionality of the word vectors, `None` without representations.
    pub fn dims(&self) -> Option<usize> {
        self.sentences.values().next().map(Array2::ncols)
    }

    /// Read representations from an `.npz` archive.
    pub fn from_npz_read<R>(read: R) -> Fallible<Self>
    where
        R: Read + Seek,
    {
        let mut npz = NpzReader::new(read)?;
        let mut sentences = HashMap::new();
        for name in npz.names()? {
            let matrix: Array2<f32> = npz.by_name(&name)?;
            let key = name.strip_suffix(NPY_SUFFIX).unwrap_or(&name).to_owned();
            sentences.insert(key, matrix);
        }

        Ok(Representations { sentences })
    }

    /// Write representations to a compressed `.npz` archive.
    pub fn to_npz_write<W>(&self, write: W) -> Fallible<()>
    where
        W: Write + Seek,
    {
        let mut npz = NpzWriter::new_compressed(write);

        // Write in sentence order to get reproducible archives.
        let mut keys = self.sentences.keys().collect::<Vec<_>>();
        keys.sort_by_key(|key| (key.len(), (*key).clone()));
        for key in keys {
            npz.add_array(key.as_str(), &self.sentences[key])?;
        }

        npz.finish()?;

        Ok(())
    }

    /// Load representations from an `.npz` file.
    pub fn load(path: impl AsRef<Path>) -> Fallible<Self> {
        let path = path.as_ref();
        let f = File::open(path)
            .context(format!("Cannot open '{}'", path.to_string_lossy()))?;
        Ok(Self::from_npz_read(BufReader::new(f))
            .context(format!("Cannot read representations from '{}'", path.to_string_lossy()))?)
    }

    /// Save representations to an `.npz` file.
    pub fn save(&self, path: impl AsRef<Path>) -> Fallible<()> {
        let path = path.as_ref();
        let f = File::create(path)
            .context(format!("Cannot create '{}'", path.to_string_lossy()))?;
        self.to_npz_write(BufWriter::new(f))
    }
}
