use failure::Fallible;
use finalfusion::prelude::*;
use ndarray::{Array1, Array2, Axis};

use super::{AlignError, BertTokenizer};

/// Word representation provider.
///
/// An encoder maps a bracketed sequence of token identifiers to one
/// vector per position, including the two bracketing positions.
/// Encoders must be deterministic.
///
/// Contextual representations, such as the hidden states of a
/// multilingual transformer, are obtained by implementing this trait
/// for the model and passing it to `Preprocessor`.
pub trait WordEncoder {
    /// Dimensionality of the token vectors.
    fn dims(&self) -> usize;

    /// Encode a sequence of token identifiers.
    fn encode(&self, token_ids: &[u32]) -> Fallible<Array2<f32>>;
}

/// Encoder with a fixed vector per vocabulary entry.
///
/// This encoder does not use context: every occurrence of a sub-word
/// unit gets the same vector. It is the only encoder that the `udprobe`
/// binary can load, so contextual probing requires a `WordEncoder`
/// implementation for the model of interest.
pub struct EmbeddingEncoder {
    table: Array2<f32>,
}

impl EmbeddingEncoder {
    /// Construct an encoder from a table with one row per token identifier.
    pub fn new(table: Array2<f32>) -> Self {
        EmbeddingEncoder { table }
    }

    /// Construct an encoder from finalfusion embeddings.
    ///
    /// Vocabulary entries without an embedding get the normalized
    /// average of all embeddings.
    pub fn from_embeddings(
        embeddings: &Embeddings<VocabWrap, StorageWrap>,
        tokenizer: &BertTokenizer,
    ) -> Self {
        let mut unknown = Array1::zeros(embeddings.dims());

        for (_, embed) in embeddings {
            unknown += &embed;
        }

        let l2norm = unknown.dot(&unknown).sqrt();
        if l2norm != 0f32 {
            unknown /= l2norm;
        }

        let mut table = Array2::zeros((tokenizer.vocab_len(), embeddings.dims()));
        for (token, mut row) in tokenizer.tokens().iter().zip(table.axis_iter_mut(Axis(0))) {
            match embeddings.embedding(token) {
                Some(embed) => row.assign(&embed),
                None => row.assign(&unknown),
            }
        }

        EmbeddingEncoder { table }
    }
}

impl WordEncoder for EmbeddingEncoder {
    fn dims(&self) -> usize {
        self.table.ncols()
    }

    fn encode(&self, token_ids: &[u32]) -> Fallible<Array2<f32>> {
        if let Some(&id) = token_ids
            .iter()
            .find(|&&id| id as usize >= self.table.nrows())
        {
            return Err(AlignError::UnknownTokenId { id }.into());
        }

        let indices = token_ids.iter().map(|&id| id as usize).collect::<Vec<_>>();
        Ok(self.table.select(Axis(0), &indices))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{array, Array2};

    use super::{EmbeddingEncoder, WordEncoder};
    use crate::align::AlignError;

    #[test]
    fn encodes_rows() {
        let encoder = EmbeddingEncoder::new(array![[0., 1.], [2., 3.], [4., 5.]]);
        assert_eq!(encoder.dims(), 2);
        assert_eq!(
            encoder.encode(&[2, 0, 2]).unwrap(),
            array![[4., 5.], [0., 1.], [4., 5.]]
        );
        assert_eq!(encoder.encode(&[]).unwrap(), Array2::<f32>::zeros((0, 2)));
    }

    #[test]
    fn unknown_identifier() {
        let encoder = EmbeddingEncoder::new(array![[0., 1.]]);
        let err = encoder
            .encode(&[0, 1])
            .unwrap_err()
            .downcast::<AlignError>()
            .unwrap();
        assert_eq!(err, AlignError::UnknownTokenId { id: 1 });
    }
}
