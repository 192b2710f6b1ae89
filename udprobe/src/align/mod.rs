//! Alignment of words to sub-word units.
//!
//! Encoders operate on sub-word units, while probes operate on
//! words. The `Aligner` maps the words of a sentence to spans of
//! sub-word tokens and pools the sub-word vectors of each span back
//! into one vector per word.

use failure::Fallible;
use ndarray::{s, Array2, ArrayView2, Axis};

mod encoder;
pub use self::encoder::{EmbeddingEncoder, WordEncoder};

mod error;
pub use self::error::AlignError;

mod tokenizer;
pub use self::tokenizer::{BertTokenizer, SpecialTokens, SubwordTokenizer};

/// Default maximum length of an encoder input, including brackets.
pub const DEFAULT_MAX_LEN: usize = 512;

/// Half-open span of sub-word positions that belong to one word.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Alignment of words to sub-word tokens.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Alignment {
    /// One span per aligned word, in word order. Positions do not
    /// include the start token.
    pub spans: Vec<Span>,

    /// Token identifiers, bracketed by the start and end tokens.
    pub token_ids: Vec<u32>,
}

/// Word to sub-word aligner.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Aligner {
    max_len: usize,
}

impl Default for Aligner {
    fn default() -> Self {
        Aligner::new(DEFAULT_MAX_LEN)
    }
}

impl Aligner {
    /// Construct an aligner for encoder inputs of at most `max_len` tokens.
    pub fn new(max_len: usize) -> Self {
        Aligner { max_len }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Align words to sub-word tokens.
    ///
    /// Words are added greedily. When the sub-word tokens of a word do
    /// not fit in the length budget anymore, that word and all words
    /// that follow it are not aligned.
    pub fn align<S, T>(&self, words: &[S], tokenizer: &T) -> Fallible<Alignment>
    where
        S: AsRef<str>,
        T: ?Sized + SubwordTokenizer,
    {
        let mut sub_tokens = Vec::new();
        let mut spans = Vec::with_capacity(words.len());

        for word in words {
            let word_sub_tokens = tokenizer.tokenize(word.as_ref())?;
            let start = sub_tokens.len();
            let end = start + word_sub_tokens.len();
            if end + 2 > self.max_len {
                break;
            }

            sub_tokens.extend(word_sub_tokens);
            spans.push(Span::new(start, end));
        }

        let mut token_ids = Vec::with_capacity(sub_tokens.len() + 2);
        token_ids.push(special_token_id(tokenizer, tokenizer.start_token())?);
        token_ids.extend(
            sub_tokens
                .iter()
                .map(|token| tokenizer.token_id(token).unwrap_or_else(|| tokenizer.unknown_id())),
        );
        token_ids.push(special_token_id(tokenizer, tokenizer.end_token())?);

        Ok(Alignment { spans, token_ids })
    }

    /// Get one vector per word from an encoder.
    ///
    /// The returned matrix has one row per aligned word, which can be
    /// fewer than the number of words when the sentence exceeds the
    /// length budget.
    pub fn represent<S, T, E>(&self, words: &[S], tokenizer: &T, encoder: &E) -> Fallible<Array2<f32>>
    where
        S: AsRef<str>,
        T: ?Sized + SubwordTokenizer,
        E: ?Sized + WordEncoder,
    {
        let alignment = self.align(words, tokenizer)?;
        let hidden = encoder.encode(&alignment.token_ids)?;

        if hidden.nrows() != alignment.token_ids.len() {
            return Err(AlignError::RepresentationLength {
                expected: alignment.token_ids.len(),
                found: hidden.nrows(),
            }
            .into());
        }

        // Strip the start and end token.
        let sub_words = hidden.slice(s![1..hidden.nrows() - 1, ..]);

        Ok(aggregate(sub_words, &alignment.spans)?)
    }
}

fn special_token_id<T>(tokenizer: &T, token: &str) -> Result<u32, AlignError>
where
    T: ?Sized + SubwordTokenizer,
{
    tokenizer
        .token_id(token)
        .ok_or_else(|| AlignError::UnknownSpecialToken {
            token: token.to_owned(),
        })
}

/// Pool sub-word vectors into word vectors.
///
/// `hidden` contains one vector per sub-word token, without the
/// bracketing tokens. The result has exactly one row per span: the
/// vector of a single-token span is copied, the vectors of longer
/// spans are averaged. A span without tokens results in a zero vector.
pub fn aggregate(hidden: ArrayView2<f32>, spans: &[Span]) -> Result<Array2<f32>, AlignError> {
    let mut words = Array2::zeros((spans.len(), hidden.ncols()));

    for (span, mut word) in spans.iter().zip(words.axis_iter_mut(Axis(0))) {
        if span.end > hidden.nrows() || span.start > span.end {
            return Err(AlignError::SpanOutOfBounds {
                start: span.start,
                end: span.end,
                len: hidden.nrows(),
            });
        }

        let span_vectors = hidden.slice(s![span.start..span.end, ..]);
        if let Some(mean) = span_vectors.mean_axis(Axis(0)) {
            word.assign(&mean);
        }
    }

    Ok(words)
}

#[cfg(test)]
mod tests {
    use failure::Fallible;
    use ndarray::{array, Array2};

    use super::{aggregate, AlignError, Aligner, EmbeddingEncoder, Span, SubwordTokenizer};

    /// Tokenizer that splits words in chunks of at most two characters.
    struct PairTokenizer;

    impl SubwordTokenizer for PairTokenizer {
        fn tokenize(&self, word: &str) -> Fallible<Vec<String>> {
            Ok(word
                .chars()
                .collect::<Vec<_>>()
                .chunks(2)
                .map(|chunk| chunk.iter().collect())
                .collect())
        }

        fn token_id(&self, token: &str) -> Option<u32> {
            match token {
                "<s>" => Some(0),
                "</s>" => Some(1),
                token if token.len() == 1 => Some(2),
                token if token.len() == 2 => Some(3),
                _ => None,
            }
        }

        fn unknown_id(&self) -> u32 {
            4
        }

        fn start_token(&self) -> &str {
            "<s>"
        }

        fn end_token(&self) -> &str {
            "</s>"
        }
    }

    #[test]
    fn spans_and_identifiers() {
        let alignment = Aligner::default()
            .align(&["a", "bcd", "ef"], &PairTokenizer)
            .unwrap();
        assert_eq!(
            alignment.spans,
            vec![Span::new(0, 1), Span::new(1, 3), Span::new(3, 4)]
        );
        assert_eq!(alignment.token_ids, vec![0, 2, 3, 2, 3, 1]);
    }

    #[test]
    fn truncates_at_length_budget() {
        // Budget of 5: brackets plus at most 3 sub-words.
        let alignment = Aligner::new(5)
            .align(&["abcd", "ef", "g"], &PairTokenizer)
            .unwrap();
        assert_eq!(alignment.spans, vec![Span::new(0, 2), Span::new(2, 3)]);
        assert_eq!(alignment.token_ids.len(), 5);

        // A word that does not fit drops all following words, even
        // when these would fit.
        let alignment = Aligner::new(4)
            .align(&["ab", "cdef", "g"], &PairTokenizer)
            .unwrap();
        assert_eq!(alignment.spans, vec![Span::new(0, 1)]);
        assert_eq!(alignment.token_ids, vec![0, 3, 1]);
    }

    #[test]
    fn never_more_spans_than_words() {
        let words = ["a", "bc", "defgh", "", "ijklmnopq"];
        for max_len in 0..16 {
            let alignment = Aligner::new(max_len).align(&words, &PairTokenizer).unwrap();
            assert!(alignment.spans.len() <= words.len());
            assert!(alignment.token_ids.len() <= max_len.max(2));
        }
    }

    #[test]
    fn aggregate_pools_spans() {
        let hidden = array![[1., 2.], [3., 4.], [5., 6.], [7., 8.]];
        let spans = vec![Span::new(0, 1), Span::new(1, 4), Span::new(4, 4)];
        let words = aggregate(hidden.view(), &spans).unwrap();
        assert_eq!(words.nrows(), spans.len());
        assert_eq!(words, array![[1., 2.], [5., 6.], [0., 0.]]);
    }

    #[test]
    fn aggregate_rejects_out_of_bounds_spans() {
        let hidden = array![[1., 2.]];
        assert_eq!(
            aggregate(hidden.view(), &[Span::new(0, 2)]).unwrap_err(),
            AlignError::SpanOutOfBounds {
                start: 0,
                end: 2,
                len: 1
            }
        );
    }

    #[test]
    fn represent_sentence() {
        // Vectors for: <s>, </s>, single char, char pair, unknown.
        let encoder = EmbeddingEncoder::new(array![
            [0., 0.],
            [9., 9.],
            [1., 0.],
            [0., 1.],
            [5., 5.]
        ]);

        let words = Aligner::default()
            .represent(&["abc", "d"], &PairTokenizer, &encoder)
            .unwrap();
        assert_eq!(words, array![[0.5, 0.5], [1., 0.]]);
    }

    #[test]
    fn represent_empty_sentence() {
        let encoder = EmbeddingEncoder::new(Array2::zeros((5, 3)));
        let words = Aligner::new(2)
            .represent(&["abc", "d"], &PairTokenizer, &encoder)
            .unwrap();
        assert_eq!(words.dim(), (0, 3));
    }
}
