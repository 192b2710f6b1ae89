use failure::Fail;

/// Alignment errors.
#[derive(Clone, Debug, Eq, Fail, PartialEq)]
pub enum AlignError {
    /// A bracketing token is not in the vocabulary.
    #[fail(display = "special token '{}' is not in the vocabulary", token)]
    UnknownSpecialToken { token: String },

    /// The encoder returned a different number of vectors than tokens.
    #[fail(
        display = "encoder returned {} vectors for {} token identifiers",
        found, expected
    )]
    RepresentationLength { expected: usize, found: usize },

    /// A span refers to positions beyond the encoder output.
    #[fail(
        display = "span {}..{} is out of bounds for {} sub-token vectors",
        start, end, len
    )]
    SpanOutOfBounds { start: usize, end: usize, len: usize },

    /// A token identifier is not known to the encoder.
    #[fail(display = "unknown token identifier: {}", id)]
    UnknownTokenId { id: u32 },
}
