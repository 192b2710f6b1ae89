use failure::Fail;

/// CoNLL-U parse errors.
#[derive(Clone, Debug, Eq, Fail, PartialEq)]
pub enum ParseError {
    /// A data line has fewer than the six leading CoNLL-U columns.
    #[fail(
        display = "line {}: expected at least 6 tab-separated fields, found {}",
        line, fields
    )]
    TooFewFields { line: usize, fields: usize },

    /// A morphological feature is not of the form `Key=Value`.
    #[fail(display = "malformed feature '{}', expected Key=Value", feature)]
    MalformedFeature { feature: String },
}

/// Sampling errors.
#[derive(Clone, Copy, Debug, Eq, Fail, PartialEq)]
pub enum SamplingError {
    /// The requested sample is larger than the split.
    #[fail(
        display = "cannot sample {} sentences from a population of {}",
        sample_size, population
    )]
    InsufficientPopulation {
        sample_size: usize,
        population: usize,
    },
}
