use failure::Fail;

/// Probe errors.
#[derive(Clone, Debug, Eq, Fail, PartialEq)]
pub enum ProbeError {
    /// The property is not one of the probed properties.
    #[fail(
        display = "invalid property '{}', must be one of: upos, Number, Case, Tense, Gender",
        property
    )]
    InvalidProperty { property: String },

    /// The classifier type is unknown.
    #[fail(
        display = "invalid classifier type '{}', must be one of: SGD, MLP",
        classifier
    )]
    InvalidClassifier { classifier: String },

    /// Features can only be extracted from the train and test splits.
    #[fail(display = "invalid split '{}', must be either 'train' or 'test'", split)]
    InvalidSplit { split: String },

    /// The probe is evaluated before it was trained.
    #[fail(display = "the probe must be trained before it can be evaluated")]
    NotTrained,

    /// The training data has too few distinct labels to fit a classifier.
    #[fail(display = "at least 2 classes are required for training, found {}", n_classes)]
    TooFewClasses { n_classes: usize },

    /// A sentence does not have a representation.
    #[fail(display = "no representation for sentence {}", idx)]
    MissingRepresentation { idx: usize },
}
