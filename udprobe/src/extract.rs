//! Extraction of (feature, label) pairs for probing.
//!
//! Every extractor walks over the words of a split that have a
//! representation. When a sentence has more words than its
//! representation has rows, the remaining words are ignored.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use failure::Fallible;
use ndarray::{Array1, Array2, ArrayView1};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

use crate::corpus::{Sentence, Split, Word};
use crate::probe::ProbeError;
use crate::property::{Property, PropertyValue};
use crate::repr::Representations;

/// Splits that a probe extracts features from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProbeSplit {
    Train,
    Test,
}

impl ProbeSplit {
    pub fn as_str(self) -> &'static str {
        match self {
            ProbeSplit::Train => "train",
            ProbeSplit::Test => "test",
        }
    }
}

impl fmt::Display for ProbeSplit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProbeSplit {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(ProbeSplit::Train),
            "test" => Ok(ProbeSplit::Test),
            _ => Err(ProbeError::InvalidSplit {
                split: s.to_owned(),
            }),
        }
    }
}

impl From<ProbeSplit> for Split {
    fn from(split: ProbeSplit) -> Self {
        match split {
            ProbeSplit::Train => Split::Train,
            ProbeSplit::Test => Split::Test,
        }
    }
}

/// Feature matrix with one label per row.
#[derive(Clone, Debug, PartialEq)]
pub struct LabeledFeatures {
    pub features: Array2<f32>,
    pub labels: Vec<String>,
}

impl LabeledFeatures {
    fn from_rows(rows: Vec<f32>, labels: Vec<String>, dims: usize) -> Fallible<Self> {
        let features = Array2::from_shape_vec((labels.len(), dims), rows)?;
        Ok(LabeledFeatures { features, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The distinct labels.
    pub fn classes(&self) -> BTreeSet<String> {
        self.labels.iter().cloned().collect()
    }
}

/// Extraction of features and labels from a split.
pub trait FeatureExtractor {
    fn features_and_labels(
        &mut self,
        sentences: &[Sentence],
        representations: &Representations,
        property: Property,
    ) -> Fallible<LabeledFeatures>;
}

/// Call `f` for every word that has a representation.
fn for_each_aligned_word<F>(
    sentences: &[Sentence],
    representations: &Representations,
    mut f: F,
) -> Fallible<()>
where
    F: FnMut(&Word, ArrayView1<f32>) -> Fallible<()>,
{
    for (idx, sentence) in sentences.iter().enumerate() {
        let matrix = representations
            .get(idx)
            .ok_or(ProbeError::MissingRepresentation { idx })?;

        for (word, vector) in sentence.iter().zip(matrix.outer_iter()) {
            f(word, vector)?;
        }
    }

    Ok(())
}

/// Contextual word representations labeled with property values.
///
/// Words that lack the property are skipped.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContextualFeatures;

impl FeatureExtractor for ContextualFeatures {
    fn features_and_labels(
        &mut self,
        sentences: &[Sentence],
        representations: &Representations,
        property: Property,
    ) -> Fallible<LabeledFeatures> {
        let dims = representations.dims().unwrap_or(0);
        let mut rows = Vec::new();
        let mut labels = Vec::new();

        for_each_aligned_word(sentences, representations, |word, vector| {
            if let Some(label) = word.value(property)? {
                rows.extend(vector.iter());
                labels.push(label.to_owned());
            }
            Ok(())
        })?;

        LabeledFeatures::from_rows(rows, labels, dims)
    }
}

/// Random vectors per word form, labeled with property values.
///
/// The vector of a form is drawn uniformly from *[0, 1)* when the form
/// is first seen and reused afterwards.
pub struct RandomFeatures {
    rng: XorShiftRng,
    form_vectors: HashMap<String, Array1<f32>>,
}

impl RandomFeatures {
    pub fn new(seed: u64) -> Self {
        RandomFeatures {
            rng: XorShiftRng::seed_from_u64(seed),
            form_vectors: HashMap::new(),
        }
    }

    /// The number of forms that have a vector.
    pub fn len(&self) -> usize {
        self.form_vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.form_vectors.is_empty()
    }
}

impl FeatureExtractor for RandomFeatures {
    fn features_and_labels(
        &mut self,
        sentences: &[Sentence],
        representations: &Representations,
        property: Property,
    ) -> Fallible<LabeledFeatures> {
        let dims = representations.dims().unwrap_or(0);
        let mut rows = Vec::new();
        let mut labels = Vec::new();

        let rng = &mut self.rng;
        let form_vectors = &mut self.form_vectors;
        for_each_aligned_word(sentences, representations, |word, vector| {
            let label = match word.value(property)? {
                Some(label) => label,
                None => return Ok(()),
            };

            let random_vector = form_vectors
                .entry(word.form().to_owned())
                .or_insert_with(|| Array1::from_shape_fn(vector.len(), |_| rng.gen::<f32>()));
            rows.extend(random_vector.iter());
            labels.push(label.to_owned());

            Ok(())
        })?;

        LabeledFeatures::from_rows(rows, labels, dims)
    }
}

/// Contextual word representations labeled with a random class per
/// word form.
///
/// The number of classes is the number of distinct property values in
/// the training data. Every word with a representation is labeled,
/// regardless of whether it has the property.
pub struct ControlTaskFeatures {
    rng: XorShiftRng,
    n_classes: usize,
    form_labels: HashMap<String, usize>,
}

impl ControlTaskFeatures {
    /// Construct control task features.
    ///
    /// `train` is used to determine the number of classes.
    pub fn new(train: &[Sentence], property: Property, seed: u64) -> Fallible<Self> {
        let n_classes = n_classes(train, property)?;
        if n_classes == 0 {
            return Err(ProbeError::TooFewClasses { n_classes }.into());
        }

        Ok(ControlTaskFeatures {
            rng: XorShiftRng::seed_from_u64(seed),
            n_classes,
            form_labels: HashMap::new(),
        })
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// The control label of a form, if it was assigned.
    pub fn form_label(&self, form: &str) -> Option<usize> {
        self.form_labels.get(form).copied()
    }
}

impl FeatureExtractor for ControlTaskFeatures {
    fn features_and_labels(
        &mut self,
        sentences: &[Sentence],
        representations: &Representations,
        _property: Property,
    ) -> Fallible<LabeledFeatures> {
        let dims = representations.dims().unwrap_or(0);
        let mut rows = Vec::new();
        let mut labels = Vec::new();

        let rng = &mut self.rng;
        let n_classes = self.n_classes;
        let form_labels = &mut self.form_labels;
        for_each_aligned_word(sentences, representations, |word, vector| {
            let label = *form_labels
                .entry(word.form().to_owned())
                .or_insert_with(|| rng.gen_range(0..n_classes));
            rows.extend(vector.iter());
            labels.push(label.to_string());

            Ok(())
        })?;

        LabeledFeatures::from_rows(rows, labels, dims)
    }
}

/// The number of distinct values of `property` in `sentences`.
pub fn n_classes(sentences: &[Sentence], property: Property) -> Fallible<usize> {
    let mut classes = BTreeSet::new();
    for word in sentences.iter().flat_map(Sentence::iter) {
        if let Some(value) = word.value(property)? {
            classes.insert(value);
        }
    }

    Ok(classes.len())
}

#[cfg(test)]
mod tests {
    use ndarray::{array, Array2};

    use super::{
        n_classes, ContextualFeatures, ControlTaskFeatures, FeatureExtractor, ProbeSplit,
        RandomFeatures,
    };
    use crate::corpus::{parse, Sentence};
    use crate::probe::ProbeError;
    use crate::property::Property;
    use crate::repr::Representations;

    static SENTENCES: &str = "1\tThe\tthe\tDET\tDT\tDefinite=Def
2\tdogs\tdog\tNOUN\tNNS\tNumber=Plur
3\tbark\tbark\tVERB\tVBP\tTense=Pres
4\t.\t.\tPUNCT\t.\t_

1\tThe\tthe\tDET\tDT\tDefinite=Def
2\tdog\tdog\tNOUN\tNN\tNumber=Sing
3\tbarked\tbark\tVERB\tVBD\tTense=Past
";

    fn sentences() -> Vec<Sentence> {
        parse(SENTENCES).unwrap()
    }

    fn representations() -> Representations {
        Representations::from_matrices(vec![
            array![[1.0, 1.5], [2.0, 2.5], [3.0, 3.5]],
            array![[4.0, 4.5], [5.0, 5.5], [6.0, 6.5]],
        ])
    }

    #[test]
    fn probe_split_names() {
        assert_eq!("train".parse::<ProbeSplit>().unwrap(), ProbeSplit::Train);
        assert_eq!("test".parse::<ProbeSplit>().unwrap(), ProbeSplit::Test);
        assert_eq!(
            "dev".parse::<ProbeSplit>().unwrap_err(),
            ProbeError::InvalidSplit {
                split: "dev".to_owned()
            }
        );
    }

    #[test]
    fn contextual_features_are_truncated() {
        let labeled = ContextualFeatures
            .features_and_labels(&sentences(), &representations(), Property::Upos)
            .unwrap();

        // The final punctuation of the first sentence has no representation.
        assert_eq!(labeled.len(), 6);
        assert_eq!(
            labeled.labels,
            vec!["DET", "NOUN", "VERB", "DET", "NOUN", "VERB"]
        );
        assert_eq!(labeled.features.row(3), array![4.0, 4.5]);
    }

    #[test]
    fn contextual_features_skip_words_without_property() {
        let labeled = ContextualFeatures
            .features_and_labels(&sentences(), &representations(), Property::Number)
            .unwrap();

        assert_eq!(labeled.labels, vec!["Plur", "Sing"]);
        assert_eq!(labeled.features, array![[2.0, 2.5], [5.0, 5.5]]);
    }

    #[test]
    fn missing_representation_is_an_error() {
        let representations = Representations::from_matrices(vec![Array2::zeros((4, 2))]);
        let err = ContextualFeatures
            .features_and_labels(&sentences(), &representations, Property::Upos)
            .unwrap_err()
            .downcast::<ProbeError>()
            .unwrap();
        assert_eq!(err, ProbeError::MissingRepresentation { idx: 1 });
    }

    #[test]
    fn random_features_are_memoized_per_form() {
        let mut extractor = RandomFeatures::new(42);
        let labeled = extractor
            .features_and_labels(&sentences(), &representations(), Property::Upos)
            .unwrap();

        assert_eq!(labeled.features.ncols(), 2);
        assert_eq!(labeled.labels, vec!["DET", "NOUN", "VERB", "DET", "NOUN", "VERB"]);
        // "The" occurs in both sentences.
        assert_eq!(labeled.features.row(0), labeled.features.row(3));
        assert_ne!(labeled.features.row(1), labeled.features.row(4));
        assert!(labeled.features.iter().all(|&v| v >= 0.0 && v < 1.0));
        assert_eq!(extractor.len(), 5);

        let again = extractor
            .features_and_labels(&sentences(), &representations(), Property::Upos)
            .unwrap();
        assert_eq!(again, labeled);
    }

    #[test]
    fn control_task_labels_are_memoized_per_form() {
        let sentences = sentences();
        let mut extractor = ControlTaskFeatures::new(&sentences, Property::Upos, 42).unwrap();
        assert_eq!(extractor.n_classes(), 4);

        let first = extractor
            .features_and_labels(&sentences, &representations(), Property::Upos)
            .unwrap();
        let second = extractor
            .features_and_labels(&sentences, &representations(), Property::Upos)
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.labels[0], first.labels[3]);
        assert_eq!(first.features, second.features);
        for label in &first.labels {
            assert!(label.parse::<usize>().unwrap() < 4);
        }
        assert_eq!(
            extractor.form_label("The").map(|label| label.to_string()),
            Some(first.labels[0].clone())
        );
    }

    #[test]
    fn control_task_labels_words_without_property() {
        let sentences = sentences();
        let mut extractor = ControlTaskFeatures::new(&sentences, Property::Tense, 7).unwrap();
        assert_eq!(extractor.n_classes(), 2);

        let labeled = extractor
            .features_and_labels(&sentences, &representations(), Property::Tense)
            .unwrap();
        assert_eq!(labeled.len(), 6);
    }

    #[test]
    fn control_task_requires_classes() {
        assert!(ControlTaskFeatures::new(&sentences(), Property::Gender, 1).is_err());
        assert_eq!(n_classes(&sentences(), Property::Gender).unwrap(), 0);
    }
}
