use std::collections::{BTreeSet, HashMap};

use failure::Fallible;

use super::{Predictions, Probe, ProbeError};
use crate::corpus::{Sentence, Word};
use crate::property::{Property, PropertyValue};

/// Label counts in order of first occurrence.
#[derive(Debug, Default)]
struct LabelCounts(Vec<(String, usize)>);

impl LabelCounts {
    fn add(&mut self, label: &str) {
        match self.0.iter_mut().find(|(known, _)| known == label) {
            Some((_, count)) => *count += 1,
            None => self.0.push((label.to_owned(), 1)),
        }
    }

    /// The most frequent label. Ties go to the label that was seen first.
    fn majority(&self) -> Option<&str> {
        let mut best: Option<&(String, usize)> = None;
        for entry in &self.0 {
            if best.map(|(_, count)| entry.1 > *count).unwrap_or(true) {
                best = Some(entry);
            }
        }

        best.map(|(label, _)| label.as_str())
    }
}

struct MajorityTable {
    form_majority: HashMap<String, String>,
    overall_majority: String,
}

/// Baseline that predicts the most frequent label of a word form.
///
/// Forms that did not occur in the training data get the most frequent
/// label overall.
pub struct MajorityBaseline<'a> {
    train: &'a [Sentence],
    test: &'a [Sentence],
    property: Property,
    table: Option<MajorityTable>,
    classes: BTreeSet<String>,
}

impl<'a> MajorityBaseline<'a> {
    /// Construct a majority baseline, failing on an unknown property.
    pub fn new(
        train: &'a [Sentence],
        test: &'a [Sentence],
        property: &str,
    ) -> Result<Self, ProbeError> {
        Ok(Self::with_property(train, test, property.parse()?))
    }

    pub fn with_property(train: &'a [Sentence], test: &'a [Sentence], property: Property) -> Self {
        MajorityBaseline {
            train,
            test,
            property,
            table: None,
            classes: BTreeSet::new(),
        }
    }

    /// The most frequent label in the training data.
    pub fn overall_majority(&self) -> Option<&str> {
        self.table
            .as_ref()
            .map(|table| table.overall_majority.as_str())
    }

    /// Predict the label of a word form.
    ///
    /// Returns `None` when the baseline was not trained.
    pub fn predict(&self, form: &str) -> Option<&str> {
        self.table.as_ref().map(|table| {
            table
                .form_majority
                .get(form)
                .unwrap_or(&table.overall_majority)
                .as_str()
        })
    }
}

/// Call `f` with every word that has the property and its value.
fn for_each_labeled_word<F>(sentences: &[Sentence], property: Property, mut f: F) -> Fallible<()>
where
    F: FnMut(&Word, &str),
{
    for word in sentences.iter().flat_map(Sentence::iter) {
        if let Some(label) = word.value(property)? {
            f(word, label);
        }
    }

    Ok(())
}

impl<'a> Probe for MajorityBaseline<'a> {
    fn train(&mut self) -> Fallible<()> {
        let mut form_counts: HashMap<String, LabelCounts> = HashMap::new();
        let mut overall_counts = LabelCounts::default();

        for_each_labeled_word(self.train, self.property, |word, label| {
            form_counts
                .entry(word.form().to_owned())
                .or_default()
                .add(label);
            overall_counts.add(label);
        })?;

        self.classes = overall_counts
            .0
            .iter()
            .map(|(label, _)| label.clone())
            .collect();

        let overall_majority = overall_counts
            .majority()
            .ok_or(ProbeError::TooFewClasses { n_classes: 0 })?
            .to_owned();
        let form_majority = form_counts
            .into_iter()
            .filter_map(|(form, counts)| {
                counts
                    .majority()
                    .map(|label| (form, label.to_owned()))
            })
            .collect();

        self.table = Some(MajorityTable {
            form_majority,
            overall_majority,
        });

        Ok(())
    }

    fn test(&mut self) -> Fallible<Predictions> {
        if self.table.is_none() {
            return Err(ProbeError::NotTrained.into());
        }

        let mut predicted = Vec::new();
        let mut gold = Vec::new();
        let mut classes = BTreeSet::new();
        let baseline = &*self;
        for_each_labeled_word(self.test, self.property, |word, label| {
            if let Some(prediction) = baseline.predict(word.form()) {
                predicted.push(prediction.to_owned());
                gold.push(label.to_owned());
                classes.insert(label.to_owned());
            }
        })?;
        self.classes = classes;

        Ok(Predictions { predicted, gold })
    }

    fn classes(&self) -> &BTreeSet<String> {
        &self.classes
    }
}
