use std::collections::BTreeSet;

use failure::{format_err, Fallible};
use numberer::Numberer;

use super::{Predictions, Probe, ProbeData, ProbeError};
use crate::classifier::{Classifier, ClassifierType, TrainConfig};
use crate::extract::{
    ContextualFeatures, ControlTaskFeatures, FeatureExtractor, LabeledFeatures, ProbeSplit,
    RandomFeatures,
};
use crate::property::Property;

/// Probe with contextual word representations.
pub type ContextualProbe<'a> = ClassifierProbe<'a, ContextualFeatures>;

/// Probe with random word representations.
pub type RandomBaseline<'a> = ClassifierProbe<'a, RandomFeatures>;

/// Probe with random labels per word form.
pub type ControlTaskProbe<'a> = ClassifierProbe<'a, ControlTaskFeatures>;

/// Probe that trains a classifier on extracted features.
pub struct ClassifierProbe<'a, E> {
    data: ProbeData<'a>,
    property: Property,
    extractor: E,
    classifier: Box<dyn Classifier>,
    labels: Option<Numberer<String>>,
    classes: BTreeSet<String>,
}

impl<'a, E> ClassifierProbe<'a, E>
where
    E: FeatureExtractor,
{
    pub fn with_extractor(
        data: ProbeData<'a>,
        classifier_type: ClassifierType,
        property: Property,
        config: &TrainConfig,
        extractor: E,
    ) -> Self {
        ClassifierProbe {
            data,
            property,
            extractor,
            classifier: classifier_type.classifier(config),
            labels: None,
            classes: BTreeSet::new(),
        }
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    pub fn property(&self) -> Property {
        self.property
    }

    fn features_and_labels(&mut self, split: ProbeSplit) -> Fallible<LabeledFeatures> {
        let (sentences, representations) = match split {
            ProbeSplit::Train => (self.data.train, self.data.train_repr),
            ProbeSplit::Test => (self.data.test, self.data.test_repr),
        };

        let labeled =
            self.extractor
                .features_and_labels(sentences, representations, self.property)?;
        self.classes = labeled.classes();

        Ok(labeled)
    }
}

impl<'a> ContextualProbe<'a> {
    /// Construct a probe on contextual representations.
    ///
    /// Fails when the classifier type or property is unknown.
    pub fn new(
        data: ProbeData<'a>,
        classifier: &str,
        property: &str,
        config: &TrainConfig,
    ) -> Result<Self, ProbeError> {
        Ok(ClassifierProbe::with_extractor(
            data,
            classifier.parse()?,
            property.parse()?,
            config,
            ContextualFeatures,
        ))
    }
}

impl<'a> RandomBaseline<'a> {
    /// Construct a probe on random per-form representations.
    pub fn new(
        data: ProbeData<'a>,
        classifier: &str,
        property: &str,
        config: &TrainConfig,
    ) -> Result<Self, ProbeError> {
        Ok(ClassifierProbe::with_extractor(
            data,
            classifier.parse()?,
            property.parse()?,
            config,
            RandomFeatures::new(config.seed),
        ))
    }
}

impl<'a> ControlTaskProbe<'a> {
    /// Construct a control task probe.
    ///
    /// The number of control classes is the number of distinct property
    /// values in the training sentences.
    pub fn new(
        data: ProbeData<'a>,
        classifier: &str,
        property: &str,
        config: &TrainConfig,
    ) -> Fallible<Self> {
        let classifier_type = classifier.parse::<ClassifierType>()?;
        let property = property.parse::<Property>()?;
        let extractor = ControlTaskFeatures::new(data.train, property, config.seed)?;

        Ok(ClassifierProbe::with_extractor(
            data,
            classifier_type,
            property,
            config,
            extractor,
        ))
    }
}

impl<'a, E> Probe for ClassifierProbe<'a, E>
where
    E: FeatureExtractor,
{
    fn train(&mut self) -> Fallible<()> {
        let labeled = self.features_and_labels(ProbeSplit::Train)?;

        let mut numberer = Numberer::new(0);
        let label_ids: Vec<_> = labeled
            .labels
            .into_iter()
            .map(|label| numberer.add(label))
            .collect();

        let n_classes = numberer.len();
        if n_classes < 2 {
            return Err(ProbeError::TooFewClasses { n_classes }.into());
        }

        self.classifier
            .fit(labeled.features.view(), &label_ids, n_classes)?;
        self.labels = Some(numberer);

        Ok(())
    }

    fn test(&mut self) -> Fallible<Predictions> {
        if self.labels.is_none() {
            return Err(ProbeError::NotTrained.into());
        }

        let labeled = self.features_and_labels(ProbeSplit::Test)?;
        let labels = self.labels.as_ref().ok_or(ProbeError::NotTrained)?;

        let predicted = self
            .classifier
            .predict(labeled.features.view())?
            .into_iter()
            .map(|label_id| {
                labels.value(label_id).cloned().ok_or_else(|| {
                    format_err!("Classifier predicted unknown label: {}", label_id)
                })
            })
            .collect::<Fallible<Vec<_>>>()?;

        Ok(Predictions {
            predicted,
            gold: labeled.labels,
        })
    }

    fn classes(&self) -> &BTreeSet<String> {
        &self.classes
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::{ContextualProbe, ControlTaskProbe, RandomBaseline};
    use crate::classifier::{LrScheduleConfig, TrainConfig};
    use crate::corpus::{parse, Sentence};
    use crate::probe::{Probe, ProbeData, ProbeError};
    use crate::repr::Representations;

    static TRAIN: &str = "1\tdogs\tdog\tNOUN\tNNS\tNumber=Plur
2\tbark\tbark\tVERB\tVBP\tTense=Pres

1\tcats\tcat\tNOUN\tNNS\tNumber=Plur
2\tsleep\tsleep\tVERB\tVBP\tTense=Pres

1\tdog\tdog\tNOUN\tNN\tNumber=Sing
2\tbarks\tbark\tVERB\tVBZ\tTense=Pres

1\tcat\tcat\tNOUN\tNN\tNumber=Sing
2\tsleeps\tsleep\tVERB\tVBZ\tTense=Pres
";

    static TEST: &str = "1\tbirds\tbird\tNOUN\tNNS\tNumber=Plur
2\tsing\tsing\tVERB\tVBP\tTense=Pres
";

    fn sentence_repr(sentences: &[Sentence]) -> Representations {
        // Nouns and verbs are separated by the first dimension.
        Representations::from_matrices(sentences.iter().map(|sentence| {
            Array2::from_shape_fn((sentence.len(), 2), |(row, col)| {
                let noun = sentence[row].upos() == "NOUN";
                match (col, noun) {
                    (0, true) => 1.0,
                    (0, false) => -1.0,
                    _ => 0.1 * row as f32,
                }
            })
        }))
    }

    fn config() -> TrainConfig {
        TrainConfig {
            max_epochs: 100,
            batch_size: 2,
            lr: LrScheduleConfig::Constant { lr: 0.1 },
            ..TrainConfig::default()
        }
    }

    #[test]
    fn contextual_probe_learns_upos() {
        let train = parse(TRAIN).unwrap();
        let test = parse(TEST).unwrap();
        let train_repr = sentence_repr(&train);
        let test_repr = sentence_repr(&test);
        let data = ProbeData {
            train: &train,
            test: &test,
            train_repr: &train_repr,
            test_repr: &test_repr,
        };

        let mut probe = ContextualProbe::new(data, "SGD", "upos", &config()).unwrap();
        probe.train().unwrap();
        let scores = probe.evaluate().unwrap();

        assert_eq!(scores.accuracy, 1.0);
        assert_eq!(scores.balanced_accuracy, 1.0);
        assert_eq!(
            probe.classes().iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["NOUN", "VERB"]
        );
    }

    #[test]
    fn probe_must_be_trained() {
        let train = parse(TRAIN).unwrap();
        let repr = sentence_repr(&train);
        let data = ProbeData {
            train: &train,
            test: &train,
            train_repr: &repr,
            test_repr: &repr,
        };

        let mut probe = RandomBaseline::new(data, "MLP", "Number", &config()).unwrap();
        let err = probe
            .evaluate()
            .unwrap_err()
            .downcast::<ProbeError>()
            .unwrap();
        assert_eq!(err, ProbeError::NotTrained);
    }

    #[test]
    fn construction_validates_names() {
        let train = parse(TRAIN).unwrap();
        let repr = sentence_repr(&train);
        let data = ProbeData {
            train: &train,
            test: &train,
            train_repr: &repr,
            test_repr: &repr,
        };

        assert_eq!(
            ContextualProbe::new(data, "SVM", "upos", &config()).err(),
            Some(ProbeError::InvalidClassifier {
                classifier: "SVM".to_owned()
            })
        );
        assert_eq!(
            ContextualProbe::new(data, "SGD", "Mood", &config()).err(),
            Some(ProbeError::InvalidProperty {
                property: "Mood".to_owned()
            })
        );
        assert!(ControlTaskProbe::new(data, "SGD", "lemma", &config()).is_err());
    }

    #[test]
    fn single_class_cannot_be_trained() {
        let train = parse(TRAIN).unwrap();
        let repr = sentence_repr(&train);
        let data = ProbeData {
            train: &train,
            test: &train,
            train_repr: &repr,
            test_repr: &repr,
        };

        let mut probe = ContextualProbe::new(data, "SGD", "Tense", &config()).unwrap();
        let err = probe
            .train()
            .unwrap_err()
            .downcast::<ProbeError>()
            .unwrap();
        assert_eq!(err, ProbeError::TooFewClasses { n_classes: 1 });
    }

    #[test]
    fn control_task_classes_follow_training_data() {
        let train = parse(TRAIN).unwrap();
        let repr = sentence_repr(&train);
        let data = ProbeData {
            train: &train,
            test: &train,
            train_repr: &repr,
            test_repr: &repr,
        };

        let probe = ControlTaskProbe::new(data, "SGD", "upos", &config()).unwrap();
        assert_eq!(probe.extractor().n_classes(), 2);

        let probe = ControlTaskProbe::new(data, "SGD", "Number", &config()).unwrap();
        assert_eq!(probe.extractor().n_classes(), 2);
        assert!(probe.classes().is_empty());
    }
}
