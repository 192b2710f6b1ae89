use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use failure::{Fallible, ResultExt};
use serde_derive::Serialize;
use tracing::{info, warn};

use super::config::ProbeConfig;
use super::preprocess::{representations_filename, PREPROCESSED_JSON};
use crate::classifier::ClassifierType;
use crate::corpus::{Data, Sampling, Split};
use crate::extract::{ContextualFeatures, ControlTaskFeatures, RandomFeatures};
use crate::probe::{
    sensitivity, ClassifierProbe, MajorityBaseline, Probe, ProbeData, ProbeError, ProbeScores,
};
use crate::property::Property;
use crate::repr::Representations;

/// Probing results of a language.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LanguageResult {
    pub language: String,

    /// Labels of the training data.
    pub classes: BTreeSet<String>,

    pub classifier: ProbeScores,
    pub majority: ProbeScores,
    pub random: ProbeScores,
    pub control: ProbeScores,

    /// Classifier accuracy minus control task accuracy.
    pub sensitivity: f64,

    /// The language has fewer training sentences than the small
    /// sample threshold.
    pub small_sample: bool,
}

/// Probing experiment over preprocessed languages.
pub struct ProbeExperiment {
    config: ProbeConfig,
    property: Property,
    classifier_type: ClassifierType,
}

impl ProbeExperiment {
    /// Construct an experiment, failing on an unknown property or
    /// classifier type.
    pub fn new(config: ProbeConfig) -> Result<Self, ProbeError> {
        let property = config.property()?;
        let classifier_type = config.classifier_type()?;

        Ok(ProbeExperiment {
            config,
            property,
            classifier_type,
        })
    }

    pub fn classifier_type(&self) -> ClassifierType {
        self.classifier_type
    }

    pub fn property(&self) -> Property {
        self.property
    }

    /// Probe a language that was written by `Preprocessor`.
    ///
    /// Returns `None` when the language has no training data.
    pub fn probe_language(
        &self,
        language: &str,
        dir: impl AsRef<Path>,
    ) -> Fallible<Option<LanguageResult>> {
        let dir = dir.as_ref();

        let json_path = dir.join(PREPROCESSED_JSON);
        let f = File::open(&json_path)
            .context(format!("Cannot open '{}'", json_path.to_string_lossy()))?;
        let data = Data::from_json_read(BufReader::new(f))?;

        let train_repr = Representations::load(dir.join(representations_filename(Split::Train)))?;
        if train_repr.is_empty() {
            return Ok(None);
        }
        let test_repr = Representations::load(dir.join(representations_filename(Split::Test)))?;

        self.probe_data(language, &data, &train_repr, &test_repr)
            .map(Some)
    }

    /// Train and evaluate all probes on the data of a language.
    pub fn probe_data(
        &self,
        language: &str,
        data: &Data,
        train_repr: &Representations,
        test_repr: &Representations,
    ) -> Fallible<LanguageResult> {
        let unsampled = Sampling::default();
        let train = data.train(&unsampled)?;
        let test = data.test(&unsampled)?;
        let probe_data = ProbeData {
            train: &train,
            test: &test,
            train_repr,
            test_repr,
        };
        let train_config = &self.config.train;

        let mut classifier_probe = ClassifierProbe::with_extractor(
            probe_data,
            self.classifier_type,
            self.property,
            train_config,
            ContextualFeatures,
        );
        classifier_probe.train()?;
        let classes = classifier_probe.classes().clone();
        let classifier = classifier_probe.evaluate()?;
        info!(
            language,
            accuracy = classifier.accuracy,
            balanced_accuracy = classifier.balanced_accuracy,
            "classifier probe"
        );

        let mut majority_baseline =
            MajorityBaseline::with_property(&train, &test, self.property);
        majority_baseline.train()?;
        let majority = majority_baseline.evaluate()?;
        info!(
            language,
            accuracy = majority.accuracy,
            balanced_accuracy = majority.balanced_accuracy,
            "majority baseline"
        );

        let mut random_baseline = ClassifierProbe::with_extractor(
            probe_data,
            self.classifier_type,
            self.property,
            train_config,
            RandomFeatures::new(train_config.seed),
        );
        random_baseline.train()?;
        let random = random_baseline.evaluate()?;
        info!(
            language,
            accuracy = random.accuracy,
            balanced_accuracy = random.balanced_accuracy,
            "random baseline"
        );

        let mut control_probe = ClassifierProbe::with_extractor(
            probe_data,
            self.classifier_type,
            self.property,
            train_config,
            ControlTaskFeatures::new(&train, self.property, train_config.seed)?,
        );
        control_probe.train()?;
        let control = control_probe.evaluate()?;
        info!(
            language,
            accuracy = control.accuracy,
            balanced_accuracy = control.balanced_accuracy,
            "control task probe"
        );

        Ok(LanguageResult {
            language: language.to_owned(),
            classes,
            classifier,
            majority,
            random,
            control,
            sensitivity: sensitivity(&classifier, &control),
            small_sample: train_repr.len() < self.config.small_sample,
        })
    }

    /// Probe a language, logging and skipping it on failure.
    pub fn probe_or_skip(&self, language: &str, dir: impl AsRef<Path>) -> Option<LanguageResult> {
        match self.probe_language(language, dir) {
            Ok(Some(result)) => Some(result),
            Ok(None) => {
                warn!(language, "skipped, no training data");
                None
            }
            Err(err) => {
                match err.downcast_ref::<ProbeError>() {
                    Some(ProbeError::TooFewClasses { .. }) => {
                        warn!(language, "skipped, could not train: {}", err)
                    }
                    _ => warn!(language, "skipped: {}", err),
                }
                None
            }
        }
    }
}
