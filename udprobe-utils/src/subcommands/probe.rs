use clap::{App, Arg, ArgMatches};
use ordered_float::NotNan;
use stdinout::{OrExit, Output};
use udprobe::classifier::LrScheduleConfig;
use udprobe::wrapper::{language_dirs, ProbeConfig, ProbeExperiment};

use crate::progress::language_progress;
use crate::report::write_probe_report;
use crate::traits::{UdprobeApp, UdprobeConfigApp};

static CLASSIFIER: &str = "CLASSIFIER";
static INITIAL_LR: &str = "INITIAL_LR";
static LR_PATIENCE: &str = "LR_PATIENCE";
static LR_SCALE: &str = "LR_SCALE";
static OUTPUT: &str = "OUTPUT";
static PATIENCE: &str = "PATIENCE";
static PREPROCESSED_DIR: &str = "PREPROCESSED_DIR";
static PROPERTY: &str = "PROPERTY";

pub struct LrSchedule {
    pub initial_lr: NotNan<f32>,
    pub lr_scale: NotNan<f32>,
    pub lr_patience: usize,
}

pub struct ProbeApp {
    config: String,
    preprocessed_dir: String,
    output: Option<String>,
    property: Option<String>,
    classifier: Option<String>,
    lr_schedule: Option<LrSchedule>,
    patience: Option<usize>,
}

impl ProbeApp {
    /// Apply command-line overrides to the probe configuration.
    fn probe_config(&self, mut config: ProbeConfig) -> ProbeConfig {
        if let Some(property) = &self.property {
            config.property = property.clone();
        }

        if let Some(classifier) = &self.classifier {
            config.classifier = classifier.clone();
        }

        if let Some(lr_schedule) = &self.lr_schedule {
            config.train.lr = LrScheduleConfig::Plateau {
                initial_lr: lr_schedule.initial_lr.into_inner(),
                scale: lr_schedule.lr_scale.into_inner(),
                patience: lr_schedule.lr_patience,
                warmup_steps: 0,
            };
        }

        if let Some(patience) = self.patience {
            config.train.patience = patience;
        }

        config
    }
}

impl UdprobeConfigApp for ProbeApp {}

impl UdprobeApp for ProbeApp {
    fn app() -> App<'static, 'static> {
        Self::config_app("probe")
            .about("Train and evaluate probes on preprocessed languages")
            .arg(
                Arg::with_name(PREPROCESSED_DIR)
                    .help("Directory with preprocessed languages")
                    .index(2)
                    .required(true),
            )
            .arg(
                Arg::with_name(OUTPUT)
                    .help("Output report (default: stdout)")
                    .index(3),
            )
            .arg(
                Arg::with_name(PROPERTY)
                    .long("property")
                    .value_name("PROPERTY")
                    .possible_values(&["upos", "Number", "Case", "Tense", "Gender"])
                    .help("Property to probe for"),
            )
            .arg(
                Arg::with_name(CLASSIFIER)
                    .long("classifier")
                    .value_name("TYPE")
                    .possible_values(&["SGD", "MLP"])
                    .help("Classifier type"),
            )
            .arg(
                Arg::with_name(INITIAL_LR)
                    .long("lr")
                    .value_name("LR")
                    .help("Initial learning rate"),
            )
            .arg(
                Arg::with_name(LR_PATIENCE)
                    .long("lr-patience")
                    .value_name("N")
                    .help("Scale learning rate after N epochs without improvement")
                    .default_value("2"),
            )
            .arg(
                Arg::with_name(LR_SCALE)
                    .long("lr-scale")
                    .value_name("SCALE")
                    .help("Value to scale the learning rate by")
                    .default_value("0.5"),
            )
            .arg(
                Arg::with_name(PATIENCE)
                    .long("patience")
                    .value_name("N")
                    .help("Maximum number of epochs without loss improvement"),
            )
    }

    fn parse(matches: &ArgMatches) -> Self {
        let config = matches.value_of(Self::CONFIG).unwrap().into();
        let preprocessed_dir = matches.value_of(PREPROCESSED_DIR).unwrap().into();
        let output = matches.value_of(OUTPUT).map(ToOwned::to_owned);
        let property = matches.value_of(PROPERTY).map(ToOwned::to_owned);
        let classifier = matches.value_of(CLASSIFIER).map(ToOwned::to_owned);

        // The schedule is only overridden when a learning rate is given.
        let lr_schedule = matches.value_of(INITIAL_LR).map(|initial_lr| LrSchedule {
            initial_lr: initial_lr
                .parse()
                .or_exit("Cannot parse initial learning rate", 1),
            lr_scale: matches
                .value_of(LR_SCALE)
                .unwrap()
                .parse()
                .or_exit("Cannot parse learning rate scale", 1),
            lr_patience: matches
                .value_of(LR_PATIENCE)
                .unwrap()
                .parse()
                .or_exit("Cannot parse learning rate patience", 1),
        });
        let patience = matches
            .value_of(PATIENCE)
            .map(|v| v.parse().or_exit("Cannot parse patience", 1));

        ProbeApp {
            config,
            preprocessed_dir,
            output,
            property,
            classifier,
            lr_schedule,
            patience,
        }
    }

    fn run(&self) {
        let config = Self::load_config(&self.config);
        let probe_config = self.probe_config(config.probe);
        probe_config
            .train
            .lr
            .to_schedule()
            .or_exit("Invalid learning rate schedule", 1);
        let classifier = probe_config.classifier.clone();
        let experiment =
            ProbeExperiment::new(probe_config).or_exit("Cannot construct probes", 1);

        let languages =
            language_dirs(&self.preprocessed_dir).or_exit("Cannot list preprocessed data", 1);
        let progress = language_progress(languages.len(), "probe");

        let mut results = Vec::new();
        for (language, dir) in &languages {
            progress.set_message(language);
            if let Some(result) = experiment.probe_or_skip(language, dir) {
                results.push(result);
            }
            progress.inc(1);
        }
        progress.finish();

        let output = Output::from(self.output.as_ref());
        let write = output.write().or_exit("Cannot open report for writing", 1);
        write_probe_report(write, &classifier, &results).or_exit("Cannot write report", 1);
    }
}
