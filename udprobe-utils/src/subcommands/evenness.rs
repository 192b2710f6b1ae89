use clap::{App, Arg, ArgMatches};
use stdinout::{OrExit, Output};
use tracing::{info, warn};
use udprobe::analysis::{label_counts, shannon_evenness};
use udprobe::wrapper::language_dirs;
use udprobe::Property;

use super::read_train;
use crate::report::write_evenness_report;
use crate::traits::{UdprobeApp, UdprobeDataApp};

static PROPERTY: &str = "PROPERTY";

pub struct EvennessApp {
    preprocessed_dir: String,
    output: Option<String>,
    property: Property,
}

impl UdprobeDataApp for EvennessApp {}

impl UdprobeApp for EvennessApp {
    fn app() -> App<'static, 'static> {
        Self::data_app("evenness")
            .about("Compute the evenness of the label distribution of a property")
            .arg(
                Arg::with_name(PROPERTY)
                    .long("property")
                    .value_name("PROPERTY")
                    .possible_values(&["upos", "Number", "Case", "Tense", "Gender"])
                    .default_value("upos")
                    .help("Property to compute the label distribution for"),
            )
    }

    fn parse(matches: &ArgMatches) -> Self {
        let preprocessed_dir = matches.value_of(Self::PREPROCESSED_DIR).unwrap().into();
        let output = matches.value_of(Self::OUTPUT).map(ToOwned::to_owned);
        let property = matches
            .value_of(PROPERTY)
            .unwrap()
            .parse()
            .or_exit("Cannot parse property", 1);

        EvennessApp {
            preprocessed_dir,
            output,
            property,
        }
    }

    fn run(&self) {
        let languages =
            language_dirs(&self.preprocessed_dir).or_exit("Cannot list preprocessed data", 1);

        let mut rows = Vec::new();
        for (language, dir) in languages {
            let train = match read_train(&dir) {
                Ok(train) => train,
                Err(err) => {
                    warn!(language = %language, "skipped: {}", err);
                    continue;
                }
            };

            if train.is_empty() {
                continue;
            }

            let counts = label_counts(&train, self.property)
                .or_exit(format!("Cannot count labels of {}", language), 1);
            if let Some(evenness) = shannon_evenness(&counts) {
                info!(
                    language = %language,
                    evenness,
                    n_labels = counts.len(),
                    "label evenness"
                );
                rows.push((language, evenness, counts.len()));
            }
        }

        let output = Output::from(self.output.as_ref());
        let write = output.write().or_exit("Cannot open report for writing", 1);
        write_evenness_report(write, &rows).or_exit("Cannot write report", 1);
    }
}
