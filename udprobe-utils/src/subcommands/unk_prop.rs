use clap::{App, Arg, ArgMatches};
use stdinout::{OrExit, Output};
use tracing::{info, warn};
use udprobe::analysis::unknown_proportion;
use udprobe::wrapper::language_dirs;

use super::read_train;
use crate::report::write_unknown_report;
use crate::traits::{UdprobeApp, UdprobeConfigApp};

static OUTPUT: &str = "OUTPUT";
static PREPROCESSED_DIR: &str = "PREPROCESSED_DIR";

pub struct UnkPropApp {
    config: String,
    preprocessed_dir: String,
    output: Option<String>,
}

impl UdprobeConfigApp for UnkPropApp {}

impl UdprobeApp for UnkPropApp {
    fn app() -> App<'static, 'static> {
        Self::config_app("unk-prop")
            .about("Compute the proportion of unknown sub-word tokens per language")
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
    }

    fn parse(matches: &ArgMatches) -> Self {
        UnkPropApp {
            config: matches.value_of(Self::CONFIG).unwrap().into(),
            preprocessed_dir: matches.value_of(PREPROCESSED_DIR).unwrap().into(),
            output: matches.value_of(OUTPUT).map(ToOwned::to_owned),
        }
    }

    fn run(&self) {
        let config = Self::load_config(&self.config);
        let tokenizer = config
            .input
            .load_tokenizer()
            .or_exit("Cannot load tokenizer", 1);
        let aligner = config.input.aligner();

        let languages =
            language_dirs(&self.preprocessed_dir).or_exit("Cannot list preprocessed data", 1);

        let mut rows = Vec::new();
        for (language, dir) in languages {
            let proportion = read_train(&dir)
                .and_then(|train| unknown_proportion(&train, &aligner, &tokenizer));
            match proportion {
                Ok(Some(proportion)) => {
                    info!(language = %language, proportion, "unknown tokens");
                    rows.push((language, proportion));
                }
                Ok(None) => (),
                Err(err) => warn!(language = %language, "skipped: {}", err),
            }
        }

        let output = Output::from(self.output.as_ref());
        let write = output.write().or_exit("Cannot open report for writing", 1);
        write_unknown_report(write, &rows).or_exit("Cannot write report", 1);
    }
}
