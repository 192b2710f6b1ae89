use std::path::Path;

use clap::{App, Arg, ArgMatches};
use stdinout::{OrExit, Output};
use tracing::warn;
use udprobe::analysis::{overlap_matrix, vocab_ids};
use udprobe::wrapper::language_dirs;

use super::read_train;
use crate::progress::language_progress;
use crate::report::write_overlap_report;
use crate::traits::{UdprobeApp, UdprobeConfigApp};

static OUTPUT: &str = "OUTPUT";
static PREPROCESSED_DIR: &str = "PREPROCESSED_DIR";

pub struct VocabOverlapApp {
    config: String,
    preprocessed_dir: String,
    output: Option<String>,
}

impl UdprobeConfigApp for VocabOverlapApp {}

impl UdprobeApp for VocabOverlapApp {
    fn app() -> App<'static, 'static> {
        Self::config_app("vocab-overlap")
            .about("Compute the sub-word vocabulary overlap between languages")
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
        VocabOverlapApp {
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

        let languages = language_dirs(Path::new(&self.preprocessed_dir))
            .or_exit("Cannot list preprocessed data", 1);
        let progress = language_progress(languages.len(), "vocabulary");

        let mut vocabs = Vec::with_capacity(languages.len());
        for (language, dir) in languages {
            progress.set_message(&language);
            match read_train(&dir).and_then(|train| vocab_ids(&train, &aligner, &tokenizer)) {
                Ok(ids) => vocabs.push((language, ids)),
                Err(err) => warn!(language = %language, "skipped: {}", err),
            }
            progress.inc(1);
        }
        progress.finish();

        let (languages, matrix) = overlap_matrix(&vocabs);

        let output = Output::from(self.output.as_ref());
        let write = output.write().or_exit("Cannot open report for writing", 1);
        write_overlap_report(write, &languages, &matrix).or_exit("Cannot write report", 1);
    }
}
