use std::path::Path;

use clap::{App, Arg, ArgMatches};
use stdinout::OrExit;
use tracing::info;
use udprobe::wrapper::{language_dirs, PrepareOutcome, Preprocessor};

use crate::progress::language_progress;
use crate::traits::{UdprobeApp, UdprobeConfigApp};

static DATA_DIR: &str = "DATA_DIR";
static OUT_DIR: &str = "OUT_DIR";
static SAMPLE_SIZE: &str = "SAMPLE_SIZE";
static SEED: &str = "SEED";
static STRICT: &str = "STRICT";

pub struct PrepareApp {
    config: String,
    data_dir: String,
    out_dir: String,
    sample_size: Option<usize>,
    seed: Option<u64>,
    strict: bool,
}

impl UdprobeConfigApp for PrepareApp {}

impl UdprobeApp for PrepareApp {
    fn app() -> App<'static, 'static> {
        Self::config_app("prepare")
            .about("Sample treebanks and compute word representations")
            .arg(
                Arg::with_name(DATA_DIR)
                    .help("Directory with one treebank directory per language")
                    .index(2)
                    .required(true),
            )
            .arg(
                Arg::with_name(OUT_DIR)
                    .help("Output directory")
                    .index(3)
                    .required(true),
            )
            .arg(
                Arg::with_name(SAMPLE_SIZE)
                    .long("sample-size")
                    .value_name("N")
                    .help("Number of training sentences to sample"),
            )
            .arg(
                Arg::with_name(SEED)
                    .long("seed")
                    .value_name("SEED")
                    .help("Sampling seed"),
            )
            .arg(
                Arg::with_name(STRICT)
                    .long("strict")
                    .help("Skip languages with fewer training sentences than the sample size"),
            )
    }

    fn parse(matches: &ArgMatches) -> Self {
        let config = matches.value_of(Self::CONFIG).unwrap().into();
        let data_dir = matches.value_of(DATA_DIR).unwrap().into();
        let out_dir = matches.value_of(OUT_DIR).unwrap().into();
        let sample_size = matches
            .value_of(SAMPLE_SIZE)
            .map(|v| v.parse().or_exit("Cannot parse sample size", 1));
        let seed = matches
            .value_of(SEED)
            .map(|v| v.parse().or_exit("Cannot parse seed", 1));
        let strict = matches.is_present(STRICT);

        PrepareApp {
            config,
            data_dir,
            out_dir,
            sample_size,
            seed,
            strict,
        }
    }

    fn run(&self) {
        let config = Self::load_config(&self.config);

        let mut sampling = config.sampling;
        if self.sample_size.is_some() {
            sampling.sample_size = self.sample_size;
        }
        if self.seed.is_some() {
            sampling.seed = self.seed;
        }
        sampling.strict |= self.strict;

        let tokenizer = config
            .input
            .load_tokenizer()
            .or_exit("Cannot load tokenizer", 1);
        let encoder = config
            .input
            .load_encoder(&tokenizer)
            .or_exit("Cannot load embeddings", 1);
        let preprocessor =
            Preprocessor::new(config.input.aligner(), &tokenizer, &encoder, sampling);

        let languages = language_dirs(&self.data_dir).or_exit("Cannot list treebanks", 1);
        let progress = language_progress(languages.len(), "prepare");

        let mut n_prepared = 0;
        for (language, treebank_dir) in &languages {
            progress.set_message(language);
            let out_dir = Path::new(&self.out_dir).join(language);
            if preprocessor.prepare_or_skip(language, treebank_dir, out_dir)
                == PrepareOutcome::Prepared
            {
                n_prepared += 1;
            }
            progress.inc(1);
        }

        progress.finish();
        info!(
            prepared = n_prepared,
            languages = languages.len(),
            "finished preparing treebanks"
        );
    }
}
