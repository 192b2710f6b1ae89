use std::fs::File;

use clap::{crate_version, App, AppSettings, Arg, ArgMatches};
use stdinout::OrExit;
use udprobe::wrapper::{Config, TomlRead};

static DEFAULT_CLAP_SETTINGS: &[AppSettings] = &[
    AppSettings::DontCollapseArgsInUsage,
    AppSettings::UnifiedHelpMessage,
];

pub trait UdprobeApp {
    fn app() -> App<'static, 'static>;

    fn parse(matches: &ArgMatches) -> Self;

    fn run(&self);
}

/// Applications that read preprocessed languages.
pub trait UdprobeDataApp: UdprobeApp {
    const PREPROCESSED_DIR: &'static str = "PREPROCESSED_DIR";
    const OUTPUT: &'static str = "OUTPUT";

    fn data_app<'a, 'b>(name: &str) -> App<'a, 'b> {
        App::new(name)
            .settings(DEFAULT_CLAP_SETTINGS)
            .version(crate_version!())
            .arg(
                Arg::with_name(Self::PREPROCESSED_DIR)
                    .help("Directory with preprocessed languages")
                    .index(1)
                    .required(true),
            )
            .arg(
                Arg::with_name(Self::OUTPUT)
                    .help("Output report (default: stdout)")
                    .index(2),
            )
    }
}

/// Applications that use a udprobe configuration file.
pub trait UdprobeConfigApp: UdprobeApp {
    const CONFIG: &'static str = "CONFIG";

    fn config_app<'a, 'b>(name: &str) -> App<'a, 'b> {
        App::new(name)
            .settings(DEFAULT_CLAP_SETTINGS)
            .version(crate_version!())
            .arg(
                Arg::with_name(Self::CONFIG)
                    .help("udprobe configuration")
                    .index(1)
                    .required(true),
            )
    }

    fn load_config(path: &str) -> Config {
        let config_file = File::open(path)
            .or_exit(format!("Cannot open configuration file '{}'", path), 1);
        let mut config =
            Config::from_toml_read(config_file).or_exit("Cannot parse configuration", 1);
        config
            .relativize_paths(path)
            .or_exit("Cannot relativize paths in configuration", 1);

        config
    }
}
