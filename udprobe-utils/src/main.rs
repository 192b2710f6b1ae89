use std::io::{stderr, stdout};

use clap::{crate_version, App, AppSettings, Arg, Shell, SubCommand};
use tracing_subscriber::EnvFilter;

mod progress;

mod report;

mod subcommands;

mod traits;
pub use self::traits::{UdprobeApp, UdprobeConfigApp, UdprobeDataApp};

static DEFAULT_CLAP_SETTINGS: &[AppSettings] = &[
    AppSettings::DontCollapseArgsInUsage,
    AppSettings::UnifiedHelpMessage,
    AppSettings::SubcommandRequiredElseHelp,
];

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(stderr)
        .init();

    // Known subapplications.
    let apps = vec![
        subcommands::EvennessApp::app(),
        subcommands::PrepareApp::app(),
        subcommands::ProbeApp::app(),
        subcommands::UnkPropApp::app(),
        subcommands::VocabOverlapApp::app(),
    ];

    let cli = App::new("udprobe")
        .settings(DEFAULT_CLAP_SETTINGS)
        .about("Probe multilingual word representations for morphosyntactic properties")
        .version(crate_version!())
        .subcommands(apps)
        .subcommand(
            SubCommand::with_name("completions")
                .about("Generate completion scripts for your shell")
                .setting(AppSettings::ArgRequiredElseHelp)
                .arg(Arg::with_name("shell").possible_values(&Shell::variants())),
        );
    let matches = cli.clone().get_matches();

    match matches.subcommand_name().unwrap() {
        "completions" => {
            let shell = matches
                .subcommand_matches("completions")
                .unwrap()
                .value_of("shell")
                .unwrap();
            write_completion_script(cli, shell.parse::<Shell>().unwrap());
        }
        "evenness" => {
            subcommands::EvennessApp::parse(matches.subcommand_matches("evenness").unwrap()).run()
        }
        "prepare" => {
            subcommands::PrepareApp::parse(matches.subcommand_matches("prepare").unwrap()).run()
        }
        "probe" => subcommands::ProbeApp::parse(matches.subcommand_matches("probe").unwrap()).run(),
        "unk-prop" => {
            subcommands::UnkPropApp::parse(matches.subcommand_matches("unk-prop").unwrap()).run()
        }
        "vocab-overlap" => subcommands::VocabOverlapApp::parse(
            matches.subcommand_matches("vocab-overlap").unwrap(),
        )
        .run(),
        _unknown => unreachable!(),
    }
}

fn write_completion_script(mut cli: App, shell: Shell) {
    cli.gen_completions_to("udprobe", shell, &mut stdout());
}
