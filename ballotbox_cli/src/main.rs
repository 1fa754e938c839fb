use clap::{App, AppSettings, Arg, SubCommand};
use log::LevelFilter;

mod command_audit;
mod command_demo;
mod command_keygen;
mod config;
mod logging;

use command_audit::*;
use command_demo::*;
use command_keygen::*;

fn main() {
    let matches = App::new("BallotBox CLI")
        .version("1.0")
        .author("Patrick Hayes <patrick.d.hayes@gmail.com>")
        .about("Operator tooling for the BallotBox anonymous ballot core")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .global(true)
                .help("Sets the level of verbosity - can also be set with BALLOTBOX_LOG"),
        )
        .arg(
            Arg::with_name("key-path")
                .long("key-path")
                .takes_value(true)
                .global(true)
                .help("Authority key file - can also be set with BALLOTBOX_KEY_PATH"),
        )
        .arg(
            Arg::with_name("key-bits")
                .long("key-bits")
                .takes_value(true)
                .global(true)
                .help("Modulus size for new keys - can also be set with BALLOTBOX_KEY_BITS"),
        )
        .subcommand(
            SubCommand::with_name("keygen")
                .about("Generate the authority signing key")
                .arg(
                    Arg::with_name("force")
                        .long("force")
                        .help("Replace an existing key. Every signature issued under it stops verifying."),
                ),
        )
        .subcommand(
            SubCommand::with_name("public-key").about("Print the authority public key as JSON"),
        )
        .subcommand(
            SubCommand::with_name("demo")
                .about("Run a simulated election in-process")
                .arg(
                    Arg::with_name("voters")
                        .long("voters")
                        .takes_value(true)
                        .default_value("25")
                        .help("Number of voters"),
                )
                .arg(
                    Arg::with_name("parties")
                        .long("parties")
                        .takes_value(true)
                        .default_value("Red,Green,Blue")
                        .help("Comma separated party names"),
                )
                .arg(
                    Arg::with_name("export")
                        .long("export")
                        .takes_value(true)
                        .help("Write the ledger to this file as JSON"),
                )
                .arg(
                    Arg::with_name("print-receipts")
                        .long("print-receipts")
                        .help("Print every receipt code"),
                ),
        )
        .subcommand(
            SubCommand::with_name("audit")
                .about("Verify the hash chains in an exported ledger")
                .arg(
                    Arg::with_name("INPUT")
                        .index(1)
                        .required(true)
                        .help("Ledger file in JSON format"),
                ),
        )
        .get_matches();

    let mut config = config::Config::from_env().unwrap_or_else(|e| {
        eprintln!("ballotbox: {}", e);
        std::process::exit(1);
    });

    // Globals may be given before or after the subcommand
    let (command, sub_matches) = matches.subcommand();
    let global = |name: &str| {
        sub_matches
            .and_then(|m| m.value_of(name))
            .or_else(|| matches.value_of(name))
    };

    if let Some(path) = global("key-path") {
        config.key_path = expand(path);
    }
    if let Some(bits) = global("key-bits") {
        config.key_bits = config::parse_key_bits(bits).unwrap_or_else(|e| {
            eprintln!("ballotbox: {}", e);
            std::process::exit(1);
        });
    }

    // Propagated globals show up at both levels, so don't add them
    let verbosity = std::cmp::max(
        matches.occurrences_of("v"),
        sub_matches.map_or(0, |m| m.occurrences_of("v")),
    );
    config.log_level = match verbosity {
        0 => config.log_level,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    if let Err(e) = logging::init(config.log_level) {
        eprintln!("ballotbox: {}", e);
        std::process::exit(1);
    }

    // Subcommands
    match (command, sub_matches) {
        ("keygen", Some(matches)) => command_keygen(matches, &config),
        ("public-key", Some(_)) => command_public_key(&config),
        ("demo", Some(matches)) => command_demo(matches, &config),
        ("audit", Some(matches)) => command_audit(matches),
        _ => {
            eprintln!("ballotbox: unknown command, see --help");
            std::process::exit(1);
        }
    }
}

pub fn expand(input: &str) -> String {
    shellexpand::full(input)
        .map(|s| s.into_owned())
        .unwrap_or_else(|e| {
            eprintln!("ballotbox: unable to expand {}: {}", input, e);
            std::process::exit(1);
        })
}

fn exit_with(context: &str, e: impl std::fmt::Display) -> ! {
    eprintln!("ballotbox {}: {}", context, e);
    std::process::exit(1);
}
