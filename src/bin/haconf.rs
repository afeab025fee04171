//! Command-line interface for haconf
//! Formats, checks and queries HAProxy configuration files.
//!
//! Usage:
//!   haconf fmt `<path>` [--hash] [--write]                 - Print (or rewrite) the canonical form
//!   haconf check `<path>`                                   - Verify the file is stable under a round trip
//!   haconf sections `<path>` `<kind>`                         - List section names of one kind
//!   haconf get `<path>` `<kind>` `<section>` `<keyword>`          - Print a directive's data as JSON
//!
//! Global options: `--config <file>` layers a TOML file over the defaults and
//! `--set parser.<key>=<value>` overrides a single option. Logging goes to stderr
//! and is filtered by `RUST_LOG` (default `warn`).

use clap::{Arg, ArgAction, ArgMatches, Command};
use haconf::haconf::options::Loader;
use haconf::haconf::processing;
use haconf::haconf::registry::Registry;
use haconf::haconf::sorter;
use haconf::{ConfigParser, Options, SectionKind};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let path_arg = || {
        Arg::new("path")
            .help("Path to the HAProxy configuration file")
            .required(true)
            .index(1)
    };

    let matches = Command::new("haconf")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A tool for formatting and inspecting HAProxy configuration files")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .help("TOML file with a [parser] table"),
        )
        .arg(
            Arg::new("set")
                .long("set")
                .global(true)
                .action(ArgAction::Append)
                .help("Override one option, e.g. parser.use_md5_hash=true"),
        )
        .subcommand(
            Command::new("fmt")
                .about("Print the file in canonical form")
                .arg(path_arg())
                .arg(
                    Arg::new("hash")
                        .long("hash")
                        .action(ArgAction::SetTrue)
                        .help("Prefix the output with its MD5 hash"),
                )
                .arg(
                    Arg::new("write")
                        .long("write")
                        .short('w')
                        .action(ArgAction::SetTrue)
                        .help("Rewrite the file in place instead of printing"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Check the file is a round-trip fixpoint and its defaults resolve")
                .arg(path_arg()),
        )
        .subcommand(
            Command::new("sections")
                .about("List the sections of one kind")
                .arg(path_arg())
                .arg(Arg::new("kind").required(true).index(2)),
        )
        .subcommand(
            Command::new("get")
                .about("Print one directive as JSON")
                .arg(path_arg())
                .arg(Arg::new("kind").required(true).index(2))
                .arg(Arg::new("section").required(true).index(3))
                .arg(Arg::new("keyword").required(true).index(4)),
        )
        .get_matches();

    // Global flags are propagated into the subcommand's matches
    let Some((command, sub)) = matches.subcommand() else {
        unreachable!()
    };
    let options = load_options(sub).unwrap_or_else(|e| fail("Configuration error", e));

    match command {
        "fmt" => {
            let options = options.use_md5_hash(options.use_md5_hash || sub.get_flag("hash"));
            handle_fmt_command(arg(sub, "path"), options, sub.get_flag("write"));
        }
        "check" => handle_check_command(arg(sub, "path"), options),
        "sections" => handle_sections_command(arg(sub, "path"), arg(sub, "kind"), options),
        "get" => handle_get_command(
            arg(sub, "path"),
            arg(sub, "kind"),
            arg(sub, "section"),
            arg(sub, "keyword"),
            options,
        ),
        _ => unreachable!(),
    }
}

fn arg<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .unwrap_or_default()
}

fn fail(context: &str, error: impl std::fmt::Display) -> ! {
    eprintln!("{context}: {error}");
    std::process::exit(1);
}

fn load_options(matches: &ArgMatches) -> Result<Options, config::ConfigError> {
    let mut loader = Loader::new();
    if let Some(path) = matches.get_one::<String>("config") {
        loader = loader.with_file(path);
    }
    for pair in matches.get_many::<String>("set").into_iter().flatten() {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(config::ConfigError::Message(format!(
                "expected key=value, got {pair}"
            )));
        };
        loader = loader.set_override(key.trim(), value.trim())?;
    }
    loader.build()
}

fn open(path: &str, options: Options) -> ConfigParser {
    let parser = ConfigParser::new(options);
    parser
        .load_path(path)
        .unwrap_or_else(|e| fail("Error reading file", e));
    parser
}

/// Handle the fmt command
fn handle_fmt_command(path: &str, options: Options, write: bool) {
    let parser = open(path, options);
    if write {
        parser
            .save(path)
            .unwrap_or_else(|e| fail("Error writing file", e));
    } else {
        print!("{parser}");
    }
}

/// Handle the check command
fn handle_check_command(path: &str, options: Options) {
    let source = std::fs::read_to_string(path).unwrap_or_else(|e| fail("Error reading file", e));
    let mut problems = Vec::new();

    let mut registry = Registry::new(options);
    processing::process(&mut registry, source.lines());
    if let Err(e) = sorter::sort(&registry.defaults_edges()) {
        problems.push(format!("defaults: {e}"));
    }

    let parser = ConfigParser::new(options);
    let written = match parser.load_data(&source) {
        Ok(()) => parser.to_string(),
        Err(e) => fail("Parse error", e),
    };
    if let Err(e) = parser.load_data(&written) {
        fail("Parse error", e);
    }
    if parser.to_string() != written {
        problems.push("output is not stable under a second round trip".to_string());
    }
    if written != source {
        println!("{path}: not in canonical form (run `haconf fmt --write`)");
    }

    if problems.is_empty() {
        println!("{path}: ok");
    } else {
        for problem in &problems {
            eprintln!("{path}: {problem}");
        }
        std::process::exit(1);
    }
}

/// Handle the sections command
fn handle_sections_command(path: &str, kind: &str, options: Options) {
    let kind: SectionKind = kind.parse().unwrap_or_else(|e| fail("Unknown section kind", e));
    let parser = open(path, options);
    for name in parser.sections_get(kind) {
        println!("{name}");
    }
}

/// Handle the get command
fn handle_get_command(path: &str, kind: &str, section: &str, keyword: &str, options: Options) {
    let kind: SectionKind = kind.parse().unwrap_or_else(|e| fail("Unknown section kind", e));
    let parser = open(path, options);
    let data = parser
        .get(kind, section, keyword)
        .unwrap_or_else(|e| fail("Lookup failed", e));
    let json = serde_json::to_string_pretty(&data).unwrap_or_else(|e| fail("Encoding failed", e));
    println!("{json}");
}
