//! Command-line probe for a fact graph.
//!
//! Loads a fact dictionary through the configured engine bridge, then reads or
//! writes facts one command at a time. `probe shell` keeps the graph loaded
//! across commands.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};

use probe::core::messages::Locale;
use probe::core::path::validate_path;
use probe::core::sanitize::sanitize_message;
use probe::error::AdapterError;
use probe::exit_codes;
use probe::io::bridge::ProcessEngine;
use probe::io::config::{DEFAULT_CONFIG_FILE, load_config};
use probe::session::{Reply, Session};
use probe::shell::{run_shell, write_reply};

#[derive(Parser)]
#[command(name = "probe", version, about = "Query and edit a fact graph")]
struct Cli {
    /// Config file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Fact dictionary to load before running the command.
    #[arg(long, global = true)]
    dictionary: Option<PathBuf>,

    /// Message language (`en` or `zh-tw`); overrides the config file.
    #[arg(long, global = true)]
    locale: Option<Locale>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a fact path without loading anything.
    CheckPath { path: String },
    /// List every path the dictionary defines.
    Paths,
    /// Read one fact.
    Get { path: String },
    /// Write one fact and print the resulting graph.
    Set { path: String, value: String },
    /// List concrete paths defined under a collection.
    Collection { base: String },
    /// Print the whole graph.
    Dump,
    /// Interactive session over stdin.
    Shell,
}

fn main() {
    probe::logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{}", error_text(&err));
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;
    if let Some(locale) = cli.locale {
        config.locale = locale;
    }

    let mut session = Session::from_config(ProcessEngine::new(config.engine.clone()), &config);
    let reply = match cli.command {
        Command::CheckPath { path } => return Ok(cmd_check_path(&path, config.locale)),
        Command::Shell => {
            if let Some(dictionary) = &cli.dictionary {
                load(&mut session, dictionary)?;
            }
            let stdin = io::stdin();
            let mut stdout = io::stdout();
            run_shell(&mut session, stdin.lock(), &mut stdout)?;
            return Ok(exit_codes::OK);
        }
        command => {
            let dictionary = cli
                .dictionary
                .as_deref()
                .ok_or_else(|| anyhow!("--dictionary is required for this command"))?;
            let code = load(&mut session, dictionary)?;
            if code != exit_codes::OK {
                return Ok(code);
            }
            dispatch(&mut session, command)
        }
    };
    emit(&reply)
}

/// Top-level failures echo file names and arguments; filter them like notices.
fn error_text(err: &anyhow::Error) -> String {
    sanitize_message(&format!("{err:#}"))
}

fn dispatch(session: &mut Session<ProcessEngine>, command: Command) -> Reply {
    match command {
        Command::Paths => match session.paths() {
            Ok(paths) => Reply::output(paths.join("\n")),
            Err(err) => Reply::notice(session.to_notice(&err)),
        },
        Command::Get { path } => session.on_get_requested(&path),
        Command::Set { path, value } => session.on_set_requested(&path, &value),
        Command::Collection { base } => session.on_collection_query_requested(&base),
        Command::Dump => match session.dump() {
            Ok(text) => Reply::output(text),
            Err(err) => Reply::notice(session.to_notice(&err)),
        },
        Command::CheckPath { .. } | Command::Shell => Reply::default(),
    }
}

fn cmd_check_path(path: &str, locale: Locale) -> i32 {
    match validate_path(path) {
        Ok(()) => {
            println!("ok");
            exit_codes::OK
        }
        Err(rejection) => {
            eprintln!(
                "{}",
                sanitize_message(&AdapterError::from(rejection).localized(locale))
            );
            exit_codes::INVALID
        }
    }
}

fn load(session: &mut Session<ProcessEngine>, path: &Path) -> Result<i32> {
    let source =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    match session.load_dictionary(&source) {
        Ok(_) => Ok(exit_codes::OK),
        Err(err) => emit(&Reply::notice(session.to_notice(&err))),
    }
}

/// Print output to stdout and the notice to stderr; return the exit code.
fn emit(reply: &Reply) -> Result<i32> {
    if let Some(output) = &reply.output {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{output}").context("write stdout")?;
    }
    match &reply.notice {
        Some(notice) => {
            let mut stderr = io::stderr().lock();
            write_reply(&mut stderr, &Reply::notice(notice.clone()))?;
            Ok(exit_codes::for_notice(notice.kind))
        }
        None => Ok(exit_codes::OK),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_get_with_globals_after_subcommand() {
        let cli = Cli::parse_from([
            "probe",
            "get",
            "/age",
            "--dictionary",
            "facts.xml",
            "--locale",
            "zh-tw",
        ]);
        assert!(matches!(cli.command, Command::Get { ref path } if path == "/age"));
        assert_eq!(cli.dictionary, Some(PathBuf::from("facts.xml")));
        assert_eq!(cli.locale, Some(Locale::ZhTw));
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn parse_set_takes_path_and_value() {
        let cli = Cli::parse_from(["probe", "set", "/filingStatus", "single"]);
        assert!(matches!(
            cli.command,
            Command::Set { ref path, ref value } if path == "/filingStatus" && value == "single"
        ));
    }

    #[test]
    fn parse_check_path() {
        let cli = Cli::parse_from(["probe", "check-path", "/formW2s/*/wages"]);
        assert!(matches!(cli.command, Command::CheckPath { .. }));
    }

    #[test]
    fn unknown_locale_is_rejected() {
        assert!(Cli::try_parse_from(["probe", "--locale", "fr", "dump"]).is_err());
    }

    #[test]
    fn error_text_is_sanitized() {
        let err = anyhow!("bad\u{0007}file").context("read facts\u{001b}.xml");
        assert_eq!(error_text(&err), "read facts.xml: badfile");
    }

    #[test]
    fn check_path_codes() {
        assert_eq!(cmd_check_path("/age", Locale::En), exit_codes::OK);
        assert_eq!(
            cmd_check_path("/formW2s/*/wages", Locale::En),
            exit_codes::INVALID
        );
    }
}
