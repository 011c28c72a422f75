//! Line-oriented front end over a [`Session`].
//!
//! Each input line is one command. Results go to the output writer; notices are
//! printed on their own line, prefixed with their kind.

use std::fs;
use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::sanitize::sanitize_message;
use crate::engine::FactEngine;
use crate::session::{Notice, NoticeKind, Reply, Session};

const PROMPT: &str = "probe> ";

const HELP: &str = "\
commands:
  load FILE           load a fact dictionary from FILE
  get PATH            read one fact
  set PATH VALUE      write one fact (VALUE is the rest of the line)
  collection BASE     list paths defined under a collection
  paths               list every fact path
  dump                print the whole graph
  help                show this text
  quit                leave the shell";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Load(String),
    Get(String),
    Set { path: String, value: String },
    Collection(String),
    Paths,
    Dump,
    Help,
    Quit,
}

impl ShellCommand {
    /// Parse one non-empty input line.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let needs_arg = |usage: &str| {
            if rest.is_empty() {
                Err(format!("usage: {usage}"))
            } else {
                Ok(rest.to_string())
            }
        };
        match word {
            "load" => needs_arg("load FILE").map(ShellCommand::Load),
            "get" => needs_arg("get PATH").map(ShellCommand::Get),
            "set" => {
                let Some((path, value)) = rest.split_once(char::is_whitespace) else {
                    return Err("usage: set PATH VALUE".to_string());
                };
                Ok(ShellCommand::Set {
                    path: path.to_string(),
                    value: value.trim().to_string(),
                })
            }
            "collection" => needs_arg("collection BASE").map(ShellCommand::Collection),
            "paths" => Ok(ShellCommand::Paths),
            "dump" => Ok(ShellCommand::Dump),
            "help" | "?" => Ok(ShellCommand::Help),
            "quit" | "exit" => Ok(ShellCommand::Quit),
            other => Err(format!("unknown command: {other} (try help)")),
        }
    }
}

/// Read commands from `input` until EOF or `quit`.
pub fn run_shell<E, R, W>(session: &mut Session<E>, input: R, out: &mut W) -> Result<()>
where
    E: FactEngine,
    R: BufRead,
    W: Write,
{
    write!(out, "{PROMPT}").context("write prompt")?;
    out.flush().context("flush prompt")?;
    for line in input.lines() {
        let line = line.context("read command")?;
        if !line.trim().is_empty() {
            match ShellCommand::parse(&line) {
                Ok(ShellCommand::Quit) => break,
                Ok(command) => {
                    debug!(?command, "shell command");
                    let reply = execute(session, command);
                    write_reply(out, &reply)?;
                }
                Err(usage) => {
                    writeln!(out, "{}", sanitize_message(&usage)).context("write usage")?;
                }
            }
        }
        write!(out, "{PROMPT}").context("write prompt")?;
        out.flush().context("flush prompt")?;
    }
    writeln!(out).context("write newline")?;
    Ok(())
}

fn execute<E: FactEngine>(session: &mut Session<E>, command: ShellCommand) -> Reply {
    match command {
        ShellCommand::Load(file) => match fs::read_to_string(&file) {
            Ok(source) => session.on_dictionary_loaded(&source),
            Err(err) => Reply::notice(Notice::new(
                NoticeKind::Validation,
                &format!("read {file}: {err}"),
            )),
        },
        ShellCommand::Get(path) => session.on_get_requested(&path),
        ShellCommand::Set { path, value } => session.on_set_requested(&path, &value),
        ShellCommand::Collection(base) => session.on_collection_query_requested(&base),
        ShellCommand::Paths => match session.paths() {
            Ok(paths) => Reply::output(paths.join("\n")),
            Err(err) => Reply::notice(session.to_notice(&err)),
        },
        ShellCommand::Dump => match session.dump() {
            Ok(text) => Reply::output(text),
            Err(err) => Reply::notice(session.to_notice(&err)),
        },
        ShellCommand::Help => Reply::output(HELP.to_string()),
        ShellCommand::Quit => Reply::default(),
    }
}

/// Write a reply's notice first, then its output.
pub fn write_reply<W: Write>(out: &mut W, reply: &Reply) -> Result<()> {
    if let Some(notice) = &reply.notice {
        writeln!(out, "{}: {}", notice_label(notice.kind), notice.text)
            .context("write notice")?;
    }
    if let Some(output) = &reply.output {
        writeln!(out, "{output}").context("write output")?;
    }
    Ok(())
}

fn notice_label(kind: NoticeKind) -> &'static str {
    match kind {
        NoticeKind::Validation => "invalid",
        NoticeKind::Engine => "engine error",
        NoticeKind::Violation => "violation",
        NoticeKind::Advisory => "note",
    }
}
