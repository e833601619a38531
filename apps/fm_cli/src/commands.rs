use client_core::{SortOrder, UserCommand};
use shared::domain::BufferAction;
use thiserror::Error;

pub const HELP: &str = "\
commands:
  ls                  refresh the listing
  cd <name|/path>     enter a directory (.. for the parent)
  up                  go to the parent directory
  open <name>         open a directory or download a file
  select <name>       select one entry
  add <name>          toggle an entry in the selection
  all                 select every entry
  mkdir <name>        create a directory
  touch <name>        create an empty file
  cut | copy          put the selection in the clipboard
  paste               paste the clipboard here
  rm                  delete the selection
  chmod <mode> [-R]   change permissions (octal)
  sort name|size      change the sort order
  props               show properties of the selection
  upload              print the upload URL
  pwd                 ask the server for the current directory
  quit";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command {0:?}, try `help`")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("invalid mode {0:?}, expected octal like 755")]
    InvalidMode(String),
    #[error("unknown sort order {0:?}")]
    InvalidOrder(String),
    #[error("{}", HELP)]
    Help,
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<UserCommand>, CommandError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let argument = |name: &'static str| {
        if rest.is_empty() {
            Err(CommandError::MissingArgument(name))
        } else {
            Ok(rest.to_string())
        }
    };

    let command = match word {
        "" => return Ok(None),
        "help" | "?" => return Err(CommandError::Help),
        "ls" | "refresh" => UserCommand::Refresh,
        "cd" => {
            let target = argument("cd")?;
            if target.starts_with('/') {
                UserCommand::ChangeDir {
                    path: target,
                    name: String::new(),
                }
            } else {
                UserCommand::Enter(target)
            }
        }
        "up" => UserCommand::Up,
        "open" => UserCommand::Open(argument("open")?),
        "select" => UserCommand::Select {
            name: argument("select")?,
            ctrl: false,
        },
        "add" => UserCommand::Select {
            name: argument("add")?,
            ctrl: true,
        },
        "all" => UserCommand::SelectAll,
        "mkdir" => UserCommand::CreateDir(argument("mkdir")?),
        "touch" => UserCommand::CreateFile(argument("touch")?),
        "cut" => UserCommand::Buffer(BufferAction::Cut),
        "copy" => UserCommand::Buffer(BufferAction::Copy),
        "paste" => UserCommand::Paste,
        "rm" => UserCommand::Remove,
        "chmod" => parse_chmod(rest)?,
        "sort" => match rest {
            "name" => UserCommand::Order(SortOrder::Name),
            "size" => UserCommand::Order(SortOrder::Size),
            other => return Err(CommandError::InvalidOrder(other.to_string())),
        },
        "props" | "properties" => UserCommand::Properties,
        "upload" => UserCommand::Upload,
        "pwd" => UserCommand::Pwd,
        "quit" | "exit" => UserCommand::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn parse_chmod(rest: &str) -> Result<UserCommand, CommandError> {
    let mut recursive = false;
    let mut mode = None;
    for token in rest.split_whitespace() {
        match token {
            "-R" | "-r" => recursive = true,
            digits => mode = Some(digits),
        }
    }
    let digits = mode.ok_or(CommandError::MissingArgument("chmod"))?;
    let mode = u32::from_str_radix(digits, 8)
        .ok()
        .filter(|mode| *mode <= 0o7777)
        .ok_or_else(|| CommandError::InvalidMode(digits.to_string()))?;
    Ok(UserCommand::Chmod { mode, recursive })
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
