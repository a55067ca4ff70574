//! Parsing of chat input lines into commands.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use legalbot_core::DownloadFormat;

pub const HELP: &str = "\
Commands:
  /details                      show the extracted document details
  /set KEY=VALUE                change one detail value
  /verify, /unverify            confirm or withdraw the details
  /download docx|pdf NAME [DIR] save the verified document
  /format                       show the formatted document
  /complete                     finish the session
  /retry-details                extract the details again
  /quit                         leave the chat
Anything else is sent to the assistant.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Message(String),
    Details,
    Set { key: String, value: String },
    Verify(bool),
    Download {
        format: DownloadFormat,
        name: String,
        dir: Option<PathBuf>,
    },
    Format,
    Complete,
    RetryDetails,
    Help,
    Quit,
}

impl Command {
    /// Interpret one line of input. Lines not starting with `/` are messages.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Self::Message(line.to_string()));
        };
        let (name, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let args = args.trim();

        let command = match name {
            "details" => Self::Details,
            "set" => {
                let (key, value) = args
                    .split_once('=')
                    .context("usage: /set KEY=VALUE")?;
                let key = key.trim();
                if key.is_empty() {
                    bail!("usage: /set KEY=VALUE");
                }
                Self::Set {
                    key: key.to_string(),
                    value: value.trim().to_string(),
                }
            }
            "verify" => Self::Verify(true),
            "unverify" => Self::Verify(false),
            "download" => {
                let mut parts = args.split_whitespace();
                let (Some(format), Some(name)) = (parts.next(), parts.next()) else {
                    bail!("usage: /download docx|pdf NAME [DIR]");
                };
                Self::Download {
                    format: format.parse()?,
                    name: name.to_string(),
                    dir: parts.next().map(PathBuf::from),
                }
            }
            "format" => Self::Format,
            "complete" => Self::Complete,
            "retry-details" => Self::RetryDetails,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => bail!("unknown command /{other}; type /help"),
        };
        Ok(command)
    }
}
