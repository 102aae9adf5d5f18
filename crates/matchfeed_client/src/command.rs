//! Interactive command grammar.
//!
//! One command per input line:
//!
//! ```text
//! login <host:port> <user> <pass>
//! join <game>
//! exit [<game>]
//! report <path>
//! summary <game> <user> <outputFile>
//! logout
//! ```

use crate::error::{ClientError, ClientResult};
use std::fmt;
use std::path::PathBuf;

/// A server address given to `login`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Endpoint {
    /// Parses `host:port`.
    pub fn parse(raw: &str) -> ClientResult<Self> {
        let (host, port) = raw
            .rsplit_once(':')
            .ok_or_else(|| ClientError::usage("login <host:port> <user> <pass>"))?;
        if host.is_empty() {
            return Err(ClientError::usage("login <host:port> <user> <pass>"));
        }
        let port = port
            .parse()
            .map_err(|_| ClientError::usage(format!("invalid port '{port}'")))?;

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A parsed user command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Connect and authenticate.
    Login {
        /// Server address.
        endpoint: Endpoint,
        /// User name.
        user: String,
        /// Password.
        passcode: String,
    },
    /// Subscribe to a game.
    Join {
        /// Raw game name.
        game: String,
    },
    /// Leave a game, or log out when no game is given.
    Exit {
        /// Raw game name.
        game: Option<String>,
    },
    /// Report the events of a file to its game.
    Report {
        /// Event file.
        path: PathBuf,
    },
    /// Write a summary of one reporter's events for a game.
    Summary {
        /// Raw game name.
        game: String,
        /// Reporter whose timeline is summarised.
        user: String,
        /// Output file.
        output: PathBuf,
    },
    /// Close the session.
    Logout,
}

impl Command {
    /// Parses one input line.
    pub fn parse(line: &str) -> ClientResult<Self> {
        let mut words = line.split_whitespace();
        let keyword = words
            .next()
            .ok_or_else(|| ClientError::usage("empty command"))?;
        let args: Vec<&str> = words.collect();

        match keyword {
            "login" => match args.as_slice() {
                [endpoint, user, passcode] => Ok(Command::Login {
                    endpoint: Endpoint::parse(endpoint)?,
                    user: (*user).to_string(),
                    passcode: (*passcode).to_string(),
                }),
                _ => Err(ClientError::usage("login <host:port> <user> <pass>")),
            },
            "join" => {
                if args.is_empty() {
                    return Err(ClientError::usage("join <game>"));
                }
                Ok(Command::Join {
                    game: args.join(" "),
                })
            }
            "exit" => Ok(Command::Exit {
                game: (!args.is_empty()).then(|| args.join(" ")),
            }),
            "report" => match args.as_slice() {
                [path] => Ok(Command::Report {
                    path: PathBuf::from(*path),
                }),
                _ => Err(ClientError::usage("report <path>")),
            },
            "summary" => match args.as_slice() {
                [game, user, output] => Ok(Command::Summary {
                    game: (*game).to_string(),
                    user: (*user).to_string(),
                    output: PathBuf::from(*output),
                }),
                _ => Err(ClientError::usage("summary <game> <user> <outputFile>")),
            },
            "logout" => {
                if !args.is_empty() {
                    return Err(ClientError::usage("logout"));
                }
                Ok(Command::Logout)
            }
            other => Err(ClientError::usage(format!("unknown command '{other}'"))),
        }
    }

    /// Returns the command keyword.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Login { .. } => "login",
            Command::Join { .. } => "join",
            Command::Exit { .. } => "exit",
            Command::Report { .. } => "report",
            Command::Summary { .. } => "summary",
            Command::Logout => "logout",
        }
    }
}
