//! Line-oriented command language for replaying operations against a store.
//!
//! One command per line, arguments separated by whitespace. Blank lines and
//! lines starting with `#` are ignored.
//!
//! ```text
//! add <key> <timestamp> [nonce]
//! get <key>
//! earliest
//! remove <key>
//! pop
//! touch <key> <nonce>
//! touch-earliest <nonce>
//! len
//! verify
//! ```

use std::fmt;

use crate::block::Block;
use crate::error::StoreResult;
use crate::hasher::ProbeHasher;
use crate::store::BlockStore;
use crate::verifier::Violation;

/// Errors raised while parsing a command line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The command name is not recognized.
    #[error("unknown command: {0}")]
    Unknown(String),

    /// Wrong number of arguments.
    #[error("wrong number of arguments for '{0}'")]
    WrongArity(&'static str),

    /// An argument could not be parsed.
    #[error("invalid {name}: {value}")]
    InvalidArgument {
        /// Argument name.
        name: &'static str,
        /// The offending text.
        value: String,
    },
}

/// A parsed command with keys borrowed from the input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command<'a> {
    /// add key timestamp [nonce]
    Add {
        /// Block key.
        key: &'a str,
        /// Ordering timestamp.
        timestamp: u64,
        /// Payload, zero when omitted.
        nonce: f64,
    },
    /// get key
    Get {
        /// Block key.
        key: &'a str,
    },
    /// earliest
    Earliest,
    /// remove key
    Remove {
        /// Block key.
        key: &'a str,
    },
    /// pop
    Pop,
    /// touch key nonce
    Touch {
        /// Block key.
        key: &'a str,
        /// New payload.
        nonce: f64,
    },
    /// touch-earliest nonce
    TouchEarliest {
        /// New payload.
        nonce: f64,
    },
    /// len
    Len,
    /// verify
    Verify,
}

impl<'a> Command<'a> {
    /// Parse a single line.
    ///
    /// Returns `Ok(None)` for blank lines and comments.
    pub fn parse(line: &'a str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let mut parts = line.split_whitespace();
        let Some(name) = parts.next() else {
            return Ok(None);
        };
        let args: Vec<&'a str> = parts.collect();

        let command = match name.to_ascii_lowercase().as_str() {
            "add" => match args[..] {
                [key, timestamp] => Command::Add {
                    key,
                    timestamp: parse_timestamp(timestamp)?,
                    nonce: 0.0,
                },
                [key, timestamp, nonce] => Command::Add {
                    key,
                    timestamp: parse_timestamp(timestamp)?,
                    nonce: parse_nonce(nonce)?,
                },
                _ => return Err(CommandError::WrongArity("add")),
            },
            "get" => match args[..] {
                [key] => Command::Get { key },
                _ => return Err(CommandError::WrongArity("get")),
            },
            "earliest" => {
                expect_no_args(&args, "earliest")?;
                Command::Earliest
            }
            "remove" => match args[..] {
                [key] => Command::Remove { key },
                _ => return Err(CommandError::WrongArity("remove")),
            },
            "pop" => {
                expect_no_args(&args, "pop")?;
                Command::Pop
            }
            "touch" => match args[..] {
                [key, nonce] => Command::Touch {
                    key,
                    nonce: parse_nonce(nonce)?,
                },
                _ => return Err(CommandError::WrongArity("touch")),
            },
            "touch-earliest" => match args[..] {
                [nonce] => Command::TouchEarliest {
                    nonce: parse_nonce(nonce)?,
                },
                _ => return Err(CommandError::WrongArity("touch-earliest")),
            },
            "len" => {
                expect_no_args(&args, "len")?;
                Command::Len
            }
            "verify" => {
                expect_no_args(&args, "verify")?;
                Command::Verify
            }
            _ => return Err(CommandError::Unknown(name.to_string())),
        };

        Ok(Some(command))
    }

    /// Run the command against a store.
    pub fn execute<H: ProbeHasher>(&self, store: &mut BlockStore<H>) -> StoreResult<Response> {
        let response = match *self {
            Command::Add {
                key,
                timestamp,
                nonce,
            } => Response::Admitted(store.add_block(Block::new(key, timestamp, nonce))?),
            Command::Get { key } => Response::Found(store.get_block(key).cloned()),
            Command::Earliest => Response::Found(store.get_earliest_block().cloned()),
            Command::Remove { key } => Response::Removed(store.remove_block(key)),
            Command::Pop => Response::Removed(store.remove_earliest_block()),
            Command::Touch { key, nonce } => Response::Touched(store.update_block(key, nonce)),
            Command::TouchEarliest { nonce } => {
                Response::Touched(store.update_earliest_block(nonce))
            }
            Command::Len => Response::Len(store.length()),
            Command::Verify => Response::Verified(store.verify()),
        };
        Ok(response)
    }
}

fn expect_no_args(args: &[&str], name: &'static str) -> Result<(), CommandError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CommandError::WrongArity(name))
    }
}

fn parse_timestamp(value: &str) -> Result<u64, CommandError> {
    value.parse().map_err(|_| CommandError::InvalidArgument {
        name: "timestamp",
        value: value.to_string(),
    })
}

fn parse_nonce(value: &str) -> Result<f64, CommandError> {
    value.parse().map_err(|_| CommandError::InvalidArgument {
        name: "nonce",
        value: value.to_string(),
    })
}

/// Outcome of executing a [`Command`].
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Result of `add`.
    Admitted(bool),
    /// Result of `get` and `earliest`.
    Found(Option<Block>),
    /// Result of `remove` and `pop`.
    Removed(Option<Block>),
    /// Result of `touch` and `touch-earliest`.
    Touched(bool),
    /// Result of `len`.
    Len(usize),
    /// Result of `verify`.
    Verified(Result<(), Violation>),
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Admitted(true) => write!(f, "admitted"),
            Response::Admitted(false) => write!(f, "rejected"),
            Response::Found(Some(block)) => write!(f, "{}", block),
            Response::Removed(Some(block)) => write!(f, "removed {}", block),
            Response::Found(None) | Response::Removed(None) => write!(f, "(none)"),
            Response::Touched(true) => write!(f, "touched"),
            Response::Touched(false) => write!(f, "(none)"),
            Response::Len(len) => write!(f, "{}", len),
            Response::Verified(Ok(())) => write!(f, "ok"),
            Response::Verified(Err(violation)) => write!(f, "violation: {}", violation),
        }
    }
}
