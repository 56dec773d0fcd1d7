//! Subcommand implementations.

pub mod address;
pub mod auth;
pub mod cart;
pub mod catalog;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

use sdcart_client::ClientError;
use sdcart_client::address::AddressError;
use sdcart_client::auth::{AuthError, SessionError};
use sdcart_client::gateway::ApiError;

/// Errors surfaced by a subcommand.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Terminal input could not be read.
    #[error("Failed to read {what}: {source}")]
    Input {
        what: &'static str,
        source: io::Error,
    },

    /// Output file could not be written.
    #[error("Failed to write {}: {source}", .path.display())]
    Output { path: PathBuf, source: io::Error },
}

impl CliError {
    /// Whether the user has to sign in again before retrying.
    pub const fn requires_login(&self) -> bool {
        matches!(self, Self::Client(client) if client.requires_login())
    }
}

macro_rules! client_error_from {
    ($($source:ty),*) => {
        $(
            impl From<$source> for CliError {
                fn from(error: $source) -> Self {
                    Self::Client(error.into())
                }
            }
        )*
    };
}

client_error_from!(ApiError, AuthError, AddressError, SessionError);

/// Prompt on stderr and read one line of sensitive input from stdin.
///
/// Input is not masked; pipe it in or use the environment when that matters.
fn read_secret(prompt: &str, what: &'static str) -> Result<SecretString, CliError> {
    eprint!("{prompt}");
    io::stderr()
        .flush()
        .map_err(|source| CliError::Input { what, source })?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|source| CliError::Input { what, source })?;

    Ok(SecretString::from(line.trim_end_matches(['\r', '\n']).to_owned()))
}
