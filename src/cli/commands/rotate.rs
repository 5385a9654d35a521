//! `ciphervault rotate` — switch the active encryption algorithm.
//!
//! Envelopes carry their own algorithm tag, so nothing already encrypted
//! needs to be rewritten.  Only new encryptions use the new algorithm.

use crate::cli::output;
use crate::cli::{open_session, Cli};
use crate::errors::Result;

/// Execute the `rotate` command.
pub fn execute(cli: &Cli, algorithm: Option<&str>) -> Result<()> {
    let mut session = open_session(cli)?;

    let event = match algorithm {
        Some(name) => session.rotate_algorithm(name)?,
        None => session.rotate_next()?,
    };

    output::success(&format!("Rotated {} -> {}", event.from, event.to));
    output::info("Existing ciphertexts remain decryptable.");

    Ok(())
}
