//! `ciphervault decrypt` — decrypt an armored envelope for a user.

use std::fs;

use dialoguer::Input;

use crate::cli::{open_session, prompt_token, Cli};
use crate::errors::{CipherVaultError, Result};

/// Execute the `decrypt` command.
pub fn execute(cli: &Cli, user: &str, envelope: Option<&str>, input: Option<&str>) -> Result<()> {
    let armored = match (envelope, input) {
        (Some(text), _) => text.to_string(),
        (None, Some(path)) => fs::read_to_string(path).map_err(|e| {
            CipherVaultError::CommandFailed(format!("failed to read {path}: {e}"))
        })?,
        (None, None) => Input::<String>::new()
            .with_prompt("Envelope to decrypt")
            .interact_text()
            .map_err(|e| CipherVaultError::CommandFailed(format!("input prompt: {e}")))?,
    };

    let mut session = open_session(cli)?;
    let token = prompt_token(user)?;

    let plaintext = session.decrypt_armored(user, &token, &armored)?;
    println!("{}", plaintext.as_str());

    Ok(())
}
