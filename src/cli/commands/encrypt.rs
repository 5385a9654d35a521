//! `ciphervault encrypt` — encrypt text for a user.
//!
//! Prints the armored envelope, or writes it to `--output`.

use std::path::Path;

use dialoguer::Input;

use crate::cli::output;
use crate::cli::{open_session, prompt_token, Cli};
use crate::errors::{CipherVaultError, Result};
use crate::storage::write_atomic;

/// Execute the `encrypt` command.
pub fn execute(cli: &Cli, user: &str, text: Option<&str>, output_path: Option<&str>) -> Result<()> {
    let mut session = open_session(cli)?;
    let token = prompt_token(user)?;

    let plaintext = match text {
        Some(t) => t.to_string(),
        None => Input::<String>::new()
            .with_prompt("Text to encrypt")
            .interact_text()
            .map_err(|e| CipherVaultError::CommandFailed(format!("input prompt: {e}")))?,
    };

    let envelope = session.encrypt_text(user, &token, &plaintext)?;
    let armored = envelope.to_armored();

    match output_path {
        Some(path) => {
            let mut contents = armored;
            contents.push('\n');
            write_atomic(Path::new(path), contents.as_bytes())?;
            output::success(&format!(
                "Encrypted with {} and saved to {path}",
                envelope.algorithm()
            ));
        }
        None => println!("{armored}"),
    }

    Ok(())
}
