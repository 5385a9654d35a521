//! `ciphervault remove-user` — delete a user and their key.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{open_session, Cli};
use crate::errors::{CipherVaultError, Result};

/// Execute the `remove-user` command.
pub fn execute(cli: &Cli, user: &str, force: bool) -> Result<()> {
    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Remove user '{user}'? Anything encrypted for them becomes unreadable"
            ))
            .default(false)
            .interact()
            .map_err(|e| CipherVaultError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let mut session = open_session(cli)?;
    session.remove_user(user)?;

    output::success(&format!("Removed user '{user}'"));

    Ok(())
}
