//! `ciphervault auth` — check a user's credential token.

use crate::cli::output;
use crate::cli::{open_session, prompt_token, Cli};
use crate::errors::Result;

/// Execute the `auth` command.
pub fn execute(cli: &Cli, user: &str) -> Result<()> {
    let mut session = open_session(cli)?;
    let token = prompt_token(user)?;

    session.authenticate(user, &token)?;
    output::success(&format!("Authenticated '{user}'"));

    Ok(())
}
