//! `ciphervault register` — add a user with a fresh encryption key.

use crate::cli::output;
use crate::cli::{open_session, prompt_new_token, Cli};
use crate::errors::Result;

/// Execute the `register` command.
pub fn execute(cli: &Cli, user: &str) -> Result<()> {
    let mut session = open_session(cli)?;
    let token = prompt_new_token(user)?;

    let summary = session.register_user(user, &token)?;

    output::success(&format!("Registered user '{}'", summary.user_id));
    output::tip(&format!("Encrypt something: ciphervault encrypt {user}"));

    Ok(())
}
