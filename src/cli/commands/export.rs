//! `ciphervault export-key` — print a user's raw key as base64.

use crate::cli::output;
use crate::cli::{open_session, prompt_token, Cli};
use crate::errors::Result;

/// Execute the `export-key` command.
pub fn execute(cli: &Cli, user: &str) -> Result<()> {
    let mut session = open_session(cli)?;
    let token = prompt_token(user)?;

    let key = session.export_key(user, &token)?;

    output::warning("Anyone holding this key can decrypt everything encrypted for this user.");
    println!("{}", key.as_str());

    Ok(())
}
