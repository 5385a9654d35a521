//! `ciphervault users` — list registered users.

use crate::cli::output;
use crate::cli::{open_session, Cli};
use crate::errors::Result;

/// Execute the `users` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let session = open_session(cli)?;
    let users = session.list_users_summary();

    output::info(&format!("{} user(s)", users.len()));
    output::print_users_table(&users);

    Ok(())
}
