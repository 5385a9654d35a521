//! `ciphervault status` — keystore summary without any key material.

use console::style;

use crate::cli::output;
use crate::cli::{open_session, Cli};
use crate::errors::Result;

/// Execute the `status` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let session = open_session(cli)?;
    let params = session.kdf_params();
    let registry = session.registry();

    println!("{}", style("Keystore").bold());
    println!("  Location:   {}", session.paths().data_dir().display());
    println!("  Users:      {}", session.user_count());
    if registry.history().is_empty() {
        println!("  Algorithm:  {}", registry.current());
    } else {
        println!(
            "  Algorithm:  {} (initially {})",
            registry.current(),
            registry.initial()
        );
    }
    println!(
        "  KDF:        argon2id (m={} KiB, t={}, p={})",
        params.memory_kib, params.iterations, params.parallelism
    );
    println!();

    println!("{}", style("Rotation history").bold());
    output::print_rotation_table(registry.history());

    Ok(())
}
