//! `ciphervault init` — create a new, empty keystore.

use crate::cli::output;
use crate::cli::{data_dir, prompt_new_passphrase, Cli};
use crate::config::Settings;
use crate::errors::{CipherVaultError, Result};
use crate::keystore::KeystoreSession;

/// Execute the `init` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;
    let dir = data_dir(cli, &settings)?;

    // 1. Refuse to overwrite an existing keystore.
    if KeystoreSession::exists(&dir) {
        output::tip("Use `ciphervault register <USER>` to add users to the existing keystore.");
        return Err(CipherVaultError::CommandFailed(format!(
            "a keystore already exists in {}",
            dir.display()
        )));
    }

    // 2. Validate config before asking for anything.
    let options = settings.keystore_options()?;

    // 3. Prompt for a new passphrase (with confirmation).
    let passphrase = prompt_new_passphrase()?;

    // 4. Bootstrap: new salt, empty state, first save.
    let session = KeystoreSession::open(&dir, passphrase.as_bytes(), &options)?;

    output::success(&format!(
        "Keystore created at {} (algorithm: {})",
        dir.display(),
        session.current_algorithm()
    ));
    output::warning("There is no way to recover a lost passphrase.");
    output::tip("Next: ciphervault register <USER>");

    Ok(())
}
