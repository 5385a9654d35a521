//! CLI module — Clap argument parser, prompts, output helpers, and command implementations.
//!
//! Commands only prompt, call into `KeystoreSession`, and render results.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;

use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{CipherVaultError, Result};
use crate::keystore::{KeystoreOptions, KeystoreSession};

/// Minimum passphrase length to prevent trivially weak passphrases.
const MIN_PASSPHRASE_LEN: usize = 8;

/// Env var read before prompting for the keystore passphrase.
pub const PASSPHRASE_ENV: &str = "CIPHERVAULT_PASSPHRASE";

/// Env var read before prompting for a credential token.
pub const TOKEN_ENV: &str = "CIPHERVAULT_TOKEN";

/// CipherVault CLI: per-user text encryption backed by an encrypted keystore.
#[derive(Parser)]
#[command(
    name = "ciphervault",
    about = "Encrypted keystore for per-user text encryption",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Keystore directory (default: `data_dir` from .ciphervault.toml, else .ciphervault)
    #[arg(long, global = true, env = "CIPHERVAULT_DATA_DIR")]
    pub data_dir: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new keystore
    Init,

    /// Register a user and generate their encryption key
    Register {
        /// User id
        user: String,
    },

    /// Check a user's credential token
    Auth {
        /// User id
        user: String,
    },

    /// Encrypt text for a user
    Encrypt {
        /// User id
        user: String,
        /// Text to encrypt (omit for interactive prompt)
        text: Option<String>,
        /// Write the armored envelope to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Decrypt an armored envelope for a user
    Decrypt {
        /// User id
        user: String,
        /// Armored envelope (omit to use --input or an interactive prompt)
        envelope: Option<String>,
        /// Read the armored envelope from a file
        #[arg(short, long, conflicts_with = "envelope")]
        input: Option<String>,
    },

    /// Rotate the active encryption algorithm
    Rotate {
        /// Target algorithm (default: the next supported algorithm)
        algorithm: Option<String>,
    },

    /// Print a user's raw encryption key (base64)
    ExportKey {
        /// User id
        user: String,
    },

    /// List registered users
    Users,

    /// Show keystore summary: users, active algorithm, rotation history
    Status,

    /// View the audit log
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
        /// Show entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
    },

    /// Remove a user and their key (data encrypted for them becomes unreadable)
    RemoveUser {
        /// User id
        user: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Get the keystore passphrase, trying in order:
/// 1. `CIPHERVAULT_PASSPHRASE` env var (scripts/CI)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the passphrase is wiped from memory on drop.
pub fn prompt_passphrase() -> Result<Zeroizing<String>> {
    if let Some(pw) = non_empty_env(PASSPHRASE_ENV) {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter keystore passphrase")
        .interact()
        .map_err(|e| CipherVaultError::CommandFailed(format!("passphrase prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new passphrase with confirmation (used during `init`).
///
/// Also respects `CIPHERVAULT_PASSPHRASE` for scripted usage.
/// Enforces a minimum passphrase length.
pub fn prompt_new_passphrase() -> Result<Zeroizing<String>> {
    if let Some(pw) = non_empty_env(PASSPHRASE_ENV) {
        if pw.len() < MIN_PASSPHRASE_LEN {
            return Err(CipherVaultError::CommandFailed(format!(
                "passphrase must be at least {MIN_PASSPHRASE_LEN} characters"
            )));
        }
        return Ok(pw);
    }

    loop {
        let passphrase = dialoguer::Password::new()
            .with_prompt("Choose keystore passphrase")
            .with_confirmation(
                "Confirm keystore passphrase",
                "Passphrases do not match, try again",
            )
            .interact()
            .map_err(|e| CipherVaultError::CommandFailed(format!("passphrase prompt: {e}")))?;

        if passphrase.len() < MIN_PASSPHRASE_LEN {
            output::warning(&format!(
                "Passphrase must be at least {MIN_PASSPHRASE_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(Zeroizing::new(passphrase));
    }
}

/// Get a user's credential token from `CIPHERVAULT_TOKEN` or a hidden prompt.
pub fn prompt_token(user: &str) -> Result<Zeroizing<String>> {
    if let Some(token) = non_empty_env(TOKEN_ENV) {
        return Ok(token);
    }

    let token = dialoguer::Password::new()
        .with_prompt(format!("Credential token for '{user}'"))
        .interact()
        .map_err(|e| CipherVaultError::CommandFailed(format!("token prompt: {e}")))?;
    Ok(Zeroizing::new(token))
}

/// Prompt for a new credential token with confirmation (used by `register`).
pub fn prompt_new_token(user: &str) -> Result<Zeroizing<String>> {
    if let Some(token) = non_empty_env(TOKEN_ENV) {
        return Ok(token);
    }

    let token = dialoguer::Password::new()
        .with_prompt(format!("New credential token for '{user}'"))
        .with_confirmation("Confirm credential token", "Tokens do not match, try again")
        .interact()
        .map_err(|e| CipherVaultError::CommandFailed(format!("token prompt: {e}")))?;
    Ok(Zeroizing::new(token))
}

fn non_empty_env(name: &str) -> Option<Zeroizing<String>> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .map(Zeroizing::new)
}

/// Resolve the keystore directory: `--data-dir`, then the config file,
/// relative to the current directory.
///
/// Example: `<cwd>/.ciphervault`
pub fn data_dir(cli: &Cli, settings: &Settings) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(match &cli.data_dir {
        Some(dir) => cwd.join(dir),
        None => settings.data_dir_path(&cwd),
    })
}

/// Open the existing keystore, prompting for the passphrase.
pub fn open_session(cli: &Cli) -> Result<KeystoreSession> {
    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;
    let dir = data_dir(cli, &settings)?;

    if !KeystoreSession::exists(&dir) {
        output::tip("Run `ciphervault init` to create a keystore.");
        return Err(CipherVaultError::Storage(format!(
            "no keystore found in {}",
            dir.display()
        )));
    }

    // Bootstrap options are unused for an existing keystore; its header and
    // registry decide the KDF params and algorithm.
    let passphrase = prompt_passphrase()?;
    KeystoreSession::open(&dir, passphrase.as_bytes(), &KeystoreOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_encrypt_with_output() {
        let cli = Cli::try_parse_from([
            "ciphervault",
            "encrypt",
            "owner",
            "hello",
            "--output",
            "msg.txt",
        ])
        .unwrap();
        match cli.command {
            Commands::Encrypt { user, text, output } => {
                assert_eq!(user, "owner");
                assert_eq!(text.as_deref(), Some("hello"));
                assert_eq!(output.as_deref(), Some("msg.txt"));
            }
            _ => panic!("expected encrypt"),
        }
    }

    #[test]
    fn cli_rotate_algorithm_is_optional() {
        let cli = Cli::try_parse_from(["ciphervault", "rotate"]).unwrap();
        assert!(matches!(cli.command, Commands::Rotate { algorithm: None }));
    }

    #[test]
    fn cli_decrypt_rejects_both_sources() {
        let result = Cli::try_parse_from([
            "ciphervault",
            "decrypt",
            "owner",
            "Q1ZFTg==",
            "--input",
            "msg.txt",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_data_dir_is_global() {
        let cli = Cli::try_parse_from(["ciphervault", "users", "--data-dir", "vault"]).unwrap();
        assert_eq!(cli.data_dir.as_deref(), Some("vault"));
    }
}
