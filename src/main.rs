use clap::Parser;
use ciphervault::cli::commands;
use ciphervault::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

/// Env var holding the tracing filter (e.g. `debug`, `ciphervault=info`).
const LOG_ENV: &str = "CIPHERVAULT_LOG";

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init::execute(&cli),
        Commands::Register { ref user } => commands::register::execute(&cli, user),
        Commands::Auth { ref user } => commands::auth::execute(&cli, user),
        Commands::Encrypt {
            ref user,
            ref text,
            ref output,
        } => commands::encrypt::execute(&cli, user, text.as_deref(), output.as_deref()),
        Commands::Decrypt {
            ref user,
            ref envelope,
            ref input,
        } => commands::decrypt::execute(&cli, user, envelope.as_deref(), input.as_deref()),
        Commands::Rotate { ref algorithm } => commands::rotate::execute(&cli, algorithm.as_deref()),
        Commands::ExportKey { ref user } => commands::export::execute(&cli, user),
        Commands::Users => commands::users::execute(&cli),
        Commands::Status => commands::status::execute(&cli),
        Commands::Audit { last, ref since } => {
            commands::audit_cmd::execute(&cli, last, since.as_deref())
        }
        Commands::RemoveUser { ref user, force } => {
            commands::remove_user::execute(&cli, user, force)
        }
    };

    if let Err(e) = result {
        ciphervault::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
