//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::audit::AuditEntry;
use crate::keystore::{RotationEvent, UserSummary};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of registered users (User, Registered).
pub fn print_users_table(users: &[UserSummary]) {
    if users.is_empty() {
        info("No users registered yet.");
        tip("Run `ciphervault register <USER>` to add the first one.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["User", "Registered"]);

    for u in users {
        table.add_row(vec![
            u.user_id.clone(),
            u.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }

    println!("{table}");
}

/// Print the algorithm rotation history (Time, From, To).
pub fn print_rotation_table(history: &[RotationEvent]) {
    if history.is_empty() {
        info("No rotations yet.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time", "From", "To"]);

    for event in history {
        table.add_row(vec![
            event.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            event.from.to_string(),
            event.to.to_string(),
        ]);
    }

    println!("{table}");
}

/// Print audit entries in a formatted table.
pub fn print_audit_table(entries: &[AuditEntry]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time", "Actor", "Action", "Outcome", "Details"]);

    for entry in entries {
        let outcome = if entry.outcome.success {
            style("success").green().to_string()
        } else {
            style("failure").red().to_string()
        };

        table.add_row(vec![
            entry.timestamp.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
            entry.actor.clone(),
            colorize_action(&entry.action),
            outcome,
            entry.outcome.detail.clone().unwrap_or_else(|| "-".into()),
        ]);
    }

    println!(
        "{}",
        style(format!("{} audit entries:", entries.len())).bold()
    );
    println!("{table}");
}

/// Colorize action names for display.
fn colorize_action(action: &str) -> String {
    match action {
        "register" => style(action).green().to_string(),
        "encrypt" | "decrypt" => style(action).blue().to_string(),
        "remove-user" | "unlock" => style(action).red().to_string(),
        "rotate" => style(action).yellow().to_string(),
        "export-key" => style(action).magenta().to_string(),
        "authenticate" => style(action).cyan().to_string(),
        _ => action.to_string(),
    }
}
