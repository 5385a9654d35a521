//! `ciphervault audit` — display the audit log.
//!
//! Usage:
//!   ciphervault audit               # show last 50 entries
//!   ciphervault audit --last 20     # show last 20
//!   ciphervault audit --since 7d    # entries from last 7 days
//!
//! The log is plain text, so no passphrase is needed to read it.

use chrono::{DateTime, Duration, Utc};

use crate::audit::AuditLog;
use crate::cli::output;
use crate::cli::{data_dir, Cli};
use crate::config::Settings;
use crate::errors::{CipherVaultError, Result};
use crate::keystore::KeystorePaths;

/// Execute the `audit` command.
pub fn execute(cli: &Cli, last: usize, since: Option<&str>) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;
    let paths = KeystorePaths::new(data_dir(cli, &settings)?);

    let since_dt = match since {
        Some(s) => Some(parse_duration(s)?),
        None => None,
    };

    let audit = AuditLog::open(&paths.audit);
    let entries = audit.query(last, since_dt)?;

    if entries.is_empty() {
        output::info("No audit entries found.");
        return Ok(());
    }

    output::print_audit_table(&entries);

    Ok(())
}

/// Parse a human-friendly duration string like "7d", "24h", "30m".
fn parse_duration(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();

    let invalid = || {
        CipherVaultError::CommandFailed(format!(
            "invalid duration '{input}' — use format like 7d, 24h, or 30m"
        ))
    };

    let (num_str, unit) = if let Some(s) = input.strip_suffix('d') {
        (s, 'd')
    } else if let Some(s) = input.strip_suffix('h') {
        (s, 'h')
    } else if let Some(s) = input.strip_suffix('m') {
        (s, 'm')
    } else {
        return Err(invalid());
    };

    let num: i64 = num_str.parse().map_err(|_| invalid())?;
    if num < 0 {
        return Err(invalid());
    }

    let duration = match unit {
        'd' => Duration::try_days(num),
        'h' => Duration::try_hours(num),
        _ => Duration::try_minutes(num),
    }
    .ok_or_else(invalid)?;

    Utc::now().checked_sub_signed(duration).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::Outcome;

    #[test]
    fn parse_duration_days() {
        let dt = parse_duration("7d").unwrap();
        let diff = Utc::now() - dt;
        // Should be roughly 7 days (within a few seconds).
        assert!((diff.num_days() - 7).abs() <= 1);
    }

    #[test]
    fn parse_duration_hours() {
        let dt = parse_duration("24h").unwrap();
        let diff = Utc::now() - dt;
        assert!((diff.num_hours() - 24).abs() <= 1);
    }

    #[test]
    fn parse_duration_minutes() {
        let dt = parse_duration("30m").unwrap();
        let diff = Utc::now() - dt;
        assert!((diff.num_minutes() - 30).abs() <= 1);
    }

    #[test]
    fn parse_duration_invalid() {
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("7x").is_err());
        assert!(parse_duration("d").is_err());
        assert!(parse_duration("-3d").is_err());
    }

    #[test]
    fn audit_with_since_filter() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut audit = AuditLog::open(&dir.path().join("audit.log"));

        audit.append("owner", "register", Outcome::success()).unwrap();

        // Query with "1h" should include recent entries.
        let since = parse_duration("1h").unwrap();
        let entries = audit.query(10, Some(since)).unwrap();
        assert_eq!(entries.len(), 1);
    }
}
