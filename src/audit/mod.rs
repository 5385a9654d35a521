//! Audit log — append-only text record of security-relevant operations.
//!
//! One line per entry in `<data_dir>/audit.log`:
//!
//! ```text
//! [2026-10-17T09:30:12.123456Z] alice: encrypt — success (aes-256-gcm)
//! ```
//!
//! Every append is flushed and synced before returning, so a crash can lose
//! at most the entry being written.  The log is advisory: the keystore
//! session treats append failures as warnings and never lets them affect
//! keystore state.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use tracing::warn;

use crate::errors::{CipherVaultError, Result};

/// Actor recorded for operations not performed on behalf of a user.
pub const SYSTEM_ACTOR: &str = "system";

/// Separator between the action and the outcome on a log line.
const OUTCOME_SEPARATOR: &str = " — ";

/// Result of an audited operation, with an optional short detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub detail: Option<String>,
}

impl Outcome {
    pub fn success() -> Self {
        Self {
            success: true,
            detail: None,
        }
    }

    pub fn failure() -> Self {
        Self {
            success: false,
            detail: None,
        }
    }

    /// Attach a detail.  Line breaks are flattened so one entry stays one line.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        let detail: String = detail.into();
        self.detail = Some(detail.replace(['\n', '\r'], " "));
        self
    }

    fn parse(text: &str) -> Option<Self> {
        let (status, detail) = match text.split_once(" (") {
            Some((status, rest)) => (status, Some(rest.strip_suffix(')')?.to_string())),
            None => (text, None),
        };
        let success = match status {
            "success" => true,
            "failure" => false,
            _ => return None,
        };
        Some(Self { success, detail })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.success { "success" } else { "failure" })?;
        if let Some(detail) = &self.detail {
            write!(f, " ({detail})")?;
        }
        Ok(())
    }
}

/// A single audit log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub action: String,
    pub outcome: Outcome,
}

impl AuditEntry {
    /// Render as one log line (without the trailing newline).
    pub fn to_line(&self) -> String {
        format!(
            "[{}] {}: {}{OUTCOME_SEPARATOR}{}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            self.actor,
            self.action,
            self.outcome
        )
    }

    /// Parse one log line; `None` if it is not a well-formed entry.
    pub fn parse_line(line: &str) -> Option<Self> {
        let rest = line.strip_prefix('[')?;
        let (ts, rest) = rest.split_once("] ")?;
        let (actor, rest) = rest.split_once(": ")?;
        let (action, outcome) = rest.split_once(OUTCOME_SEPARATOR)?;

        let timestamp = DateTime::parse_from_rfc3339(ts).ok()?.with_timezone(&Utc);
        Some(Self {
            timestamp,
            actor: actor.to_string(),
            action: action.to_string(),
            outcome: Outcome::parse(outcome)?,
        })
    }
}

/// Append-only audit log file.
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    /// Timestamp of the newest entry, used to keep timestamps strictly increasing.
    last_timestamp: Option<DateTime<Utc>>,
}

impl AuditLog {
    /// Open the audit log at `path`.  The file is created on first append.
    ///
    /// Never fails: an unreadable log only means timestamps restart from
    /// the current clock.
    pub fn open(path: &Path) -> Self {
        let mut log = Self {
            path: path.to_path_buf(),
            last_timestamp: None,
        };
        match log.read_entries() {
            Ok(entries) => log.last_timestamp = entries.last().map(|e| e.timestamp),
            Err(e) => warn!(path = %path.display(), error = %e, "audit log is unreadable"),
        }
        log
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry and sync it to disk.
    ///
    /// If the clock has not advanced past the previous entry (or went
    /// backwards), the new entry is stamped one microsecond after it.
    /// A torn final line left by a crash is terminated first so the new
    /// entry always starts on its own line.
    pub fn append(&mut self, actor: &str, action: &str, outcome: Outcome) -> Result<AuditEntry> {
        let now = Utc::now().trunc_subsecs(6);
        let timestamp = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };

        let entry = AuditEntry {
            timestamp,
            actor: actor.to_string(),
            action: action.to_string(),
            outcome,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut options = OpenOptions::new();
        options.create(true).read(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options
            .open(&self.path)
            .map_err(|e| CipherVaultError::AuditError(format!("open {}: {e}", self.path.display())))?;

        let mut line = String::new();
        if ends_mid_line(&mut file)? {
            warn!(path = %self.path.display(), "audit log ends with a torn line");
            line.push('\n');
        }
        line.push_str(&entry.to_line());
        line.push('\n');
        file.write_all(line.as_bytes())?;
        file.flush()?;
        file.sync_data()?;

        self.last_timestamp = Some(timestamp);
        Ok(entry)
    }

    /// Read every entry in write order.  Malformed lines, including lines
    /// that are not valid UTF-8, are skipped.
    pub fn read_entries(&self) -> Result<Vec<AuditEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read(&self.path)
            .map_err(|e| CipherVaultError::AuditError(format!("read {}: {e}", self.path.display())))?;

        let mut entries = Vec::new();
        for (idx, raw) in contents.split(|b| *b == b'\n').enumerate() {
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            let Ok(line) = std::str::from_utf8(raw) else {
                warn!(line = idx + 1, "skipping audit log line that is not valid UTF-8");
                continue;
            };
            if line.trim().is_empty() {
                continue;
            }
            match AuditEntry::parse_line(line) {
                Some(entry) => entries.push(entry),
                None => warn!(line = idx + 1, "skipping malformed audit log line"),
            }
        }
        Ok(entries)
    }

    /// Query recent audit entries.
    ///
    /// - `limit`: maximum number of entries to return (most recent first).
    /// - `since`: if provided, only return entries at or after this timestamp.
    pub fn query(&self, limit: usize, since: Option<DateTime<Utc>>) -> Result<Vec<AuditEntry>> {
        let entries = self.read_entries()?;
        Ok(entries
            .into_iter()
            .rev()
            .filter(|e| since.map_or(true, |ts| e.timestamp >= ts))
            .take(limit)
            .collect())
    }
}

/// Whether a non-empty file's last byte is something other than a newline.
fn ends_mid_line(file: &mut File) -> io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}
