//! Activity log: one timestamped line per lifecycle event.
//!
//! Lines go to a plain-text file per calendar day, inside a folder per
//! calendar month:
//!
//! ```text
//! <root>/Log_10_2026/Log_10_19_2026.txt
//!     10/19/2026 3:04:05 PM: Started looking at conversion.....
//!     10/19/2026 3:04:06 PM: SUCCESS : downloaded PDF for Laserfiche Entry#12345(CITY).
//! ```
//!
//! Folder and file are created lazily. Recording never fails from the
//! caller's point of view: a write error is printed to stderr and emitted as
//! a `tracing` warning, and the job carries on.

use chrono::{DateTime, Datelike, Local, TimeZone};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Dated append-only activity log rooted at a directory.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    root: PathBuf,
}

impl ActivityLog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Log rooted next to the running executable, falling back to the
    /// working directory when that cannot be determined.
    pub fn beside_executable() -> Self {
        let root = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Append `message` stamped with the current local time.
    pub async fn record(&self, message: impl AsRef<str>) {
        self.record_at(&Local::now(), message.as_ref()).await;
    }

    /// Append `message` stamped with `at`. Never returns an error.
    pub async fn record_at<Tz: TimeZone>(&self, at: &DateTime<Tz>, message: &str)
    where
        Tz::Offset: std::fmt::Display,
    {
        info!(target: "activity", "{message}");
        let path = self.path_for(at);
        let line = format_line(at, message);
        if let Err(e) = append(&path, &line).await {
            eprintln!("Failed to write activity log {}: {e}", path.display());
            warn!(
                "Failed to write activity log under {}: {}",
                self.root.display(),
                e
            );
        }
    }

    /// Path of the file a line stamped `at` goes to.
    pub fn path_for<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> PathBuf {
        self.root
            .join(format!("Log_{}_{}", at.month(), at.year()))
            .join(format!("Log_{}_{}_{}.txt", at.month(), at.day(), at.year()))
    }

    /// Path of today's file.
    pub fn current_path(&self) -> PathBuf {
        self.path_for(&Local::now())
    }
}

async fn append(path: &Path, line: &str) -> io::Result<()> {
    if let Some(folder) = path.parent() {
        fs::create_dir_all(folder).await?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(format!("{line}\n").as_bytes()).await?;
    file.flush().await
}

/// `M/D/YYYY h:mm:ss AM: message.`
fn format_line<Tz: TimeZone>(at: &DateTime<Tz>, message: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}: {}.", at.format("%-m/%-d/%Y %-I:%M:%S %p"), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn path_uses_month_folder_and_day_file() {
        let log = ActivityLog::new("/var/log/pagegen");
        let path = log.path_for(&at(2026, 3, 7, 9, 0, 0));
        assert_eq!(
            path,
            PathBuf::from("/var/log/pagegen/Log_3_2026/Log_3_7_2026.txt")
        );
    }

    #[test]
    fn line_format_is_twelve_hour_with_trailing_period() {
        assert_eq!(
            format_line(&at(2026, 10, 19, 15, 4, 5), "BYPASS : x"),
            "10/19/2026 3:04:05 PM: BYPASS : x."
        );
        assert_eq!(
            format_line(&at(2026, 1, 2, 0, 30, 0), "midnight"),
            "1/2/2026 12:30:00 AM: midnight."
        );
    }

    #[tokio::test]
    async fn record_creates_folder_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let log = ActivityLog::new(dir.path());
        let stamp = at(2026, 10, 19, 8, 0, 0);

        log.record_at(&stamp, "first").await;
        log.record_at(&stamp, "second").await;

        let content = std::fs::read_to_string(log.path_for(&stamp)).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(": first."));
        assert!(lines[1].ends_with(": second."));
    }

    #[tokio::test]
    async fn unwritable_root_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the month folder should go.
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        let log = ActivityLog::new(&blocker);

        log.record_at(&at(2026, 10, 19, 8, 0, 0), "lost").await;
        assert!(!log.path_for(&at(2026, 10, 19, 8, 0, 0)).exists());
    }
}
