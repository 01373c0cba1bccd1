//! Poll-based follower for an append-only log file.
//!
//! Opens the file, seeks to the current end of content, and reads forward as
//! the node appends. Lines written before the follower starts are never
//! replayed. A partially-written line (no trailing newline yet) is held in an
//! internal buffer across calls and emitted only once complete, so a line is
//! never split across two reads.
//!
//! If the file is truncated, rotated, or deleted underneath the follower, no
//! further lines will ever arrive; the condition is detected and reported
//! once, but not recovered from (there is no reopen logic).

use super::LineSource;
use crate::Result;
use metrics::counter;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Follows a single append-only log file from end-of-content forward.
pub struct LogFollower {
    reader: BufReader<File>,
    path: PathBuf,
    /// Byte offset of the next read, tracked to detect truncation.
    position: u64,
    /// Partial line awaiting its newline.
    pending: String,
    rotation_reported: bool,
}

impl LogFollower {
    /// Open the log file and position at the current end of content.
    ///
    /// Fatal if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let mut reader = BufReader::new(file);
        let position = reader.seek(SeekFrom::End(0))?;

        info!(
            "Following {} from byte offset {}",
            path.display(),
            position
        );

        Ok(Self {
            reader,
            path,
            position,
            pending: String::new(),
            rotation_reported: false,
        })
    }

    /// Whether the followed file was observed truncated, rotated, or
    /// inaccessible at some point. Once true, the follower is permanently
    /// idle.
    pub fn rotation_detected(&self) -> bool {
        self.rotation_reported
    }

    /// Check for truncation/rotation while idle. Report-only; the follower
    /// keeps polling the original handle and will simply never see data
    /// again.
    fn check_rotation(&mut self) {
        if self.rotation_reported {
            return;
        }

        match fs::metadata(&self.path) {
            Ok(meta) if meta.len() < self.position => {
                warn!(
                    "{} shrank below read offset ({} < {}): file was truncated or rotated; \
                     no further lines will be read",
                    self.path.display(),
                    meta.len(),
                    self.position
                );
                counter!("tail_rotations_detected_total").increment(1);
                self.rotation_reported = true;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(
                    "{} became inaccessible ({}): no further lines will be read",
                    self.path.display(),
                    e
                );
                counter!("tail_rotations_detected_total").increment(1);
                self.rotation_reported = true;
            }
        }
    }
}

impl LineSource for LogFollower {
    fn name(&self) -> &'static str {
        "tail"
    }

    fn next_line(&mut self) -> Result<Option<String>> {
        // read_line appends to the pending buffer, so a line arriving in
        // pieces accumulates across calls.
        let read = self.reader.read_line(&mut self.pending)?;
        self.position += read as u64;

        if self.pending.ends_with('\n') {
            let mut line = std::mem::take(&mut self.pending);
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            return Ok(Some(line));
        }

        if read == 0 {
            self.check_rotation();
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn append(path: &Path, data: &str) {
        let mut file = fs::OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(data.as_bytes()).unwrap();
        file.flush().unwrap();
    }

    fn follower_for(content: &str) -> (tempfile::TempDir, PathBuf, LogFollower) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("debug.log");
        fs::write(&path, content).unwrap();
        let follower = LogFollower::open(&path).unwrap();
        (dir, path, follower)
    }

    #[test]
    fn test_open_missing_file_is_fatal() {
        assert!(LogFollower::open("/nonexistent/debug.log").is_err());
    }

    #[test]
    fn test_starts_at_end_of_content() {
        let (_dir, path, mut follower) = follower_for("old line\n");
        assert_eq!(follower.next_line().unwrap(), None);

        append(&path, "new line\n");
        assert_eq!(follower.next_line().unwrap().as_deref(), Some("new line"));
    }

    #[test]
    fn test_yields_appended_lines_in_order() {
        let (_dir, path, mut follower) = follower_for("");
        append(&path, "first\nsecond\n");

        assert_eq!(follower.next_line().unwrap().as_deref(), Some("first"));
        assert_eq!(follower.next_line().unwrap().as_deref(), Some("second"));
        assert_eq!(follower.next_line().unwrap(), None);
    }

    #[test]
    fn test_partial_line_is_held_until_complete() {
        let (_dir, path, mut follower) = follower_for("");

        append(&path, "par");
        assert_eq!(follower.next_line().unwrap(), None);

        append(&path, "tial\n");
        assert_eq!(follower.next_line().unwrap().as_deref(), Some("partial"));
    }

    #[test]
    fn test_crlf_line_endings_are_stripped() {
        let (_dir, path, mut follower) = follower_for("");
        append(&path, "windows line\r\n");
        assert_eq!(
            follower.next_line().unwrap().as_deref(),
            Some("windows line")
        );
    }

    #[test]
    fn test_truncation_is_detected_and_reported_once() {
        let (_dir, path, mut follower) = follower_for("plenty of content before truncation\n");

        fs::write(&path, "short").unwrap();

        assert_eq!(follower.next_line().unwrap(), None);
        assert!(follower.rotation_detected());

        // Still idle, still reported only once.
        assert_eq!(follower.next_line().unwrap(), None);
        assert!(follower.rotation_detected());
    }
}
