//! Incremental reader over the monitored log file.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Tracks how far into the file has been delivered and carries an
/// unterminated trailing fragment between read cycles, so a half-written
/// line is neither dropped nor delivered twice.
///
/// The offset only ever moves forward, except when the file shrinks below
/// it: that means truncation or rotation, and the next read restarts from
/// byte 0 of the new content.
pub struct LogTailer {
    path: PathBuf,
    offset: u64,
    carry: Vec<u8>,
}

impl LogTailer {
    /// Starts at the current end of file; pre-existing content is never
    /// reprocessed. Fails when the file cannot be stat'ed.
    pub fn new(path: &Path) -> std::io::Result<Self> {
        let size = std::fs::metadata(path)?.len();
        Ok(Self {
            path: path.to_path_buf(),
            offset: size,
            carry: Vec::new(),
        })
    }

    /// Starts at byte 0. For callers that want the existing content too.
    pub fn from_start(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            offset: 0,
            carry: Vec::new(),
        }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// One read cycle: detect truncation, read everything new, return the
    /// complete non-empty lines in file order. Growth that lands after the
    /// initial stat is picked up by the next cycle.
    pub fn poll(&mut self) -> std::io::Result<Vec<String>> {
        let size = std::fs::metadata(&self.path)?.len();

        if size < self.offset {
            info!(
                path = %self.path.display(),
                old_offset = self.offset,
                new_size = size,
                "Log file truncated, restarting from the beginning"
            );
            self.offset = 0;
            self.carry.clear();
        }
        if size == self.offset {
            return Ok(Vec::new());
        }

        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(self.offset))?;
        let mut chunk = Vec::with_capacity((size - self.offset) as usize);
        file.take(size - self.offset).read_to_end(&mut chunk)?;

        let mut buf = std::mem::take(&mut self.carry);
        buf.extend_from_slice(&chunk);
        self.offset = size;

        let lines = match buf.iter().rposition(|&b| b == b'\n') {
            Some(last_nl) => {
                self.carry = buf[last_nl + 1..].to_vec();
                buf.truncate(last_nl);
                String::from_utf8_lossy(&buf)
                    .split('\n')
                    .map(|l| l.trim_end_matches('\r'))
                    .filter(|l| !l.trim().is_empty())
                    .map(str::to_string)
                    .collect()
            }
            None => {
                // No line terminator yet, hold the fragment for next time
                self.carry = buf;
                Vec::new()
            }
        };

        debug!(count = lines.len(), offset = self.offset, "Read cycle complete");
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    fn append(path: &Path, data: &str) {
        let mut file = fs::OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(data.as_bytes()).unwrap();
    }

    fn setup(initial: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ufw.log");
        fs::write(&path, initial).unwrap();
        (dir, path)
    }

    #[test]
    fn starts_at_end_of_existing_content() {
        let (_dir, path) = setup("old line 1\nold line 2\n");
        let mut tailer = LogTailer::new(&path).unwrap();

        assert!(tailer.poll().unwrap().is_empty());

        append(&path, "new line\n");
        assert_eq!(tailer.poll().unwrap(), vec!["new line"]);
    }

    #[test]
    fn missing_file_is_an_error_at_construction() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LogTailer::new(&dir.path().join("absent.log")).is_err());
    }

    #[test]
    fn delivers_lines_in_file_order() {
        let (_dir, path) = setup("");
        let mut tailer = LogTailer::new(&path).unwrap();

        append(&path, "first\nsecond\nthird\n");
        assert_eq!(tailer.poll().unwrap(), vec!["first", "second", "third"]);
        assert!(tailer.poll().unwrap().is_empty());
    }

    #[test]
    fn blank_lines_are_skipped() {
        let (_dir, path) = setup("");
        let mut tailer = LogTailer::new(&path).unwrap();

        append(&path, "one\n\n  \ntwo\n");
        assert_eq!(tailer.poll().unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn unterminated_fragment_is_held_until_completed() {
        let (_dir, path) = setup("");
        let mut tailer = LogTailer::new(&path).unwrap();

        append(&path, "complete\npart");
        assert_eq!(tailer.poll().unwrap(), vec!["complete"]);

        append(&path, "ial line\n");
        assert_eq!(tailer.poll().unwrap(), vec!["partial line"]);
    }

    #[test]
    fn fragment_without_any_newline_is_not_delivered() {
        let (_dir, path) = setup("");
        let mut tailer = LogTailer::new(&path).unwrap();

        append(&path, "no newline yet");
        assert!(tailer.poll().unwrap().is_empty());

        append(&path, " and now\n");
        assert_eq!(tailer.poll().unwrap(), vec!["no newline yet and now"]);
    }

    #[test]
    fn truncation_resets_to_byte_zero_without_redelivery() {
        let (_dir, path) = setup("");
        let mut tailer = LogTailer::new(&path).unwrap();

        append(&path, "before rotation 1\nbefore rotation 2\n");
        assert_eq!(tailer.poll().unwrap().len(), 2);

        // Rotation: the file is replaced with shorter, fresh content
        fs::write(&path, "after rotation\n").unwrap();
        assert_eq!(tailer.poll().unwrap(), vec!["after rotation"]);
        assert_eq!(tailer.offset(), "after rotation\n".len() as u64);
    }

    #[test]
    fn truncation_drops_a_pending_fragment() {
        let (_dir, path) = setup("");
        let mut tailer = LogTailer::new(&path).unwrap();

        append(&path, "dangling fragment without newline");
        assert!(tailer.poll().unwrap().is_empty());

        fs::write(&path, "fresh\n").unwrap();
        assert_eq!(tailer.poll().unwrap(), vec!["fresh"]);
    }

    #[test]
    fn crlf_terminators_are_stripped() {
        let (_dir, path) = setup("");
        let mut tailer = LogTailer::new(&path).unwrap();

        append(&path, "windows line\r\nplain line\n");
        assert_eq!(tailer.poll().unwrap(), vec!["windows line", "plain line"]);
    }

    #[test]
    fn from_start_replays_existing_content() {
        let (_dir, path) = setup("seeded\n");
        let mut tailer = LogTailer::from_start(&path);
        assert_eq!(tailer.poll().unwrap(), vec!["seeded"]);
    }
}
