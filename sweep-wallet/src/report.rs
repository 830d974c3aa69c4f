use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const RECORD_SEPARATOR: &str = "------------------------------";

/// Append-only result file shared by every worker.
///
/// The lock scopes one whole record, so records from different secrets
/// never interleave inside the file.
pub struct ResultSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl ResultSink {
    /// Create the sink, truncating any previous run's file.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one record atomically, followed by the separator line.
    pub fn append(&self, record: &str) -> io::Result<()> {
        let mut file = self.file.lock().expect("sink lock poisoned");
        writeln!(file, "{record}\n{RECORD_SEPARATOR}")?;
        file.flush()
    }
}

/// The two files every secret reports into: funded secrets in one,
/// empty and failed ones in the other.
pub struct ReportSinks {
    pub positive: ResultSink,
    pub zero: ResultSink,
}

impl ReportSinks {
    /// `<prefix>_positive.txt` and `<prefix>_zero.txt`, truncated up front
    /// so a run always starts from empty files.
    pub fn create(prefix: impl AsRef<Path>) -> io::Result<Self> {
        let prefix = prefix.as_ref();
        Ok(Self {
            positive: ResultSink::create(sibling(prefix, "positive"))?,
            zero: ResultSink::create(sibling(prefix, "zero"))?,
        })
    }
}

fn sibling(prefix: &Path, label: &str) -> PathBuf {
    let mut name = prefix.file_name().unwrap_or_default().to_os_string();
    name.push(format!("_{label}.txt"));
    prefix.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn records_do_not_interleave_across_threads() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(ResultSink::create(dir.path().join("out.txt")).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    let record = format!("Secret: s{i}\nBalance: {i} sats");
                    sink.append(&record).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let contents = std::fs::read_to_string(sink.path()).unwrap();
        let records: Vec<&str> = contents
            .split(RECORD_SEPARATOR)
            .map(str::trim)
            .filter(|chunk| !chunk.is_empty())
            .collect();
        assert_eq!(records.len(), 8);
        for record in records {
            let mut lines = record.lines();
            assert!(lines.next().unwrap().starts_with("Secret: s"));
            assert!(lines.next().unwrap().starts_with("Balance: "));
        }
    }

    #[test]
    fn create_truncates_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "stale").unwrap();
        let _sink = ResultSink::create(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn sinks_use_the_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let sinks = ReportSinks::create(dir.path().join("results")).unwrap();
        assert!(sinks.positive.path().ends_with("results_positive.txt"));
        assert!(sinks.zero.path().ends_with("results_zero.txt"));
    }
}
