//! Run log: a single serialized sink writing the literal `TRYING`/`FAIL`/
//! `SUCCESS` line formats mandated by §6 to `logs/unpack.log`, shared by
//! every worker behind a mutex so concurrent writers never interleave
//! partial lines.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

pub struct RunLog {
    writer: Mutex<BufWriter<File>>,
}

impl RunLog {
    pub fn open(logs_dir: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(logs_dir.join("unpack.log"))?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn trying(&self, path: &str, signature: &str, offset: u64) {
        self.write_line(&format!("TRYING {path} {signature} at offset: {offset}"));
    }

    pub fn fail(&self, path: &str, signature: &str, offset: u64, reason: &str) {
        self.write_line(&format!(
            "FAIL {path} {signature} at offset: {offset}: {reason}"
        ));
    }

    pub fn success(&self, path: &str, signature: &str, offset: u64, length: u64) {
        self.write_line(&format!(
            "SUCCESS {path} {signature} at offset: {offset}, length: {length}"
        ));
    }

    fn write_line(&self, line: &str) {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        if writeln!(writer, "{line}").is_ok() {
            let _ = writer.flush();
        }
        tracing::debug!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_mandated_line_formats() {
        let dir = tempdir().expect("tempdir");
        let log = RunLog::open(dir.path()).expect("open log");

        log.trying("/unpack/image.bin", "png", 0);
        log.fail("/unpack/image.bin", "lzma", 0, "header checksum mismatch");
        log.success("/unpack/image.bin", "png", 0, 1024);

        let contents = std::fs::read_to_string(dir.path().join("unpack.log")).unwrap();
        assert!(contents.contains("TRYING /unpack/image.bin png at offset: 0"));
        assert!(contents.contains(
            "FAIL /unpack/image.bin lzma at offset: 0: header checksum mismatch"
        ));
        assert!(contents.contains("SUCCESS /unpack/image.bin png at offset: 0, length: 1024"));
    }
}
