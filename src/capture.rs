//! Optional packet capture to disk, for offline inspection of a session.
//!
//! Capture records each logical `(packet_type, payload)` frame re-encoded
//! as a normal frame in the connection's current type-width, rather than
//! the exact bytes that crossed the wire for frames that arrived inside a
//! compression group or as a jumbo frame — see `DESIGN.md` for why.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Writes one numbered `.packet` file per captured frame for a single
/// direction ("in" or "out"), matching the naming contract checked by
/// `tools/validate_packet_files.py` in the source client.
pub struct FrameCapture {
    dir: PathBuf,
    direction: &'static str,
    counter: u32,
}

impl FrameCapture {
    /// Start capturing into `dir` for `direction` ("in" or "out"). Does
    /// not touch the directory itself — call [`prepare_capture_dir`] once
    /// per connection before constructing either direction's capture.
    pub fn new(dir: PathBuf, direction: &'static str) -> Self {
        FrameCapture { dir, direction, counter: 0 }
    }

    /// Write one captured frame and advance this direction's counter.
    pub fn record(&mut self, packet_type: u16, raw_frame: &[u8]) -> io::Result<()> {
        let filename = format!("{}_{:04}_type{:03}.packet", self.direction, self.counter, packet_type);
        fs::write(self.dir.join(filename), raw_frame)?;
        self.counter += 1;
        Ok(())
    }
}

/// Clear `dir` of any prior contents and (re)create it, per the
/// "overwrites existing directory contents" capture contract.
pub fn prepare_capture_dir(dir: &Path) -> io::Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_use_independent_per_direction_counters() {
        let tmp = tempfile::tempdir().unwrap();
        prepare_capture_dir(tmp.path()).unwrap();
        let mut inbound = FrameCapture::new(tmp.path().to_path_buf(), "in");
        let mut outbound = FrameCapture::new(tmp.path().to_path_buf(), "out");

        inbound.record(5, b"hello").unwrap();
        outbound.record(4, b"join").unwrap();
        inbound.record(16, b"world").unwrap();

        assert!(tmp.path().join("in_0000_type005.packet").exists());
        assert!(tmp.path().join("out_0000_type004.packet").exists());
        assert!(tmp.path().join("in_0001_type016.packet").exists());
    }

    #[test]
    fn prepare_clears_existing_contents() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("stale.packet"), b"old").unwrap();
        prepare_capture_dir(tmp.path()).unwrap();
        assert!(!tmp.path().join("stale.packet").exists());
    }
}
