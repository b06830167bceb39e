//! Capture sessions
//!
//! A session owns the identifiers and accumulators that live for one
//! recording run: the collision-free session id, the monotonic segment
//! index, and the full-session buffer that collects every emitted segment
//! for the combined artifact written at stop.

use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;
use std::path::{Path, PathBuf};

/// State scoped to one recording run
pub struct Session {
    /// E.g. `RECORDING_4_07_08_2026`
    pub id: String,
    next_segment: u32,
    full: Vec<i16>,
}

impl Session {
    /// Begin a session, allocating the next free recording number from the
    /// files already present in `audio_dir`.
    pub fn begin(audio_dir: &Path) -> Self {
        let number = next_recording_number(audio_dir);
        let id = session_id(number, Local::now().date_naive());
        tracing::info!("session {} started", id);
        Self {
            id,
            next_segment: 1,
            full: Vec::new(),
        }
    }

    /// Claim the next segment index and the file path it will be written
    /// under. Indices start at 1 and are never reused within a session.
    pub fn next_segment_path(&mut self, audio_dir: &Path) -> (u32, PathBuf) {
        let index = self.next_segment;
        self.next_segment += 1;
        let path = audio_dir.join(format!("{}_SEGMENT_{}.wav", self.id, index));
        (index, path)
    }

    /// Number of segments emitted so far.
    pub fn segments_emitted(&self) -> u32 {
        self.next_segment - 1
    }

    /// Append an emitted segment's fresh (non-overlapped) audio to the
    /// full-session buffer.
    pub fn append_full(&mut self, samples: &[i16]) {
        self.full.extend_from_slice(samples);
    }

    /// Path of the combined full-session artifact.
    pub fn full_path(&self, audio_dir: &Path) -> PathBuf {
        audio_dir.join(format!("{}_FULL.wav", self.id))
    }

    /// Take the full-session buffer for its single flush at session end.
    pub fn take_full(&mut self) -> Vec<i16> {
        std::mem::take(&mut self.full)
    }
}

/// Scan existing output files for `RECORDING_<n>_` and return the first
/// free recording number.
///
/// A directory that cannot be listed deterministically yields 1 rather than
/// failing the session start.
fn next_recording_number(audio_dir: &Path) -> u32 {
    let pattern = Regex::new(r"RECORDING_(\d+)_").expect("valid recording pattern");
    let entries = match std::fs::read_dir(audio_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(
                "could not scan {} for existing recordings ({}), using number 1",
                audio_dir.display(),
                e
            );
            return 1;
        }
    };

    let mut next = 1;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("wav") {
            continue;
        }
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };
        if let Some(found) = pattern
            .captures(name)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
        {
            if found >= next {
                next = found + 1;
            }
        }
    }
    next
}

/// `RECORDING_<n>_<dd>_<mm>_<yyyy>`
fn session_id(number: u32, date: NaiveDate) -> String {
    format!(
        "RECORDING_{}_{:02}_{:02}_{}",
        number,
        date.day(),
        date.month(),
        date.year()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_session_id_format() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        assert_eq!(session_id(4, date), "RECORDING_4_07_08_2026");
    }

    #[test]
    fn test_number_starts_at_one_in_empty_dir() {
        let tmp = tempdir().unwrap();
        assert_eq!(next_recording_number(tmp.path()), 1);
    }

    #[test]
    fn test_number_skips_existing_recordings() {
        let tmp = tempdir().unwrap();
        for name in [
            "RECORDING_1_01_02_2026_SEGMENT_1.wav",
            "RECORDING_3_01_02_2026_SEGMENT_2.wav",
            "RECORDING_3_01_02_2026_FULL.wav",
        ] {
            File::create(tmp.path().join(name)).unwrap();
        }
        assert_eq!(next_recording_number(tmp.path()), 4);
    }

    #[test]
    fn test_number_ignores_unrelated_files() {
        let tmp = tempdir().unwrap();
        File::create(tmp.path().join("notes.txt")).unwrap();
        File::create(tmp.path().join("RECORDING_9_notes.txt")).unwrap();
        File::create(tmp.path().join("capture_12.wav")).unwrap();
        assert_eq!(next_recording_number(tmp.path()), 1);
    }

    #[test]
    fn test_missing_directory_falls_back_to_one() {
        let tmp = tempdir().unwrap();
        let gone = tmp.path().join("nope");
        assert_eq!(next_recording_number(&gone), 1);
    }

    #[test]
    fn test_segment_indices_are_sequential() {
        let tmp = tempdir().unwrap();
        let mut session = Session::begin(tmp.path());
        assert_eq!(session.segments_emitted(), 0);

        let (first, path1) = session.next_segment_path(tmp.path());
        let (second, path2) = session.next_segment_path(tmp.path());
        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_ne!(path1, path2);
        assert!(path1
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .ends_with("_SEGMENT_1.wav"));
        assert_eq!(session.segments_emitted(), 2);
    }

    #[test]
    fn test_full_buffer_taken_once() {
        let tmp = tempdir().unwrap();
        let mut session = Session::begin(tmp.path());
        session.append_full(&[1, 2, 3]);
        session.append_full(&[4]);

        assert_eq!(session.take_full(), vec![1, 2, 3, 4]);
        assert!(session.take_full().is_empty());
    }
}
