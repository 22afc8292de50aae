use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use log::info;
use thiserror::Error;

use crate::session::{Session, SessionError, SessionSnapshot};

/// Loads a session from a JSON file.
///
/// The stored definition is re-parsed and every stored experiment is validated
/// against the resulting model before the session is returned.
///
/// # Arguments
///
/// * `path` - Path to a file written by [`save_session`]
///
/// # Errors
///
/// * `IOError::FileNotFound` if the file cannot be opened
/// * `IOError::JsonParseError` if the contents are not a session snapshot
/// * `IOError::Session` if the definition or an experiment no longer validates
pub fn load_session(path: impl Into<PathBuf>) -> Result<Session, IOError> {
    let path = path.into();
    let file = File::open(&path).map_err(IOError::FileNotFound)?;
    let snapshot: SessionSnapshot =
        serde_json::from_reader(BufReader::new(file)).map_err(IOError::JsonParseError)?;

    info!("Loading session from {}", path.display());
    Ok(Session::from_snapshot(snapshot)?)
}

/// Saves a session to a JSON file, replacing any existing file.
pub fn save_session(path: impl Into<PathBuf>, session: &Session) -> Result<(), IOError> {
    let path = path.into();
    let file = File::create(&path).map_err(IOError::FileNotFound)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &session.snapshot())
        .map_err(IOError::JsonParseError)?;
    writer.flush().map_err(IOError::Write)?;

    info!("Saved session '{}' to {}", session.name, path.display());
    Ok(())
}

/// Errors raised while reading or writing session files
#[derive(Error, Debug)]
pub enum IOError {
    #[error("File not found: {0}")]
    FileNotFound(#[from] std::io::Error),

    #[error("Failed to write file: {0}")]
    Write(std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Stored session is invalid: {0}")]
    Session(#[from] SessionError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::observation::Observation;

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_session(dir.path().join("missing.json")),
            Err(IOError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_session(&path),
            Err(IOError::JsonParseError(_))
        ));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_write_failure_is_reported() {
        let mut session = Session::new("full disk");
        session.import_definition("A <-> B").unwrap();

        assert!(matches!(
            save_session("/dev/full", &session),
            Err(IOError::Write(_))
        ));
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut session = Session::new("round trip");
        session.import_definition("E + S <-> ES\nES <-> E + P").unwrap();
        session
            .add_experiment([
                ("E", Observation::initial(1.0)),
                ("S", Observation::initial(10.0)),
                ("ES", Observation::initial(0.0)),
                ("P", Observation::initial(0.0)),
            ])
            .unwrap();

        save_session(&path, &session).unwrap();
        let loaded = load_session(&path).unwrap();

        assert_eq!(loaded.name, "round trip");
        assert_eq!(loaded.snapshot(), session.snapshot());
    }
}
