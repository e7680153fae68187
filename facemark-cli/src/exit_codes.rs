//! Exit codes following sysexits.h conventions.
//!
//! These codes let scripts tell "the video could not be checked" apart from
//! "the video was checked and rejected".

use facemark_core::FacemarkError;

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all, including videos without a usable face).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (invalid arguments).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Signature rejected (tampered video, wrong key, missing watermark).
/// Maps to EX_DATAERR from sysexits.h.
pub const VERIFICATION_FAILED: i32 = 65;

/// Cannot open or decode input (video, public key).
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// I/O error (cannot write output video or key).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        // Typed core errors take precedence over message inspection
        let core = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<FacemarkError>());

        let code = match core {
            Some(FacemarkError::UnreadableVideo(_) | FacemarkError::InvalidPublicKey(_)) => {
                INPUT_ERROR
            }
            Some(FacemarkError::VideoWrite(_)) => IO_ERROR,
            Some(FacemarkError::Io(_)) if message.contains("Failed to read") => INPUT_ERROR,
            Some(FacemarkError::Io(_)) => IO_ERROR,
            Some(_) => GENERAL_ERROR,
            None if message.contains("Verification failed") => VERIFICATION_FAILED,
            None if message.contains("Failed to read") => INPUT_ERROR,
            None if message.contains("Failed to write") => IO_ERROR,
            None if message.contains("Invalid argument") => USAGE_ERROR,
            None => GENERAL_ERROR,
        };

        Self {
            code,
            message: Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};

    #[test]
    fn test_verification_failure_code() {
        let err = anyhow!("Verification failed: signature mismatch");
        assert_eq!(ExitCode::from_anyhow(&err).code, VERIFICATION_FAILED);
    }

    #[test]
    fn test_core_errors_classified_through_context() {
        let err = Err::<(), _>(FacemarkError::UnreadableVideo("gone".into()))
            .context("Failed to open video")
            .unwrap_err();
        assert_eq!(ExitCode::from_anyhow(&err).code, INPUT_ERROR);

        let err = Err::<(), _>(FacemarkError::NoFaceDetected)
            .context("Failed to derive identity")
            .unwrap_err();
        assert_eq!(ExitCode::from_anyhow(&err).code, GENERAL_ERROR);

        let err = Err::<(), _>(FacemarkError::VideoWrite("disk full".into()))
            .context("Failed to sign video")
            .unwrap_err();
        assert_eq!(ExitCode::from_anyhow(&err).code, IO_ERROR);
    }

    #[test]
    fn test_io_error_direction() {
        let io = || std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = Err::<(), _>(FacemarkError::Io(io()))
            .context("Failed to read public key")
            .unwrap_err();
        assert_eq!(ExitCode::from_anyhow(&err).code, INPUT_ERROR);

        let err = Err::<(), _>(FacemarkError::Io(io()))
            .context("Failed to write public key")
            .unwrap_err();
        assert_eq!(ExitCode::from_anyhow(&err).code, IO_ERROR);
    }

    #[test]
    fn test_success_has_no_message() {
        let ok = ExitCode::success();
        assert_eq!(ok.code, SUCCESS);
        assert!(ok.message.is_none());
    }
}
