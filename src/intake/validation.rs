//! Upload validation.
//!
//! Runs before a file enters the state machine. Checks, in order:
//! - file name shape (no path separators, traversal, or control characters)
//! - declared MIME type against the accepted raster types
//! - declared size against the configured limit
//! - declared size against the actual payload
//! - sniffed content type against the declared type

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::PipelineConfig;
use crate::error::IntakeError;
use crate::intake::upload::UploadedFile;
use crate::logging::structured::LogContext;

lazy_static! {
    static ref VALID_FILE_NAME: Regex =
        Regex::new(r"^[^/\\\x00-\x1f\x7f]{1,255}$").unwrap();
}

/// Canonical spelling of a declared MIME type.
pub fn normalize_mime(mime_type: &str) -> String {
    let lower = mime_type.trim().to_ascii_lowercase();
    match lower.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        "image/x-ms-bmp" | "image/x-bmp" => "image/bmp".to_string(),
        "image/x-png" => "image/png".to_string(),
        _ => lower,
    }
}

fn check_file_name(name: &str) -> Result<(), IntakeError> {
    if name == "." || name == ".." || !VALID_FILE_NAME.is_match(name) {
        return Err(IntakeError::InvalidFileName(name.escape_debug().to_string()));
    }
    Ok(())
}

/// Validate an upload against the intake rules.
pub fn validate_upload(
    file: &UploadedFile,
    config: &PipelineConfig,
    ctx: &LogContext,
) -> Result<(), IntakeError> {
    let result = run_checks(file, config);

    match &result {
        Ok(()) => log::debug!(
            "{} INTAKE_ACCEPTED name={} mime={} bytes={}",
            ctx,
            file.file_name,
            file.mime_type,
            file.byte_size
        ),
        Err(e) => {
            crate::log_warn!(
                ctx,
                "INTAKE_REJECTED",
                name = file.file_name,
                reason = e.to_string()
            );
        }
    }

    result
}

fn run_checks(file: &UploadedFile, config: &PipelineConfig) -> Result<(), IntakeError> {
    check_file_name(&file.file_name)?;

    let declared = normalize_mime(&file.mime_type);
    if !config.accepts_mime(&declared) {
        return Err(IntakeError::UnsupportedType {
            mime_type: file.mime_type.clone(),
        });
    }

    if file.byte_size > config.max_upload_bytes {
        return Err(IntakeError::TooLarge {
            byte_size: file.byte_size,
            limit: config.max_upload_bytes,
        });
    }

    if file.byte_size == 0 || file.bytes.is_empty() {
        return Err(IntakeError::Empty);
    }

    let actual = file.bytes.len() as u64;
    if actual != file.byte_size {
        return Err(IntakeError::SizeMismatch {
            declared: file.byte_size,
            actual,
        });
    }

    let detected = infer::get(&file.bytes)
        .map(|kind| normalize_mime(kind.mime_type()))
        .unwrap_or_else(|| "unknown".to_string());
    if detected != declared {
        return Err(IntakeError::ContentMismatch { declared, detected });
    }

    Ok(())
}
