//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract. Scripts branch on them.
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Success                                                  |
//! | 1    | General error (unspecified)                              |
//! | 2    | CLI usage error (bad args, unreadable input file)        |
//! | 3    | Client input rejected (unparseable or empty upload)      |
//! | 4    | Reference store unavailable (query failed or timed out)  |
//! | 5    | Invalid configuration                                    |
//! | 6    | I/O or output failure (staging, workbook generation)     |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Map it in [`exit_code_for`] if it comes from an engine error

use payadj_recon::AdjustError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing input file.
pub const EXIT_USAGE: u8 = 2;

/// The upload could not be parsed or yielded no usable records.
pub const EXIT_CLIENT_INPUT: u8 = 3;

/// An employee or rate store could not be queried.
pub const EXIT_REFERENCE_UNAVAILABLE: u8 = 4;

/// Config file unreadable, unparseable or inconsistent.
pub const EXIT_INVALID_CONFIG: u8 = 5;

/// Staging, workbook generation or output write failed.
pub const EXIT_IO: u8 = 6;

/// Map an engine error to its exit code.
pub fn exit_code_for(err: &AdjustError) -> u8 {
    match err {
        AdjustError::Parse(_) | AdjustError::Validation { .. } => EXIT_CLIENT_INPUT,
        AdjustError::ReferenceUnavailable { .. } => EXIT_REFERENCE_UNAVAILABLE,
        AdjustError::ConfigParse(_) | AdjustError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        AdjustError::Output(_) | AdjustError::Io(_) => EXIT_IO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_map_to_distinct_codes() {
        assert_eq!(exit_code_for(&AdjustError::validation("empty")), EXIT_CLIENT_INPUT);
        assert_eq!(exit_code_for(&AdjustError::Parse("zip".into())), EXIT_CLIENT_INPUT);
        assert_eq!(
            exit_code_for(&AdjustError::ReferenceUnavailable {
                store: "hr".into(),
                message: "down".into(),
            }),
            EXIT_REFERENCE_UNAVAILABLE
        );
        assert_eq!(exit_code_for(&AdjustError::ConfigParse("toml".into())), EXIT_INVALID_CONFIG);
        assert_eq!(exit_code_for(&AdjustError::Output("xlsx".into())), EXIT_IO);
    }
}
