//! Binary-boundary error type.
//!
//! Components report failures through their own `thiserror` enums; the
//! pipeline converts them into an `AppError` that carries the process exit
//! code and a message prefixed with the stage that failed.

use std::fmt;

/// Exit code for configuration, missing input and template problems.
pub const EXIT_INPUT: u8 = 2;
/// Exit code for malformed data rows.
pub const EXIT_DATA: u8 = 3;
/// Exit code for rendering and output failures.
pub const EXIT_OUTPUT: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// Build an error attributed to one pipeline stage.
    pub fn at(stage: Stage, exit_code: u8, message: impl fmt::Display) -> Self {
        Self::new(exit_code, format!("[{stage}] {message}"))
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Pipeline stages, used to attribute fatal errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Load,
    Features,
    Aggregate,
    Charts,
    Tables,
    Export,
    Deck,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Config => "config",
            Stage::Load => "load",
            Stage::Features => "features",
            Stage::Aggregate => "aggregate",
            Stage::Charts => "charts",
            Stage::Tables => "tables",
            Stage::Export => "export",
            Stage::Deck => "deck",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_prefix_is_part_of_message() {
        let err = AppError::at(Stage::Features, EXIT_DATA, "bad date");
        assert_eq!(err.exit_code(), EXIT_DATA);
        assert_eq!(err.to_string(), "[features] bad date");
    }
}
