//! One-line confirmation messages for operations without a payload.

use std::fmt;

/// Outcome line printed after `init`, `validate` and similar commands.
pub struct OperationStatus {
    pub message: String,
    pub success: bool,
}

impl OperationStatus {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: false,
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {}",
            if self.success { "Success:" } else { "Error:" },
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_status_display() {
        let success = OperationStatus::success("Database initialized");
        assert_eq!(success.to_string(), "Success: Database initialized\n");

        let failure = OperationStatus::failure("Connection lacks write access");
        assert!(failure.to_string().starts_with("Error:"));
    }
}
