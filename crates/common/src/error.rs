//! Error types for the yield optimization engine.
//!
//! Fallible operations return `Result<T, Report<YieldError>>`. The variants are
//! cloneable so a settled single-flight result can be handed to every caller
//! that awaited it.

use derive_more::{Display, Error};

/// Errors raised while resolving unified pricing rules.
#[derive(Debug, Clone, Display, Error, PartialEq, Eq)]
pub enum YieldError {
    /// Settings could not be loaded or failed validation.
    #[display("Configuration error: {message}")]
    Configuration { message: String },

    /// The price rule endpoint could not be reached or answered with an error status.
    #[display("HTTP error: {message}")]
    Http { message: String },

    /// The price rule document was not valid JSON or had the wrong shape.
    #[display("Invalid price rules response: {message}")]
    InvalidResponse { message: String },

    /// The configured provider tag is not one of `none`, `static` or `dynamic`.
    #[display("Unknown config provider")]
    UnknownProvider,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = YieldError::Http {
            message: "Not Found".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error: Not Found");

        assert_eq!(
            YieldError::UnknownProvider.to_string(),
            "Unknown config provider"
        );
    }

    #[test]
    fn test_error_report_keeps_context() {
        let report = error_stack::Report::new(YieldError::InvalidResponse {
            message: "Response is missing rules".to_string(),
        });
        assert!(format!("{}", report).contains("missing rules"));
        assert!(matches!(
            report.current_context(),
            YieldError::InvalidResponse { .. }
        ));
    }
}
