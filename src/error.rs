//! Error types for template compilation and rendering

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::expr::EvalError;
use crate::format::FormatError;
use crate::namespace::RegistrationError;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The template text itself is invalid; raised before anything renders
    #[error("malformed template: {message}")]
    MalformedTemplate { message: String, span: Span },

    #[error("{name} not found")]
    UnresolvedName { name: String },

    #[error("evaluation failed: {0}")]
    Evaluation(#[source] EvalError),

    #[error("format error: {0}")]
    Format(#[from] FormatError),

    #[error("registration failed: {0}")]
    Registration(#[from] RegistrationError),
}

impl From<EvalError> for Error {
    fn from(err: EvalError) -> Self {
        match err {
            EvalError::UnresolvedName { name } => Error::UnresolvedName { name },
            other => Error::Evaluation(other),
        }
    }
}

impl Error {
    pub(crate) fn malformed(message: impl Into<String>, span: Span) -> Self {
        Error::MalformedTemplate {
            message: message.into(),
            span,
        }
    }

    /// Format the error with source context using ariadne
    ///
    /// Only malformed templates carry a span; other errors render as their
    /// plain message.
    pub fn report(&self, source: &str, filename: &str) -> String {
        let Error::MalformedTemplate { message, span } = self else {
            return format!("Error: {}\n", self);
        };

        // ariadne counts characters, spans count bytes
        let to_char = |byte: usize| {
            source
                .get(..byte.min(source.len()))
                .map_or_else(|| source.chars().count(), |prefix| prefix.chars().count())
        };
        let start = to_char(span.start);
        let end = to_char(span.end).max(start);

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, start)
            .with_message(format!("malformed template: {}", message))
            .with_label(
                Label::new((filename, start..end))
                    .with_message(message)
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => format!("Error: {}\n", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_names_keep_their_own_variant() {
        let err: Error = EvalError::UnresolvedName {
            name: "x".to_string(),
        }
        .into();
        assert_eq!(
            err,
            Error::UnresolvedName {
                name: "x".to_string()
            }
        );
        assert_eq!(err.to_string(), "x not found");

        let err: Error = EvalError::runtime("division by zero").into();
        assert!(matches!(err, Error::Evaluation(EvalError::Runtime(_))));
    }

    #[test]
    fn test_report_points_at_the_span() {
        let err = Error::malformed("single '}' encountered", 6..7);
        let report = err.report("hello } world", "template");
        assert!(report.contains("single '}' encountered"));
        assert!(report.contains("template"));
    }

    #[test]
    fn test_report_of_other_errors_is_plain() {
        let err = Error::UnresolvedName {
            name: "x".to_string(),
        };
        assert_eq!(err.report("{x}", "template"), "Error: x not found\n");
    }
}
