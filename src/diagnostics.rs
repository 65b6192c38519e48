//! Structured diagnostics for degraded results
//!
//! Nothing in the scoring core is fatal. When an input cannot be used as-is the
//! core clamps it (if a safe default exists) or scores it as 0, and records a
//! `Diagnostic` next to the value so the caller can highlight the offending field.

use serde::Serialize;
use thiserror::Error;

/// Category of a recoverable problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Numeric field missing, non-finite, or outside its declared domain
    InvalidInput,
    /// Name-based lookup (unit key, catalog name) found nothing
    UnresolvedReference,
    /// Imported entry needs an explicit user decision
    ImportAmbiguity,
    /// Informational: the value is deliberately left out of a total
    Excluded,
}

/// Kind + offending field + human-readable cause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{kind:?} on '{field}': {message}")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub field: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::InvalidInput, field, message)
    }

    pub fn unresolved(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::UnresolvedReference, field, message)
    }

    pub fn ambiguity(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::ImportAmbiguity, field, message)
    }

    pub fn excluded(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Excluded, field, message)
    }
}

/// A computed value plus whatever degradations happened on the way
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scored {
    pub value: f64,
    pub diagnostics: Vec<Diagnostic>,
}

impl Scored {
    pub fn clean(value: f64) -> Self {
        Self {
            value,
            diagnostics: Vec::new(),
        }
    }

    /// Value 0 with a single diagnostic (no safe default existed)
    pub fn failed(diagnostic: Diagnostic) -> Self {
        Self {
            value: 0.0,
            diagnostics: vec![diagnostic],
        }
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn has(&self, kind: DiagnosticKind) -> bool {
        self.diagnostics.iter().any(|d| d.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display_names_field() {
        let d = Diagnostic::invalid_input("ai_percent", "must be within 0-100, got 140");
        let text = d.to_string();
        assert!(text.contains("InvalidInput"));
        assert!(text.contains("'ai_percent'"));
        assert!(text.contains("140"));
    }

    #[test]
    fn test_failed_scores_zero() {
        let s = Scored::failed(Diagnostic::unresolved("product", "not in catalog"));
        assert_eq!(s.value, 0.0);
        assert!(!s.is_clean());
        assert!(s.has(DiagnosticKind::UnresolvedReference));
        assert!(!s.has(DiagnosticKind::InvalidInput));
    }
}
