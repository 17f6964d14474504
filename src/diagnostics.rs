//! # Non-fatal diagnostics
//!
//! Conditions that do not stop a translation or an assembly (a fallback keyword was
//! used, a default was applied, two sources disagreed, ...) are logged through
//! `tracing` and also collected as [`Diagnostic`] values returned with the result,
//! so callers can inspect them without capturing logs.
use std::fmt;

use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A secondary source was used for the field.
    Fallback,
    /// No source at all, a documented default was used.
    Default,
    /// Sources disagreed; the authoritative one was kept.
    Ambiguous,
    /// A value was rounded further than its expected precision.
    Precision,
    /// Raw geometry disagreed with the camera description.
    Geometry,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::Fallback => "fallback",
            DiagnosticKind::Default => "default",
            DiagnosticKind::Ambiguous => "ambiguous",
            DiagnosticKind::Precision => "precision",
            DiagnosticKind::Geometry => "geometry",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub field: &'static str,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.field, self.message)
    }
}

/// Ordered collection of diagnostics for one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    events: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and emit it as a warning.
    pub fn warn(&mut self, field: &'static str, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        warn!(field, %kind, "{message}");
        self.events.push(Diagnostic {
            field,
            kind,
            message,
        });
    }

    /// Record a diagnostic but only log it at debug level.
    pub fn note(&mut self, field: &'static str, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        debug!(field, %kind, "{message}");
        self.events.push(Diagnostic {
            field,
            kind,
            message,
        });
    }

    /// `true` if a diagnostic of `kind` was recorded for `field`.
    pub fn has(&self, field: &str, kind: DiagnosticKind) -> bool {
        self.events
            .iter()
            .any(|d| d.field == field && d.kind == kind)
    }

    /// Diagnostics recorded for `field`.
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.events.iter().filter(move |d| d.field == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.events.extend(other.events);
    }
}
