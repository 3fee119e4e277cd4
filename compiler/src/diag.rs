// diag.rs — Unified diagnostics model
//
// Shared diagnostic types used across all resolver passes, plus the
// internal `ResolveError` the passes thread through `?`. A diagnostic is
// a rendered, user-facing record; a `ResolveError` carries the one
// distinction the pass driver acts on (a missing name can be absorbed by
// an enclosing optional, anything else cannot).
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

use serde::Serialize;

use crate::ast::Span;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0001`, `W0001`).
///
/// Codes are `&'static str` constants defined in the `codes` module.
/// Once assigned, a code must never be reassigned to a different semantic
/// meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub mod codes {
    use super::DiagCode;

    /// A name did not resolve in any reachable scope.
    pub const UNRESOLVED_REFERENCE: DiagCode = DiagCode("E0001");
    /// Two declarations of the same name and symbol class in one scope.
    pub const DUPLICATE_DECLARATION: DiagCode = DiagCode("E0002");
    /// Wrong argument count, wrong symbol class for a position, or a
    /// malformed expression.
    pub const ARITY_FLAVOR_MISMATCH: DiagCode = DiagCode("E0003");
    /// Ordered-domain violation (unordered member, re-ordering attempt).
    pub const ORDER_VIOLATION: DiagCode = DiagCode("E0004");
    /// A macro expands itself, or block inheritance cycles.
    pub const REENTRANT_CALL: DiagCode = DiagCode("E0005");
    /// An optional block was disabled after an unresolved reference.
    pub const OPTIONAL_DISABLED: DiagCode = DiagCode("W0001");
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagLevel {
    Error,
    Warning,
}

// ── Related span ─────────────────────────────────────────────────────────

/// A secondary source location providing context for a diagnostic.
#[derive(Debug, Clone, Serialize)]
pub struct RelatedSpan {
    pub span: Span,
    pub label: String,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A resolver diagnostic emitted by any pass.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub level: DiagLevel,
    pub span: Span,
    pub message: String,
    pub hint: Option<String>,
    pub related_spans: Vec<RelatedSpan>,
}

impl Diagnostic {
    /// Create a new diagnostic with no code, hint, or related spans.
    pub fn new(level: DiagLevel, span: Span, message: impl Into<String>) -> Self {
        Self {
            code: None,
            level,
            span,
            message: message.into(),
            hint: None,
            related_spans: Vec::new(),
        }
    }

    pub fn error(span: Span, message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Error, span, message)
    }

    pub fn warning(span: Span, message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Warning, span, message)
    }

    /// Attach a stable diagnostic code.
    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attach a related span.
    pub fn with_related(mut self, span: Span, label: impl Into<String>) -> Self {
        self.related_spans.push(RelatedSpan {
            span,
            label: label.into(),
        });
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        };
        if let Some(code) = &self.code {
            write!(f, "{}[{}]: {}", level, code, self.message)?;
        } else {
            write!(f, "{}: {}", level, self.message)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}

// ── Resolve error ────────────────────────────────────────────────────────

/// Failure of one resolution step. `NotFound` is the only variant an
/// enclosing enabled optional may absorb; `Malformed` always aborts.
#[derive(Debug, Clone)]
pub enum ResolveError {
    NotFound(Diagnostic),
    Malformed(Diagnostic),
}

impl ResolveError {
    pub fn diagnostic(&self) -> &Diagnostic {
        match self {
            ResolveError::NotFound(d) | ResolveError::Malformed(d) => d,
        }
    }

    pub fn into_diagnostic(self) -> Diagnostic {
        match self {
            ResolveError::NotFound(d) | ResolveError::Malformed(d) => d,
        }
    }

    pub fn not_found(span: Span, message: impl Into<String>) -> Self {
        ResolveError::NotFound(Diagnostic::error(span, message).with_code(codes::UNRESOLVED_REFERENCE))
    }
}

pub type ResolveResult<T> = Result<T, ResolveError>;
