//! Diagnostics collection.
//!
//! The resolution pass reports every problem it finds into a [`Problems`]
//! collector and keeps going; rendering, printing, and exit-status policy
//! belong to the driver. A completed pass always yields a collection
//! (possibly empty) rather than failing on the first mistake.

use std::fmt;

use crate::{ResolveError, Span};

/// Severity of a reported problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemKind {
    /// Blocks downstream passes.
    Error,
    /// Reported but does not block.
    Warning,
}

/// A single reported problem.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    /// Severity.
    pub kind: ProblemKind,
    /// Where the problem occurred.
    pub span: Span,
    /// Human-readable message; never formatted/printed by the pass itself.
    pub message: String,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Append-only collector of problems.
#[derive(Debug, Default)]
pub struct Problems {
    items: Vec<Problem>,
}

impl Problems {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resolution error.
    pub fn error(&mut self, err: ResolveError) {
        self.items.push(Problem {
            kind: ProblemKind::Error,
            span: err.span(),
            message: err.to_string(),
        });
    }

    /// Record a warning.
    pub fn warning(&mut self, span: Span, message: impl Into<String>) {
        self.items.push(Problem {
            kind: ProblemKind::Warning,
            span,
            message: message.into(),
        });
    }

    /// Number of error-severity problems.
    pub fn error_count(&self) -> usize {
        self.items
            .iter()
            .filter(|p| p.kind == ProblemKind::Error)
            .count()
    }

    /// Whether any problem was recorded.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of problems.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Iterate over recorded problems in report order.
    pub fn iter(&self) -> impl Iterator<Item = &Problem> {
        self.items.iter()
    }

    /// Consume the collector, yielding all problems.
    pub fn into_vec(self) -> Vec<Problem> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_in_order() {
        let mut problems = Problems::new();
        problems.error(ResolveError::UnknownName {
            name: "a".into(),
            span: Span::new(1, 1, 1),
        });
        problems.warning(Span::new(2, 1, 0), "statement has no effect");

        assert_eq!(problems.len(), 2);
        assert_eq!(problems.error_count(), 1);
        let kinds: Vec<_> = problems.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![ProblemKind::Error, ProblemKind::Warning]);
    }

    #[test]
    fn empty_collector() {
        let problems = Problems::new();
        assert!(problems.is_empty());
        assert_eq!(problems.error_count(), 0);
    }
}
