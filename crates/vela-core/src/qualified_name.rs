//! Dotted qualified names.

use std::fmt;

/// Qualified name for modules and declared entities.
///
/// Used as the module-registry key and for error messages. A simple name is
/// always a single identifier; the qualified form dots the parent chain
/// (e.g. `vela.core.Object`).
///
/// # Examples
///
/// ```
/// use vela_core::QualifiedName;
///
/// let simple = QualifiedName::simple("Object");
/// assert_eq!(simple.to_string(), "Object");
///
/// let nested = QualifiedName::parse("vela.core.Object");
/// assert_eq!(nested.name(), "Object");
/// assert_eq!(nested.to_string(), "vela.core.Object");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    /// All segments, outermost first. Never empty.
    segments: Vec<String>,
}

impl QualifiedName {
    /// Create a single-segment name.
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    /// Create from explicit segments. Empty input yields a single empty
    /// segment so `name()` stays total.
    pub fn from_segments(segments: Vec<String>) -> Self {
        if segments.is_empty() {
            Self::simple("")
        } else {
            Self { segments }
        }
    }

    /// Parse a dotted string (`a.b.C`). Empty segments are dropped.
    pub fn parse(s: &str) -> Self {
        Self::from_segments(
            s.split('.')
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// The final (simple) segment.
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// All segments, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether this is a single-identifier name.
    pub fn is_simple(&self) -> bool {
        self.segments.len() == 1
    }

    /// Extend with a child segment.
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        Self { segments }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl From<&str> for QualifiedName {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_name_roundtrip() {
        let n = QualifiedName::simple("Player");
        assert!(n.is_simple());
        assert_eq!(n.name(), "Player");
        assert_eq!(n.to_string(), "Player");
    }

    #[test]
    fn parse_dotted() {
        let n = QualifiedName::parse("game.entities.Player");
        assert_eq!(n.name(), "Player");
        assert_eq!(n.segments().len(), 3);
        assert!(!n.is_simple());
    }

    #[test]
    fn child_extends() {
        let n = QualifiedName::simple("game").child("Player");
        assert_eq!(n.to_string(), "game.Player");
    }

    #[test]
    fn empty_segments_dropped() {
        let n = QualifiedName::parse("a..b");
        assert_eq!(n.segments().len(), 2);
    }
}
