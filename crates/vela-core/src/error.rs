//! Error types for semantic resolution.
//!
//! [`ResolveError`] covers every language-level mistake the resolution pass
//! can detect. The pass never fails on one of these: each is rendered into
//! the diagnostics collector and resolution continues with the unknown type
//! standing in wherever a concrete type could not be determined.
//!
//! The only non-recoverable condition, "this module needs other modules
//! first", is *not* an error and lives in the pass outcome type instead.

use thiserror::Error;

use crate::Span;

/// Errors detected during semantic resolution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    // ------------------------------------------------------------------
    // Name resolution
    // ------------------------------------------------------------------
    /// A name could not be resolved in any visible scope.
    #[error("at {span}: unknown name '{name}'")]
    UnknownName {
        /// The name that wasn't found.
        name: String,
        /// Where the name was referenced.
        span: Span,
    },

    /// A member access did not resolve on the owning entity.
    #[error("at {span}: '{owner}' has no member '{name}'")]
    UnknownMember {
        /// The member name that wasn't found.
        name: String,
        /// The owning entity or type.
        owner: String,
        /// Where the member was referenced.
        span: Span,
    },

    /// A type name could not be resolved.
    #[error("at {span}: unknown type '{name}'")]
    UnknownType {
        /// The type name that wasn't found.
        name: String,
        /// Where the type was referenced.
        span: Span,
    },

    // ------------------------------------------------------------------
    // Visibility
    // ------------------------------------------------------------------
    /// A private entity was referenced from outside its permitted scope.
    #[error("at {span}: '{name}' is private")]
    PrivateAccess {
        /// The referenced entity.
        name: String,
        /// Where the reference occurred.
        span: Span,
    },

    /// A protected entity was referenced from outside its permitted scope.
    #[error("at {span}: '{name}' is protected")]
    ProtectedAccess {
        /// The referenced entity.
        name: String,
        /// Where the reference occurred.
        span: Span,
    },

    // ------------------------------------------------------------------
    // Overloads
    // ------------------------------------------------------------------
    /// No candidate signature fits the call's arguments.
    #[error(
        "at {span}: no overload of '{name}' fits ({args}){}",
        if *.invisible_match { " - a matching overload exists but is not visible here" } else { "" }
    )]
    NoMatchingOverload {
        /// The called name.
        name: String,
        /// The argument types as written.
        args: String,
        /// Whether an otherwise-matching candidate was excluded for
        /// visibility.
        invisible_match: bool,
        /// Where the call occurred.
        span: Span,
    },

    /// Multiple candidates fit with no tie-breaking rule applying.
    #[error("at {span}: ambiguous call to '{name}': {candidates}")]
    AmbiguousCall {
        /// The called name.
        name: String,
        /// The tied candidates.
        candidates: String,
        /// Where the call occurred.
        span: Span,
    },

    /// A function-group value converts to the target type via more than
    /// one of its overloads.
    #[error("at {span}: conversion of '{name}' to '{target}' is ambiguous")]
    AmbiguousConversion {
        /// The group name.
        name: String,
        /// The conversion target type.
        target: String,
        /// Where the conversion occurred.
        span: Span,
    },

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------
    /// A condition expression is not convertible to boolean.
    #[error("at {span}: condition is '{actual}', expected a boolean")]
    ConditionNotBoolean {
        /// The condition's actual type.
        actual: String,
        /// Where the condition occurred.
        span: Span,
    },

    /// An expression cannot be converted to the required type.
    #[error("at {span}: cannot convert '{from}' to '{to}'")]
    IncompatibleType {
        /// The expression's type.
        from: String,
        /// The required type.
        to: String,
        /// Where the conversion was required.
        span: Span,
    },

    /// A returned value cannot be converted to the declared return type.
    #[error("at {span}: return value '{from}' does not convert to '{to}'")]
    IncompatibleReturn {
        /// The value's type.
        from: String,
        /// The declared return type.
        to: String,
        /// Where the return occurred.
        span: Span,
    },

    /// `return` appeared outside of any function.
    #[error("at {span}: return outside of a function")]
    ReturnOutsideFunction {
        /// Where the return occurred.
        span: Span,
    },

    /// A value was returned from a function declared void.
    #[error("at {span}: '{name}' returns no value")]
    ReturnValueFromVoid {
        /// The enclosing function.
        name: String,
        /// Where the return occurred.
        span: Span,
    },

    /// A call was made on something that is not callable.
    #[error("at {span}: expression is not callable")]
    NotCallable {
        /// Where the call occurred.
        span: Span,
    },

    /// `void` used where a value type is required.
    #[error("at {span}: invalid use of 'void'")]
    InvalidVoidUse {
        /// Where the use occurred.
        span: Span,
    },

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------
    /// Two incompatible declarations share one name in a scope.
    #[error("at {span}: duplicate declaration of '{name}'")]
    DuplicateName {
        /// The conflicting name.
        name: String,
        /// Where the later declaration occurred.
        span: Span,
    },

    /// More than one visibility modifier on a declaration.
    #[error("at {span}: conflicting visibility modifiers on '{name}'")]
    ConflictingModifiers {
        /// The declared name.
        name: String,
        /// Where the declaration occurred.
        span: Span,
    },

    /// A function without a body is not marked extern.
    #[error("at {span}: '{name}' has no body and is not extern")]
    MissingBody {
        /// The function name.
        name: String,
        /// Where the function was declared.
        span: Span,
    },

    /// An extern function carries a body.
    #[error("at {span}: extern function '{name}' must not have a body")]
    ExternWithBody {
        /// The function name.
        name: String,
        /// Where the function was declared.
        span: Span,
    },

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------
    /// Assignment to a property with no setter.
    #[error("at {span}: property '{name}' is read-only")]
    ReadOnlyProperty {
        /// The property name.
        name: String,
        /// Where the assignment occurred.
        span: Span,
    },

    /// Read of a property with no getter.
    #[error("at {span}: property '{name}' is write-only")]
    WriteOnlyProperty {
        /// The property name.
        name: String,
        /// Where the read occurred.
        span: Span,
    },
}

impl ResolveError {
    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            ResolveError::UnknownName { span, .. } => *span,
            ResolveError::UnknownMember { span, .. } => *span,
            ResolveError::UnknownType { span, .. } => *span,
            ResolveError::PrivateAccess { span, .. } => *span,
            ResolveError::ProtectedAccess { span, .. } => *span,
            ResolveError::NoMatchingOverload { span, .. } => *span,
            ResolveError::AmbiguousCall { span, .. } => *span,
            ResolveError::AmbiguousConversion { span, .. } => *span,
            ResolveError::ConditionNotBoolean { span, .. } => *span,
            ResolveError::IncompatibleType { span, .. } => *span,
            ResolveError::IncompatibleReturn { span, .. } => *span,
            ResolveError::ReturnOutsideFunction { span } => *span,
            ResolveError::ReturnValueFromVoid { span, .. } => *span,
            ResolveError::NotCallable { span } => *span,
            ResolveError::InvalidVoidUse { span } => *span,
            ResolveError::DuplicateName { span, .. } => *span,
            ResolveError::ConflictingModifiers { span, .. } => *span,
            ResolveError::MissingBody { span, .. } => *span,
            ResolveError::ExternWithBody { span, .. } => *span,
            ResolveError::ReadOnlyProperty { span, .. } => *span,
            ResolveError::WriteOnlyProperty { span, .. } => *span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_span() {
        let err = ResolveError::UnknownName {
            name: "x".into(),
            span: Span::new(3, 4, 1),
        };
        assert_eq!(err.span(), Span::new(3, 4, 1));
        assert_eq!(err.to_string(), "at 3:4: unknown name 'x'");
    }

    #[test]
    fn overload_message_mentions_invisible_match() {
        let err = ResolveError::NoMatchingOverload {
            name: "f".into(),
            args: "int32".into(),
            invisible_match: true,
            span: Span::default(),
        };
        assert!(err.to_string().contains("not visible"));
    }
}
