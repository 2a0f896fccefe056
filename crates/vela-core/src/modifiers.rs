//! Declaration modifiers.

use bitflags::bitflags;

bitflags! {
    /// Modifier set attached to every declared entity.
    ///
    /// At most one of `PUBLIC`/`PRIVATE`/`PROTECTED` may be set; the
    /// resolution pass reports conflicting combinations as declaration
    /// errors via [`Modifiers::visibility_conflict`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modifiers: u8 {
        /// Visible everywhere.
        const PUBLIC = 1 << 0;
        /// Visible only inside the declaring module/type.
        const PRIVATE = 1 << 1;
        /// Visible inside the declaring type and its lexical nesting.
        const PROTECTED = 1 << 2;
        /// Not bound to an instance.
        const STATIC = 1 << 3;
        /// Declared here, defined externally (no body).
        const EXTERN = 1 << 4;
    }
}

impl Modifiers {
    /// Whether more than one visibility modifier is set.
    pub fn visibility_conflict(&self) -> bool {
        (*self & (Modifiers::PUBLIC | Modifiers::PRIVATE | Modifiers::PROTECTED))
            .bits()
            .count_ones()
            > 1
    }

    /// Whether the entity is access-restricted at all.
    pub fn is_restricted(&self) -> bool {
        self.intersects(Modifiers::PRIVATE | Modifiers::PROTECTED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_visibility_is_fine() {
        assert!(!Modifiers::PUBLIC.visibility_conflict());
        assert!(!(Modifiers::PRIVATE | Modifiers::STATIC).visibility_conflict());
        assert!(!Modifiers::empty().visibility_conflict());
    }

    #[test]
    fn combined_visibility_conflicts() {
        assert!((Modifiers::PRIVATE | Modifiers::PROTECTED).visibility_conflict());
        assert!((Modifiers::PUBLIC | Modifiers::PRIVATE).visibility_conflict());
    }

    #[test]
    fn restricted() {
        assert!(Modifiers::PRIVATE.is_restricted());
        assert!(Modifiers::PROTECTED.is_restricted());
        assert!(!Modifiers::PUBLIC.is_restricted());
        assert!(!Modifiers::STATIC.is_restricted());
    }
}
