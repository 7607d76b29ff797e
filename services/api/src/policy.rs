//! Ownership policy
//!
//! A record may be mutated or deleted only by the identity it is bound to:
//! a property by its owner, a booking by the tenant who created it. The
//! check is a pure predicate; turning a refusal into a response is the
//! caller's job.

use uuid::Uuid;

/// A record bound to the identity that controls it
pub trait Owned {
    /// Immutable owner or creator reference
    fn owner_id(&self) -> Uuid;
}

/// Whether `caller` controls `record`
pub fn owns<R: Owned + ?Sized>(record: &R, caller: Uuid) -> bool {
    record.owner_id() == caller
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Note {
        author: Uuid,
    }

    impl Owned for Note {
        fn owner_id(&self) -> Uuid {
            self.author
        }
    }

    #[test]
    fn test_owner_passes_and_stranger_fails() {
        let author = Uuid::new_v4();
        let note = Note { author };

        assert!(owns(&note, author));
        assert!(!owns(&note, Uuid::new_v4()));
    }

    #[test]
    fn test_nil_caller_never_matches_real_owner() {
        let note = Note {
            author: Uuid::new_v4(),
        };
        assert!(!owns(&note, Uuid::nil()));
    }
}
