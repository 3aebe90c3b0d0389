//! Charity records

use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// A single charity listing.
///
/// Every field is fixed at creation. The all-default value is the empty
/// record: it occupies slot 0 permanently and replaces a record when it is
/// deleted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Charity {
    /// Identifier assigned by the registry (0 for the empty record)
    pub id: u64,
    /// Display name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Funding goal, in the smallest currency unit
    pub goal: u128,
    /// Campaign duration
    pub duration: u64,
    /// Identity that listed the charity
    pub creator: Identity,
}

impl Charity {
    /// The empty record
    pub const EMPTY: Charity = Charity {
        id: 0,
        name: String::new(),
        description: String::new(),
        goal: 0,
        duration: 0,
        creator: Identity::ZERO,
    };

    /// Whether this slot holds the empty record (never created or deleted)
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

/// Caller-supplied fields for a new listing
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewCharity {
    pub name: String,
    pub description: String,
    pub goal: u128,
    pub duration: u64,
}

impl NewCharity {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        goal: u128,
        duration: u64,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            goal,
            duration,
        }
    }

    /// Turn the listing into a stored record
    pub(crate) fn into_charity(self, id: u64, creator: Identity) -> Charity {
        Charity {
            id,
            name: self.name,
            description: self.description,
            goal: self.goal,
            duration: self.duration,
            creator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_record() {
        assert!(Charity::EMPTY.is_empty());
        assert!(Charity::default().is_empty());
        assert_eq!(Charity::EMPTY.id, 0);
        assert_eq!(Charity::EMPTY.name, "");
    }

    #[test]
    fn test_created_record_is_not_empty() {
        let creator = Identity::from_bytes([7u8; 20]);
        let charity = NewCharity::new("hh", "dd", 12, 12).into_charity(1, creator);
        assert!(!charity.is_empty());
        assert_eq!(charity.creator, creator);
        assert_eq!(charity.goal, 12);
    }

    #[test]
    fn test_blank_fields_still_count_as_a_record() {
        // Only the id and creator need to differ from the empty record
        let creator = Identity::from_bytes([1u8; 20]);
        let charity = NewCharity::default().into_charity(3, creator);
        assert!(!charity.is_empty());
    }
}
