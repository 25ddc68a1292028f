use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The two sides of every marketplace conversation and transaction.
///
/// Serialized as the lowercase tags `"buyer"` / `"seller"` so stored data
/// matches the storefront's JSON layout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Seller,
}

impl Role {
    /// The other side of the conversation.
    pub fn counterpart(self) -> Self {
        match self {
            Role::Buyer => Role::Seller,
            Role::Seller => Role::Buyer,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A member community of the marketplace.
///
/// The set is fixed: products are always listed under exactly one of these
/// identifiers, and unknown strings are rejected at parse time rather than
/// stored as free text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Community {
    Kendem,
    Menji,
    Fontem,
    Alou,
    Wabane,
}

impl Community {
    /// Every community, in display order.
    pub const ALL: [Community; 5] = [
        Community::Kendem,
        Community::Menji,
        Community::Fontem,
        Community::Alou,
        Community::Wabane,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Community::Kendem => "kendem",
            Community::Menji => "menji",
            Community::Fontem => "fontem",
            Community::Alou => "alou",
            Community::Wabane => "wabane",
        }
    }
}

impl std::fmt::Display for Community {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown community: {0}")]
pub struct CommunityParseError(pub String);

impl std::str::FromStr for Community {
    type Err = CommunityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Community::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CommunityParseError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn community_round_trips_through_str() {
        for c in Community::ALL {
            assert_eq!(c.as_str().parse::<Community>().unwrap(), c);
        }
        assert!("atlantis".parse::<Community>().is_err());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Buyer).unwrap(), "\"buyer\"");
        assert_eq!(Role::Seller.counterpart(), Role::Buyer);
    }
}
