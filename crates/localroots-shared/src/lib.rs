//! # localroots-shared
//!
//! Types shared across the Local Roots crates: user roles, community
//! identifiers, application constants, and the signed auth token.
//!
//! An unsigned base64 JSON blob is not a credential: any client can forge
//! one.  [`token::AuthToken`] is an Ed25519-signed bearer token instead.

pub mod constants;
pub mod token;
pub mod types;

mod error;

pub use error::TokenError;
pub use types::{Community, CommunityParseError, Role};
