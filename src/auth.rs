//! Credential triples and the token state they produce.

pub mod credentials;
pub mod token;

pub use credentials::*;
pub use token::{secret::*, state::*};
