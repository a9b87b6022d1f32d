//! Access-token secrets and the process-wide token state.

pub mod secret;
pub mod state;
