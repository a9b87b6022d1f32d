//! Credential-holding OAuth 2.0 relay for clients that cannot keep secrets.
//!
//! A handheld device talks to this relay instead of the music service. The relay owns the
//! refresh token, keeps a live access token (renewing it shortly before expiry), and forwards
//! the device's requests with `Authorization: Bearer <token>` attached, relaying the upstream
//! status and body back unchanged.
//!
//! # Components
//!
//! - [`lifecycle`]: the token lifecycle manager (refresh grant, proactive renewal, single-flight).
//! - [`forward`]: the authenticated forwarder that turns a [`forward::ForwardRequest`] into an
//!   upstream API call.
//! - [`server`]: the axum surface that the device talks to.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod forward;
pub mod http;
pub mod lifecycle;
pub mod oauth;
pub mod obs;
pub mod player;
pub mod server;

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use oauth2;
pub use url;
#[cfg(test)]
use {base64 as _, color_eyre as _, http_body_util as _, httpmock as _, tower as _};
