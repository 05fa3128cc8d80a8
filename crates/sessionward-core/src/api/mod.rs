//! Transport adapter for the authentication endpoints.
//!
//! This module provides the `Transport` trait the session manager calls for
//! every network operation, and `HttpTransport`, its `reqwest`
//! implementation against `{api_base_url}/auth/*`.

pub mod client;
pub mod error;
pub mod transport;

pub use client::HttpTransport;
pub use error::ApiError;
pub use transport::Transport;
