//! Wire models for the authentication endpoints.
//!
//! These are shared by the HTTP transport (client side) and the reference
//! issuance server, so both ends agree on field names.

pub mod auth;

pub use auth::{
    Credentials, ErrorBody, LoginResponse, LogoutResponse, MeResponse, RefreshRequest,
    RefreshResponse, ServerUser,
};
