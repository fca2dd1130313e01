// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Callrelay call-signaling service.
//!
//! Exposes session lifecycle, signal relay, and presence operations as a
//! small JSON API. Clients poll; there is no push channel.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use auth::{AuthConfig, CallerId};
pub use error::{ApiError, ErrorResponse};
pub use server::{router, start_server, GatewayState, ServerConfig};
