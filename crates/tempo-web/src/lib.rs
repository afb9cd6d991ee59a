//! Tempo Web Server
//!
//! HTTP API for tasks and their timers plus the authenticated push channel
//! that delivers timer updates to every open connection of a user.
//! Tower middleware provides CORS, tracing and compression.

#![forbid(unsafe_code)]
#![forbid(clippy::unwrap_used)]
#![forbid(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod routes;
pub mod server;

pub use auth::{AuthError, AuthenticatedOwner, SignedTokenVerifier, TokenVerifier};
pub use config::{ConfigError, ServerConfig};
pub use error::{AppError, Error, ErrorResponse};
pub use gateway::{ConnectionGateway, ConnectionId, spawn_dispatcher};
pub use server::{AppState, create_app, serve};
