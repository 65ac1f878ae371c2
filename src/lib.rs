//! archive-api: authentication edge of the archive blog backend.
//!
//! Protected routes sit behind an authentication gate that verifies the
//! caller's Identity Platform ID token and, when it no longer verifies,
//! transparently exchanges the `refreshToken` cookie for a new one.
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
