//! quickdesk-core: helpdesk ticket state.
//!
//! A [`desk::Desk`] owns four record collections (users, categories,
//! tickets, comments) persisted as JSON blobs through a [`store::BlobStore`].
//! Derived listings and counts live in [`view`]; email-only sign-in lives in
//! [`auth`].
//!
//! # Conventions
//!
//! - **Errors**: typed [`error::DeskError`] from the desk and store, each with
//!   a stable [`error::ErrorCode`]; `anyhow::Result` for config loading.
//! - **Logging**: `tracing` macros only; the binary installs the subscriber.

pub mod auth;
pub mod clock;
pub mod config;
pub mod desk;
pub mod error;
pub mod model;
pub mod seed;
pub mod store;
pub mod timing;
pub mod view;

pub use desk::Desk;
pub use error::{DeskError, ErrorCode};
