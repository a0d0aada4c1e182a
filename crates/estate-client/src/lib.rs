//! Request orchestration for the estate listing API.
//!
//! [`api::ApiClient`] performs one backend call per operation and resolves it
//! to an [`outcome::Outcome`]. [`controller::ScreenController`] wraps those
//! calls the way a screen drives them: one in-flight call per trigger, a
//! notice for every result, and navigation after sign-in.

pub mod action;
pub mod ads;
pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod navigation;
pub mod notify;
pub mod outcome;
pub mod session;
pub mod telemetry;
pub mod upload;

pub use api::{ApiClient, IdentityProvider, SignUpRequest};
pub use outcome::{ActionFailure, FailureKind, Outcome};
