//! Core types and trait definitions for the rollcall attendance service.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! backends, the device client and the SMS gateway implement the traits
//! defined here; the reconciliation engine only ever sees the traits.

// Native `async fn` in traits; the trait definitions spell out `Send` bounds
// on the returned futures themselves.
#![allow(async_fn_in_trait)]

pub mod attendance;
pub mod device;
pub mod error;
pub mod notify;
pub mod person;
pub mod punch;
pub mod store;

pub use error::{DeviceError, NotifyError};
