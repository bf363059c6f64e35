//! Core types and the term lifecycle engine for Pacto.
//!
//! This crate is free of HTTP and database dependencies.
//! Persistence is reached only through the traits in [`store`].

// Store implementations may use native `async fn`; the trait signatures
// already require `Send` futures.
#![allow(async_fn_in_trait)]

pub mod balance;
pub mod commitment;
pub mod coordinator;
pub mod error;
pub mod guard;
pub mod link;
pub mod month;
pub mod mutation;
pub mod payment;
pub mod periods;
pub mod store;
pub mod term;
pub mod validate;
pub mod versions;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::TermCoordinator;
pub use error::{Error, Result, ValidationError};
pub use month::{MonthRange, YearMonth};
