//! Core types and trait definitions for the parish ledger.
//!
//! This crate has no HTTP or database dependencies. It owns
//! the matricule allocator, the commitment ledger arithmetic and the report
//! aggregations; storage backends implement [`store::ParishStore`].

pub mod association;
pub mod commitment;
pub mod error;
pub mod ledger;
pub mod matricule;
pub mod member;
pub mod payment;
pub mod report;
pub mod store;
mod validate;

pub use error::{Error, ErrorKind, Result};
pub use matricule::Matricule;
