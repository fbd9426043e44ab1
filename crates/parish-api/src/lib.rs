//! JSON REST API for the parish register.
//!
//! Exposes an axum [`Router`] backed by any [`parish_core::store::ParishStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", parish_api::api_router(store.clone()))
//! ```

pub mod associations;
pub mod commitments;
pub mod error;
pub mod exports;
pub mod members;
pub mod payments;
pub mod reports;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use chrono::{Datelike, Utc};
use parish_core::store::ParishStore;

pub use error::ApiError;

/// The calendar year used when a request does not name one.
pub(crate) fn current_year() -> i32 { Utc::now().year() }

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: ParishStore + 'static,
{
  Router::new()
    // Members
    .route("/members", get(members::list::<S>).post(members::create::<S>))
    .route("/members/by-matricule/{matricule}", get(members::by_matricule::<S>))
    .route(
      "/members/{id}",
      get(members::get_one::<S>)
        .patch(members::update::<S>)
        .delete(members::delete::<S>),
    )
    .route("/members/{id}/stats", get(members::stats::<S>))
    .route(
      "/members/{id}/associations",
      get(members::associations::<S>).post(members::join::<S>),
    )
    .route("/members/{id}/associations/{association_id}", delete(members::leave::<S>))
    // Associations
    .route("/associations", get(associations::list::<S>).post(associations::create::<S>))
    .route(
      "/associations/{id}",
      get(associations::get_one::<S>)
        .patch(associations::update::<S>)
        .delete(associations::delete::<S>),
    )
    .route("/associations/{id}/members", get(associations::members::<S>))
    // Commitments
    .route("/commitments", get(commitments::list::<S>).post(commitments::create::<S>))
    .route("/commitments/migrate", post(commitments::migrate::<S>))
    .route("/commitments/stats", get(commitments::stats::<S>))
    .route(
      "/commitments/{id}",
      get(commitments::get_one::<S>)
        .patch(commitments::update::<S>)
        .delete(commitments::delete::<S>),
    )
    // Payments
    .route("/payments", get(payments::list::<S>).post(payments::create::<S>))
    .route("/payments/stats", get(payments::stats::<S>))
    .route(
      "/payments/{id}",
      get(payments::get_one::<S>)
        .patch(payments::update::<S>)
        .delete(payments::delete::<S>),
    )
    // Reports
    .route("/reports/members/{id}", get(reports::member::<S>))
    .route("/reports/associations/{id}", get(reports::association::<S>))
    .route("/reports/global", get(reports::global::<S>))
    .route("/reports/performance", get(reports::performance::<S>))
    // Exports
    .route("/exports/members.csv", get(exports::members_csv::<S>))
    .route("/exports/payments.csv", get(exports::payments_csv::<S>))
    .with_state(store)
}
