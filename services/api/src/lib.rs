//! Rental marketplace API service
//!
//! Accounts, property listings and bookings behind a bearer-token guarded
//! HTTP API. The binary in `main.rs` wires [`settings::Settings`] into an
//! [`AppState`] and serves [`create_router`]; tests drive the same router
//! over the in-memory store.

pub mod credentials;
pub mod error;
pub mod extract;
pub mod identity;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod repositories;
pub mod response;
pub mod routes;
pub mod settings;
pub mod state;
pub mod validation;

pub use routes::create_router;
pub use state::AppState;
