//! HTTP gateway serving assistant personas.
//!
//! Each configured persona is mounted at `POST /{persona}/chat` and
//! `POST /{persona}/_chat`; `GET /` reports health.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
