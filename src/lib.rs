//! Authentication shell for the Vibe List web app.
//!
//! SYSTEM CONTEXT
//! ==============
//! A hosted identity provider owns accounts and sessions. This crate mirrors
//! the provider's session into a [`store::SessionStore`], gates pages behind
//! [`guard::AccessGuard`], and exposes the OAuth start, callback and
//! sign-out endpoints through an Axum router ([`routes::app`]).

pub mod actions;
pub mod config;
pub mod guard;
pub mod paths;
pub mod provider;
pub mod routes;
pub mod sign_in;
pub mod state;
pub mod store;
pub mod views;
