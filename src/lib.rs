//! Portal client core.
//!
//! SYSTEM CONTEXT
//! ==============
//! A client for a PocketBase-style backend: credential persistence, the
//! reactive session store with permission-filtered navigation, localized
//! error messages, and start-up wiring. The `server` crate in this workspace
//! hosts the `GET /api/me` hook on top of the same API types.

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod context;
pub mod filter;
pub mod messages;
pub mod router;
pub mod session;
pub mod theme;
