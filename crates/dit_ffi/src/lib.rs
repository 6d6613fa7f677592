//! Host-facing bindings for the dit core.

pub mod api;
