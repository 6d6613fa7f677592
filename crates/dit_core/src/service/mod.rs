//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into use-case level APIs.
//! - Keep host surfaces (FFI, CLI) decoupled from storage backends.

pub mod todo_service;
