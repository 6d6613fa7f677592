//! Domain model for todo items.
//!
//! # Responsibility
//! - Define the canonical todo record shared by every storage backend.
//! - Own text normalization and lifecycle invariants.
//!
//! # Invariants
//! - Every todo is identified by a stable, non-nil `TodoId`.
//! - `updated_at` never precedes `created_at`.

pub mod todo;
