//! Versioned, multi-language content model.
//!
//! # Responsibility
//! - Define roots, versions, per-language availability and translation orders.
//! - Keep publishing status rules as pure functions over these types.
//!
//! # Invariants
//! - A root id never changes across edits of the same logical entity.
//! - Authoritative publishing status lives per language, never per version.
//! - `Deleted` is a soft tombstone and terminal for one availability record.

pub mod availability;
pub mod content;
pub mod entity;
pub mod language;
pub mod status;
pub mod translation;
pub mod version;
