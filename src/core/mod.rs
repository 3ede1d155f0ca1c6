//! Core types and functionality for Braid
//!
//! This module forms the foundation of Braid's type system: error handling,
//! source references, canonical identity, and category classification.
//!
//! # Modules
//!
//! - [`error`] - [`BraidError`] variants, [`ErrorContext`], and the
//!   [`user_friendly_error`] adapter used at the CLI boundary
//! - [`reference`] - [`SourceReference`], [`CanonicalKey`], and [`Category`],
//!   the identities that flow through resolution and compilation
//!
//! # Design Principles
//!
//! Recoverable failures (an unresolvable reference, a failed fetch) surface as
//! warnings and drop the offending reference, so a partial compile remains
//! useful. Structural failures ([`BraidError::StructuralViolation`],
//! [`BraidError::MissingRegistration`]) always propagate with an actionable
//! message, since they mean the recipe configuration itself is broken.

pub mod error;
pub mod reference;

pub use error::{BraidError, ErrorContext, user_friendly_error};
pub use reference::{CanonicalKey, Category, DiscoveryKind, Locator, SourceReference};
