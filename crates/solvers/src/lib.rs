//! Solvers for quadra.
//!
//! Solvers drive a [`Model`] through a problem definition, emitting events
//! to an [`Observer`] so callers can log progress or steer the search.
//!
//! # Modules
//!
//! - [`optimization`] — minimizing or maximizing a scalar objective
//!
//! [`Model`]: quadra_core::Model
//! [`Observer`]: quadra_core::Observer

pub mod optimization;
