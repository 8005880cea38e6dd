//! Reusable observers for quadra solvers.
//!
//! This crate provides [`Observer`] implementations and capability traits that
//! work across solver event and action types.
//!
//! # Modules
//!
//! - [`traits`] — Capability traits for cross-solver observers
//!   ([`HasObjective`], [`CanStopEarly`], [`CanAssumeWorse`])
//! - [`TraceObserver`] — logs every event through `tracing`
//!
//! [`Observer`]: quadra_core::Observer
//! [`HasObjective`]: traits::HasObjective
//! [`CanStopEarly`]: traits::CanStopEarly
//! [`CanAssumeWorse`]: traits::CanAssumeWorse

pub mod traits;

mod trace;

pub use trace::TraceObserver;
