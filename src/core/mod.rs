//! Core guard subsystems.
//!
//! Leaf-first: manifest and snapshot know nothing about policy; the policy
//! pipeline is a pure function over one detection pass; only the bootstrap
//! interceptor owns the invocation lifecycle and writes the snapshot.

pub mod bootstrap;
pub mod config;
pub mod detect;
pub mod error;
pub mod evidence;
pub mod manifest;
pub mod output;
pub mod policy;
pub mod progress;
pub mod snapshot;
