//! An abstraction layer for different LLMs.
//!
//! This crate establishes a unified protocol for the agent driver to talk
//! to various completion services, so that the driver can switch between
//! them without modifying the core codebase.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to. A round trip is a
//! plain request/result call: the provider receives the full accumulated
//! conversation and answers with a [`ModelTurn`] that carries either final
//! text or pending tool call requests.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod turn;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use turn::*;
