//! Core logic including the agent driver, tool dispatch, workspace
//! provisioning, and the expectation oracle.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

pub mod context;
pub mod conversation;
mod driver;
pub mod oracle;
pub mod suite;
pub mod tool;
pub mod workspace;

pub use driver::{
    Driver, RunConfig, RunResult, Termination, ToolExchange, Turn,
};
