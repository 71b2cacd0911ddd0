//! Multi-agent research orchestration for deepresearch.
//!
//! This crate turns a query into a fixed sequence of agent invocations
//! (web searcher → analyst → writer), threading each stage's artifact into
//! the stages that depend on it, and exposes the result through
//! [`ResearchService`].

pub mod agent;
pub mod crew;
pub mod pipeline;
pub mod service;
pub mod stage;

#[cfg(test)]
mod testing;

pub use agent::{Agent, Assignment, GenerationTool, SearchTool, Tool};
pub use pipeline::{Pipeline, ProgressReporter, Run, SilentProgress};
pub use service::{Diagnostics, MISSING_QUERY, ResearchService};
pub use stage::{Stage, StageId};
