//! CLI module
//!
//! Command-line interface for assigning cost centers.
//!
//! # Commands
//!
//! - `assign` - Plan or apply cost center assignments
//! - `list-users` - List Copilot license holders
//! - `report` - Per cost center user counts
//! - `config` - Show the resolved configuration

mod assign;
mod commands;
mod runner;
pub mod summary;

pub use assign::{ApplyOptions, ApplyReport, Assigner, Plan, PlanKind};
pub use commands::{AssignArgs, Cli, Commands};
pub use runner::Runner;
