//! Administrative tools for the hosted Supabase backend.
//!
//! - `reset-employee-scores`: delete test history and reset scores of
//!   employees matched by name
//! - `create-performance-evaluations`: provision the evaluations table,
//!   its indexes and row level security policies

pub mod config;
pub mod constants;
pub mod error;
pub mod maintenance;
pub mod name_pattern;
pub mod provision;
pub mod rest;
pub mod schema;
pub mod store;
pub mod telemetry;
