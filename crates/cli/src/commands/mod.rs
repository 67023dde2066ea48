//! CLI subcommands

pub mod alerts;
pub mod dashboards;
pub mod insights;
pub mod push;
pub mod status;
