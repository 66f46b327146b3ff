//! CLI subcommand implementations for the factfetch binary.

pub mod doctor;
pub mod fetch_cmd;
