//! `regconf` - configuration mapping and validation for a container registry
//!
//! The library edits a registry's raw configuration document through flat
//! view fields, keeps the storage backend list in sync with the three keys
//! that encode it, and validates the result before it may be submitted.

pub mod cli;
pub mod config;
pub mod error;
pub mod mapper;
pub mod sections;
pub mod session;
pub mod storage;
pub mod system;
pub mod validation;

use anyhow::Result;
use cli::Args;
use system::RealSystem;

/// Main entry point for the regconf library
///
/// # Errors
///
/// Returns an error if the command fails; see [`error::EditorError`] for the
/// exit code each failure maps to
pub fn run(args: &Args) -> Result<()> {
    let system = RealSystem::new();
    cli::execute(args, &system)
}
