//! Luna HSM PKCS#11 samples.
//!
//! Each subcommand of `luna-samples` loads the PKCS#11 library, opens an
//! authenticated session, runs one demonstration and tears the session down.

pub mod actions;
pub mod config;
pub mod error;
pub mod prompt;

mod commands;

pub use commands::{Cli, SampleCommands, SamplesContext, luna_samples_main};
