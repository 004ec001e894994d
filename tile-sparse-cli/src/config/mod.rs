//! Configuration files read by the CLI.

pub mod encode_config;
