//! # bomcraft
//!
//! The command-line layer over `bomcraft-core`: argument parsing,
//! configuration, file I/O and report rendering.

pub mod cli;
pub mod config;
pub mod error;
pub mod report;
