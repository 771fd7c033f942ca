//! Command line front-end for the Imoji SDK.

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod output;
