#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod cli;
pub mod compression;
pub mod config;
pub mod document;
pub mod error;
pub mod eval;
pub mod http;
pub mod prompt;
pub mod provider;
pub mod tokens;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
