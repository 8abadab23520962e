pub mod config;
pub mod error;
pub mod git_ops;
pub mod manifest;
pub mod propagate;
pub mod publish;
pub mod release;
pub mod runner;
pub mod ui;
pub mod version;

pub use error::{ReleaseError, Result};
