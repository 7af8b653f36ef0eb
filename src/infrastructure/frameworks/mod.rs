//! Test framework adapters

pub mod pytest;

pub use pytest::PytestFramework;
