//! Utility types shared by the broker and its front ends.

pub mod logging;

pub use logging::LogLevel;
