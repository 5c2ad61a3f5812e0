//! Command domains pluggable into the console

pub mod calc;
pub mod files;
pub mod sleep;

pub use calc::Calculator;
pub use files::FileInspector;
pub use sleep::Sleeper;
