//! JSON configuration of the command-line tools.

pub mod dataset;
pub mod detect;
