//! Device address types shared by the command and event layers

pub mod constants;
pub mod types;

pub use constants::*;
pub use types::*;
