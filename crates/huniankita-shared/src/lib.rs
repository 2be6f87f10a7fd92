//! # huniankita-shared
//!
//! Domain vocabulary shared by the store and the server: roles, property
//! and action enums, gate decision types, and marketplace constants.

pub mod constants;
pub mod types;

pub use types::*;
