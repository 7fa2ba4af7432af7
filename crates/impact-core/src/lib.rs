pub mod analyzer;
pub mod config;
pub mod confidence;
pub mod error;
pub mod io;
pub mod model;
pub mod paths;
pub mod requirements;
pub mod seed;
pub mod store;
pub mod testgen;
pub mod text;

pub use error::{ImpactError, Result};
