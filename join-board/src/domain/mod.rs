pub mod clock;
mod error;
pub mod models;
pub mod paths;
pub mod ports;
pub mod schema;
pub mod services;
pub mod validation;

pub use error::*;
