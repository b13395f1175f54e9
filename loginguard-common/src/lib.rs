mod config;
mod data;
mod error;
pub mod helpers;
mod types;

pub use config::*;
pub use data::*;
pub use error::LoginGuardError;
pub use types::*;
