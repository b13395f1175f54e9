mod auth;
pub mod clock;
pub mod db;
mod detection;
mod ip_blocker;
mod locks;
mod login;
mod services;
mod status;
pub mod stores;

pub use auth::{Authenticator, DatabaseAuthenticator};
pub use detection::DetectionEngine;
pub use ip_blocker::{validate_ip_format, IpBlocker};
pub use locks::IpLocks;
pub use login::{LoginGate, LoginOutcome};
pub use services::Services;
pub use status::{security_status, SecurityStatus};
