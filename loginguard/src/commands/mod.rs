pub mod attempts;
pub mod block;
pub mod blocked;
pub mod check;
mod common;
pub mod create_user;
pub mod evaluate;
pub mod hash;
pub mod login;
pub mod set_permanent;
pub mod set_user_status;
pub mod stats;
pub mod status;
pub mod unblock;
pub mod users;
