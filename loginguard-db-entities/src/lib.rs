#![allow(non_snake_case)]

pub mod BlockedIp;
pub mod LoginAttempt;
pub mod User;
