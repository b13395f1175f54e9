use crate::Secret;

pub(crate) const fn _default_max_failed_attempts() -> u32 {
    3
}

pub(crate) const fn _default_time_window_minutes() -> u32 {
    5
}

pub(crate) const fn _default_lockout_duration_minutes() -> u32 {
    30
}

pub(crate) const fn _default_manual_block_minutes() -> u32 {
    30
}

pub(crate) const fn _default_recent_window_hours() -> u32 {
    24
}

pub(crate) const fn _default_history_limit() -> u64 {
    100
}

#[inline]
pub(crate) fn _default_manual_block_reason() -> String {
    "Manually blocked".to_owned()
}

#[inline]
pub(crate) fn _default_database_url() -> Secret<String> {
    Secret::new("sqlite:data/db".to_owned())
}
