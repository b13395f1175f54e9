use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per IP address.
///
/// Serializes the check-record-count-block sequence for a single IP while
/// leaving different IPs fully concurrent. Idle entries are pruned on the
/// next acquisition.
#[derive(Default)]
pub struct IpLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IpLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, ip: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // map holds the only reference: nobody holds or waits for it
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(ip.to_owned()).or_default().clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}
