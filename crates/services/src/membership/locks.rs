use super::models::UserId;
use tokio::sync::{Mutex, MutexGuard};

const DEFAULT_STRIPES: usize = 64;

/// Serializes load-mutate-save sequences per user.
///
/// Users are hashed onto a fixed set of stripes, so unrelated users may share
/// a lock but the table never grows.
pub struct UserLocks {
    stripes: Vec<Mutex<()>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::with_stripes(DEFAULT_STRIPES)
    }

    pub fn with_stripes(count: usize) -> Self {
        Self {
            stripes: (0..count.max(1)).map(|_| Mutex::new(())).collect(),
        }
    }

    pub async fn lock(&self, user_id: UserId) -> MutexGuard<'_, ()> {
        let index = user_id.0.rem_euclid(self.stripes.len() as i64) as usize;
        self.stripes[index].lock().await
    }
}

impl Default for UserLocks {
    fn default() -> Self {
        Self::new()
    }
}
