//! Records produced by the simulated workloads.

use serde::{Deserialize, Serialize};

/// A user profile as returned by the slow user lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: u64,
    pub name: String,
    pub email: String,
}

impl UserRecord {
    /// The synthetic profile stored for `user_id`.
    pub fn synthetic(user_id: u64) -> Self {
        Self {
            user_id,
            name: format!("Usuario {user_id} (áéíóúñ)"),
            email: format!("user{user_id}@example.com"),
        }
    }
}
