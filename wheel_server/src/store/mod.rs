use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use wheel_core::Role;
use wheel_shared::{InvitationGrantView, NotificationView, SpinLogEntry, SpinResult};

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("already exists")]
    AlreadyExists,
    #[error("backend error: {0}")]
    Backend(String),
}

/// Seed material kept with a spin so it can be audited later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinProof {
    pub server_seed: String,
    pub client_seed: String,
    pub nonce: u64,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSpin {
    pub user_id: String,
    pub result: SpinResult,
    pub spun_at: DateTime<Utc>,
    pub spin_day: Option<NaiveDate>,
    pub proof: Option<SpinProof>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinRecord {
    pub id: i64,
    pub user_id: String,
    pub result: SpinResult,
    pub spun_at: DateTime<Utc>,
    pub spin_day: Option<NaiveDate>,
    pub proof: Option<SpinProof>,
}

impl SpinRecord {
    fn from_new(id: i64, spin: NewSpin) -> Self {
        Self {
            id,
            user_id: spin.user_id,
            result: spin.result,
            spun_at: spin.spun_at,
            spin_day: spin.spin_day,
            proof: spin.proof,
        }
    }

    pub fn to_log_entry(&self) -> SpinLogEntry {
        SpinLogEntry {
            id: self.id,
            user_id: self.user_id.clone(),
            result: self.result,
            spun_at: self.spun_at,
            server_seed: self.proof.as_ref().map(|p| p.server_seed.clone()),
            client_seed: self.proof.as_ref().map(|p| p.client_seed.clone()),
            nonce: self.proof.as_ref().map(|p| p.nonce),
            hash: self.proof.as_ref().map(|p| p.hash.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationGrant {
    pub user_id: String,
    pub invites_remaining: u32,
    pub expiration_days: Option<u32>,
    pub granted_at: DateTime<Utc>,
}

impl From<InvitationGrant> for InvitationGrantView {
    fn from(g: InvitationGrant) -> Self {
        Self {
            user_id: g.user_id,
            invites_remaining: g.invites_remaining,
            expiration_days: g.expiration_days,
            granted_at: g.granted_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: i64,
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    fn from_new(id: i64, n: NewNotification) -> Self {
        Self {
            id,
            user_id: n.user_id,
            kind: n.kind,
            title: n.title,
            message: n.message,
            read: false,
            created_at: n.created_at,
        }
    }
}

impl From<Notification> for NotificationView {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            kind: n.kind,
            title: n.title,
            message: n.message,
            read: n.read,
            created_at: n.created_at,
        }
    }
}

/// What a winning spin hands out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reward {
    pub invites: u32,
    pub expiration_days: Option<u32>,
    pub notification: NewNotification,
}

/// At most one row per `(user_id, spin_day)`; a second is `AlreadyExists`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WheelStore: Send + Sync {
    // Spin ledger
    async fn latest_spin_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<SpinRecord>, StoreError>;
    async fn insert_spin(&self, spin: NewSpin) -> Result<SpinRecord, StoreError>;
    async fn recent_spins(&self, limit: u32) -> Result<Vec<SpinRecord>, StoreError>;
    async fn all_spins(&self) -> Result<Vec<SpinRecord>, StoreError>;

    // Rewards
    /// Create the grant or add `count` to the invites already remaining.
    async fn grant_invitations(
        &self,
        user_id: &str,
        count: u32,
        expiration_days: Option<u32>,
        granted_at: DateTime<Utc>,
    ) -> Result<InvitationGrant, StoreError>;
    async fn invitation_grant(&self, user_id: &str) -> Result<Option<InvitationGrant>, StoreError>;
    async fn insert_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, StoreError>;
    async fn notifications(&self, user_id: &str) -> Result<Vec<Notification>, StoreError>;

    /// Write the spin and, for a win, its reward as one unit. Either every
    /// row lands or none does.
    async fn finalize_spin(
        &self,
        spin: NewSpin,
        reward: Option<Reward>,
    ) -> Result<SpinRecord, StoreError>;

    // Roles
    async fn role_of(&self, user_id: &str) -> Result<Role, StoreError>;
    async fn set_role(&self, user_id: &str, role: Role) -> Result<(), StoreError>;
}
