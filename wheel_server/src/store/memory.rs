use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use wheel_core::Role;

use super::{
    InvitationGrant, NewNotification, NewSpin, Notification, Reward, SpinRecord, StoreError,
    WheelStore,
};

#[derive(Default)]
struct Tables {
    spins: Vec<SpinRecord>,
    grants: HashMap<String, InvitationGrant>,
    notifications: Vec<Notification>,
    roles: HashMap<String, Role>,
}

impl Tables {
    fn insert_spin(&mut self, spin: NewSpin) -> Result<SpinRecord, StoreError> {
        if let Some(day) = spin.spin_day {
            let taken = self
                .spins
                .iter()
                .any(|s| s.user_id == spin.user_id && s.spin_day == Some(day));
            if taken {
                return Err(StoreError::AlreadyExists);
            }
        }
        let record = SpinRecord::from_new(self.spins.len() as i64 + 1, spin);
        self.spins.push(record.clone());
        Ok(record)
    }

    fn grant(
        &mut self,
        user_id: &str,
        count: u32,
        expiration_days: Option<u32>,
        granted_at: DateTime<Utc>,
    ) -> InvitationGrant {
        let grant = self
            .grants
            .entry(user_id.to_string())
            .and_modify(|g| {
                g.invites_remaining = g.invites_remaining.saturating_add(count);
                g.expiration_days = expiration_days;
                g.granted_at = granted_at;
            })
            .or_insert_with(|| InvitationGrant {
                user_id: user_id.to_string(),
                invites_remaining: count,
                expiration_days,
                granted_at,
            });
        grant.clone()
    }

    fn notify(&mut self, notification: NewNotification) -> Notification {
        let n = Notification::from_new(self.notifications.len() as i64 + 1, notification);
        self.notifications.push(n.clone());
        n
    }
}

/// In-process store. One lock covers every table, so `finalize_spin` is
/// applied as a single step.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WheelStore for MemoryStore {
    async fn latest_spin_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<SpinRecord>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .spins
            .iter()
            .filter(|s| s.user_id == user_id && s.spun_at >= since)
            .max_by_key(|s| (s.spun_at, s.id))
            .cloned())
    }

    async fn insert_spin(&self, spin: NewSpin) -> Result<SpinRecord, StoreError> {
        self.tables.lock().await.insert_spin(spin)
    }

    async fn recent_spins(&self, limit: u32) -> Result<Vec<SpinRecord>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .spins
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn all_spins(&self) -> Result<Vec<SpinRecord>, StoreError> {
        Ok(self.tables.lock().await.spins.clone())
    }

    async fn grant_invitations(
        &self,
        user_id: &str,
        count: u32,
        expiration_days: Option<u32>,
        granted_at: DateTime<Utc>,
    ) -> Result<InvitationGrant, StoreError> {
        Ok(self
            .tables
            .lock()
            .await
            .grant(user_id, count, expiration_days, granted_at))
    }

    async fn invitation_grant(&self, user_id: &str) -> Result<Option<InvitationGrant>, StoreError> {
        Ok(self.tables.lock().await.grants.get(user_id).cloned())
    }

    async fn insert_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, StoreError> {
        Ok(self.tables.lock().await.notify(notification))
    }

    async fn notifications(&self, user_id: &str) -> Result<Vec<Notification>, StoreError> {
        let tables = self.tables.lock().await;
        let mut notes: Vec<Notification> = tables
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notes.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(notes)
    }

    async fn finalize_spin(
        &self,
        spin: NewSpin,
        reward: Option<Reward>,
    ) -> Result<SpinRecord, StoreError> {
        let mut tables = self.tables.lock().await;
        let record = tables.insert_spin(spin)?;
        if let Some(reward) = reward {
            tables.grant(
                &record.user_id,
                reward.invites,
                reward.expiration_days,
                record.spun_at,
            );
            tables.notify(reward.notification);
        }
        Ok(record)
    }

    async fn role_of(&self, user_id: &str) -> Result<Role, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.roles.get(user_id).copied().unwrap_or_default())
    }

    async fn set_role(&self, user_id: &str, role: Role) -> Result<(), StoreError> {
        self.tables
            .lock()
            .await
            .roles
            .insert(user_id.to_string(), role);
        Ok(())
    }
}
