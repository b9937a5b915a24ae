use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqliteConnection, SqlitePool,
};
use tracing::debug;
use wheel_core::Role;
use wheel_shared::SpinResult;

use super::{
    InvitationGrant, NewNotification, NewSpin, Notification, Reward, SpinProof, SpinRecord,
    StoreError, WheelStore,
};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

const SPIN_COLUMNS: &str =
    "id, user_id, result, spun_at, spin_day, server_seed, client_seed, nonce, hash";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url` and run migrations.
    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(backend)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(backend)?;
        Self::from_pool(pool).await
    }

    /// Private in-memory database on a single connection.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(backend)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(backend)?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn write_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::AlreadyExists,
        _ => backend(e),
    }
}

fn millis_to_utc(ms: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Backend(format!("timestamp out of range: {ms}")))
}

#[derive(sqlx::FromRow)]
struct SpinRow {
    id: i64,
    user_id: String,
    result: String,
    spun_at: i64,
    spin_day: Option<NaiveDate>,
    server_seed: Option<String>,
    client_seed: Option<String>,
    nonce: Option<i64>,
    hash: Option<String>,
}

impl TryFrom<SpinRow> for SpinRecord {
    type Error = StoreError;

    fn try_from(row: SpinRow) -> Result<Self, Self::Error> {
        let result = SpinResult::from_str(&row.result)
            .map_err(|_| StoreError::Backend(format!("bad spin result: {}", row.result)))?;
        let proof = match (row.server_seed, row.client_seed, row.nonce, row.hash) {
            (Some(server_seed), Some(client_seed), Some(nonce), Some(hash)) => Some(SpinProof {
                server_seed,
                client_seed,
                nonce: u64::try_from(nonce)
                    .map_err(|_| StoreError::Backend(format!("bad nonce: {nonce}")))?,
                hash,
            }),
            _ => None,
        };
        Ok(SpinRecord {
            id: row.id,
            user_id: row.user_id,
            result,
            spun_at: millis_to_utc(row.spun_at)?,
            spin_day: row.spin_day,
            proof,
        })
    }
}

#[derive(sqlx::FromRow)]
struct GrantRow {
    user_id: String,
    invites_remaining: i64,
    expiration_days: Option<i64>,
    granted_at: i64,
}

impl TryFrom<GrantRow> for InvitationGrant {
    type Error = StoreError;

    fn try_from(row: GrantRow) -> Result<Self, Self::Error> {
        Ok(InvitationGrant {
            user_id: row.user_id,
            invites_remaining: u32::try_from(row.invites_remaining)
                .map_err(|_| StoreError::Backend("invites_remaining out of range".into()))?,
            expiration_days: row
                .expiration_days
                .map(u32::try_from)
                .transpose()
                .map_err(|_| StoreError::Backend("expiration_days out of range".into()))?,
            granted_at: millis_to_utc(row.granted_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: i64,
    user_id: String,
    kind: String,
    title: String,
    message: String,
    read: bool,
    created_at: i64,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = StoreError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            kind: row.kind,
            title: row.title,
            message: row.message,
            read: row.read,
            created_at: millis_to_utc(row.created_at)?,
        })
    }
}

// Statements shared by the pooled methods and the finalize transaction.

async fn insert_spin_on(
    conn: &mut SqliteConnection,
    spin: NewSpin,
) -> Result<SpinRecord, StoreError> {
    let proof = spin.proof.as_ref();
    let nonce = proof
        .map(|p| i64::try_from(p.nonce))
        .transpose()
        .map_err(|_| StoreError::Backend("nonce out of range".into()))?;
    let done = sqlx::query(
        "INSERT INTO wheel_spins (user_id, result, spun_at, spin_day, server_seed, client_seed, nonce, hash) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&spin.user_id)
    .bind(spin.result.as_str())
    .bind(spin.spun_at.timestamp_millis())
    .bind(spin.spin_day)
    .bind(proof.map(|p| p.server_seed.as_str()))
    .bind(proof.map(|p| p.client_seed.as_str()))
    .bind(nonce)
    .bind(proof.map(|p| p.hash.as_str()))
    .execute(&mut *conn)
    .await
    .map_err(write_error)?;
    Ok(SpinRecord::from_new(done.last_insert_rowid(), spin))
}

async fn grant_on(
    conn: &mut SqliteConnection,
    user_id: &str,
    count: u32,
    expiration_days: Option<u32>,
    granted_at: DateTime<Utc>,
) -> Result<InvitationGrant, StoreError> {
    sqlx::query(
        "INSERT INTO user_invitations (user_id, invites_remaining, expiration_days, granted_at) \
         VALUES (?, ?, ?, ?) \
         ON CONFLICT(user_id) DO UPDATE SET \
           invites_remaining = invites_remaining + excluded.invites_remaining, \
           expiration_days = excluded.expiration_days, \
           granted_at = excluded.granted_at",
    )
    .bind(user_id)
    .bind(i64::from(count))
    .bind(expiration_days.map(i64::from))
    .bind(granted_at.timestamp_millis())
    .execute(&mut *conn)
    .await
    .map_err(write_error)?;

    let row = sqlx::query_as::<_, GrantRow>(
        "SELECT user_id, invites_remaining, expiration_days, granted_at FROM user_invitations WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(backend)?;
    row.try_into()
}

async fn notify_on(
    conn: &mut SqliteConnection,
    notification: NewNotification,
) -> Result<Notification, StoreError> {
    let done = sqlx::query(
        "INSERT INTO notifications (user_id, kind, title, message, read, created_at) VALUES (?, ?, ?, ?, 0, ?)",
    )
    .bind(&notification.user_id)
    .bind(&notification.kind)
    .bind(&notification.title)
    .bind(&notification.message)
    .bind(notification.created_at.timestamp_millis())
    .execute(&mut *conn)
    .await
    .map_err(write_error)?;
    Ok(Notification::from_new(done.last_insert_rowid(), notification))
}

#[async_trait]
impl WheelStore for SqliteStore {
    async fn latest_spin_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<SpinRecord>, StoreError> {
        let row = sqlx::query_as::<_, SpinRow>(&format!(
            "SELECT {SPIN_COLUMNS} FROM wheel_spins WHERE user_id = ? AND spun_at >= ? \
             ORDER BY spun_at DESC, id DESC LIMIT 1"
        ))
        .bind(user_id)
        .bind(since.timestamp_millis())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        row.map(SpinRecord::try_from).transpose()
    }

    async fn insert_spin(&self, spin: NewSpin) -> Result<SpinRecord, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(backend)?;
        insert_spin_on(&mut conn, spin).await
    }

    async fn recent_spins(&self, limit: u32) -> Result<Vec<SpinRecord>, StoreError> {
        let rows = sqlx::query_as::<_, SpinRow>(&format!(
            "SELECT {SPIN_COLUMNS} FROM wheel_spins ORDER BY id DESC LIMIT ?"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.into_iter().map(SpinRecord::try_from).collect()
    }

    async fn all_spins(&self) -> Result<Vec<SpinRecord>, StoreError> {
        let rows = sqlx::query_as::<_, SpinRow>(&format!(
            "SELECT {SPIN_COLUMNS} FROM wheel_spins ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.into_iter().map(SpinRecord::try_from).collect()
    }

    async fn grant_invitations(
        &self,
        user_id: &str,
        count: u32,
        expiration_days: Option<u32>,
        granted_at: DateTime<Utc>,
    ) -> Result<InvitationGrant, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(backend)?;
        grant_on(&mut conn, user_id, count, expiration_days, granted_at).await
    }

    async fn invitation_grant(&self, user_id: &str) -> Result<Option<InvitationGrant>, StoreError> {
        let row = sqlx::query_as::<_, GrantRow>(
            "SELECT user_id, invites_remaining, expiration_days, granted_at FROM user_invitations WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        row.map(InvitationGrant::try_from).transpose()
    }

    async fn insert_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(backend)?;
        notify_on(&mut conn, notification).await
    }

    async fn notifications(&self, user_id: &str) -> Result<Vec<Notification>, StoreError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            "SELECT id, user_id, kind, title, message, read, created_at FROM notifications \
             WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn finalize_spin(
        &self,
        spin: NewSpin,
        reward: Option<Reward>,
    ) -> Result<SpinRecord, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        // Dropping `tx` on an early return rolls every write back.
        let record = insert_spin_on(&mut tx, spin).await?;
        if let Some(reward) = reward {
            grant_on(
                &mut tx,
                &record.user_id,
                reward.invites,
                reward.expiration_days,
                record.spun_at,
            )
            .await?;
            notify_on(&mut tx, reward.notification).await?;
        }
        tx.commit().await.map_err(backend)?;
        debug!(spin_id = record.id, user_id = %record.user_id, "spin finalized");
        Ok(record)
    }

    async fn role_of(&self, user_id: &str) -> Result<Role, StoreError> {
        let role: Option<String> =
            sqlx::query_scalar("SELECT role FROM user_roles WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
        match role {
            None => Ok(Role::User),
            Some(r) => r
                .parse()
                .map_err(|e: wheel_core::UnknownRole| StoreError::Backend(e.to_string())),
        }
    }

    async fn set_role(&self, user_id: &str, role: Role) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO user_roles (user_id, role) VALUES (?, ?) \
             ON CONFLICT(user_id) DO UPDATE SET role = excluded.role",
        )
        .bind(user_id)
        .bind(role.as_str())
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }
}
