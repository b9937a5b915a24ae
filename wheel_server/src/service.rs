use std::sync::Arc;

use chrono::{DateTime, Days, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use thiserror::Error;
use tracing::{info, warn};
use wheel_core::{
    draw_full_spins, landing_rotation, spin_with_seeds, Clock, EntropySource, Role, SeedError,
    SpinOutcome, SpinSeeds, WheelConfig,
};
use wheel_shared::SpinResult;

use crate::store::{
    InvitationGrant, NewNotification, NewSpin, Notification, Reward, SpinProof, SpinRecord,
    StoreError, WheelStore,
};

pub const WIN_NOTIFICATION_KIND: &str = "wheel_win";
pub const WIN_NOTIFICATION_TITLE: &str = "You won the wheel!";
pub const WIN_NOTIFICATION_MESSAGE: &str =
    "Congratulations! You won an invite code. Go to the Invite page to generate your code.";

#[derive(Debug, Error)]
pub enum SpinError {
    #[error("already spun today, next spin at {next_eligible_at}")]
    NotEligible {
        last_spin_at: DateTime<Utc>,
        next_eligible_at: DateTime<Utc>,
        wait: Duration,
    },
    #[error(transparent)]
    InvalidClientSeed(#[from] SeedError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible {
        role: Role,
    },
    Ineligible {
        role: Role,
        last_spin_at: DateTime<Utc>,
        next_eligible_at: DateTime<Utc>,
        wait: Duration,
    },
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible { .. })
    }
}

#[derive(Debug, Clone)]
pub struct SpinSettings {
    pub wheel: WheelConfig,
    pub utc_offset: FixedOffset,
    pub invites_per_win: u32,
    pub invite_expiration_days: Option<u32>,
}

impl Default for SpinSettings {
    fn default() -> Self {
        Self {
            wheel: WheelConfig::default(),
            utc_offset: Utc.fix(),
            invites_per_win: 1,
            invite_expiration_days: Some(7),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpinReceipt {
    pub outcome: SpinOutcome,
    pub record: SpinRecord,
    pub rotation: f64,
    pub full_spins: u32,
    pub invites_granted: Option<u32>,
}

pub struct SpinService {
    store: Arc<dyn WheelStore>,
    entropy: Arc<dyn EntropySource>,
    clock: Arc<dyn Clock>,
    settings: SpinSettings,
}

impl SpinService {
    pub fn new(
        store: Arc<dyn WheelStore>,
        entropy: Arc<dyn EntropySource>,
        clock: Arc<dyn Clock>,
        settings: SpinSettings,
    ) -> Self {
        Self {
            store,
            entropy,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &SpinSettings {
        &self.settings
    }

    /// Calendar day of `at` at the configured fixed offset.
    pub fn day_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.settings.utc_offset).date_naive()
    }

    /// Instant at which `day` begins at the configured fixed offset.
    pub fn start_of_day(&self, day: NaiveDate) -> DateTime<Utc> {
        let local_midnight = day.and_time(NaiveTime::MIN);
        let offset = Duration::seconds(i64::from(self.settings.utc_offset.local_minus_utc()));
        (local_midnight - offset).and_utc()
    }

    /// When a caller whose last spin was at `last_spin_at` may spin again.
    pub fn next_eligible_at(&self, last_spin_at: DateTime<Utc>) -> DateTime<Utc> {
        let day = self.day_of(last_spin_at);
        let next = day.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX);
        self.start_of_day(next)
    }

    pub async fn check_eligibility(&self, user_id: &str) -> Result<Eligibility, SpinError> {
        validate_user(user_id)?;
        let role = self.store.role_of(user_id).await?;
        if role.is_unrestricted() {
            return Ok(Eligibility::Eligible { role });
        }

        let now = self.clock.now();
        let today = self.start_of_day(self.day_of(now));
        let Some(last) = self.store.latest_spin_since(user_id, today).await? else {
            return Ok(Eligibility::Eligible { role });
        };

        let next_eligible_at = self.next_eligible_at(last.spun_at);
        let wait = next_eligible_at - now;
        if wait <= Duration::zero() {
            return Ok(Eligibility::Eligible { role });
        }
        Ok(Eligibility::Ineligible {
            role,
            last_spin_at: last.spun_at,
            next_eligible_at,
            wait,
        })
    }

    pub async fn spin(
        &self,
        user_id: &str,
        client_seed: Option<&str>,
        current_rotation: Option<f64>,
    ) -> Result<SpinReceipt, SpinError> {
        let current_rotation = current_rotation.unwrap_or(0.0);
        if !current_rotation.is_finite() {
            return Err(SpinError::InvalidRequest(
                "current_rotation must be a finite number".into(),
            ));
        }

        let role = match self.check_eligibility(user_id).await? {
            Eligibility::Eligible { role } => role,
            Eligibility::Ineligible {
                last_spin_at,
                next_eligible_at,
                wait,
                ..
            } => {
                return Err(SpinError::NotEligible {
                    last_spin_at,
                    next_eligible_at,
                    wait,
                })
            }
        };

        let seeds = SpinSeeds::with_client_seed(&*self.entropy, &*self.clock, client_seed)?;
        let outcome = spin_with_seeds(seeds, &self.settings.wheel);
        let full_spins = draw_full_spins(&*self.entropy);
        let rotation = landing_rotation(
            current_rotation,
            outcome.landing_segment,
            full_spins,
            &self.settings.wheel,
        );

        info!(
            user_id,
            server_seed = %outcome.seeds.server_seed,
            client_seed = %outcome.seeds.client_seed,
            nonce = outcome.seeds.nonce,
            hash = %outcome.hash,
            roll = outcome.roll,
            is_win = outcome.is_win,
            landing_segment = outcome.landing_segment,
            "provably fair spin"
        );

        let spun_at = self.clock.now();
        let spin = NewSpin {
            user_id: user_id.to_string(),
            result: SpinResult::from_win(outcome.is_win),
            spun_at,
            spin_day: (!role.is_unrestricted()).then(|| self.day_of(spun_at)),
            proof: Some(SpinProof {
                server_seed: outcome.seeds.server_seed.clone(),
                client_seed: outcome.seeds.client_seed.clone(),
                nonce: outcome.seeds.nonce,
                hash: outcome.hash.clone(),
            }),
        };
        let reward = outcome.is_win.then(|| self.reward_for(user_id, spun_at));
        let invites_granted = reward.as_ref().map(|r| r.invites);

        let record = match self.store.finalize_spin(spin, reward).await {
            Ok(record) => record,
            Err(StoreError::AlreadyExists) => {
                // Lost a race with a concurrent spin for the same day.
                warn!(user_id, "duplicate spin for the day rejected");
                let next_eligible_at = self.next_eligible_at(spun_at);
                return Err(SpinError::NotEligible {
                    last_spin_at: spun_at,
                    next_eligible_at,
                    wait: next_eligible_at - self.clock.now(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(invites) = invites_granted {
            info!(user_id, invites, spin_id = record.id, "wheel win rewarded");
        }

        Ok(SpinReceipt {
            outcome,
            record,
            rotation,
            full_spins,
            invites_granted,
        })
    }

    /// Recompute an outcome from disclosed seeds.
    pub fn verify(&self, seeds: SpinSeeds) -> SpinOutcome {
        spin_with_seeds(seeds, &self.settings.wheel)
    }

    pub async fn invitation_grant(
        &self,
        user_id: &str,
    ) -> Result<Option<InvitationGrant>, SpinError> {
        validate_user(user_id)?;
        Ok(self.store.invitation_grant(user_id).await?)
    }

    pub async fn notifications(&self, user_id: &str) -> Result<Vec<Notification>, SpinError> {
        validate_user(user_id)?;
        Ok(self.store.notifications(user_id).await?)
    }

    pub async fn set_role(&self, user_id: &str, role: Role) -> Result<(), SpinError> {
        validate_user(user_id)?;
        self.store.set_role(user_id, role).await?;
        info!(user_id, %role, "role updated");
        Ok(())
    }

    fn reward_for(&self, user_id: &str, at: DateTime<Utc>) -> Reward {
        Reward {
            invites: self.settings.invites_per_win,
            expiration_days: self.settings.invite_expiration_days,
            notification: NewNotification {
                user_id: user_id.to_string(),
                kind: WIN_NOTIFICATION_KIND.to_string(),
                title: WIN_NOTIFICATION_TITLE.to_string(),
                message: WIN_NOTIFICATION_MESSAGE.to_string(),
                created_at: at,
            },
        }
    }
}

fn validate_user(user_id: &str) -> Result<(), SpinError> {
    if user_id.trim().is_empty() {
        return Err(SpinError::InvalidRequest("user_id must not be empty".into()));
    }
    Ok(())
}
