use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use tokio::sync::broadcast;

use super::attachment::encode_receipt;
use super::mirror::spawn_mirror;
use super::notifier::{Notice, Notifier};
use super::record::Record;
use super::repository::{remote_write_failed, Backends, Repository};
use super::stats::{summarize, BetStatistics};
use crate::config::AppConfig;
use crate::db::{Collection, LocalStore};
use crate::errors::TrackerError;
use crate::models::{
    Bet, BetDraft, BetFilter, BetKind, Profile, ProfileDraft, ProfileFilter, StatusFilter,
};
use crate::remote::{Filters, RemoteClient};

const NOTICE_CAPACITY: usize = 64;

/// Persistence facade for bets and profiles.
///
/// The mode is fixed at construction: with a [`RemoteClient`] every operation
/// goes to the remote backend and the local store is kept as a mirror of
/// confirmed remote state; without one the local store is authoritative.
///
/// Operations take `&mut self`; the tracker is meant to be driven by a single
/// task. Construction spawns the mirror task and so needs a Tokio runtime.
#[derive(Debug)]
pub struct BetTracker {
    backends: Backends,
    bets: Repository<Bet>,
    profiles: Repository<Profile>,
    active_profile: ProfileFilter,
}

impl BetTracker {
    /// Open the local store at the configured path and build the tracker.
    /// A store that cannot be opened is fatal; see [`LocalStore::reset_at`].
    pub async fn open(config: &AppConfig) -> Result<Self, TrackerError> {
        let store = LocalStore::open(&config.store_path).await?;
        Ok(Self::with_store(store, config))
    }

    pub fn with_store(store: LocalStore, config: &AppConfig) -> Self {
        let remote = if config.is_remote_configured() {
            Some(RemoteClient::new(
                reqwest::Client::new(),
                &config.remote_url,
                &config.remote_api_key,
            ))
        } else {
            tracing::warn!("Remote backend not configured, running in local-only mode");
            None
        };
        Self::new(store, remote)
    }

    pub fn new(store: LocalStore, remote: Option<RemoteClient>) -> Self {
        if let Some(remote) = &remote {
            tracing::info!(url = %remote.base_url(), "Using remote backend");
        }
        let backends = Backends {
            remote,
            mirror: spawn_mirror(store.clone()),
            store,
            online: Arc::new(AtomicBool::new(true)),
            notifier: Notifier::new(NOTICE_CAPACITY),
        };

        Self {
            backends,
            bets: Repository::new(),
            profiles: Repository::new(),
            active_profile: ProfileFilter::All,
        }
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    pub fn is_remote_configured(&self) -> bool {
        self.backends.remote.is_some()
    }

    pub fn is_online(&self) -> bool {
        self.backends.is_online()
    }

    /// Record a network status change.
    pub fn set_online(&self, online: bool) {
        let was = self.backends.online.swap(online, Ordering::Relaxed);
        if was != online {
            tracing::info!(online, "Network status changed");
            if online {
                self.backends.notifier.info("Back online");
            }
        }
    }

    /// Shared flag for network monitors running outside the tracker.
    pub fn online_flag(&self) -> Arc<AtomicBool> {
        self.backends.online.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.backends.notifier.subscribe()
    }

    pub fn active_profile(&self) -> ProfileFilter {
        self.active_profile
    }

    /// Profile new bets are tagged with when the draft names none.
    pub fn set_active_profile(&mut self, filter: ProfileFilter) {
        self.active_profile = filter;
    }

    pub fn store(&self) -> &LocalStore {
        &self.backends.store
    }

    /// Wait for pending mirror writes to reach the local store.
    pub async fn flush_mirror(&self) {
        self.backends.mirror.flush().await;
    }

    // -----------------------------------------------------------------------
    // Bets
    // -----------------------------------------------------------------------

    pub async fn list_bets(&mut self, status: StatusFilter, profile: ProfileFilter) -> Vec<Bet> {
        let filter = BetFilter::new(status, profile);
        self.bets.list(&self.backends, &filter).await
    }

    pub async fn get_bet(&mut self, id: i64) -> Option<Bet> {
        self.bets.get(&self.backends, id).await
    }

    /// Create (`draft.id == None`) or replace a bet.
    ///
    /// Total coefficient and kind are recomputed from the events. On replace
    /// the stored `date` is always kept.
    pub async fn save_bet(&mut self, draft: BetDraft) -> Result<Bet, TrackerError> {
        let (events, total_coef) = draft.validate().map_err(TrackerError::Validation)?;

        // The receipt is fully encoded before any store is touched.
        let image = match draft.receipt {
            Some(receipt) => Some(encode_receipt(receipt).await?),
            None => None,
        };
        let kind = BetKind::for_event_count(events.len());

        match draft.id {
            None => {
                let bet = Bet {
                    id: 0,
                    events,
                    total_coef,
                    amount: draft.amount,
                    status: draft.status,
                    kind,
                    profile_id: draft.profile_id.or(self.active_profile.profile_id()),
                    date: Utc::now().trunc_subsecs(3),
                    image,
                };
                self.bets.create(&self.backends, bet).await
            }
            Some(id) => {
                let existing = self
                    .get_bet(id)
                    .await
                    .ok_or_else(|| TrackerError::NotFound(format!("bet {id}")))?;
                let bet = Bet {
                    id,
                    events,
                    total_coef,
                    amount: draft.amount,
                    status: draft.status,
                    kind,
                    profile_id: draft.profile_id.or(existing.profile_id),
                    date: existing.date,
                    image: image.or(existing.image),
                };
                self.bets.update(&self.backends, bet).await
            }
        }
    }

    pub async fn delete_bet(&mut self, id: i64) -> Result<(), TrackerError> {
        self.bets.remove(&self.backends, id).await
    }

    // -----------------------------------------------------------------------
    // Profiles
    // -----------------------------------------------------------------------

    pub async fn list_profiles(&mut self) -> Vec<Profile> {
        self.profiles.list(&self.backends, &()).await
    }

    pub async fn get_profile(&mut self, id: i64) -> Option<Profile> {
        self.profiles.get(&self.backends, id).await
    }

    pub async fn save_profile(&mut self, draft: ProfileDraft) -> Result<Profile, TrackerError> {
        draft.validate().map_err(TrackerError::Validation)?;

        match draft.id {
            None => {
                let profile = draft.into_profile(0, Utc::now().trunc_subsecs(3));
                self.profiles.create(&self.backends, profile).await
            }
            Some(id) => {
                let existing = self
                    .get_profile(id)
                    .await
                    .ok_or_else(|| TrackerError::NotFound(format!("profile {id}")))?;
                let profile = draft.into_profile(id, existing.created_at);
                self.profiles.update(&self.backends, profile).await
            }
        }
    }

    /// Delete a profile and every bet assigned to it.
    pub async fn delete_profile(&mut self, id: i64) -> Result<(), TrackerError> {
        match self.backends.write_target()? {
            Some(remote) => {
                let bets_table = Bet::COLLECTION.table();
                let profiles_table = Profile::COLLECTION.table();

                remote
                    .delete_matching(bets_table, &Filters::new().eq("profile_id", id))
                    .await
                    .map_err(|e| remote_write_failed("delete", bets_table, e))?;
                let pruned = self
                    .bets
                    .snapshot_mut()
                    .remove_where(|b| b.profile_id == Some(id));
                self.backends.mirror.delete(Collection::Bets, pruned);

                remote
                    .delete(profiles_table, id)
                    .await
                    .map_err(|e| remote_write_failed("delete", profiles_table, e))?;
                self.backends.mirror.cascade_profile(id);
            }
            None => {
                let removed = self.backends.store.delete_profile_cascade(id).await?;
                self.bets
                    .snapshot_mut()
                    .remove_where(|b| b.profile_id == Some(id));
                tracing::debug!(profile_id = id, bets_removed = removed, "Local cascade");
            }
        }

        self.profiles.snapshot_mut().remove(id);
        if self.active_profile == ProfileFilter::Profile(id) {
            self.active_profile = ProfileFilter::All;
        }

        tracing::info!(profile_id = id, "Profile deleted with its bets");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Views over the snapshot
    // -----------------------------------------------------------------------

    pub fn cached_bets(&self) -> &[Bet] {
        self.bets.snapshot().rows()
    }

    pub fn cached_profiles(&self) -> &[Profile] {
        self.profiles.snapshot().rows()
    }

    pub fn statistics(&self, filter: &BetFilter) -> BetStatistics {
        summarize(&self.bets.snapshot().filtered(filter))
    }
}
