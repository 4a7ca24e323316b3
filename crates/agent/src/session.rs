//! In-memory session store
//!
//! Sessions live in a map guarded by a short-lived `RwLock`; each session
//! additionally carries a fair `tokio::sync::Mutex` whose leases serialize
//! turns per conversation id (FIFO). Terminal sessions are retained for an
//! audit window and swept by a background task.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};

use driver_assist_config::{ConcurrencyPolicy, SessionConfig};
use driver_assist_core::{ConversationState, Error, Language, Result, SessionLease, SessionStore};

struct SessionSlot {
    state: ConversationState,
    key_lock: Arc<Mutex<()>>,
}

/// Default session store: in-memory, per-key mutual exclusion
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionSlot>>,
    policy: ConcurrencyPolicy,
    max_sessions: usize,
    retention: Duration,
    sweep_interval: Duration,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::with_config(&SessionConfig::default())
    }

    pub fn with_config(config: &SessionConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            policy: config.concurrency,
            max_sessions: config.max_sessions,
            retention: Duration::from_secs(config.retention_secs),
            sweep_interval: Duration::from_secs(config.sweep_interval_secs),
        }
    }

    /// Number of sessions currently held, terminal ones included
    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Remove terminal sessions older than the retention window
    pub fn sweep_expired(&self) {
        let now = Utc::now();
        let retention =
            chrono::Duration::from_std(self.retention).unwrap_or(chrono::Duration::zero());

        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, slot| {
            !(slot.state.is_terminal() && now - slot.state.last_activity > retention)
        });
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(removed, remaining = sessions.len(), "swept expired sessions");
        }
    }

    /// Start the periodic retention sweep
    ///
    /// Returns a shutdown sender; send `true` to stop the task.
    pub fn start_sweeper(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let store = Arc::clone(self);
        let interval = store.sweep_interval;

        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = timer.tick() => store.sweep_expired(),
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("session sweeper shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    fn key_lock(&self, conversation_id: &str) -> Result<Arc<Mutex<()>>> {
        {
            let sessions = self.sessions.read();
            if let Some(slot) = sessions.get(conversation_id) {
                return Ok(Arc::clone(&slot.key_lock));
            }
        }

        // First contact: reserve the slot so the lock exists before the state.
        // At capacity, reclaim expired terminal sessions once before refusing.
        for _ in 0..2 {
            let mut sessions = self.sessions.write();
            if sessions.len() < self.max_sessions || sessions.contains_key(conversation_id) {
                let slot = sessions
                    .entry(conversation_id.to_string())
                    .or_insert_with(|| SessionSlot {
                        state: ConversationState::new(conversation_id, Language::default()),
                        key_lock: Arc::new(Mutex::new(())),
                    });
                return Ok(Arc::clone(&slot.key_lock));
            }
            drop(sessions);
            self.sweep_expired();
        }

        Err(Error::InvalidInput("session capacity reached".to_string()))
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_or_create(
        &self,
        conversation_id: &str,
        language: Language,
    ) -> Result<ConversationState> {
        {
            let sessions = self.sessions.read();
            if let Some(slot) = sessions.get(conversation_id) {
                return Ok(slot.state.clone());
            }
        }

        let mut sessions = self.sessions.write();
        if sessions.len() >= self.max_sessions && !sessions.contains_key(conversation_id) {
            return Err(Error::InvalidInput("session capacity reached".to_string()));
        }
        let slot = sessions
            .entry(conversation_id.to_string())
            .or_insert_with(|| {
                tracing::info!(session_id = %conversation_id, %language, "created session");
                SessionSlot {
                    state: ConversationState::new(conversation_id, language),
                    key_lock: Arc::new(Mutex::new(())),
                }
            });
        Ok(slot.state.clone())
    }

    async fn get(&self, conversation_id: &str) -> Option<ConversationState> {
        self.sessions
            .read()
            .get(conversation_id)
            .map(|slot| slot.state.clone())
    }

    async fn save(&self, state: ConversationState) {
        let mut sessions = self.sessions.write();
        match sessions.get_mut(&state.conversation_id) {
            Some(slot) => slot.state = state,
            None => {
                let id = state.conversation_id.clone();
                sessions.insert(
                    id,
                    SessionSlot {
                        state,
                        key_lock: Arc::new(Mutex::new(())),
                    },
                );
            }
        }
    }

    async fn lock(&self, conversation_id: &str) -> Result<SessionLease> {
        let key_lock = self.key_lock(conversation_id)?;
        match self.policy {
            ConcurrencyPolicy::Serialize => {
                // tokio's Mutex is fair: waiters acquire in FIFO order
                Ok(SessionLease::new(key_lock.lock_owned().await))
            }
            ConcurrencyPolicy::Reject => key_lock
                .try_lock_owned()
                .map(SessionLease::new)
                .map_err(|_| {
                    Error::InvalidInput("another turn is in flight for this session".to_string())
                }),
        }
    }

    async fn remove(&self, conversation_id: &str) {
        if self.sessions.write().remove(conversation_id).is_some() {
            tracing::info!(session_id = %conversation_id, "removed session");
        }
    }
}
