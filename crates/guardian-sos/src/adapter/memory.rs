//! In-memory adapters for every port, used by tests and the simulator.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::channels::{EmailBatch, EmailGateway, PushGateway, SmsTransport};
use crate::domain::{AlertRecord, AlertStatus, Contact, HistoryRecord, LocationFix, RecordId};
use crate::error::{ChannelError, GuardianError, StoreError};
use crate::location::LocationProvider;
use crate::port::{AlertStore, ContactRepository};

// ============================================================================
// Contacts
// ============================================================================

/// Contact repository returning a fixed list for every user
#[derive(Default)]
pub struct StaticContactRepository {
    contacts: RwLock<Vec<Contact>>,
    unreachable: AtomicBool,
}

impl StaticContactRepository {
    /// Create a repository holding `contacts`
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self {
            contacts: RwLock::new(contacts),
            unreachable: AtomicBool::new(false),
        }
    }

    /// Make every lookup fail
    pub fn unreachable(self) -> Self {
        self.unreachable.store(true, Ordering::SeqCst);
        self
    }

    /// Replace the stored contacts
    pub fn set_contacts(&self, contacts: Vec<Contact>) {
        *self.contacts.write() = contacts;
    }
}

#[async_trait]
impl ContactRepository for StaticContactRepository {
    async fn list_contacts(&self, user_id: &str) -> Result<Vec<Contact>, GuardianError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(GuardianError::Repository(format!(
                "contact backend unreachable for user {}",
                user_id
            )));
        }
        Ok(self.contacts.read().clone())
    }
}

// ============================================================================
// Store
// ============================================================================

/// Alert store kept in process memory
#[derive(Default)]
pub struct InMemoryAlertStore {
    alerts: RwLock<HashMap<RecordId, AlertRecord>>,
    history: RwLock<Vec<(String, HistoryRecord)>>,
    unavailable: AtomicBool,
}

impl InMemoryAlertStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail
    pub fn unavailable(self) -> Self {
        self.unavailable.store(true, Ordering::SeqCst);
        self
    }

    /// All public records
    pub fn alerts(&self) -> Vec<(RecordId, AlertRecord)> {
        self.alerts
            .read()
            .iter()
            .map(|(id, record)| (*id, record.clone()))
            .collect()
    }

    /// Public records with a given status
    pub fn alerts_with_status(&self, status: AlertStatus) -> Vec<AlertRecord> {
        self.alerts
            .read()
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect()
    }

    /// History entries for `user_id`, oldest first
    pub fn history(&self, user_id: &str) -> Vec<HistoryRecord> {
        self.history
            .read()
            .iter()
            .filter(|(owner, _)| owner == user_id)
            .map(|(_, record)| record.clone())
            .collect()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store disabled".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl AlertStore for InMemoryAlertStore {
    async fn put_active_alert(&self, record: &AlertRecord) -> Result<RecordId, StoreError> {
        self.check_available()?;
        let id = RecordId::new();
        self.alerts.write().insert(id, record.clone());
        Ok(id)
    }

    async fn append_history(&self, user_id: &str, record: &HistoryRecord) -> Result<(), StoreError> {
        self.check_available()?;
        self.history.write().push((user_id.to_string(), record.clone()));
        Ok(())
    }

    async fn update_status(&self, id: RecordId, status: AlertStatus) -> Result<(), StoreError> {
        self.check_available()?;
        let mut alerts = self.alerts.write();
        let record = alerts
            .get_mut(&id)
            .ok_or_else(|| StoreError::Rejected(format!("alert {} not found", id)))?;

        if !record.status.can_transition_to(status) {
            return Err(StoreError::Rejected(format!(
                "cannot move alert {} from {} to {}",
                id, record.status, status
            )));
        }
        record.status = status;
        Ok(())
    }
}

// ============================================================================
// Location
// ============================================================================

/// Location provider with scripted answers
pub struct StaticLocationProvider {
    permission: bool,
    cached: Option<LocationFix>,
    fresh: Option<(LocationFix, Duration)>,
    hangs: bool,
    cache_stalls: bool,
}

impl StaticLocationProvider {
    /// Provider with permission and no fixes
    pub fn new() -> Self {
        Self {
            permission: true,
            cached: None,
            fresh: None,
            hangs: false,
            cache_stalls: false,
        }
    }

    /// Hold a last-known fix
    pub fn with_cached(mut self, fix: LocationFix) -> Self {
        self.cached = Some(fix);
        self
    }

    /// Answer fresh requests with `fix` after `delay`
    pub fn with_fresh(mut self, fix: LocationFix, delay: Duration) -> Self {
        self.fresh = Some((fix, delay));
        self
    }

    /// Never answer fresh requests
    pub fn hanging(mut self) -> Self {
        self.hangs = true;
        self
    }

    /// Never answer the last-known-fix lookup
    pub fn stalled_cache(mut self) -> Self {
        self.cache_stalls = true;
        self
    }

    /// Deny location permission
    pub fn without_permission(mut self) -> Self {
        self.permission = false;
        self
    }
}

impl Default for StaticLocationProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocationProvider for StaticLocationProvider {
    fn has_permission(&self) -> bool {
        self.permission
    }

    async fn cached_fix(&self) -> Option<LocationFix> {
        if self.cache_stalls {
            return std::future::pending().await;
        }
        self.cached.clone()
    }

    async fn request_fresh_fix(&self) -> Option<LocationFix> {
        if self.hangs {
            return std::future::pending().await;
        }
        match &self.fresh {
            Some((fix, delay)) => {
                tokio::time::sleep(*delay).await;
                Some(fix.clone())
            }
            None => None,
        }
    }
}

// ============================================================================
// Transports
// ============================================================================

/// SMS transport that records what it was asked to send
pub struct RecordingSmsTransport {
    permission: bool,
    fail_all: bool,
    failing: HashSet<String>,
    delay: Duration,
    sent: RwLock<Vec<(String, Vec<String>)>>,
}

impl RecordingSmsTransport {
    /// Transport that accepts everything
    pub fn new() -> Self {
        Self {
            permission: true,
            fail_all: false,
            failing: HashSet::new(),
            delay: Duration::ZERO,
            sent: RwLock::new(Vec::new()),
        }
    }

    /// Deny the send permission
    pub fn without_permission(mut self) -> Self {
        self.permission = false;
        self
    }

    /// Fail every send
    pub fn failing(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Fail sends to one number
    pub fn failing_for(mut self, phone: impl Into<String>) -> Self {
        self.failing.insert(phone.into());
        self
    }

    /// Wait before answering each send
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Accepted sends as (phone, parts), in call order
    pub fn sent(&self) -> Vec<(String, Vec<String>)> {
        self.sent.read().clone()
    }
}

impl Default for RecordingSmsTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SmsTransport for RecordingSmsTransport {
    fn has_permission(&self) -> bool {
        self.permission
    }

    async fn send_multipart(&self, phone: &str, parts: &[String]) -> Result<(), ChannelError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_all || self.failing.contains(phone) {
            return Err(ChannelError::transport(format!("carrier rejected {}", phone)));
        }
        self.sent.write().push((phone.to_string(), parts.to_vec()));
        Ok(())
    }
}

/// Push gateway that records its calls
#[derive(Default)]
pub struct RecordingPushGateway {
    fail_all: bool,
    calls: RwLock<Vec<(String, BTreeMap<String, String>)>>,
}

impl RecordingPushGateway {
    /// Gateway that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call
    pub fn failing(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Calls as (token, metadata)
    pub fn calls(&self) -> Vec<(String, BTreeMap<String, String>)> {
        self.calls.read().clone()
    }
}

#[async_trait]
impl PushGateway for RecordingPushGateway {
    async fn invoke(
        &self,
        token: &str,
        _title: &str,
        _body: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<(), ChannelError> {
        if self.fail_all {
            return Err(ChannelError::transport("push endpoint returned 503"));
        }
        self.calls.write().push((token.to_string(), metadata.clone()));
        Ok(())
    }
}

/// Email gateway that records its batches
#[derive(Default)]
pub struct RecordingEmailGateway {
    fail_all: bool,
    batches: RwLock<Vec<EmailBatch>>,
}

impl RecordingEmailGateway {
    /// Gateway that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call
    pub fn failing(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Batches received
    pub fn batches(&self) -> Vec<EmailBatch> {
        self.batches.read().clone()
    }
}

#[async_trait]
impl EmailGateway for RecordingEmailGateway {
    async fn invoke(&self, batch: &EmailBatch) -> Result<(), ChannelError> {
        if self.fail_all {
            return Err(ChannelError::transport("email endpoint unreachable"));
        }
        self.batches.write().push(batch.clone());
        Ok(())
    }
}
