//! SOS lifecycle owner: countdown, fan-out to channels, persistence, reset.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};

use super::MessageComposer;
use crate::channels::{eligible, NotificationChannel};
use crate::domain::{
    location_reference, AlertPayload, AlertRecord, AlertSession, AlertStatus, Contact,
    DispatchOutcome, DispatchSummary, FailureKind, HistoryRecord, RecordId, SessionId, SosState,
    TriggerSource,
};
use crate::error::{ChannelError, ConfigError, GuardianError};
use crate::location::LocationResolver;
use crate::port::{AlertStore, ContactRepository};

/// Shown while the cancel grace period runs
pub const CANCELLED_MESSAGE: &str = "SOS cancelled";
/// Shown when the user has no contacts
pub const NO_CONTACTS_MESSAGE: &str = "No emergency contacts configured. Add contacts to use SOS.";
/// Shown when every delivery failed
pub const DELIVERY_FAILED_MESSAGE: &str =
    "Failed to send SOS alert. Please call emergency services directly.";
/// Shown when a backend could not be reached
pub const INFRASTRUCTURE_MESSAGE: &str = "Something went wrong while sending SOS. Please try again.";

/// Configuration for alert dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Countdown used when the caller does not pick one (seconds)
    pub default_countdown_secs: u64,
    /// Delay between cancel and reset to idle (ms)
    pub cancel_grace_ms: u64,
    /// How long a success message stays up (ms)
    pub success_display_ms: u64,
    /// How long a failure message stays up (ms)
    pub failure_display_ms: u64,
    /// Upper bound on the location lookup (ms)
    pub location_timeout_ms: u64,
    /// Upper bound on each channel and on persistence (ms)
    pub channel_timeout_ms: u64,
    /// Maximum characters per SMS segment
    pub sms_segment_chars: usize,
    /// Title used for push and email
    pub alert_title: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_countdown_secs: 5,
            cancel_grace_ms: 2000,
            success_display_ms: 5000,
            failure_display_ms: 3000,
            location_timeout_ms: 5000,
            channel_timeout_ms: 30_000,
            sms_segment_chars: 160,
            alert_title: "Emergency SOS".to_string(),
        }
    }
}

impl DispatchConfig {
    /// Default countdown
    pub fn default_countdown(&self) -> Duration {
        Duration::from_secs(self.default_countdown_secs)
    }

    /// Cancel grace period
    pub fn cancel_grace(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_ms)
    }

    /// Success display delay
    pub fn success_display(&self) -> Duration {
        Duration::from_millis(self.success_display_ms)
    }

    /// Failure display delay
    pub fn failure_display(&self) -> Duration {
        Duration::from_millis(self.failure_display_ms)
    }

    /// Location lookup timeout
    pub fn location_timeout(&self) -> Duration {
        Duration::from_millis(self.location_timeout_ms)
    }

    /// Per-channel timeout
    pub fn channel_timeout(&self) -> Duration {
        Duration::from_millis(self.channel_timeout_ms)
    }

    /// Check timings are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.location_timeout_ms == 0 {
            return Err(ConfigError::invalid_value("location_timeout_ms", "must be > 0"));
        }
        if self.channel_timeout_ms == 0 {
            return Err(ConfigError::invalid_value("channel_timeout_ms", "must be > 0"));
        }
        if self.sms_segment_chars == 0 {
            return Err(ConfigError::invalid_value("sms_segment_chars", "must be > 0"));
        }
        if self.alert_title.trim().is_empty() {
            return Err(ConfigError::invalid_value("alert_title", "must not be blank"));
        }
        Ok(())
    }
}

/// The user on whose behalf alerts are sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Account ID
    pub user_id: String,
    /// Name shown to contacts and responders
    pub display_name: String,
}

impl UserProfile {
    /// Create a profile
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Observable view of the dispatcher
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SosSnapshot {
    /// Current state
    pub state: SosState,
    /// Attached session
    pub session_id: Option<SessionId>,
    /// Countdown deadline of the attached session
    pub deadline: Option<DateTime<Utc>>,
    /// User-visible message
    pub message: Option<String>,
    /// Cause when the state is `PartialFailure`
    pub failure: Option<FailureKind>,
    /// Delivery summary once the session is terminal
    pub summary: Option<DispatchSummary>,
}

impl SosSnapshot {
    fn idle() -> Self {
        Self {
            state: SosState::Idle,
            session_id: None,
            deadline: None,
            message: None,
            failure: None,
            summary: None,
        }
    }
}

/// Result of a countdown request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new session entered `Countdown`
    Started(SessionId),
    /// A countdown was already running; nothing changed
    AlreadyCounting(SessionId),
    /// A session is past its countdown; the request was ignored
    Busy(SosState),
    /// The deadline would fall outside the representable time range
    InvalidDuration,
}

enum Terminal {
    Succeeded,
    Failed(FailureKind),
}

struct Machine {
    state: SosState,
    session: Option<AlertSession>,
    timer: Option<JoinHandle<()>>,
    message: Option<String>,
    last_record: Option<RecordId>,
}

impl Machine {
    fn session_mut(&mut self, id: SessionId) -> Result<&mut AlertSession, GuardianError> {
        self.session
            .as_mut()
            .filter(|s| s.id() == id)
            .ok_or(GuardianError::NoActiveSession(id))
    }

    fn advance(&mut self, id: SessionId, next: SosState) -> Result<(), GuardianError> {
        self.session_mut(id)?.advance(next)?;
        self.state = next;
        Ok(())
    }

    fn snapshot(&self) -> SosSnapshot {
        let session = self.session.as_ref();
        SosSnapshot {
            state: self.state,
            session_id: session.map(AlertSession::id),
            deadline: session.map(|s| *s.countdown_deadline()),
            message: self.message.clone(),
            failure: session.and_then(AlertSession::failure),
            summary: session
                .filter(|s| s.state().is_terminal())
                .map(|s| s.summary().clone()),
        }
    }
}

struct DispatcherInner {
    config: DispatchConfig,
    user: UserProfile,
    contacts: Arc<dyn ContactRepository>,
    location: Option<LocationResolver>,
    channels: Vec<Arc<dyn NotificationChannel>>,
    store: Arc<dyn AlertStore>,
    composer: MessageComposer,
    machine: Mutex<Machine>,
    snapshot_tx: watch::Sender<SosSnapshot>,
}

/// Owner of the SOS state machine for one user.
///
/// Cheap to clone; all clones drive the same session. Methods that start
/// timers must be called from within a Tokio runtime.
#[derive(Clone)]
pub struct AlertDispatcher {
    inner: Arc<DispatcherInner>,
}

impl AlertDispatcher {
    /// Start building a dispatcher for `user`
    pub fn builder(user: UserProfile) -> DispatcherBuilder {
        DispatcherBuilder::new(user)
    }

    /// Get configuration
    pub fn config(&self) -> &DispatchConfig {
        &self.inner.config
    }

    /// The user alerts are sent for
    pub fn user(&self) -> &UserProfile {
        &self.inner.user
    }

    /// Current state
    pub fn state(&self) -> SosState {
        self.inner.machine.lock().state
    }

    /// Current observable view
    pub fn snapshot(&self) -> SosSnapshot {
        self.inner.machine.lock().snapshot()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<SosSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Public record written by the most recent dispatch
    pub fn last_alert_record(&self) -> Option<RecordId> {
        self.inner.machine.lock().last_record
    }

    /// Manual SOS with the configured default countdown
    pub fn start_default_countdown(&self) -> StartOutcome {
        self.start_countdown(self.inner.config.default_countdown())
    }

    /// Manual SOS: start a countdown of `duration`
    pub fn start_countdown(&self, duration: Duration) -> StartOutcome {
        self.start_countdown_for(duration, TriggerSource::Manual)
    }

    /// Start a countdown of `duration` on behalf of `source`.
    ///
    /// A no-op while a countdown is already running. Ignored while a later
    /// state is in progress; only `Idle` opens a new session.
    pub fn start_countdown_for(&self, duration: Duration, source: TriggerSource) -> StartOutcome {
        let mut machine = self.inner.machine.lock();
        match machine.state {
            SosState::Idle => {}
            SosState::Countdown => {
                if let Some(session) = machine.session.as_ref() {
                    tracing::debug!(session_id = %session.id(), "Countdown already running");
                    return StartOutcome::AlreadyCounting(session.id());
                }
            }
            other => {
                tracing::debug!(state = %other, "SOS busy; countdown request ignored");
                return StartOutcome::Busy(other);
            }
        }

        let Some(countdown) = chrono::Duration::from_std(duration)
            .ok()
            .filter(|countdown| Utc::now().checked_add_signed(*countdown).is_some())
        else {
            tracing::warn!(countdown_secs = duration.as_secs(), "Countdown duration out of range");
            return StartOutcome::InvalidDuration;
        };
        let session = AlertSession::start(self.inner.user.user_id.clone(), countdown, source);
        let id = session.id();

        machine.session = Some(session);
        machine.state = SosState::Countdown;
        machine.message = None;

        let dispatcher = self.clone();
        machine.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            dispatcher.on_deadline(id).await;
        }));

        tracing::info!(
            session_id = %id,
            countdown_ms = duration.as_millis() as u64,
            trigger = ?source,
            "SOS countdown started"
        );
        self.publish(&machine);
        StartOutcome::Started(id)
    }

    /// Cancel a running countdown
    pub fn cancel(&self) -> bool {
        self.cancel_with_reason("cancelled by user")
    }

    /// Cancel a running countdown, recording `reason`.
    ///
    /// Only accepted during `Countdown`; returns `false` otherwise. Once
    /// sending has begun the session runs to completion.
    pub fn cancel_with_reason(&self, reason: impl Into<String>) -> bool {
        let mut machine = self.inner.machine.lock();
        if machine.state != SosState::Countdown {
            tracing::debug!(state = %machine.state, "Cancel ignored outside countdown");
            return false;
        }

        if let Some(timer) = machine.timer.take() {
            timer.abort();
        }

        let Some(session) = machine.session.as_mut() else {
            return false;
        };
        if let Err(e) = session.cancel(reason) {
            tracing::error!(error = %e, "Failed to cancel session");
            return false;
        }
        let id = session.id();
        machine.state = SosState::Cancelled;
        machine.message = Some(CANCELLED_MESSAGE.to_string());

        let grace = self.inner.config.cancel_grace();
        let dispatcher = self.clone();
        machine.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            dispatcher.reset(id);
        }));

        tracing::info!(session_id = %id, "SOS cancelled");
        self.publish(&machine);
        true
    }

    /// Close a persisted public alert as resolved or cancelled
    pub async fn close_alert(&self, id: RecordId, status: AlertStatus) -> Result<(), GuardianError> {
        self.inner.store.update_status(id, status).await?;
        tracing::info!(record_id = %id, status = %status, "Alert record closed");
        Ok(())
    }

    fn publish(&self, machine: &Machine) {
        self.inner.snapshot_tx.send_replace(machine.snapshot());
    }

    async fn on_deadline(&self, id: SessionId) {
        {
            let mut machine = self.inner.machine.lock();
            if machine.state != SosState::Countdown
                || machine.session.as_ref().map(AlertSession::id) != Some(id)
            {
                return;
            }
            machine.timer = None;

            for next in [SosState::Triggered, SosState::Sending] {
                if let Err(e) = machine.advance(id, next) {
                    tracing::error!(session_id = %id, error = %e, "Trigger transition failed");
                    return;
                }
                tracing::info!(session_id = %id, state = %next, "SOS state changed");
                self.publish(&machine);
            }
        }

        self.run_dispatch(id).await;
    }

    async fn run_dispatch(&self, id: SessionId) {
        let final_state = match self.deliver(id).await {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(session_id = %id, error = %e, "SOS dispatch aborted");
                self.finish(id, Terminal::Failed(FailureKind::Infrastructure), INFRASTRUCTURE_MESSAGE)
                    .unwrap_or(SosState::PartialFailure)
            }
        };

        let delay = if final_state == SosState::Succeeded {
            self.inner.config.success_display()
        } else {
            self.inner.config.failure_display()
        };
        tokio::time::sleep(delay).await;
        self.reset(id);
    }

    async fn deliver(&self, id: SessionId) -> Result<SosState, GuardianError> {
        let user = &self.inner.user;
        let contacts = self.inner.contacts.list_contacts(&user.user_id).await?;

        if contacts.is_empty() {
            tracing::warn!(session_id = %id, "No emergency contacts; skipping dispatch");
            return self.finish(id, Terminal::Failed(FailureKind::NoContacts), NO_CONTACTS_MESSAGE);
        }

        let fix = match &self.inner.location {
            Some(resolver) => resolver.resolve(self.inner.config.location_timeout()).await,
            None => None,
        };
        let location = location_reference(fix.as_ref());

        let session = {
            let mut machine = self.inner.machine.lock();
            machine.session_mut(id)?.clone()
        };
        let payload = self
            .inner
            .composer
            .compose(&session, &user.display_name, &location);

        let outcomes = self.fan_out(&contacts, &payload).await;

        let (recorded, reached) = {
            let mut machine = self.inner.machine.lock();
            let session = machine.session_mut(id)?;
            session.summary_mut().extend(outcomes)?;
            let reached = reached_contacts(session.summary());
            (session.clone(), reached)
        };

        let summary = recorded.summary();
        tracing::info!(
            session_id = %id,
            sent = summary.total_sent(),
            failed = summary.total_failed(),
            contacts_reached = reached,
            "SOS fan-out complete"
        );

        let (terminal, message) = if summary.any_success() {
            (
                Terminal::Succeeded,
                format!("SOS alert sent to {} of {} contacts", reached, contacts.len()),
            )
        } else {
            (
                Terminal::Failed(FailureKind::AllChannelsFailed),
                DELIVERY_FAILED_MESSAGE.to_string(),
            )
        };

        let final_state = match terminal {
            Terminal::Succeeded => SosState::Succeeded,
            Terminal::Failed(_) => SosState::PartialFailure,
        };
        self.persist(&recorded, final_state, &location, &contacts).await;

        self.finish(id, terminal, &message)
    }

    async fn fan_out(&self, contacts: &[Contact], payload: &AlertPayload) -> Vec<DispatchOutcome> {
        let timeout = self.inner.config.channel_timeout();
        let mut tasks = JoinSet::new();

        for channel in &self.inner.channels {
            let recipients = eligible(channel.as_ref(), contacts);
            if recipients.is_empty() {
                continue;
            }

            let channel = Arc::clone(channel);
            let payload = payload.clone();
            tasks.spawn(async move {
                let kind = channel.kind();
                let send = std::panic::AssertUnwindSafe(channel.send(&recipients, &payload));

                let failure = match tokio::time::timeout(timeout, send.catch_unwind()).await {
                    Ok(Ok(outcomes)) => return outcomes,
                    Ok(Err(_)) => {
                        tracing::error!(channel = %kind, "Channel panicked during send");
                        ChannelError::transport("channel panicked")
                    }
                    Err(_) => {
                        tracing::warn!(channel = %kind, timeout_ms = timeout.as_millis() as u64, "Channel timed out");
                        ChannelError::Timeout(timeout)
                    }
                };

                recipients
                    .iter()
                    .map(|c| DispatchOutcome::failed(kind, c.id.clone(), failure.to_string()))
                    .collect()
            });
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(batch) => outcomes.extend(batch),
                Err(e) => tracing::error!(error = %e, "Channel task failed to join"),
            }
        }
        outcomes
    }

    async fn persist(
        &self,
        session: &AlertSession,
        final_state: SosState,
        location: &str,
        contacts: &[Contact],
    ) {
        let user = &self.inner.user;
        let record = AlertRecord::for_session(session, &user.display_name, location);
        let history =
            HistoryRecord::for_session(session, final_state, &user.display_name, location, contacts);

        let store = &self.inner.store;
        let writes = async {
            tokio::join!(
                store.put_active_alert(&record),
                store.append_history(&user.user_id, &history)
            )
        };

        match tokio::time::timeout(self.inner.config.channel_timeout(), writes).await {
            Ok((public, private)) => {
                match public {
                    Ok(record_id) => {
                        self.inner.machine.lock().last_record = Some(record_id);
                        tracing::info!(session_id = %session.id(), record_id = %record_id, "Active alert stored");
                    }
                    Err(e) => {
                        tracing::warn!(session_id = %session.id(), error = %e, "Failed to store active alert")
                    }
                }
                if let Err(e) = private {
                    tracing::warn!(session_id = %session.id(), error = %e, "Failed to store alert history");
                }
            }
            Err(_) => {
                tracing::warn!(session_id = %session.id(), "Alert persistence timed out");
            }
        }
    }

    fn finish(&self, id: SessionId, terminal: Terminal, message: &str) -> Result<SosState, GuardianError> {
        let mut machine = self.inner.machine.lock();
        let session = machine.session_mut(id)?;
        let state = match terminal {
            Terminal::Succeeded => {
                session.advance(SosState::Succeeded)?;
                SosState::Succeeded
            }
            Terminal::Failed(kind) => {
                session.fail(kind)?;
                SosState::PartialFailure
            }
        };
        machine.state = state;
        machine.message = Some(message.to_string());

        tracing::info!(session_id = %id, state = %state, "SOS state changed");
        self.publish(&machine);
        Ok(state)
    }

    fn reset(&self, id: SessionId) {
        let mut machine = self.inner.machine.lock();
        let attached = machine.session.as_ref().map(AlertSession::id) == Some(id);
        if !attached || !machine.state.is_terminal() {
            return;
        }

        machine.state = SosState::Idle;
        machine.session = None;
        machine.message = None;
        machine.timer = None;

        tracing::info!(session_id = %id, "SOS reset to idle");
        self.publish(&machine);
    }
}

fn reached_contacts(summary: &DispatchSummary) -> usize {
    let mut ids: Vec<_> = summary
        .outcomes()
        .iter()
        .filter(|o| o.success)
        .map(|o| &o.contact_id)
        .collect();
    ids.sort();
    ids.dedup();
    ids.len()
}

/// Builder for [`AlertDispatcher`]
pub struct DispatcherBuilder {
    user: UserProfile,
    config: DispatchConfig,
    contacts: Option<Arc<dyn ContactRepository>>,
    location: Option<LocationResolver>,
    channels: Vec<Arc<dyn NotificationChannel>>,
    store: Option<Arc<dyn AlertStore>>,
}

impl DispatcherBuilder {
    /// Start a builder for `user`
    pub fn new(user: UserProfile) -> Self {
        Self {
            user,
            config: DispatchConfig::default(),
            contacts: None,
            location: None,
            channels: Vec::new(),
            store: None,
        }
    }

    /// Set dispatch configuration
    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the contact repository
    pub fn contacts(mut self, contacts: Arc<dyn ContactRepository>) -> Self {
        self.contacts = Some(contacts);
        self
    }

    /// Set the location resolver
    pub fn location(mut self, resolver: LocationResolver) -> Self {
        self.location = Some(resolver);
        self
    }

    /// Add a notification channel
    pub fn channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    /// Set the durable store
    pub fn store(mut self, store: Arc<dyn AlertStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the dispatcher
    pub fn build(self) -> Result<AlertDispatcher, GuardianError> {
        self.config.validate()?;
        let contacts = self
            .contacts
            .ok_or_else(|| ConfigError::invalid_value("contacts", "a contact repository is required"))?;
        let store = self
            .store
            .ok_or_else(|| ConfigError::invalid_value("store", "an alert store is required"))?;

        let composer = MessageComposer::new(self.config.alert_title.clone());
        let (snapshot_tx, _) = watch::channel(SosSnapshot::idle());

        Ok(AlertDispatcher {
            inner: Arc::new(DispatcherInner {
                config: self.config,
                user: self.user,
                contacts,
                location: self.location,
                channels: self.channels,
                store,
                composer,
                machine: Mutex::new(Machine {
                    state: SosState::Idle,
                    session: None,
                    timer: None,
                    message: None,
                    last_record: None,
                }),
                snapshot_tx,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{InMemoryAlertStore, RecordingSmsTransport, StaticContactRepository};
    use crate::channels::SmsChannel;

    fn dispatcher(contacts: Vec<Contact>) -> (AlertDispatcher, Arc<RecordingSmsTransport>) {
        let sms = Arc::new(RecordingSmsTransport::new());
        let dispatcher = AlertDispatcher::builder(UserProfile::new("u1", "Sam"))
            .contacts(Arc::new(StaticContactRepository::new(contacts)))
            .store(Arc::new(InMemoryAlertStore::new()))
            .channel(Arc::new(SmsChannel::new(sms.clone(), 160)))
            .build()
            .unwrap();
        (dispatcher, sms)
    }

    #[test]
    fn test_builder_requires_store() {
        let result = AlertDispatcher::builder(UserProfile::new("u1", "Sam"))
            .contacts(Arc::new(StaticContactRepository::new(vec![])))
            .build();
        assert!(matches!(result, Err(GuardianError::Config(_))));
    }

    #[test]
    fn test_config_validation() {
        assert!(DispatchConfig::default().validate().is_ok());
        let bad = DispatchConfig {
            sms_segment_chars: 0,
            ..DispatchConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_idempotent() {
        let (dispatcher, _) = dispatcher(vec![Contact::new("c", "C", "+1")]);

        let StartOutcome::Started(id) = dispatcher.start_countdown(Duration::from_secs(5)) else {
            panic!("countdown should start");
        };
        let deadline = dispatcher.snapshot().deadline;

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(
            dispatcher.start_countdown(Duration::from_secs(30)),
            StartOutcome::AlreadyCounting(id)
        );
        assert_eq!(dispatcher.snapshot().deadline, deadline);
        assert_eq!(dispatcher.state(), SosState::Countdown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_trigger() {
        let (dispatcher, sms) = dispatcher(vec![Contact::new("c", "C", "+1")]);
        dispatcher.start_countdown(Duration::from_secs(5));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(dispatcher.cancel_with_reason("false alarm"));
        assert_eq!(dispatcher.state(), SosState::Cancelled);
        assert_eq!(dispatcher.snapshot().message.as_deref(), Some(CANCELLED_MESSAGE));

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(dispatcher.state(), SosState::Idle);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(dispatcher.state(), SosState::Idle);
        assert!(sms.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_ignored_when_idle() {
        let (dispatcher, _) = dispatcher(vec![]);
        assert!(!dispatcher.cancel());
        assert_eq!(dispatcher.state(), SosState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_rejected_during_cancel_grace() {
        let (dispatcher, _) = dispatcher(vec![]);
        dispatcher.start_countdown(Duration::from_secs(5));
        dispatcher.cancel();
        assert_eq!(
            dispatcher.start_countdown(Duration::from_secs(5)),
            StartOutcome::Busy(SosState::Cancelled)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_countdown_rejected() {
        let (dispatcher, sms) = dispatcher(vec![Contact::new("c", "C", "+1")]);
        assert_eq!(
            dispatcher.start_countdown(Duration::from_secs(10_000_000_000_000)),
            StartOutcome::InvalidDuration
        );
        assert_eq!(
            dispatcher.start_countdown(Duration::MAX),
            StartOutcome::InvalidDuration
        );
        assert_eq!(dispatcher.state(), SosState::Idle);
        assert!(dispatcher.snapshot().session_id.is_none());

        assert!(matches!(
            dispatcher.start_countdown(Duration::from_secs(1)),
            StartOutcome::Started(_)
        ));
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(sms.sent().len(), 1);
    }

    #[test]
    fn test_reached_contacts_deduplicates() {
        use crate::domain::{ChannelKind, ContactId};
        let mut summary = DispatchSummary::new();
        summary
            .extend([
                DispatchOutcome::delivered(ChannelKind::Sms, ContactId::new("a")),
                DispatchOutcome::delivered(ChannelKind::Email, ContactId::new("a")),
                DispatchOutcome::failed(ChannelKind::Sms, ContactId::new("b"), "x"),
            ])
            .unwrap();
        assert_eq!(reached_contacts(&summary), 1);
    }
}
