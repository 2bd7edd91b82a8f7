//! Session controller.
//!
//! The [`SessionService`] owns the full lifecycle of one disposable
//! mailbox: address generation with a one-shot collision retry, periodic
//! inbox polling with token refresh, the countdown window with expiry
//! teardown, and persistence of the session snapshot across restarts.
//!
//! It is the only layer that turns a provider error into a state
//! transition or a best-effort swallow; adapters and the manager report
//! failures unchanged.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use chrono::Utc;
use rand::Rng;
use tokio::sync::{broadcast, Mutex, RwLock};

use super::scheduler::RepeatingTask;
use crate::config::Settings;
use crate::domain::{
    merge_preserving_seen, Domain, Message, MessageDetail, ProviderKind, View,
};
use crate::providers::mail::{ProviderError, ProviderManager};
use crate::storage::{
    restored_remaining, PersistedSession, SessionStore, StoreError, TimerState,
};

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors surfaced by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A provider call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The session snapshot could not be persisted or loaded.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No domains are available to build an address from.
    #[error("no domains available")]
    NoDomains,

    /// An address generation request is already in flight.
    #[error("another generation request is in flight")]
    Busy,

    /// The operation requires an active mailbox.
    #[error("no active session")]
    NoSession,

    /// The operation requires an open message.
    #[error("no message selected")]
    NoSelection,

    /// The stored credential could not be refreshed; the session was
    /// torn down.
    #[error("session expired")]
    SessionExpired,
}

impl SessionError {
    /// Short non-technical notice for display.
    ///
    /// Raw provider error text never crosses this boundary.
    pub fn notice(&self) -> &'static str {
        match self {
            SessionError::Provider(ProviderError::Timeout)
            | SessionError::Provider(ProviderError::Network(_)) => {
                "Network error. Check your connection."
            }
            SessionError::Provider(ProviderError::RateLimited) => {
                "Rate limit reached. Please wait a few minutes and try again."
            }
            SessionError::Provider(ProviderError::AddressTaken) => {
                "Username taken. Try a different name."
            }
            SessionError::Provider(ProviderError::Auth(_)) => {
                "Authentication failed. Please try again."
            }
            SessionError::Provider(ProviderError::TokenExpired)
            | SessionError::SessionExpired => "Session expired. Please generate a new email.",
            SessionError::Provider(ProviderError::NotFound(_)) => "Message not found.",
            SessionError::Provider(ProviderError::Provider(_)) => {
                "Something went wrong. Please try again."
            }
            SessionError::Store(_) => "Could not save your session.",
            SessionError::NoDomains => "No domains available. Please try again later.",
            SessionError::Busy => "Still working on the previous request.",
            SessionError::NoSession => "No active mailbox. Generate a new email.",
            SessionError::NoSelection => "No message is open.",
        }
    }
}

/// Events emitted while a session is active.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Countdown tick with the remaining seconds.
    Tick(i64),
    /// The session is about to expire.
    ExpiryWarning,
    /// The session window elapsed and the mailbox was torn down.
    Expired,
    /// The stored credential became unrecoverable and the session was
    /// torn down.
    SessionInvalid,
    /// The inbox changed; carries the message count.
    InboxUpdated(usize),
}

/// Plain data handed to the presentation layer after each operation.
#[derive(Debug, Clone)]
pub struct ViewModel {
    /// Screen to show.
    pub view: View,
    /// Active mailbox address, if any.
    pub email: Option<String>,
    /// Seconds left on the countdown; the full window when idle.
    pub remaining_secs: i64,
    /// Current inbox.
    pub messages: Vec<Message>,
    /// Currently opened message.
    pub selected: Option<MessageDetail>,
}

/// The active mailbox and its credentials.
#[derive(Debug, Clone)]
struct ActiveMailbox {
    email: String,
    password: String,
    token: String,
    account_id: String,
    created_at_ms: i64,
}

#[derive(Default)]
struct SessionState {
    mailbox: Option<ActiveMailbox>,
    messages: Vec<Message>,
    selected: Option<MessageDetail>,
    view: View,
    /// Countdown deadline, epoch milliseconds. Remaining time is always
    /// derived from this timestamp, never from tick counts.
    expires_at_ms: i64,
    warning_fired: bool,
}

#[derive(Default)]
struct Tasks {
    tick: Option<RepeatingTask>,
    poll: Option<RepeatingTask>,
}

/// Orchestrates one disposable-mailbox session end to end.
///
/// Constructed with an injected [`ProviderManager`] and [`SessionStore`]
/// so tests can substitute fakes. [`SessionService::new`] returns an
/// [`Arc`] because the countdown and poll tasks hold a weak reference
/// back to the service.
pub struct SessionService {
    /// Self-reference handed to spawned timer tasks.
    weak: Weak<SessionService>,
    manager: Arc<ProviderManager>,
    store: Arc<dyn SessionStore>,
    settings: Settings,
    state: RwLock<SessionState>,
    domains: RwLock<Vec<Domain>>,
    /// Re-entrancy guard: only one generation request at a time.
    generating: AtomicBool,
    /// Overlapping poll ticks collapse to one in-flight request.
    polling: AtomicBool,
    tasks: Mutex<Tasks>,
    events: broadcast::Sender<SessionEvent>,
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Remaining whole seconds until `expires_at_ms`, rounded up.
fn remaining_from(expires_at_ms: i64, now_ms: i64) -> i64 {
    let diff = expires_at_ms - now_ms;
    if diff <= 0 {
        0
    } else {
        (diff + 999) / 1000
    }
}

/// Reduces a caller-supplied username to lowercase ASCII alphanumerics,
/// capped at `max_len`.
fn sanitize_username(raw: &str, max_len: usize) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .take(max_len)
        .collect()
}

fn random_lowercase(len: usize) -> String {
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..len)
        .map(|_| CHARS[rng.random_range(0..CHARS.len())] as char)
        .collect()
}

/// Zero-padded 4-digit suffix for the collision retry.
fn random_suffix() -> String {
    format!("{:04}", rand::rng().random_range(0..10_000))
}

impl SessionService {
    /// Creates a service over the given manager, store, and settings.
    pub fn new(
        manager: Arc<ProviderManager>,
        store: Arc<dyn SessionStore>,
        settings: Settings,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            manager,
            store,
            settings,
            state: RwLock::new(SessionState::default()),
            domains: RwLock::new(Vec::new()),
            generating: AtomicBool::new(false),
            polling: AtomicBool::new(false),
            tasks: Mutex::new(Tasks::default()),
            events,
        })
    }

    /// Subscribes to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Returns the current view-model snapshot.
    pub async fn view_model(&self) -> ViewModel {
        let state = self.state.read().await;
        let now = now_ms();
        ViewModel {
            view: state.view,
            email: state.mailbox.as_ref().map(|m| m.email.clone()),
            remaining_secs: if state.mailbox.is_some() {
                remaining_from(state.expires_at_ms, now)
            } else {
                self.settings.session.window_secs
            },
            messages: state.messages.clone(),
            selected: state.selected.clone(),
        }
    }

    /// Returns the cached domain list.
    pub async fn domains(&self) -> Vec<Domain> {
        self.domains.read().await.clone()
    }

    /// Fetches and caches the domain list from the active provider.
    ///
    /// Domain-listing fallback to the primary provider happens inside the
    /// manager.
    pub async fn load_domains(&self) -> Result<Vec<Domain>> {
        let domains = self.manager.get_domains().await?;
        *self.domains.write().await = domains.clone();
        Ok(domains)
    }

    /// Restores a persisted session after a restart.
    ///
    /// Returns `None` when there is nothing to restore. A snapshot whose
    /// reconciled remaining time is zero is discarded rather than
    /// restored; a persisted detail view reopens as the inbox because the
    /// message body is not persisted.
    pub async fn restore(&self) -> Result<Option<ViewModel>> {
        let Some(snapshot) = self.store.load().await? else {
            return Ok(None);
        };
        if !snapshot.is_restorable() {
            return Ok(None);
        }

        let now = now_ms();
        let remaining = restored_remaining(
            snapshot.timer,
            snapshot.created_at_ms,
            now,
            self.settings.session.window_secs,
        );
        if remaining == 0 {
            tracing::info!(email = %snapshot.email, "persisted session already expired");
            self.store.clear().await?;
            let _ = self.events.send(SessionEvent::Expired);
            return Ok(None);
        }

        self.manager.set_active(snapshot.provider).await;
        self.manager.set_mailbox(&snapshot.email).await;

        let view = if snapshot.view == View::Detail {
            View::Inbox
        } else {
            snapshot.view
        };

        {
            let mut state = self.state.write().await;
            state.mailbox = Some(ActiveMailbox {
                email: snapshot.email,
                password: snapshot.password,
                token: snapshot.token,
                account_id: snapshot.account_id,
                created_at_ms: snapshot.created_at_ms,
            });
            state.messages = snapshot.messages;
            state.selected = None;
            state.view = view;
            state.expires_at_ms = now + remaining * 1000;
            state.warning_fired = false;
        }

        self.store
            .save_timer(TimerState {
                remaining_secs: remaining,
                saved_at_ms: now,
            })
            .await?;

        // Snapshot the view model before the first poll can mutate state.
        let model = self.view_model().await;
        self.start_tick().await;
        if view == View::Inbox {
            self.start_poll().await;
        }

        tracing::info!(remaining_secs = remaining, "session restored");
        Ok(Some(model))
    }

    /// Generates a new mailbox address.
    ///
    /// A prior session's remote account is deleted best-effort. The
    /// username is the sanitized caller value or a random one; when a
    /// caller-supplied username is reported taken the generation retries
    /// exactly once with a random 4-digit suffix. Success resets the
    /// countdown to the full window and persists a fresh snapshot.
    pub async fn generate(
        &self,
        username: Option<&str>,
        domain: Option<&str>,
        provider: Option<ProviderKind>,
    ) -> Result<ViewModel> {
        if self
            .generating
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SessionError::Busy);
        }

        let result = self.generate_inner(username, domain, provider).await;
        self.generating.store(false, Ordering::SeqCst);
        result
    }

    async fn generate_inner(
        &self,
        username: Option<&str>,
        domain: Option<&str>,
        provider: Option<ProviderKind>,
    ) -> Result<ViewModel> {
        // Best-effort cleanup of the previous remote account.
        let previous = self.state.read().await.mailbox.clone();
        if let Some(prev) = previous {
            if let Err(err) = self
                .manager
                .delete_account(&prev.token, &prev.account_id)
                .await
            {
                tracing::warn!(error = %err, "failed to delete previous remote account");
            }
        }
        self.stop_tasks().await;

        let kind = provider.unwrap_or(self.settings.generation.default_provider);
        self.manager.set_active(kind).await;

        let mut domains = self.domains().await;
        if domains.is_empty() {
            domains = self.load_domains().await?;
        }
        let first_domain = domains.first().ok_or(SessionError::NoDomains)?;
        let domain_name = domain.unwrap_or(&first_domain.domain).to_string();

        let custom = username
            .map(|u| sanitize_username(u, self.settings.generation.max_username_len))
            .filter(|u| !u.is_empty());
        let mut username = custom
            .clone()
            .unwrap_or_else(|| random_lowercase(self.settings.generation.username_len));
        let password = random_lowercase(self.settings.generation.password_len);
        let mut address = format!("{}@{}", username, domain_name);
        self.manager.set_mailbox(&address).await;

        match self.manager.create_account(&address, &password).await {
            Ok(_) => {}
            Err(ProviderError::AddressTaken) if custom.is_some() => {
                // One retry with a numeric suffix, only for caller-supplied
                // usernames; a second conflict propagates.
                username = format!("{}{}", username, random_suffix());
                address = format!("{}@{}", username, domain_name);
                tracing::info!(address = %address, "address taken, retrying with suffix");
                self.manager.set_mailbox(&address).await;
                self.manager.create_account(&address, &password).await?;
            }
            Err(err) => return Err(err.into()),
        }

        let auth = self.manager.get_auth_token(&address, &password).await?;

        let now = now_ms();
        {
            let mut state = self.state.write().await;
            state.mailbox = Some(ActiveMailbox {
                email: address.clone(),
                password,
                token: auth.token,
                account_id: auth.id,
                created_at_ms: now,
            });
            state.messages = Vec::new();
            state.selected = None;
            state.view = View::Inbox;
            state.expires_at_ms = now + self.settings.session.window_secs * 1000;
            state.warning_fired = false;
        }

        self.persist().await?;

        let model = self.view_model().await;
        self.start_tick().await;
        self.start_poll().await;

        tracing::info!(address = %address, provider = %kind, "mailbox generated");
        Ok(model)
    }

    /// Fetches the inbox now.
    ///
    /// Unlike the scheduled poll, failures propagate to the caller.
    pub async fn refresh_inbox(&self) -> Result<ViewModel> {
        self.poll_inbox().await?;
        Ok(self.view_model().await)
    }

    /// One guarded poll cycle; overlapping calls collapse to a no-op.
    async fn poll_inbox(&self) -> Result<()> {
        if self
            .polling
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        let result = self.poll_inbox_inner().await;
        self.polling.store(false, Ordering::SeqCst);

        match result {
            Err(SessionError::SessionExpired) => {
                // Credential unrecoverable: clear everything and go back
                // to the generator.
                self.teardown(false, Some(SessionEvent::SessionInvalid))
                    .await;
                Err(SessionError::SessionExpired)
            }
            other => other,
        }
    }

    async fn poll_inbox_inner(&self) -> Result<()> {
        let Some(mailbox) = self.state.read().await.mailbox.clone() else {
            return Err(SessionError::NoSession);
        };

        match self.manager.get_messages(&mailbox.token).await {
            Ok(fetched) => {
                self.apply_fetched(fetched).await?;
                Ok(())
            }
            Err(ProviderError::TokenExpired) => self.refresh_token_and_retry(&mailbox).await,
            Err(err) => Err(err.into()),
        }
    }

    /// One re-authentication plus one retry fetch after a token rejection.
    async fn refresh_token_and_retry(&self, mailbox: &ActiveMailbox) -> Result<()> {
        if mailbox.password.is_empty() {
            return Err(SessionError::SessionExpired);
        }

        let attempt = async {
            let auth = self
                .manager
                .get_auth_token(&mailbox.email, &mailbox.password)
                .await?;
            let fetched = self.manager.get_messages(&auth.token).await?;
            Ok::<_, ProviderError>((auth, fetched))
        }
        .await;

        match attempt {
            Ok((auth, fetched)) => {
                {
                    let mut state = self.state.write().await;
                    if let Some(active) = state.mailbox.as_mut() {
                        active.token = auth.token;
                    }
                }
                self.apply_fetched(fetched).await?;
                tracing::info!("token refreshed after expiry");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "re-authentication failed");
                Err(SessionError::SessionExpired)
            }
        }
    }

    /// Merges fetched messages into state and persists the snapshot.
    async fn apply_fetched(&self, fetched: Vec<Message>) -> Result<()> {
        let count = {
            let mut state = self.state.write().await;
            state.messages = merge_preserving_seen(&state.messages, fetched);
            state.messages.len()
        };
        self.persist().await?;
        let _ = self.events.send(SessionEvent::InboxUpdated(count));
        Ok(())
    }

    /// Opens one message, marking it seen and switching to the detail
    /// view. Polling stops while the inbox is not visible.
    pub async fn open_message(&self, id: &str) -> Result<ViewModel> {
        let Some(mailbox) = self.state.read().await.mailbox.clone() else {
            return Err(SessionError::NoSession);
        };

        let detail = self.manager.get_message(&mailbox.token, id).await?;

        {
            let mut state = self.state.write().await;
            for msg in &mut state.messages {
                if msg.id == id {
                    msg.seen = true;
                }
            }
            state.selected = Some(detail);
            state.view = View::Detail;
        }

        self.persist().await?;
        self.stop_poll().await;
        Ok(self.view_model().await)
    }

    /// Returns from the detail view to the inbox and resumes polling.
    pub async fn back_to_inbox(&self) -> Result<ViewModel> {
        {
            let mut state = self.state.write().await;
            if state.mailbox.is_none() {
                return Err(SessionError::NoSession);
            }
            state.selected = None;
            state.view = View::Inbox;
        }
        self.persist().await?;
        self.start_poll().await;
        Ok(self.view_model().await)
    }

    /// Switches to the generator view while keeping the session alive.
    pub async fn change_email(&self) -> Result<ViewModel> {
        {
            let mut state = self.state.write().await;
            state.selected = None;
            state.view = View::Generator;
        }
        self.stop_poll().await;
        self.persist().await?;
        Ok(self.view_model().await)
    }

    /// Deletes the currently open message.
    ///
    /// The remote delete is best-effort: a failure is logged and the
    /// message is still removed locally.
    pub async fn delete_message(&self) -> Result<ViewModel> {
        let (mailbox, selected) = {
            let state = self.state.read().await;
            let mailbox = state.mailbox.clone().ok_or(SessionError::NoSession)?;
            let selected = state.selected.clone().ok_or(SessionError::NoSelection)?;
            (mailbox, selected)
        };

        if let Err(err) = self
            .manager
            .delete_message(&mailbox.token, &selected.id)
            .await
        {
            tracing::warn!(message_id = %selected.id, error = %err, "remote message delete failed");
        }

        {
            let mut state = self.state.write().await;
            state.messages.retain(|msg| msg.id != selected.id);
            state.selected = None;
            state.view = View::Inbox;
        }

        self.persist().await?;
        self.start_poll().await;
        Ok(self.view_model().await)
    }

    /// Deletes the session: best-effort remote account removal, cleared
    /// persistence, back to the generator.
    pub async fn delete_session(&self) -> Result<ViewModel> {
        self.teardown(true, None).await;
        Ok(self.view_model().await)
    }

    /// Resets the countdown to the full window and re-anchors the
    /// creation timestamp. Not additive.
    pub async fn extend_session(&self) -> Result<ViewModel> {
        let now = now_ms();
        {
            let mut state = self.state.write().await;
            let Some(mailbox) = state.mailbox.as_mut() else {
                return Err(SessionError::NoSession);
            };
            mailbox.created_at_ms = now;
            state.expires_at_ms = now + self.settings.session.window_secs * 1000;
            state.warning_fired = false;
        }
        self.persist().await?;
        Ok(self.view_model().await)
    }

    /// Writes the complete session snapshot. Last write wins; nothing is
    /// ever written partially.
    async fn persist(&self) -> Result<()> {
        let provider = self.manager.active().await;
        let snapshot = {
            let state = self.state.read().await;
            let Some(mailbox) = &state.mailbox else {
                return Ok(());
            };
            let now = now_ms();
            PersistedSession {
                email: mailbox.email.clone(),
                password: mailbox.password.clone(),
                token: mailbox.token.clone(),
                account_id: mailbox.account_id.clone(),
                messages: state.messages.clone(),
                view: state.view,
                provider,
                created_at_ms: mailbox.created_at_ms,
                timer: Some(TimerState {
                    remaining_secs: remaining_from(state.expires_at_ms, now),
                    saved_at_ms: now,
                }),
            }
        };
        self.store.save(&snapshot).await?;
        Ok(())
    }

    /// One countdown tick: persist the derived remaining time, emit the
    /// tick event, fire the expiry warning once, tear down at zero.
    async fn tick_once(&self) {
        let now = now_ms();
        let (remaining, warn) = {
            let mut state = self.state.write().await;
            if state.mailbox.is_none() {
                return;
            }
            let remaining = remaining_from(state.expires_at_ms, now);
            let warn = remaining > 0
                && remaining <= self.settings.session.expiry_warning_secs
                && !state.warning_fired;
            if warn {
                state.warning_fired = true;
            }
            (remaining, warn)
        };

        if let Err(err) = self
            .store
            .save_timer(TimerState {
                remaining_secs: remaining,
                saved_at_ms: now,
            })
            .await
        {
            tracing::warn!(error = %err, "failed to persist timer state");
        }

        let _ = self.events.send(SessionEvent::Tick(remaining));
        if warn {
            let _ = self.events.send(SessionEvent::ExpiryWarning);
        }

        if remaining == 0 {
            tracing::info!("session window elapsed, tearing down mailbox");
            self.teardown(true, Some(SessionEvent::Expired)).await;
        }
    }

    /// Clears session state, persistence, and timers.
    ///
    /// State is reset and the store cleared before the timers are
    /// cancelled, so a teardown triggered from inside a scheduled task
    /// completes its critical work before that task aborts itself.
    async fn teardown(&self, delete_remote: bool, event: Option<SessionEvent>) {
        let mailbox = {
            let mut state = self.state.write().await;
            let mailbox = state.mailbox.take();
            state.messages = Vec::new();
            state.selected = None;
            state.view = View::Generator;
            state.expires_at_ms = 0;
            state.warning_fired = false;
            mailbox
        };

        if delete_remote {
            if let Some(mailbox) = &mailbox {
                if let Err(err) = self
                    .manager
                    .delete_account(&mailbox.token, &mailbox.account_id)
                    .await
                {
                    tracing::warn!(error = %err, "failed to delete remote account");
                }
            }
        }

        if let Err(err) = self.store.clear().await {
            tracing::warn!(error = %err, "failed to clear persisted session");
        }
        self.manager.clear_mailbox().await;

        if let Some(event) = event {
            let _ = self.events.send(event);
        }

        self.stop_tasks().await;
    }

    async fn start_tick(&self) {
        let weak = self.weak.clone();
        let task = RepeatingTask::spawn(self.settings.session.tick_interval(), move || {
            let weak = weak.clone();
            async move {
                if let Some(service) = weak.upgrade() {
                    service.tick_once().await;
                }
            }
        });
        self.tasks.lock().await.tick = Some(task);
    }

    async fn start_poll(&self) {
        let weak = self.weak.clone();
        let task = RepeatingTask::spawn(self.settings.session.poll_interval(), move || {
            let weak = weak.clone();
            async move {
                if let Some(service) = weak.upgrade() {
                    match service.poll_inbox().await {
                        Ok(()) | Err(SessionError::SessionExpired) => {}
                        Err(err) => {
                            // Transient poll failures do not change state;
                            // the next tick tries again.
                            tracing::debug!(error = %err, "inbox poll failed");
                        }
                    }
                }
            }
        });
        self.tasks.lock().await.poll = Some(task);
    }

    async fn stop_poll(&self) {
        if let Some(poll) = self.tasks.lock().await.poll.take() {
            poll.cancel();
        }
    }

    async fn stop_tasks(&self) {
        let mut tasks = self.tasks.lock().await;
        if let Some(tick) = tasks.tick.take() {
            tick.cancel();
        }
        if let Some(poll) = tasks.poll.take() {
            poll.cancel();
        }
    }
}
