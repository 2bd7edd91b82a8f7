//! Integration tests for the session lifecycle.
//!
//! These tests drive the [`SessionService`] end to end against fake
//! provider adapters and the in-memory store. Adapter wire formats are
//! covered separately in `provider_wire.rs`.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;

use tempbox::config::Settings;
use tempbox::domain::{
    Account, Address, AuthToken, Domain, Message, MessageDetail, ProviderKind, View,
};
use tempbox::providers::mail::{MailProvider, ProviderError, ProviderManager};
use tempbox::services::{SessionError, SessionEvent, SessionService};
use tempbox::storage::{
    MemorySessionStore, PersistedSession, SessionStore, TimerState,
};

// ============================================================================
// Fake provider
// ============================================================================

/// Configurable fake mail backend.
///
/// Registration accumulates: creating an address marks it taken, so a
/// second registration of the same address conflicts like a real backend.
struct FakeMail {
    kind: ProviderKind,
    domains: Vec<Domain>,
    fail_domains: bool,
    fail_auth: AtomicBool,
    fail_message_delete: bool,
    /// Report every registration attempt as a conflict.
    always_taken: bool,
    create_delay: Duration,
    taken: Mutex<HashSet<String>>,
    create_attempts: AtomicUsize,
    auth_attempts: AtomicUsize,
    delete_account_calls: AtomicUsize,
    /// Token currently accepted by `get_messages`.
    valid_token: Mutex<String>,
    inbox: Mutex<Vec<Message>>,
}

impl FakeMail {
    fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            domains: vec![
                Domain::new("1", "fake.test"),
                Domain::new("2", "other.test"),
            ],
            fail_domains: false,
            fail_auth: AtomicBool::new(false),
            fail_message_delete: false,
            always_taken: false,
            create_delay: Duration::ZERO,
            taken: Mutex::new(HashSet::new()),
            create_attempts: AtomicUsize::new(0),
            auth_attempts: AtomicUsize::new(0),
            delete_account_calls: AtomicUsize::new(0),
            valid_token: Mutex::new(String::new()),
            inbox: Mutex::new(Vec::new()),
        }
    }

    fn message(id: &str, ts_secs: i64, seen: bool) -> Message {
        Message {
            id: id.to_string(),
            from: Address::with_name("sender@example.com", "Sender"),
            to: vec![Address::new("me@fake.test")],
            subject: format!("Subject {}", id),
            intro: "intro".to_string(),
            created_at: chrono::DateTime::from_timestamp(ts_secs, 0).unwrap(),
            seen,
        }
    }

    fn push_message(&self, msg: Message) {
        self.inbox.lock().unwrap().push(msg);
    }
}

#[async_trait::async_trait]
impl MailProvider for FakeMail {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn get_domains(&self) -> Result<Vec<Domain>, ProviderError> {
        if self.fail_domains {
            return Err(ProviderError::Network("domains down".to_string()));
        }
        Ok(self.domains.clone())
    }

    async fn create_account(
        &self,
        address: &str,
        password: &str,
    ) -> Result<Account, ProviderError> {
        self.create_attempts.fetch_add(1, Ordering::SeqCst);
        if !self.create_delay.is_zero() {
            tokio::time::sleep(self.create_delay).await;
        }
        let mut taken = self.taken.lock().unwrap();
        if self.always_taken || !taken.insert(address.to_string()) {
            return Err(ProviderError::AddressTaken);
        }
        Ok(Account {
            id: "acct-1".to_string(),
            address: address.to_string(),
            password: password.to_string(),
        })
    }

    async fn get_auth_token(
        &self,
        _address: &str,
        _password: &str,
    ) -> Result<AuthToken, ProviderError> {
        if self.fail_auth.load(Ordering::SeqCst) {
            return Err(ProviderError::Auth("bad credentials".to_string()));
        }
        let attempt = self.auth_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let token = format!("token-{}", attempt);
        *self.valid_token.lock().unwrap() = token.clone();
        Ok(AuthToken {
            token,
            id: "acct-1".to_string(),
        })
    }

    async fn get_messages(
        &self,
        token: &str,
        _address: &str,
    ) -> Result<Vec<Message>, ProviderError> {
        if *self.valid_token.lock().unwrap() != token {
            return Err(ProviderError::TokenExpired);
        }
        Ok(self.inbox.lock().unwrap().clone())
    }

    async fn get_message(
        &self,
        token: &str,
        _address: &str,
        id: &str,
    ) -> Result<MessageDetail, ProviderError> {
        if *self.valid_token.lock().unwrap() != token {
            return Err(ProviderError::TokenExpired);
        }
        let inbox = self.inbox.lock().unwrap();
        let msg = inbox
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))?;
        Ok(MessageDetail {
            id: msg.id.clone(),
            from: msg.from.clone(),
            to: msg.to.clone(),
            subject: msg.subject.clone(),
            intro: msg.intro.clone(),
            created_at: msg.created_at,
            seen: true,
            html: vec!["<p>body</p>".to_string()],
            text: "body".to_string(),
        })
    }

    async fn delete_message(&self, _token: &str, id: &str) -> Result<(), ProviderError> {
        if self.fail_message_delete {
            return Err(ProviderError::Network("delete down".to_string()));
        }
        self.inbox.lock().unwrap().retain(|m| m.id != id);
        Ok(())
    }

    async fn delete_account(
        &self,
        _token: &str,
        _account_id: &str,
    ) -> Result<(), ProviderError> {
        self.delete_account_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    primary: Arc<FakeMail>,
    secondary: Arc<FakeMail>,
    store: Arc<MemorySessionStore>,
    service: Arc<SessionService>,
}

fn harness_with(
    primary: FakeMail,
    secondary: FakeMail,
    store: MemorySessionStore,
    settings: Settings,
) -> Harness {
    let primary = Arc::new(primary);
    let secondary = Arc::new(secondary);
    let store = Arc::new(store);
    let manager = Arc::new(ProviderManager::with_adapters(vec![
        primary.clone() as Arc<dyn MailProvider>,
        secondary.clone() as Arc<dyn MailProvider>,
    ]));
    let service = SessionService::new(manager, store.clone(), settings);
    Harness {
        primary,
        secondary,
        store,
        service,
    }
}

fn harness() -> Harness {
    harness_with(
        FakeMail::new(ProviderKind::MailTm),
        FakeMail::new(ProviderKind::OneSec),
        MemorySessionStore::new(),
        Settings::default(),
    )
}

fn snapshot(token: &str, password: &str, created_secs_ago: i64) -> PersistedSession {
    let now = Utc::now().timestamp_millis();
    PersistedSession {
        email: "alice@fake.test".to_string(),
        password: password.to_string(),
        token: token.to_string(),
        account_id: "acct-1".to_string(),
        messages: Vec::new(),
        view: View::Inbox,
        provider: ProviderKind::MailTm,
        created_at_ms: now - created_secs_ago * 1000,
        timer: Some(TimerState {
            remaining_secs: 600 - created_secs_ago,
            saved_at_ms: now,
        }),
    }
}

/// Lets the immediate first poll spawned by generate/restore finish, so a
/// manual refresh in a test cannot collapse into it.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}

async fn wait_for_event(
    events: &mut tokio::sync::broadcast::Receiver<SessionEvent>,
    mut matcher: impl FnMut(&SessionEvent) -> bool,
) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.expect("event channel closed");
            if matcher(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

// ============================================================================
// Address generation
// ============================================================================

#[tokio::test]
async fn generate_with_username_uses_first_domain() {
    let h = harness();

    let model = h.service.generate(Some("alice"), None, None).await.unwrap();

    assert_eq!(model.email.as_deref(), Some("alice@fake.test"));
    assert_eq!(model.view, View::Inbox);
    assert_eq!(model.remaining_secs, 600);
    assert!(model.messages.is_empty());
}

#[tokio::test]
async fn generate_sanitizes_the_username() {
    let h = harness();

    let model = h
        .service
        .generate(Some("Alice.Smith!"), None, None)
        .await
        .unwrap();

    assert_eq!(model.email.as_deref(), Some("alicesmith@fake.test"));
}

#[tokio::test]
async fn generate_without_username_is_random_lowercase() {
    let h = harness();

    let model = h.service.generate(None, None, None).await.unwrap();

    let email = model.email.unwrap();
    let (local, domain) = email.split_once('@').unwrap();
    assert_eq!(domain, "fake.test");
    assert_eq!(local.len(), 10);
    assert!(local
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
}

#[tokio::test]
async fn taken_username_retries_once_with_numeric_suffix() {
    let h = harness();

    h.service.generate(Some("alice"), None, None).await.unwrap();
    let before = h.primary.create_attempts.load(Ordering::SeqCst);

    let model = h.service.generate(Some("alice"), None, None).await.unwrap();

    // Exactly two registration attempts for the second generation.
    assert_eq!(h.primary.create_attempts.load(Ordering::SeqCst) - before, 2);

    let email = model.email.unwrap();
    let (local, domain) = email.split_once('@').unwrap();
    assert_eq!(domain, "fake.test");
    assert_eq!(local.len(), "alice".len() + 4);
    assert!(local.starts_with("alice"));
    assert!(local["alice".len()..].chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn taken_random_username_does_not_retry() {
    let mut primary = FakeMail::new(ProviderKind::MailTm);
    primary.always_taken = true;
    let h = harness_with(
        primary,
        FakeMail::new(ProviderKind::OneSec),
        MemorySessionStore::new(),
        Settings::default(),
    );

    // The suffix retry is reserved for caller-supplied usernames; a
    // conflict on a random username is a plain failure.
    let err = h.service.generate(None, None, None).await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::Provider(ProviderError::AddressTaken)
    ));
    assert_eq!(h.primary.create_attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn persistent_conflict_fails_after_the_single_retry() {
    let mut primary = FakeMail::new(ProviderKind::MailTm);
    primary.always_taken = true;
    let h = harness_with(
        primary,
        FakeMail::new(ProviderKind::OneSec),
        MemorySessionStore::new(),
        Settings::default(),
    );

    let err = h.service.generate(Some("alice"), None, None).await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::Provider(ProviderError::AddressTaken)
    ));
    assert_eq!(err.notice(), "Username taken. Try a different name.");
    assert_eq!(h.primary.create_attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn generation_failure_propagates_as_notice() {
    let h = harness_with(
        {
            let mut fake = FakeMail::new(ProviderKind::MailTm);
            fake.fail_domains = true;
            fake
        },
        FakeMail::new(ProviderKind::OneSec),
        MemorySessionStore::new(),
        Settings::default(),
    );

    let err = h.service.generate(Some("alice"), None, None).await.unwrap_err();

    assert_eq!(err.notice(), "Network error. Check your connection.");
}

#[tokio::test]
async fn concurrent_generation_is_rejected() {
    let mut primary = FakeMail::new(ProviderKind::MailTm);
    primary.create_delay = Duration::from_millis(50);
    let h = harness_with(
        primary,
        FakeMail::new(ProviderKind::OneSec),
        MemorySessionStore::new(),
        Settings::default(),
    );

    let (first, second) = tokio::join!(
        h.service.generate(Some("alice"), None, None),
        h.service.generate(Some("bob"), None, None),
    );

    let results = [first.map(|_| ()), second.map(|_| ())];
    let busy = results
        .iter()
        .filter(|r| matches!(r, Err(SessionError::Busy)))
        .count();
    assert_eq!(busy, 1);
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
}

#[tokio::test]
async fn generate_replaces_previous_session_and_deletes_remote_account() {
    let h = harness();

    h.service.generate(Some("alice"), None, None).await.unwrap();
    h.service.generate(Some("bob"), None, None).await.unwrap();

    assert_eq!(h.primary.delete_account_calls.load(Ordering::SeqCst), 1);

    let stored = h.store.load().await.unwrap().unwrap();
    assert_eq!(stored.email, "bob@fake.test");
}

// ============================================================================
// Provider selection and fallback
// ============================================================================

#[tokio::test]
async fn generate_against_secondary_provider() {
    let mut secondary = FakeMail::new(ProviderKind::OneSec);
    secondary.domains = vec![Domain::new("1", "onesec.test")];
    let h = harness_with(
        FakeMail::new(ProviderKind::MailTm),
        secondary,
        MemorySessionStore::new(),
        Settings::default(),
    );

    let model = h
        .service
        .generate(Some("alice"), None, Some(ProviderKind::OneSec))
        .await
        .unwrap();

    assert_eq!(model.email.as_deref(), Some("alice@onesec.test"));
    let stored = h.store.load().await.unwrap().unwrap();
    assert_eq!(stored.provider, ProviderKind::OneSec);
}

#[tokio::test]
async fn domain_failure_on_secondary_falls_back_to_primary() {
    let mut secondary = FakeMail::new(ProviderKind::OneSec);
    secondary.fail_domains = true;
    let h = harness_with(
        FakeMail::new(ProviderKind::MailTm),
        secondary,
        MemorySessionStore::new(),
        Settings::default(),
    );

    let model = h
        .service
        .generate(Some("alice"), None, Some(ProviderKind::OneSec))
        .await
        .unwrap();

    // The fallback switched the session to the primary provider.
    assert_eq!(model.email.as_deref(), Some("alice@fake.test"));
    let stored = h.store.load().await.unwrap().unwrap();
    assert_eq!(stored.provider, ProviderKind::MailTm);
}

// ============================================================================
// Inbox polling and seen-state merging
// ============================================================================

#[tokio::test]
async fn refresh_merges_messages_preserving_seen() {
    let h = harness();
    h.service.generate(Some("alice"), None, None).await.unwrap();
    settle().await;

    h.primary.push_message(FakeMail::message("m1", 100, false));
    h.primary.push_message(FakeMail::message("m2", 200, false));
    h.service.refresh_inbox().await.unwrap();

    // Open m1 so its seen flag is client-owned state.
    h.service.open_message("m1").await.unwrap();
    h.service.back_to_inbox().await.unwrap();

    // The provider still reports seen=false for m1.
    let model = h.service.refresh_inbox().await.unwrap();

    let m1 = model.messages.iter().find(|m| m.id == "m1").unwrap();
    assert!(m1.seen);
    let m2 = model.messages.iter().find(|m| m.id == "m2").unwrap();
    assert!(!m2.seen);

    // Newest first.
    assert_eq!(model.messages[0].id, "m2");
}

#[tokio::test]
async fn token_expiry_triggers_one_reauth_and_retry() {
    let h = harness();
    let mut events = h.service.subscribe();

    h.service.generate(Some("alice"), None, None).await.unwrap();
    settle().await;
    let auth_after_generate = h.primary.auth_attempts.load(Ordering::SeqCst);

    // Invalidate the issued token server-side.
    *h.primary.valid_token.lock().unwrap() = "rotated".to_string();
    h.primary.push_message(FakeMail::message("m1", 100, false));

    let model = h.service.refresh_inbox().await.unwrap();

    // Exactly one re-authentication, and the retry fetch succeeded.
    assert_eq!(
        h.primary.auth_attempts.load(Ordering::SeqCst) - auth_after_generate,
        1
    );
    assert_eq!(model.messages.len(), 1);
    assert_eq!(model.view, View::Inbox);

    // The refreshed token is persisted with the snapshot.
    let stored = h.store.load().await.unwrap().unwrap();
    assert_eq!(stored.token, *h.primary.valid_token.lock().unwrap());

    wait_for_event(&mut events, |e| matches!(e, SessionEvent::InboxUpdated(_))).await;
}

#[tokio::test]
async fn failed_reauth_tears_the_session_down() {
    let h = harness();
    h.service.generate(Some("alice"), None, None).await.unwrap();
    settle().await;
    let mut events = h.service.subscribe();

    *h.primary.valid_token.lock().unwrap() = "rotated".to_string();
    // Make sure the single re-authentication attempt fails too.
    h.primary.fail_auth.store(true, Ordering::SeqCst);

    let err = h.service.refresh_inbox().await.unwrap_err();

    assert!(matches!(err, SessionError::SessionExpired));
    assert_eq!(err.notice(), "Session expired. Please generate a new email.");
    assert!(h.store.load().await.unwrap().is_none());
    assert_eq!(h.service.view_model().await.view, View::Generator);

    wait_for_event(&mut events, |e| matches!(e, SessionEvent::SessionInvalid)).await;
}

// ============================================================================
// Message detail and deletion
// ============================================================================

#[tokio::test]
async fn open_message_marks_seen_and_switches_view() {
    let h = harness();
    h.service.generate(Some("alice"), None, None).await.unwrap();
    settle().await;
    h.primary.push_message(FakeMail::message("m1", 100, false));
    h.service.refresh_inbox().await.unwrap();

    let model = h.service.open_message("m1").await.unwrap();

    assert_eq!(model.view, View::Detail);
    let selected = model.selected.unwrap();
    assert_eq!(selected.id, "m1");
    assert_eq!(selected.text, "body");
    assert!(model.messages.iter().find(|m| m.id == "m1").unwrap().seen);

    // The seen flag is persisted immediately.
    let stored = h.store.load().await.unwrap().unwrap();
    assert!(stored.messages.iter().find(|m| m.id == "m1").unwrap().seen);
    assert_eq!(stored.view, View::Detail);
}

#[tokio::test]
async fn open_unknown_message_reports_not_found() {
    let h = harness();
    h.service.generate(Some("alice"), None, None).await.unwrap();

    let err = h.service.open_message("missing").await.unwrap_err();

    assert_eq!(err.notice(), "Message not found.");
    assert_eq!(h.service.view_model().await.view, View::Inbox);
}

#[tokio::test]
async fn delete_message_removes_locally_even_when_remote_fails() {
    let mut primary = FakeMail::new(ProviderKind::MailTm);
    primary.fail_message_delete = true;
    let h = harness_with(
        primary,
        FakeMail::new(ProviderKind::OneSec),
        MemorySessionStore::new(),
        Settings::default(),
    );

    h.service.generate(Some("alice"), None, None).await.unwrap();
    settle().await;
    h.primary.push_message(FakeMail::message("m1", 100, false));
    h.service.refresh_inbox().await.unwrap();
    h.service.open_message("m1").await.unwrap();

    // Remote delete fails; the user-visible action still completes.
    let model = h.service.delete_message().await.unwrap();

    assert_eq!(model.view, View::Inbox);
    assert!(model.messages.is_empty());
    assert!(model.selected.is_none());
}

// ============================================================================
// Session teardown and extension
// ============================================================================

#[tokio::test]
async fn delete_session_clears_everything() {
    let h = harness();
    h.service.generate(Some("alice"), None, None).await.unwrap();

    let model = h.service.delete_session().await.unwrap();

    assert_eq!(model.view, View::Generator);
    assert!(model.email.is_none());
    assert_eq!(model.remaining_secs, 600);
    assert!(h.store.load().await.unwrap().is_none());
    assert_eq!(h.primary.delete_account_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn extend_resets_window_and_reanchors_creation() {
    let h = harness();
    h.service.generate(Some("alice"), None, None).await.unwrap();
    let before = h.store.load().await.unwrap().unwrap();

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let model = h.service.extend_session().await.unwrap();

    assert_eq!(model.remaining_secs, 600);
    let after = h.store.load().await.unwrap().unwrap();
    assert!(after.created_at_ms > before.created_at_ms);
}

#[tokio::test]
async fn expiry_tears_down_and_deletes_remote_account() {
    let mut settings = Settings::default();
    settings.session.window_secs = 1;
    settings.session.tick_interval_ms = 50;
    let h = harness_with(
        FakeMail::new(ProviderKind::MailTm),
        FakeMail::new(ProviderKind::OneSec),
        MemorySessionStore::new(),
        settings,
    );
    let mut events = h.service.subscribe();

    h.service.generate(Some("alice"), None, None).await.unwrap();

    wait_for_event(&mut events, |e| matches!(e, SessionEvent::Expired)).await;

    assert!(h.store.load().await.unwrap().is_none());
    assert_eq!(h.service.view_model().await.view, View::Generator);
    assert_eq!(h.primary.delete_account_calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Restoration
// ============================================================================

#[tokio::test]
async fn restore_without_snapshot_yields_no_session() {
    let h = harness();
    assert!(h.service.restore().await.unwrap().is_none());
}

#[tokio::test]
async fn restore_rejects_snapshot_missing_core_fields() {
    let mut incomplete = snapshot("", "pw", 10);
    incomplete.token = String::new();
    let h = harness_with(
        FakeMail::new(ProviderKind::MailTm),
        FakeMail::new(ProviderKind::OneSec),
        MemorySessionStore::with_snapshot(incomplete),
        Settings::default(),
    );

    assert!(h.service.restore().await.unwrap().is_none());
}

#[tokio::test]
async fn restore_reconciles_timer_against_creation_anchor() {
    // Persisted 100s remaining saved 200s ago, mailbox created 550s ago:
    // the countdown path is exhausted, the creation path leaves 50s.
    let now = Utc::now().timestamp_millis();
    let mut stale = snapshot("fresh", "pw", 550);
    stale.timer = Some(TimerState {
        remaining_secs: 100,
        saved_at_ms: now - 200_000,
    });
    let h = harness_with(
        {
            let fake = FakeMail::new(ProviderKind::MailTm);
            *fake.valid_token.lock().unwrap() = "fresh".to_string();
            fake
        },
        FakeMail::new(ProviderKind::OneSec),
        MemorySessionStore::with_snapshot(stale),
        Settings::default(),
    );

    let model = h.service.restore().await.unwrap().unwrap();

    assert!((49..=50).contains(&model.remaining_secs));
    assert_eq!(model.view, View::Inbox);
    assert_eq!(model.email.as_deref(), Some("alice@fake.test"));
}

#[tokio::test]
async fn restore_discards_expired_snapshot() {
    let h = harness_with(
        FakeMail::new(ProviderKind::MailTm),
        FakeMail::new(ProviderKind::OneSec),
        MemorySessionStore::with_snapshot(snapshot("fresh", "pw", 700)),
        Settings::default(),
    );
    let mut events = h.service.subscribe();

    assert!(h.service.restore().await.unwrap().is_none());
    assert!(h.store.load().await.unwrap().is_none());

    wait_for_event(&mut events, |e| matches!(e, SessionEvent::Expired)).await;
}

#[tokio::test]
async fn restore_reopens_detail_view_as_inbox() {
    let mut persisted = snapshot("fresh", "pw", 10);
    persisted.view = View::Detail;
    let h = harness_with(
        {
            let fake = FakeMail::new(ProviderKind::MailTm);
            *fake.valid_token.lock().unwrap() = "fresh".to_string();
            fake
        },
        FakeMail::new(ProviderKind::OneSec),
        MemorySessionStore::with_snapshot(persisted),
        Settings::default(),
    );

    let model = h.service.restore().await.unwrap().unwrap();

    assert_eq!(model.view, View::Inbox);
    assert!(model.selected.is_none());
}

#[tokio::test]
async fn restore_keeps_persisted_messages_and_provider() {
    let mut persisted = snapshot("fresh", "pw", 10);
    persisted.provider = ProviderKind::OneSec;
    persisted.messages = vec![FakeMail::message("m1", 100, true)];
    let h = harness_with(
        FakeMail::new(ProviderKind::MailTm),
        {
            let fake = FakeMail::new(ProviderKind::OneSec);
            *fake.valid_token.lock().unwrap() = "fresh".to_string();
            fake
        },
        MemorySessionStore::with_snapshot(persisted),
        Settings::default(),
    );

    let model = h.service.restore().await.unwrap().unwrap();

    assert_eq!(model.messages.len(), 1);
    assert!(model.messages[0].seen);
    settle().await;

    // Polling after restore goes to the provider that owns the mailbox.
    h.secondary.push_message(FakeMail::message("m2", 200, false));
    let model = h.service.refresh_inbox().await.unwrap();
    assert_eq!(model.messages.len(), 1);
    assert_eq!(model.messages[0].id, "m2");
}

// ============================================================================
// View switching
// ============================================================================

#[tokio::test]
async fn change_email_keeps_session_alive() {
    let h = harness();
    h.service.generate(Some("alice"), None, None).await.unwrap();

    let model = h.service.change_email().await.unwrap();

    assert_eq!(model.view, View::Generator);
    assert_eq!(model.email.as_deref(), Some("alice@fake.test"));
    assert!(h.store.load().await.unwrap().is_some());
}

#[tokio::test]
async fn operations_without_session_report_no_session() {
    let h = harness();

    assert!(matches!(
        h.service.extend_session().await.unwrap_err(),
        SessionError::NoSession
    ));
    assert!(matches!(
        h.service.open_message("m1").await.unwrap_err(),
        SessionError::NoSession
    ));
    assert!(matches!(
        h.service.refresh_inbox().await.unwrap_err(),
        SessionError::NoSession
    ));
}
