//! Property tests for the bootstrap state machine, driven through the
//! public API only.

use proptest::prelude::*;
use scribe_session::{
    Backend, BootstrapState, Credential, Editor, EditorError, InitialState, QueryParams,
    RoomSelector, ScopeError, ScopeStatus, SessionBootstrap, SessionScope, Surface,
    UserIdentity, ValidCredential,
};
use std::cell::Cell;
use std::rc::Rc;
use tokio::sync::watch;

struct StubScope {
    status: watch::Sender<ScopeStatus>,
}

impl SessionScope for StubScope {
    fn room_id(&self) -> &str {
        "stub"
    }

    fn status(&self) -> ScopeStatus {
        self.status.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<ScopeStatus> {
        self.status.subscribe()
    }
}

#[derive(Default, Clone)]
struct CountingBackend {
    entered: Rc<Cell<usize>>,
}

impl Backend for CountingBackend {
    type Scope = StubScope;

    fn enter(
        &self,
        _credential: &ValidCredential,
        _room: &RoomSelector,
        _initial: InitialState,
    ) -> Result<StubScope, ScopeError> {
        self.entered.set(self.entered.get() + 1);
        let (status, _) = watch::channel(ScopeStatus::Connected);
        Ok(StubScope { status })
    }
}

struct NameEditor;

impl Editor<StubScope> for NameEditor {
    fn render(&mut self, user: &UserIdentity, _scope: &StubScope) -> Result<String, EditorError> {
        Ok(user.id().to_owned())
    }
}

fn mounted(key: &str, query: &str) -> (SessionBootstrap<CountingBackend, NameEditor>, Rc<Cell<usize>>) {
    let backend = CountingBackend::default();
    let entered = backend.entered.clone();
    let mut bootstrap =
        SessionBootstrap::new(Credential::new(key), QueryParams::parse(query), backend, NameEditor);
    bootstrap.mount();
    (bootstrap, entered)
}

fn query_value() -> impl Strategy<Value = String> {
    "[A-Za-z0-9._~-]{1,20}"
}

proptest! {
    #[test]
    fn prop_blank_keys_never_open_a_scope(key in "[ \t]{0,5}", room in query_value()) {
        let (mut bootstrap, entered) = mounted(&key, &format!("?roomId={room}"));
        prop_assert_eq!(bootstrap.render(), Surface::ConfigError);
        let is_config_error = matches!(bootstrap.state(), BootstrapState::ConfigError { .. });
        prop_assert!(is_config_error);
        prop_assert_eq!(entered.get(), 0);
    }

    #[test]
    fn prop_unprefixed_keys_echo_ten_chars(key in "[a-oq-z][a-z0-9_]{0,25}") {
        let (mut bootstrap, entered) = mounted(&key, "");
        let expected: String = key.chars().take(10).collect();
        prop_assert_eq!(
            bootstrap.render(),
            Surface::CredentialError { observed_prefix: expected }
        );
        prop_assert_eq!(entered.get(), 0);
    }

    #[test]
    fn prop_room_override_is_used_verbatim(room in query_value()) {
        let query = format!("?roomId={room}");
        let (first, _) = mounted("pk_test", &query);
        let (second, _) = mounted("pk_test", &query);
        match (first.state(), second.state()) {
            (BootstrapState::Ready { room_id: a, .. }, BootstrapState::Ready { room_id: b, .. }) => {
                prop_assert_eq!(&a, &room);
                prop_assert_eq!(&a, &b);
            }
            other => prop_assert!(false, "expected Ready, got {:?}", other),
        }
    }

    #[test]
    fn prop_user_override_sets_id_and_name(name in query_value()) {
        let (mut bootstrap, entered) = mounted("pk_test", &format!("?userName={name}"));
        prop_assert_eq!(bootstrap.render(), Surface::Ready(name.clone()));
        prop_assert_eq!(entered.get(), 1);
        let context = bootstrap.context().unwrap();
        prop_assert_eq!(context.identity.id(), name.as_str());
        prop_assert_eq!(context.identity.display_name(), name.as_str());
    }

    #[test]
    fn prop_no_overrides_use_defaults(suffix in "[A-Za-z0-9]{0,20}") {
        let (bootstrap, _) = mounted(&format!("pk_{suffix}"), "");
        let context = bootstrap.context().unwrap();
        prop_assert_eq!(context.room.room_id(), "my-room");
        prop_assert_eq!(context.identity.display_name(), "Anonymous User");
        prop_assert!(context.identity.id().starts_with("anonymous-"));
    }
}

#[test]
fn test_empty_key_never_reaches_ready() {
    let backend = CountingBackend::default();
    let mut bootstrap =
        SessionBootstrap::new(Credential::new(""), QueryParams::default(), backend, NameEditor);
    assert_eq!(bootstrap.render(), Surface::ConfigError);
    bootstrap.mount();
    assert_eq!(bootstrap.render(), Surface::ConfigError);
    assert!(!matches!(bootstrap.state(), BootstrapState::Ready { .. }));
}

#[test]
fn test_named_user_in_named_room() {
    let backend = CountingBackend::default();
    let mut bootstrap = SessionBootstrap::new(
        Credential::new("pk_test_abc"),
        QueryParams::parse("?roomId=team-42&userName=alice"),
        backend,
        NameEditor,
    );

    assert_eq!(bootstrap.state(), BootstrapState::Loading);
    bootstrap.mount();

    let BootstrapState::Ready { identity, room_id } = bootstrap.state() else {
        panic!("Expected Ready");
    };
    assert_eq!(room_id, "team-42");
    assert_eq!(identity.id(), "alice");
    assert_eq!(identity.display_name(), "alice");
    assert_eq!(identity.color(), "#5371F7");
    assert_eq!(bootstrap.render(), Surface::Ready("alice".into()));
}

#[test]
fn test_anonymous_sessions_are_distinct_instances() {
    let (a, _) = mounted("pk_x", "");
    let (b, _) = mounted("pk_x", "");
    for bootstrap in [&a, &b] {
        let id = bootstrap.context().unwrap().identity.id();
        let suffix = id.strip_prefix("anonymous-").unwrap();
        assert!(!suffix.is_empty());
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
