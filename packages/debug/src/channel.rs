//! The live-reload channel.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use pilet_feed::PiletDescriptor;
use tokio::sync::{mpsc, watch};
use url::Url;

use crate::connector::ReloadConnector;
use crate::error::Result;
use crate::session::SessionContext;

/// Connection state of a [`LiveReloadChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Closed,
}

/// Receives the effects of live-reload messages.
#[async_trait]
pub trait ReloadTarget: Send + Sync {
    /// Tear down a pilet if it is loaded.
    async fn remove_pilet(&self, name: &str);

    /// Load and set up a pilet.
    async fn add_pilet(&self, descriptor: PiletDescriptor);

    /// Tear down and restart the whole session.
    async fn full_reload(&self);
}

#[async_trait]
impl<T: ReloadTarget + ?Sized> ReloadTarget for Arc<T> {
    async fn remove_pilet(&self, name: &str) {
        (**self).remove_pilet(name).await
    }

    async fn add_pilet(&self, descriptor: PiletDescriptor) {
        (**self).add_pilet(descriptor).await
    }

    async fn full_reload(&self) {
        (**self).full_reload().await
    }
}

/// What a single message caused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadEvent {
    /// The named pilet was swapped.
    Swapped(String),
    /// A full reload was requested.
    FullReload,
    /// The message was not pilet metadata.
    Ignored,
}

/// Push channel that hot-swaps pilets during a debug session.
///
/// Runs `Connecting -> Open -> Closed`. There is no reconnect: once closed,
/// the session decides whether to run the channel again.
pub struct LiveReloadChannel {
    session: Arc<SessionContext>,
    state: watch::Sender<ChannelState>,
}

impl LiveReloadChannel {
    pub fn new(session: Arc<SessionContext>) -> Self {
        let (state, _) = watch::channel(ChannelState::Closed);
        Self { session, state }
    }

    pub fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    /// Observe state transitions.
    pub fn watch(&self) -> watch::Receiver<ChannelState> {
        self.state.subscribe()
    }

    /// Connect and apply messages until the transport closes.
    ///
    /// A failed handshake leaves the channel closed and is returned to the
    /// caller.
    pub async fn run(
        &self,
        connector: &dyn ReloadConnector,
        url: &Url,
        target: &dyn ReloadTarget,
    ) -> Result<()> {
        self.set_state(ChannelState::Connecting);
        let messages = match connector.connect(url).await {
            Ok(messages) => messages,
            Err(e) => {
                self.set_state(ChannelState::Closed);
                return Err(e);
            }
        };
        tracing::debug!(url = %url, "live reload channel open");
        self.set_state(ChannelState::Open);

        self.pump(messages, target).await;

        tracing::debug!(url = %url, "live reload channel closed");
        self.set_state(ChannelState::Closed);
        Ok(())
    }

    async fn pump(&self, mut messages: mpsc::Receiver<String>, target: &dyn ReloadTarget) {
        while let Some(message) = messages.recv().await {
            self.handle(&message, target).await;
        }
    }

    /// Apply one change notification.
    ///
    /// The hard-refresh flag is read per message, so toggling it takes
    /// effect without reconnecting.
    pub async fn handle(&self, message: &str, target: &dyn ReloadTarget) -> ReloadEvent {
        if self.session.hard_refresh() {
            target.full_reload().await;
            return ReloadEvent::FullReload;
        }

        let descriptor: PiletDescriptor = match serde_json::from_str(message) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed live reload message");
                return ReloadEvent::Ignored;
            }
        };

        let name = descriptor.name.clone();
        tracing::debug!(pilet = %name, "live reload swap");
        target.remove_pilet(&name).await;
        target.add_pilet(descriptor).await;
        ReloadEvent::Swapped(name)
    }

    fn set_state(&self, state: ChannelState) {
        self.state.send_replace(state);
    }
}

impl fmt::Debug for LiveReloadChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveReloadChannel")
            .field("session", &self.session.id())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReloadError;
    use crate::session::HARD_REFRESH;
    use std::sync::Mutex;

    /// Records every call it receives.
    #[derive(Default)]
    struct SpyTarget {
        calls: Mutex<Vec<String>>,
    }

    impl SpyTarget {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReloadTarget for SpyTarget {
        async fn remove_pilet(&self, name: &str) {
            self.calls.lock().unwrap().push(format!("remove {name}"));
        }

        async fn add_pilet(&self, descriptor: PiletDescriptor) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("add {}@{}", descriptor.name, descriptor.version));
        }

        async fn full_reload(&self) {
            self.calls.lock().unwrap().push("reload".to_string());
        }
    }

    /// Hands out a prepared message stream, or fails the handshake.
    struct StubConnector {
        messages: Mutex<Option<mpsc::Receiver<String>>>,
    }

    impl StubConnector {
        fn with(messages: &[&str]) -> Self {
            let (tx, rx) = mpsc::channel(messages.len().max(1));
            for message in messages {
                tx.try_send(message.to_string()).unwrap();
            }
            Self {
                messages: Mutex::new(Some(rx)),
            }
        }

        fn failing() -> Self {
            Self {
                messages: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl ReloadConnector for StubConnector {
        async fn connect(&self, _url: &Url) -> Result<mpsc::Receiver<String>> {
            self.messages
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| ReloadError::Connect("refused".into()))
        }
    }

    fn url() -> Url {
        Url::parse("ws://localhost:1234/$pilet-api").unwrap()
    }

    const META_A: &str = r#"{"name": "a", "version": "2.0.0", "link": "http://localhost:1234/$pilet-api/a/index.js"}"#;

    #[tokio::test]
    async fn incremental_swap_removes_then_adds() {
        let channel = LiveReloadChannel::new(Arc::new(SessionContext::new()));
        let target = SpyTarget::default();

        let event = channel.handle(META_A, &target).await;

        assert_eq!(event, ReloadEvent::Swapped("a".to_string()));
        assert_eq!(target.calls(), vec!["remove a", "add a@2.0.0"]);
    }

    #[tokio::test]
    async fn hard_refresh_skips_incremental_path() {
        let session = Arc::new(SessionContext::new());
        session.set_flag(HARD_REFRESH, true);
        let channel = LiveReloadChannel::new(session);
        let target = SpyTarget::default();

        let event = channel.handle(META_A, &target).await;

        assert_eq!(event, ReloadEvent::FullReload);
        assert_eq!(target.calls(), vec!["reload"]);
    }

    #[tokio::test]
    async fn malformed_messages_are_ignored() {
        let channel = LiveReloadChannel::new(Arc::new(SessionContext::new()));
        let target = SpyTarget::default();

        assert_eq!(channel.handle("not json", &target).await, ReloadEvent::Ignored);
        assert_eq!(channel.handle(r#"{"version": "1"}"#, &target).await, ReloadEvent::Ignored);
        assert!(target.calls().is_empty());
    }

    #[tokio::test]
    async fn run_processes_messages_until_closed() {
        let channel = LiveReloadChannel::new(Arc::new(SessionContext::new()));
        let mut states = channel.watch();
        let target = SpyTarget::default();
        let connector = StubConnector::with(&[META_A, r#"{"name": "b", "version": "1"}"#]);

        channel.run(&connector, &url(), &target).await.unwrap();

        assert_eq!(
            target.calls(),
            vec!["remove a", "add a@2.0.0", "remove b", "add b@1"]
        );
        assert_eq!(channel.state(), ChannelState::Closed);
        assert!(states.has_changed().unwrap());
        assert_eq!(*states.borrow_and_update(), ChannelState::Closed);
    }

    #[tokio::test]
    async fn failed_handshake_leaves_channel_closed() {
        let channel = LiveReloadChannel::new(Arc::new(SessionContext::new()));
        let target = SpyTarget::default();

        let result = channel.run(&StubConnector::failing(), &url(), &target).await;

        assert!(matches!(result, Err(ReloadError::Connect(_))));
        assert_eq!(channel.state(), ChannelState::Closed);
        assert!(target.calls().is_empty());
    }

    #[tokio::test]
    async fn state_is_open_while_messages_flow() {
        let channel = Arc::new(LiveReloadChannel::new(Arc::new(SessionContext::new())));
        let (tx, rx) = mpsc::channel(1);
        let connector = StubConnector {
            messages: Mutex::new(Some(rx)),
        };
        let mut states = channel.watch();

        let running = {
            let channel = channel.clone();
            tokio::spawn(async move {
                channel
                    .run(&connector, &url(), &SpyTarget::default())
                    .await
            })
        };

        states.wait_for(|s| *s == ChannelState::Open).await.unwrap();
        drop(tx);
        running.await.unwrap().unwrap();
        assert_eq!(channel.state(), ChannelState::Closed);
    }
}
