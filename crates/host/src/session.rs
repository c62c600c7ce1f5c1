use tokio::sync::watch;
use tracing::debug;

use arxlink_common::types::SessionState;

pub const DEFAULT_ICE_SERVER: &str = "stun:stun.l.google.com:19302";

/// Holds the signaling session state. The wire protocol lives elsewhere;
/// whatever drives it reports through [`SignalingClient::set_state`].
pub struct SignalingClient {
    url: String,
    state: watch::Sender<SessionState>,
}

impl SignalingClient {
    pub fn new(url: impl Into<String>) -> Self {
        let (state, _) = watch::channel(SessionState::Offline);
        Self { url: url.into(), state }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn session_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn set_state(&self, next: SessionState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            debug!(target: "arxlink", from = ?*current, to = ?next, "session state");
            *current = next;
            true
        });
    }
}

#[derive(Debug, Clone)]
pub struct PeerConnectionFactory {
    ice_servers: Vec<String>,
}

impl Default for PeerConnectionFactory {
    fn default() -> Self {
        Self {
            ice_servers: vec![DEFAULT_ICE_SERVER.to_string()],
        }
    }
}

impl PeerConnectionFactory {
    pub fn ice_servers(&self) -> &[String] {
        &self.ice_servers
    }
}

/// Built once at startup and shared with the presentation layer.
pub struct SessionManager {
    signaling: SignalingClient,
    peer_factory: PeerConnectionFactory,
}

impl SessionManager {
    pub fn new(signaling: SignalingClient, peer_factory: PeerConnectionFactory) -> Self {
        Self {
            signaling,
            peer_factory,
        }
    }

    pub fn signaling_client(&self) -> &SignalingClient {
        &self.signaling
    }

    pub fn peer_connection_factory(&self) -> &PeerConnectionFactory {
        &self.peer_factory
    }

    pub fn session_state(&self) -> watch::Receiver<SessionState> {
        self.signaling.session_state()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Stage,
    VideoCall,
}

/// Which screen to show and whether the user may move to the call.
#[derive(Debug, Default)]
pub struct Presentation {
    on_call_screen: bool,
}

impl Presentation {
    pub fn screen(&self) -> Screen {
        if self.on_call_screen {
            Screen::VideoCall
        } else {
            Screen::Stage
        }
    }

    /// Joining is offered only once signaling reports the session ready.
    pub fn join(&mut self, state: SessionState) -> bool {
        if state == SessionState::Ready {
            self.on_call_screen = true;
        }
        self.on_call_screen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_state_is_observable() {
        let manager = SessionManager::new(SignalingClient::new("ws://localhost/rtc"), PeerConnectionFactory::default());
        let mut rx = manager.session_state();
        assert_eq!(*rx.borrow(), SessionState::Offline);
        manager.signaling_client().set_state(SessionState::Ready);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), SessionState::Ready);
        manager.signaling_client().set_state(SessionState::Ready);
        assert!(!rx.has_changed().unwrap());
        assert_eq!(manager.peer_connection_factory().ice_servers(), [DEFAULT_ICE_SERVER.to_string()]);
    }

    #[test]
    fn stage_until_ready() {
        let mut ui = Presentation::default();
        assert_eq!(ui.screen(), Screen::Stage);
        assert!(!ui.join(SessionState::Offline));
        assert!(!ui.join(SessionState::Impossible));
        assert_eq!(ui.screen(), Screen::Stage);
        assert!(ui.join(SessionState::Ready));
        assert_eq!(ui.screen(), Screen::VideoCall);
    }
}
