//! webrtc-rs adapter implementing `PeerConnectionPort`.
//!
//! State getters are served from values recorded by the connection's own
//! callbacks. Each callback records the new state before notifying
//! listeners, so a listener that re-reads a getter sees the new value.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_gatherer_state::RTCIceGathererState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;

use crate::application::ports::{
    DataChannelHandle, ListenerId, PeerConnectionPort, StateListener, StateListeners,
    TransportError, TransportStateChange,
};
use crate::domain::negotiation::{
    GatheringState, IceConnectionState, SdpType, SessionDescription, SignalingState,
};

#[derive(Debug, Clone, Copy, Default)]
struct States {
    gathering: GatheringState,
    connection: IceConnectionState,
    signaling: SignalingState,
}

#[derive(Debug, Default)]
struct Shared {
    states: Mutex<States>,
    listeners: StateListeners,
}

impl Shared {
    fn record(&self, change: TransportStateChange) {
        {
            let mut states = self.states.lock();
            match change {
                TransportStateChange::Gathering(s) => states.gathering = s,
                TransportStateChange::Connection(s) => states.connection = s,
                TransportStateChange::Signaling(s) => states.signaling = s,
            }
        }
        self.listeners.emit(change);
    }
}

/// Peer connection backed by webrtc-rs.
pub struct WebRtcPeerConnection {
    pc: Arc<RTCPeerConnection>,
    shared: Arc<Shared>,
    channels: Mutex<Vec<Arc<RTCDataChannel>>>,
}

impl WebRtcPeerConnection {
    /// Create a peer connection using `ice_servers` (STUN/TURN URLs).
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Api`] if the media engine, interceptors or
    /// connection cannot be set up.
    pub async fn new(ice_servers: &[String]) -> Result<Self, TransportError> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs().map_err(api)?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine).map_err(api)?;

        let webrtc_api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let config = RTCConfiguration {
            ice_servers: if ice_servers.is_empty() {
                Vec::new()
            } else {
                vec![RTCIceServer {
                    urls: ice_servers.to_vec(),
                    ..Default::default()
                }]
            },
            ..Default::default()
        };

        let pc = Arc::new(webrtc_api.new_peer_connection(config).await.map_err(api)?);
        let shared = Arc::new(Shared::default());
        register_state_callbacks(&pc, &shared);

        tracing::debug!(ice_servers = ice_servers.len(), "peer connection created");
        Ok(Self {
            pc,
            shared,
            channels: Mutex::new(Vec::new()),
        })
    }
}

impl std::fmt::Debug for WebRtcPeerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebRtcPeerConnection")
            .field("states", &*self.shared.states.lock())
            .finish_non_exhaustive()
    }
}

fn register_state_callbacks(pc: &RTCPeerConnection, shared: &Arc<Shared>) {
    let gathering = Arc::clone(shared);
    pc.on_ice_gathering_state_change(Box::new(move |state: RTCIceGathererState| {
        if let Some(state) = gathering_state(state) {
            gathering.record(TransportStateChange::Gathering(state));
        }
        Box::pin(async {})
    }));

    let connection = Arc::clone(shared);
    pc.on_ice_connection_state_change(Box::new(move |state: RTCIceConnectionState| {
        if let Some(state) = connection_state(state) {
            connection.record(TransportStateChange::Connection(state));
        }
        Box::pin(async {})
    }));

    let signaling = Arc::clone(shared);
    pc.on_signaling_state_change(Box::new(move |state: RTCSignalingState| {
        if let Some(state) = signaling_state(state) {
            signaling.record(TransportStateChange::Signaling(state));
        }
        Box::pin(async {})
    }));
}

#[async_trait]
impl PeerConnectionPort for WebRtcPeerConnection {
    fn gathering_state(&self) -> GatheringState {
        self.shared.states.lock().gathering
    }

    fn connection_state(&self) -> IceConnectionState {
        self.shared.states.lock().connection
    }

    fn signaling_state(&self) -> SignalingState {
        self.shared.states.lock().signaling
    }

    fn add_state_listener(&self, listener: StateListener) -> ListenerId {
        self.shared.listeners.add(listener)
    }

    fn remove_state_listener(&self, id: ListenerId) {
        self.shared.listeners.remove(id);
    }

    async fn create_data_channel(&self, label: &str) -> Result<DataChannelHandle, TransportError> {
        let init = RTCDataChannelInit {
            ordered: Some(true),
            ..Default::default()
        };
        let channel = self
            .pc
            .create_data_channel(label, Some(init))
            .await
            .map_err(|e| TransportError::DataChannel {
                message: e.to_string(),
            })?;

        let (handle, sink) = DataChannelHandle::new(label);

        let on_open = sink.clone();
        channel.on_open(Box::new(move || {
            on_open.opened();
            Box::pin(async {})
        }));

        let on_message = sink.clone();
        channel.on_message(Box::new(move |msg: DataChannelMessage| {
            let data = msg.data.to_vec();
            if msg.is_string {
                match String::from_utf8(data) {
                    Ok(text) => on_message.message(text),
                    Err(e) => on_message.binary(e.into_bytes()),
                }
            } else {
                on_message.binary(data);
            }
            Box::pin(async {})
        }));

        channel.on_close(Box::new(move || {
            sink.closed();
            Box::pin(async {})
        }));

        self.channels.lock().push(channel);
        Ok(handle)
    }

    async fn create_offer(&self) -> Result<SessionDescription, TransportError> {
        let offer = self.pc.create_offer(None).await.map_err(api)?;
        from_rtc(&offer)
    }

    async fn set_local_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), TransportError> {
        let desc = to_rtc(desc)?;
        self.pc
            .set_local_description(desc)
            .await
            .map_err(rejected)
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        let desc = self.pc.local_description().await?;
        from_rtc(&desc).ok()
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), TransportError> {
        let desc = to_rtc(desc)?;
        self.pc
            .set_remote_description(desc)
            .await
            .map_err(rejected)
    }

    async fn remote_description(&self) -> Option<SessionDescription> {
        let desc = self.pc.remote_description().await?;
        from_rtc(&desc).ok()
    }

    async fn close(&self) -> Result<(), TransportError> {
        let result = self.pc.close().await.map_err(api);
        self.channels.lock().clear();
        result
    }
}

// =============================================================================
// Conversions
// =============================================================================

fn api(err: webrtc::Error) -> TransportError {
    TransportError::Api {
        message: err.to_string(),
    }
}

fn rejected(err: webrtc::Error) -> TransportError {
    TransportError::DescriptionRejected {
        message: err.to_string(),
    }
}

fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription, TransportError> {
    let result = match desc.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp),
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp),
        SdpType::Pranswer => RTCSessionDescription::pranswer(desc.sdp),
        SdpType::Rollback => {
            return Err(TransportError::InvalidDescription {
                message: "rollback is not supported".to_string(),
            });
        }
    };
    result.map_err(|e| TransportError::InvalidDescription {
        message: e.to_string(),
    })
}

fn from_rtc(desc: &RTCSessionDescription) -> Result<SessionDescription, TransportError> {
    let sdp_type = match desc.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Pranswer => SdpType::Pranswer,
        RTCSdpType::Rollback => SdpType::Rollback,
        _ => {
            return Err(TransportError::InvalidDescription {
                message: "unspecified description type".to_string(),
            });
        }
    };
    Ok(SessionDescription {
        sdp: desc.sdp.clone(),
        sdp_type,
    })
}

const fn gathering_state(state: RTCIceGathererState) -> Option<GatheringState> {
    match state {
        RTCIceGathererState::New => Some(GatheringState::New),
        RTCIceGathererState::Gathering => Some(GatheringState::Gathering),
        RTCIceGathererState::Complete => Some(GatheringState::Complete),
        _ => None,
    }
}

const fn connection_state(state: RTCIceConnectionState) -> Option<IceConnectionState> {
    match state {
        RTCIceConnectionState::New => Some(IceConnectionState::New),
        RTCIceConnectionState::Checking => Some(IceConnectionState::Checking),
        RTCIceConnectionState::Connected => Some(IceConnectionState::Connected),
        RTCIceConnectionState::Completed => Some(IceConnectionState::Completed),
        RTCIceConnectionState::Disconnected => Some(IceConnectionState::Disconnected),
        RTCIceConnectionState::Failed => Some(IceConnectionState::Failed),
        RTCIceConnectionState::Closed => Some(IceConnectionState::Closed),
        _ => None,
    }
}

const fn signaling_state(state: RTCSignalingState) -> Option<SignalingState> {
    match state {
        RTCSignalingState::Stable => Some(SignalingState::Stable),
        RTCSignalingState::HaveLocalOffer => Some(SignalingState::HaveLocalOffer),
        RTCSignalingState::HaveRemoteOffer => Some(SignalingState::HaveRemoteOffer),
        RTCSignalingState::HaveLocalPranswer => Some(SignalingState::HaveLocalPranswer),
        RTCSignalingState::HaveRemotePranswer => Some(SignalingState::HaveRemotePranswer),
        RTCSignalingState::Closed => Some(SignalingState::Closed),
        _ => None,
    }
}
