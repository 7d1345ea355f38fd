use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use crate::command::*;
use crate::video::*;

pub const DEFAULT_DRONE_HOST: Ipv4Addr = Ipv4Addr::new(192, 168, 10, 1);

pub const CONTROL_UDP_PORT: u16 = 8889;
pub const STATE_UDP_PORT: u16 = 8890;
pub const VIDEO_UDP_PORT: u16 = 11111;

/// Called with the text of every reply from the drone.
pub type ReplyCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Drone connection and other usage options.
pub struct SessionOptions {
    /// Where commands are sent
    pub drone_address: SocketAddr,
    /// Local addresses for the command, state and video sockets
    pub command_bind: SocketAddr,
    pub state_bind: SocketAddr,
    pub video_bind: SocketAddr,
    pub(crate) video_sender: Option<TelloVideoSender>,
    pub(crate) command_receiver: Option<TelloCommandReceiver>,
    pub(crate) on_reply: Option<ReplyCallback>,
}

impl Default for SessionOptions {
    /// The drone's own access point, listening on the standard ports.
    ///
    /// *nb* As state and video are sent to the UDP broadcast address this
    /// only works in AP mode, ie using the drone's own WiFi network
    fn default() -> Self {
        let any = Ipv4Addr::UNSPECIFIED;
        Self {
            drone_address: (DEFAULT_DRONE_HOST, CONTROL_UDP_PORT).into(),
            command_bind: (any, CONTROL_UDP_PORT).into(),
            state_bind: (any, STATE_UDP_PORT).into(),
            video_bind: (any, VIDEO_UDP_PORT).into(),
            video_sender: None,
            command_receiver: None,
            on_reply: None,
        }
    }
}

impl SessionOptions {
    /// Everything bound to ephemeral loopback ports, for talking to a
    /// simulator on this machine.
    pub fn local(drone_address: SocketAddr) -> Self {
        let loopback: SocketAddr = (Ipv4Addr::LOCALHOST, 0).into();
        Self {
            drone_address,
            command_bind: loopback,
            state_bind: loopback,
            video_bind: loopback,
            ..Default::default()
        }
    }

    /// Request video from the drone as a stream of h264-encoded 720p YUV
    /// frames. Without this the video port is drained and frames dropped.
    ///
    /// Returns the receiver end of the channel used to pass on frames
    ///
    pub fn with_video(&mut self) -> TelloVideoReceiver {
        let (tx, rx) = make_tello_video_channel();
        self.video_sender = Some(tx);
        rx
    }

    /// Returns the sender end of a channel for issuing commands to the
    /// drone, eg from a game controller thread.
    ///
    pub fn with_command(&mut self) -> TelloCommandSender {
        let (tx, rx) = make_tello_command_channel();
        self.command_receiver = Some(rx);
        tx
    }

    /// Registers a callback run for every reply, eg to show a prompt again
    /// once the drone has answered.
    pub fn on_reply(&mut self, callback: impl Fn(&str) + Send + Sync + 'static) {
        self.on_reply = Some(Arc::new(callback));
    }
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("drone_address", &self.drone_address)
            .field("command_bind", &self.command_bind)
            .field("state_bind", &self.state_bind)
            .field("video_bind", &self.video_bind)
            .field("video", &self.video_sender.is_some())
            .field("command", &self.command_receiver.is_some())
            .field("on_reply", &self.on_reply.is_some())
            .finish()
    }
}
