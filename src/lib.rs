mod command;
mod control;
mod errors;
mod logger;
mod net;
mod options;
pub mod scripts;
mod sequencer;
mod session;
mod status;
mod store;
mod telemetry;
mod video;

pub use command::{
    make_tello_command_channel, TelloCommand, TelloCommandReceiver, TelloCommandSender,
    BATTERY_QUERY, EMERGENCY, HANDSHAKE,
};
pub use control::SessionState;
pub use errors::{Result, TelloError};
pub use logger::LogSink;
pub use options::{
    ReplyCallback, SessionOptions, CONTROL_UDP_PORT, DEFAULT_DRONE_HOST, STATE_UDP_PORT,
    VIDEO_UDP_PORT,
};
pub use sequencer::{CommandSequencer, CommandStep, Dispatch, PostDelay, ScriptProgress, SequencerPhase};
pub use session::{DroneSession, LocalAddrs};
pub use status::StatusSnapshot;
pub use store::{StatusHistory, StatusReceiver, StatusStore};
pub use video::{TelloVideoFrame, TelloVideoReceiver, TelloVideoSender};
