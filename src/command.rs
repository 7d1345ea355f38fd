use std::fmt;

use tokio::sync::mpsc;

use crate::errors::{Result, TelloError};

/// Puts the drone into SDK mode. The first reply to it marks the session
/// connected.
pub const HANDSHAKE: &str = "command";
pub const EMERGENCY: &str = "emergency";
pub const BATTERY_QUERY: &str = "battery?";

/// Typed commands, rendered to the drone's wire text by `Display`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelloCommand {
    EnterSdkMode,
    QueryBattery,
    TakeOff,
    Land,
    StopAndHover,
    EmergencyStop,
    MoveUp(u16),
    MoveDown(u16),
    MoveLeft(u16),
    MoveRight(u16),
    MoveForward(u16),
    MoveBack(u16),
    TurnClockwise(u16),
    TurnCounterClockwise(u16),
    FlipLeft,
    FlipRight,
    FlipForward,
    FlipBack,
    SetSpeed(u8),
    StartVideo,
    StopVideo,
    RemoteControl { left_right: i8, forwards_backwards: i8, up_down: i8, yaw: i8 },
}

impl fmt::Display for TelloCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TelloCommand::*;
        match self {
            EnterSdkMode => f.write_str(HANDSHAKE),
            QueryBattery => f.write_str(BATTERY_QUERY),
            TakeOff => f.write_str("takeoff"),
            Land => f.write_str("land"),
            StopAndHover => f.write_str("stop"),
            EmergencyStop => f.write_str(EMERGENCY),
            MoveUp(cm) => write!(f, "up {cm}"),
            MoveDown(cm) => write!(f, "down {cm}"),
            MoveLeft(cm) => write!(f, "left {cm}"),
            MoveRight(cm) => write!(f, "right {cm}"),
            MoveForward(cm) => write!(f, "forward {cm}"),
            MoveBack(cm) => write!(f, "back {cm}"),
            TurnClockwise(deg) => write!(f, "cw {deg}"),
            TurnCounterClockwise(deg) => write!(f, "ccw {deg}"),
            FlipLeft => f.write_str("flip l"),
            FlipRight => f.write_str("flip r"),
            FlipForward => f.write_str("flip f"),
            FlipBack => f.write_str("flip b"),
            SetSpeed(speed) => write!(f, "speed {speed}"),
            StartVideo => f.write_str("streamon"),
            StopVideo => f.write_str("streamoff"),
            RemoteControl { left_right, forwards_backwards, up_down, yaw } => {
                write!(f, "rc {left_right} {forwards_backwards} {up_down} {yaw}")
            }
        }
    }
}

pub type TelloCommandSender = mpsc::UnboundedSender<TelloCommand>;
pub type TelloCommandReceiver = mpsc::UnboundedReceiver<TelloCommand>;

pub fn make_tello_command_channel() -> (TelloCommandSender, TelloCommandReceiver) {
    mpsc::unbounded_channel()
}

/// Command text must be non-empty ASCII without NUL bytes.
pub(crate) fn check_command_text(text: &str) -> Result<()> {
    let reason = if text.is_empty() {
        "empty"
    } else if !text.is_ascii() {
        "not ASCII"
    } else if text.contains('\0') {
        "contains NUL"
    } else {
        return Ok(());
    };

    Err(TelloError::InvalidCommand { text: text.to_string(), reason })
}
