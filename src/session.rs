use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::{spawn, task};
use tracing::debug;

use crate::command::{TelloCommand, TelloCommandReceiver, BATTERY_QUERY, EMERGENCY, HANDSHAKE};
use crate::control::{CommandChannel, ReplyListener, SessionState};
use crate::errors::{Result, TelloError};
use crate::logger::EventLog;
use crate::options::SessionOptions;
use crate::scripts;
use crate::sequencer::{CommandStep, ScriptProgress, SequencerHandle, SequencerTask};
use crate::status::StatusSnapshot;
use crate::store::{StatusHistory, StatusReceiver, StatusStore};
use crate::telemetry::TelemetryListener;
use crate::video::VideoListener;

/// Where the session's sockets ended up, useful when bound to port 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalAddrs {
    pub command: SocketAddr,
    pub state: SocketAddr,
    pub video: SocketAddr,
}

#[derive(Debug)]
struct Listeners {
    replies: ReplyListener,
    state: TelemetryListener,
    video: VideoListener,
    sequencer: SequencerTask,
    commands: Option<task::JoinHandle<()>>,
}

/// A session with one drone: the command, state and video sockets plus the
/// script sequencer.
///
/// Commands are fire-and-forget. They resolve once sent and never wait for
/// the drone's reply, so callers on several tasks (eg a prompt and a game
/// controller) may interleave freely.
#[derive(Debug)]
pub struct DroneSession {
    channel: CommandChannel,
    store: Arc<StatusStore>,
    log: EventLog,
    sequencer: SequencerHandle,
    progress: watch::Receiver<ScriptProgress>,
    local_addrs: LocalAddrs,
    listeners: Listeners,
    closed: AtomicBool,
}

impl DroneSession {
    /// Binds all three sockets and starts listening. Nothing is sent to the
    /// drone until `initialize` or `command` is called.
    pub async fn bind(options: SessionOptions) -> Result<Self> {
        let SessionOptions {
            drone_address,
            command_bind,
            state_bind,
            video_bind,
            video_sender,
            command_receiver,
            on_reply,
        } = options;

        debug!("[Tello] BIND {command_bind} → {drone_address}");

        let log = EventLog::default();
        let store = Arc::new(StatusStore::new());

        let (channel, sock) = CommandChannel::bind(command_bind, drone_address, log.clone()).await?;
        let command_address = sock.local_addr()?;

        let state = TelemetryListener::start_listening(state_bind, store.clone(), log.clone()).await?;
        let video = match VideoListener::start_listening(video_bind, video_sender).await {
            Ok(video) => video,
            Err(err) => {
                state.stop_listening();
                return Err(err);
            }
        };

        let (progress_tx, progress) = watch::channel(ScriptProgress::default());
        let (sequencer_task, sequencer) =
            SequencerTask::start(channel.clone(), log.clone(), progress_tx);

        let replies = ReplyListener::start_listening(sock, channel.clone(), on_reply, sequencer.clone());

        let commands = command_receiver
            .map(|rx| spawn(forward_commands(rx, channel.clone(), log.clone())));

        let local_addrs = LocalAddrs {
            command: command_address,
            state: state.local_address(),
            video: video.local_address(),
        };

        Ok(Self {
            channel,
            store,
            log,
            sequencer,
            progress,
            local_addrs,
            listeners: Listeners { replies, state, video, sequencer: sequencer_task, commands },
            closed: AtomicBool::new(false),
        })
    }

    /// Puts the drone in SDK mode and asks for the battery level.
    pub async fn initialize(&self) -> Result<()> {
        self.check_open()?;
        self.log.log("[Tello] putting drone in command mode...");
        self.command(HANDSHAKE).await?;
        self.command(BATTERY_QUERY).await?;
        Ok(())
    }

    /// Sends raw command text, whatever the session state.
    pub async fn command(&self, text: &str) -> Result<()> {
        self.check_open()?;
        self.channel.send(text).await
    }

    pub async fn send_command(&self, command: &TelloCommand) -> Result<()> {
        self.command(&command.to_string()).await
    }

    /// Stops the motors immediately. Any running script is left as it is.
    ///
    /// *warning* the drone will drop like a brick
    pub async fn emergency_stop(&self) -> Result<()> {
        self.command(EMERGENCY).await
    }

    /// Starts one of the built-in scripts, replacing any script already
    /// running.
    pub fn run_script(&self, name: &str) -> Result<()> {
        self.check_open()?;
        let steps =
            scripts::predefined(name).ok_or_else(|| TelloError::UnknownScript { name: name.to_string() })?;
        self.run_steps(steps)
    }

    /// Starts a custom script, replacing any script already running.
    pub fn run_steps(&self, steps: Vec<CommandStep>) -> Result<()> {
        self.check_open()?;
        self.sequencer.enqueue(steps);
        Ok(())
    }

    /// The latest status received from the drone, if any.
    pub fn get_status(&self) -> Option<StatusSnapshot> {
        self.store.current()
    }

    pub fn status_history(&self) -> StatusHistory {
        self.store.history()
    }

    pub fn subscribe_status(&self) -> StatusReceiver {
        self.store.subscribe()
    }

    pub fn script_progress(&self) -> ScriptProgress {
        *self.progress.borrow()
    }

    pub fn state(&self) -> SessionState {
        self.channel.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// The last command sent that has not had a reply yet.
    pub fn executing_command(&self) -> Option<String> {
        self.channel.executing()
    }

    pub fn local_addrs(&self) -> LocalAddrs {
        self.local_addrs
    }

    /// Sends session events (sent commands, replies, discarded state
    /// messages...) to `sink` instead of `tracing`.
    pub fn set_logger(&self, sink: impl Fn(&str) + Send + Sync + 'static) {
        self.log.set_sink(Arc::new(sink));
    }

    /// Releases the sockets and stops listening. Safe to call more than
    /// once. Every later command fails with `TelloError::SessionClosed`.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.channel.close();
        self.listeners.replies.stop_listening();
        self.listeners.state.stop_listening();
        self.listeners.video.stop_listening();
        self.listeners.sequencer.stop();
        if let Some(commands) = &self.listeners.commands {
            commands.abort();
        }

        self.log.log("[Tello] CLOSED");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(TelloError::SessionClosed)
        } else {
            Ok(())
        }
    }
}

impl Drop for DroneSession {
    fn drop(&mut self) {
        self.close();
    }
}

async fn forward_commands(mut rx: TelloCommandReceiver, channel: CommandChannel, log: EventLog) {
    while let Some(command) = rx.recv().await {
        if let Err(err) = channel.send(&command.to_string()).await {
            log.log(format!("[Tello] {command:?} failed ({err})"));
        }
    }
}
