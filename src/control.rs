use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::net::UdpSocket;
use tokio::{spawn, task};
use tracing::debug;

use crate::command::{check_command_text, HANDSHAKE};
use crate::errors::{Result, TelloError};
use crate::logger::EventLog;
use crate::net::{recv_failed, MAX_DATAGRAM_SIZE};
use crate::options::ReplyCallback;
use crate::sequencer::SequencerHandle;

/// Whether the drone has answered the SDK mode handshake yet.
///
/// There is no way back to `NotConnected`; a drone that stops answering is
/// not detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    NotConnected,
    Connected,
}

#[derive(Debug, Default)]
struct CommandBook {
    executing: Option<String>,
    state: SessionState,
}

#[derive(Debug)]
struct Inner {
    sock: Mutex<Option<Arc<UdpSocket>>>,
    drone_address: SocketAddr,
    book: Mutex<CommandBook>,
    log: EventLog,
}

/// The command socket, shared by everything that sends to the drone.
///
/// Sends never wait for a reply. The executing command is bookkeeping only,
/// a second send before the first reply simply replaces it.
#[derive(Debug, Clone)]
pub(crate) struct CommandChannel {
    inner: Arc<Inner>,
}

impl CommandChannel {
    pub(crate) async fn bind(
        local_address: SocketAddr,
        drone_address: SocketAddr,
        log: EventLog,
    ) -> Result<(Self, Arc<UdpSocket>)> {
        debug!("[Tello] binding local {local_address} → {drone_address}...");
        let sock = Arc::new(UdpSocket::bind(local_address).await?);

        let channel = Self {
            inner: Arc::new(Inner {
                sock: Mutex::new(Some(sock.clone())),
                drone_address,
                book: Mutex::default(),
                log,
            }),
        };

        Ok((channel, sock))
    }

    /// Sends one command. Resolves once the datagram has been handed to the
    /// socket, not when the drone has acted on it.
    pub(crate) async fn send(&self, text: &str) -> Result<()> {
        check_command_text(text)?;

        let sock = lock(&self.inner.sock).clone().ok_or(TelloError::SessionClosed)?;

        lock(&self.inner.book).executing = Some(text.to_string());
        self.inner.log.log(format!("[Tello] SEND {text}"));

        sock.send_to(text.as_bytes(), self.inner.drone_address).await?;
        Ok(())
    }

    pub(crate) fn state(&self) -> SessionState {
        lock(&self.inner.book).state
    }

    pub(crate) fn executing(&self) -> Option<String> {
        lock(&self.inner.book).executing.clone()
    }

    /// Releases the socket. Sends already under way keep their own handle
    /// and may still complete.
    pub(crate) fn close(&self) {
        lock(&self.inner.sock).take();
    }

    /// Bookkeeping for any datagram arriving on the command socket.
    fn reply_received(&self, reply: &str) {
        let connected = {
            let mut book = lock(&self.inner.book);
            let previous = book.executing.take();
            let handshake = previous.as_deref() == Some(HANDSHAKE);
            if handshake && book.state == SessionState::NotConnected {
                book.state = SessionState::Connected;
                true
            } else {
                false
            }
        };

        self.inner.log.log(format!("[Tello] RECEIVED {reply}"));
        if connected {
            self.inner.log.log("[Tello] CONNECTED");
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Listens for replies on the command socket.
#[derive(Debug)]
pub(crate) struct ReplyListener {
    task: task::JoinHandle<()>,
}

impl ReplyListener {
    pub(crate) fn start_listening(
        sock: Arc<UdpSocket>,
        channel: CommandChannel,
        on_reply: Option<ReplyCallback>,
        sequencer: SequencerHandle,
    ) -> Self {
        debug!("[Tello] START LISTENING for replies");

        let task = spawn(async move {
            let mut buf = vec![0; MAX_DATAGRAM_SIZE];
            loop {
                let n = match sock.recv_from(&mut buf).await {
                    Ok((n, _from)) => n,
                    Err(err) => {
                        recv_failed("Tello", &err).await;
                        continue;
                    }
                };

                let reply = String::from_utf8_lossy(&buf[..n]);
                let reply = reply.trim();

                channel.reply_received(reply);
                if let Some(on_reply) = &on_reply {
                    on_reply(reply);
                }
                sequencer.advance();
            }
        });

        Self { task }
    }

    pub(crate) fn stop_listening(&self) {
        debug!("[Tello] STOP LISTENING for replies");
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn channel() -> (CommandChannel, UdpSocket) {
        let drone = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let (channel, _sock) = CommandChannel::bind(
            "127.0.0.1:0".parse().unwrap(),
            drone.local_addr().unwrap(),
            EventLog::default(),
        )
        .await
        .unwrap();
        (channel, drone)
    }

    #[tokio::test]
    async fn test_send_tracks_executing_command() {
        let (channel, drone) = channel().await;

        channel.send("takeoff").await.unwrap();
        assert_eq!(channel.executing().as_deref(), Some("takeoff"));

        let mut buf = [0; 64];
        let n = drone.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"takeoff");

        channel.reply_received("ok");
        assert_eq!(channel.executing(), None);
        assert_eq!(channel.state(), SessionState::NotConnected);
    }

    #[tokio::test]
    async fn test_reply_to_handshake_connects() {
        let (channel, _drone) = channel().await;

        channel.send(HANDSHAKE).await.unwrap();
        channel.reply_received("ok");
        assert_eq!(channel.state(), SessionState::Connected);

        // stays connected whatever comes next
        channel.send("land").await.unwrap();
        channel.reply_received("error");
        assert_eq!(channel.state(), SessionState::Connected);
    }

    #[tokio::test]
    async fn test_reply_after_later_command_does_not_connect() {
        let (channel, _drone) = channel().await;

        channel.send(HANDSHAKE).await.unwrap();
        channel.send("battery?").await.unwrap();
        channel.reply_received("ok");
        assert_eq!(channel.state(), SessionState::NotConnected);
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (channel, _drone) = channel().await;

        channel.close();
        channel.close();
        assert!(matches!(channel.send("land").await, Err(TelloError::SessionClosed)));
    }

    #[tokio::test]
    async fn test_invalid_text_not_sent() {
        let (channel, _drone) = channel().await;

        assert!(matches!(channel.send("").await, Err(TelloError::InvalidCommand { .. })));
        assert_eq!(channel.executing(), None);
    }
}
