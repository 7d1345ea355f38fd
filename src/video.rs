use std::net::SocketAddr;

use bytebuffer::ByteBuffer;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::{spawn, task};
use tracing::{debug, trace};

use crate::errors::Result;
use crate::net::recv_failed;

/// The drone splits each frame into chunks of this size, the last one
/// shorter.
pub(crate) const MAX_CHUNK_SIZE: usize = 1460;

pub type TelloVideoSender = mpsc::UnboundedSender<TelloVideoFrame>;
pub type TelloVideoReceiver = mpsc::UnboundedReceiver<TelloVideoFrame>;

pub fn make_tello_video_channel() -> (TelloVideoSender, TelloVideoReceiver) {
    mpsc::unbounded_channel()
}

/// A frame of h264-encoded video from the drone, not decoded here.
#[derive(Debug)]
pub struct TelloVideoFrame {
    pub data: Vec<u8>,
}

/// Drains the video port. Frames go to `sender` if there is one, otherwise
/// they are dropped.
#[derive(Debug)]
pub(crate) struct VideoListener {
    task: task::JoinHandle<()>,
    local_address: SocketAddr,
}

impl VideoListener {
    pub(crate) async fn start_listening(
        local_address: SocketAddr,
        sender: Option<TelloVideoSender>,
    ) -> Result<Self> {
        let sock = UdpSocket::bind(local_address).await?;
        let local_address = sock.local_addr()?;
        debug!("[Video] START LISTENING at {local_address}");

        let task = spawn(async move {
            let mut buf = ByteBuffer::new();
            let mut chunk = vec![0; MAX_CHUNK_SIZE];
            loop {
                let n = match sock.recv(&mut chunk).await {
                    Ok(n) => n,
                    Err(err) => {
                        recv_failed("Video", &err).await;
                        continue;
                    }
                };
                if n == 0 {
                    continue;
                }

                let Some(sender) = &sender else {
                    trace!("[Video] discarded {n} bytes");
                    continue;
                };

                buf.write_bytes(&chunk[..n]);

                if n < MAX_CHUNK_SIZE {
                    let frame = TelloVideoFrame { data: buf.into_vec() };
                    buf = ByteBuffer::new();
                    // nobody watching any more
                    let _ = sender.send(frame);
                }
            }
        });

        Ok(Self { task, local_address })
    }

    pub(crate) fn local_address(&self) -> SocketAddr {
        self.local_address
    }

    pub(crate) fn stop_listening(&self) {
        debug!("[Video] STOP LISTENING");
        self.task.abort();
    }
}
