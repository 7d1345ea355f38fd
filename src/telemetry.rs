use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::{spawn, task};
use tracing::debug;

use crate::errors::Result;
use crate::logger::EventLog;
use crate::net::{recv_failed, MAX_DATAGRAM_SIZE};
use crate::status::StatusSnapshot;
use crate::store::StatusStore;

/// Decodes the drone's state broadcast into the status store.
#[derive(Debug)]
pub(crate) struct TelemetryListener {
    task: task::JoinHandle<()>,
    local_address: SocketAddr,
}

impl TelemetryListener {
    pub(crate) async fn start_listening(
        local_address: SocketAddr,
        store: Arc<StatusStore>,
        log: EventLog,
    ) -> Result<Self> {
        let sock = UdpSocket::bind(local_address).await?;
        let local_address = sock.local_addr()?;
        debug!("[State] START LISTENING at {local_address}");

        let task = spawn(async move {
            let mut buf = vec![0; MAX_DATAGRAM_SIZE];
            loop {
                let n = match sock.recv(&mut buf).await {
                    Ok(n) => n,
                    Err(err) => {
                        recv_failed("State", &err).await;
                        continue;
                    }
                };

                // a bad message is dropped whole, the last good status stays
                match StatusSnapshot::decode(&buf[..n]) {
                    Ok(status) => store.update(status),
                    Err(err) => log.log(format!("[State] discarded message: {err}")),
                }
            }
        });

        Ok(Self { task, local_address })
    }

    pub(crate) fn local_address(&self) -> SocketAddr {
        self.local_address
    }

    pub(crate) fn stop_listening(&self) {
        debug!("[State] STOP LISTENING");
        self.task.abort();
    }
}
