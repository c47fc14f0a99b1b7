//! KISS local transports
//!
//! Client applications speak KISS over a network socket or a serial
//! port / pseudo-terminal.  Every transport receives the identical
//! serialized frame bytes from the dispatcher and applies its own
//! framing; a stuck or vanished client never affects the others.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::sinks::LocalTransport;

const FEND: u8 = 0xC0;
const FESC: u8 = 0xDB;
const TFEND: u8 = 0xDC;
const TFESC: u8 = 0xDD;

/// Wrap one frame for the wire: FEND, the data-frame command byte with
/// the channel in the port nibble, escaped payload, FEND.
pub fn kiss_frame(chan: usize, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 3);
    out.push(FEND);
    out.push(((chan as u8) << 4) & 0xF0);
    for &b in data {
        match b {
            FEND => out.extend_from_slice(&[FESC, TFEND]),
            FESC => out.extend_from_slice(&[FESC, TFESC]),
            other => out.push(other),
        }
    }
    out.push(FEND);
    out
}

/// KISS over TCP.  Accepts any number of clients; each gets its own
/// bounded queue and writer task so one slow client only loses its own
/// frames.
pub struct KissTcpServer {
    clients: Arc<Mutex<Vec<mpsc::Sender<Vec<u8>>>>>,
}

impl KissTcpServer {
    /// Bind and start accepting in the background.  Must be called from
    /// within a tokio runtime.
    pub fn spawn(port: u16) -> Self {
        let clients: Arc<Mutex<Vec<mpsc::Sender<Vec<u8>>>>> = Arc::default();
        let accept_clients = clients.clone();

        tokio::spawn(async move {
            let listener = match TcpListener::bind(("0.0.0.0", port)).await {
                Ok(l) => {
                    info!("KISS network server listening on port {port}");
                    l
                }
                Err(e) => {
                    warn!("KISS network server failed to bind port {port}: {e}");
                    return;
                }
            };
            loop {
                match listener.accept().await {
                    Ok((mut socket, peer)) => {
                        info!("KISS client connected from {peer}");
                        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(64);
                        accept_clients.lock().expect("client list lock").push(tx);
                        tokio::spawn(async move {
                            while let Some(bytes) = rx.recv().await {
                                if let Err(e) = socket.write_all(&bytes).await {
                                    debug!("KISS client {peer} write failed: {e}");
                                    break;
                                }
                            }
                            info!("KISS client {peer} disconnected");
                        });
                    }
                    Err(e) => warn!("KISS accept failed: {e}"),
                }
            }
        });

        Self { clients }
    }
}

impl LocalTransport for KissTcpServer {
    fn name(&self) -> &'static str {
        "kiss-tcp"
    }

    fn deliver(&self, chan: usize, frame_bytes: &[u8]) {
        let framed = kiss_frame(chan, frame_bytes);
        // Dead clients drop out of the list; a full queue just loses this
        // frame for that client.
        self.clients
            .lock()
            .expect("client list lock")
            .retain(|tx| match tx.try_send(framed.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    debug!("KISS client queue full, frame dropped");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            });
    }
}

/// KISS over a serial device or pseudo-terminal.
pub struct KissSerialPort {
    path: PathBuf,
    port: Mutex<Option<File>>,
}

impl KissSerialPort {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            port: Mutex::new(None),
        }
    }
}

impl LocalTransport for KissSerialPort {
    fn name(&self) -> &'static str {
        "kiss-serial"
    }

    fn deliver(&self, chan: usize, frame_bytes: &[u8]) {
        let framed = kiss_frame(chan, frame_bytes);
        let mut port = self.port.lock().expect("serial port lock");
        if port.is_none() {
            match OpenOptions::new().append(true).create(true).open(&self.path) {
                Ok(f) => {
                    info!("KISS serial port {} opened", self.path.display());
                    *port = Some(f);
                }
                Err(e) => {
                    warn!("Can't open KISS serial port {}: {e}", self.path.display());
                    return;
                }
            }
        }
        if let Some(f) = port.as_mut() {
            if let Err(e) = f.write_all(&framed) {
                warn!("KISS serial write failed: {e}");
                *port = None;
            }
        }
    }
}
