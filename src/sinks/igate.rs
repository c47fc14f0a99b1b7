//! Internet gateway uplink
//!
//! Converts trust-approved frames to the text form used by the internet
//! packet network and hands them to a reconnecting TCP worker.  An
//! operator-configured filter expression is consulted through a trait
//! the dispatcher knows nothing about.

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::ax25::Ax25Frame;
use crate::config::IgateConfig;
use crate::sinks::InternetGateway;

/// Opaquely-evaluated per-channel uplink filter.  The dispatcher never
/// interprets it; it only hands frames to the sink.
pub trait PacketFilter: Send + Sync {
    fn allows(&self, chan: usize, frame: &Ax25Frame) -> bool;
}

/// Default filter: everything the trust gate approved goes up.
pub struct AllowAll;

impl PacketFilter for AllowAll {
    fn allows(&self, _chan: usize, _frame: &Ax25Frame) -> bool {
        true
    }
}

/// Holds the operator's per-channel filter expressions, uninterpreted.
/// A channel with an expression configured withholds uplink until an
/// evaluator for the expression language is attached.
pub struct ChannelFilters {
    exprs: [Option<String>; crate::modem::MAX_CHANS],
}

impl ChannelFilters {
    pub fn new(exprs: [Option<String>; crate::modem::MAX_CHANS]) -> Self {
        Self { exprs }
    }
}

impl PacketFilter for ChannelFilters {
    fn allows(&self, chan: usize, _frame: &Ax25Frame) -> bool {
        match self.exprs.get(chan).and_then(Option::as_ref) {
            Some(expr) => {
                debug!("igate filter \"{expr}\" on chan {chan}: no evaluator, withholding");
                false
            }
            None => true,
        }
    }
}

pub struct IgateSink {
    tx: mpsc::Sender<String>,
    filter: Box<dyn PacketFilter>,
}

impl IgateSink {
    /// Start the uplink worker and return the sink.  Must be called from
    /// within a tokio runtime.
    pub fn spawn(config: IgateConfig) -> Self {
        let (tx, rx) = mpsc::channel::<String>(100);
        tokio::spawn(uplink_worker(config, rx));
        Self {
            tx,
            filter: Box::new(AllowAll),
        }
    }

    pub fn with_filter(mut self, filter: Box<dyn PacketFilter>) -> Self {
        self.filter = filter;
        self
    }
}

impl InternetGateway for IgateSink {
    fn forward(&self, chan: usize, frame: &Ax25Frame) {
        if !self.filter.allows(chan, frame) {
            debug!("igate filter rejected frame on chan {chan}");
            return;
        }
        let line = tnc2_line(frame);
        // Never block the dispatcher; a backed-up uplink loses frames.
        if self.tx.try_send(line).is_err() {
            debug!("igate uplink queue full, frame dropped");
        }
    }
}

/// "SRC>DST,PATH*:payload" text form.
fn tnc2_line(frame: &Ax25Frame) -> String {
    format!(
        "{}{}",
        frame.format_addrs(),
        String::from_utf8_lossy(frame.info())
    )
}

/// Connect, log in, and write queued lines until the connection drops,
/// then start over.  The queue keeps filling meanwhile; `forward` drops
/// the excess.
async fn uplink_worker(config: IgateConfig, mut rx: mpsc::Receiver<String>) {
    loop {
        let addr = format!("{}:{}", config.server, config.port);
        info!("[IGate] Connecting to {addr}");
        let mut stream = loop {
            match TcpStream::connect(&addr).await {
                Ok(s) => {
                    info!("[IGate] Connected");
                    break s;
                }
                Err(e) => {
                    warn!("[IGate] Failed to connect: {e}. Retrying in 2s...");
                    tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;
                }
            }
        };

        let login = format!(
            "user {} pass {} vers aprs-tnc 0.1\r\n",
            config.callsign, config.passcode
        );
        if let Err(e) = stream.write_all(login.as_bytes()).await {
            warn!("[IGate] Login failed: {e}");
            continue;
        }

        loop {
            match rx.recv().await {
                Some(line) => {
                    debug!("[IGate] {line}");
                    if let Err(e) = stream.write_all(format!("{line}\r\n").as_bytes()).await {
                        warn!("[IGate] Write failed: {e}. Reconnecting...");
                        break;
                    }
                }
                None => {
                    info!("[IGate] Shutting down");
                    return;
                }
            }
        }
    }
}
