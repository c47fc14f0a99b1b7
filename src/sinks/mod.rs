//! Consumer sinks for received frames
//!
//! One trait per capability so every consumer can be replaced by a test
//! double.  All sinks are `Send`, synchronize internally, and convert
//! their own faults into sink-local handling: a delivery entrypoint never
//! blocks the dispatcher and never reports failure back to it.

mod digipeater;
mod display;
mod igate;
mod kiss;
mod logger;
mod tt_gateway;
mod waypoint;

pub use digipeater::{spawn_transmitter, AliasDigipeater, RegenSink, TxQueue};
pub use display::DisplaySink;
pub use igate::{AllowAll, ChannelFilters, IgateSink, PacketFilter};
pub use kiss::{kiss_frame, KissSerialPort, KissTcpServer};
pub use logger::FileLog;
pub use tt_gateway::TtGateway;
pub use waypoint::{NmeaWaypointPort, Waypoint, WaypointFormat};

use crate::aprs::AprsReport;
use crate::ax25::Ax25Frame;
use crate::modem::{AudioLevel, RetryLevel};

/// A client-application transport.  Every configured instance receives
/// the identical serialized frame bytes; each owns its wire framing.
pub trait LocalTransport: Send {
    fn name(&self) -> &'static str;
    fn deliver(&self, chan: usize, frame_bytes: &[u8]);
}

/// Append-only received-packet log.
pub trait PacketLog: Send {
    fn log(
        &self,
        chan: usize,
        report: &AprsReport,
        frame: &Ax25Frame,
        alevel: AudioLevel,
        retries: RetryLevel,
    );
}

/// GPS/waypoint exporter, called only when a location was resolved.
pub trait WaypointSink: Send {
    fn send(&self, waypoint: &Waypoint);
}

/// RF retransmitter following embedded routing instructions.  The only
/// consumer allowed to mutate the frame, and always the last to see it.
pub trait Digipeater: Send {
    fn process(&self, chan: usize, frame: &mut Ax25Frame);
}

/// Bridge onto the internet packet network, trust-gated.
pub trait InternetGateway: Send {
    fn forward(&self, chan: usize, frame: &Ax25Frame);
}

/// Touch-tone command gateway, fed only by touch-tone-sourced frames.
pub trait TouchToneGateway: Send {
    fn sequence(&self, chan: usize, payload: &[u8]);
}

/// Clean regenerated-copy retransmission, independent of the trust
/// decision and applied to every frame type.
pub trait RegenTransmit: Send {
    fn regen(&self, chan: usize, frame: &Ax25Frame);
}
