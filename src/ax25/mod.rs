//! AX.25 link-layer frame handling
//!
//! Parses the wire form of a received frame into an address list
//! (destination, source, up to eight repeater slots) plus control/PID and
//! the information payload, and re-serializes it for local transports.

mod address;
mod frame;

pub use address::{Address, AddressError, DESTINATION, MAX_REPEATERS, REPEATER_1, SOURCE};
pub use frame::{Ax25Frame, FrameError, MAX_PACKET_LEN};
