//! AX.25 frame parsing and re-serialization

use std::fmt::Write as _;
use std::str::FromStr;

use thiserror::Error;

use super::address::{Address, AddressError, MAX_REPEATERS, REPEATER_1, SOURCE};

/// Generous upper bound on a complete frame, FCS excluded.
pub const MAX_PACKET_LEN: usize = 2048;

const CONTROL_UI: u8 = 0x03;
const PID_NO_LAYER_3: u8 = 0xF0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame of {0} bytes exceeds maximum {MAX_PACKET_LEN}")]
    TooLong(usize),
    #[error("address list has {0} entries, maximum is {max}", max = MAX_REPEATERS + 2)]
    TooManyAddresses(usize),
    #[error(transparent)]
    Address(#[from] AddressError),
}

/// A received frame: parsed address list, control/PID, info payload.
///
/// A payload that does not carry a well-formed AX.25 address section is
/// kept with an empty address list and the raw bytes as info; heard-station
/// resolution is undefined for such frames and display of the heard line
/// is suppressed downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ax25Frame {
    addrs: Vec<Address>,
    control: u8,
    pid: Option<u8>,
    info: Vec<u8>,
}

impl Ax25Frame {
    /// Parse wire bytes (FCS already stripped and verified upstream).
    pub fn from_bytes(data: &[u8]) -> Result<Self, FrameError> {
        if data.len() > MAX_PACKET_LEN {
            return Err(FrameError::TooLong(data.len()));
        }
        match Self::parse_ax25(data) {
            Some(frame) => Ok(frame),
            None => Ok(Self {
                addrs: Vec::new(),
                control: 0,
                pid: None,
                info: data.to_vec(),
            }),
        }
    }

    fn parse_ax25(data: &[u8]) -> Option<Ax25Frame> {
        let mut addrs = Vec::new();
        let mut pos = 0;
        loop {
            if pos + 7 > data.len() || addrs.len() >= MAX_REPEATERS + 2 {
                return None;
            }
            let field: &[u8; 7] = data[pos..pos + 7].try_into().ok()?;
            addrs.push(Address::from_wire(field).ok()?);
            pos += 7;
            if field[6] & 0x01 != 0 {
                break;
            }
        }
        if addrs.len() < 2 || pos >= data.len() {
            return None;
        }
        let control = data[pos];
        pos += 1;
        // PID follows for I and UI frames only.
        let has_pid = control & 0x01 == 0 || control & 0xEF == CONTROL_UI;
        let pid = if has_pid {
            if pos >= data.len() {
                return None;
            }
            let p = data[pos];
            pos += 1;
            Some(p)
        } else {
            None
        };
        Some(Ax25Frame {
            addrs,
            control,
            pid,
            info: data[pos..].to_vec(),
        })
    }

    /// Build a UI frame from text addresses, for transmit-side callers and
    /// the touch-tone gateway's synthesized packets.
    pub fn new_ui(
        source: &str,
        destination: &str,
        repeaters: &[&str],
        info: &[u8],
    ) -> Result<Self, FrameError> {
        if repeaters.len() > MAX_REPEATERS {
            return Err(FrameError::TooManyAddresses(repeaters.len() + 2));
        }
        let mut addrs = vec![
            Address::from_str(destination)?,
            Address::from_str(source)?,
        ];
        for r in repeaters {
            addrs.push(Address::from_str(r)?);
        }
        Ok(Self {
            addrs,
            control: CONTROL_UI,
            pid: Some(PID_NO_LAYER_3),
            info: info.to_vec(),
        })
    }

    /// Serialize back to wire form.  The result is what local transports
    /// receive; it is captured before any in-place mutation.
    pub fn pack(&self) -> Vec<u8> {
        if self.addrs.is_empty() {
            return self.info.clone();
        }
        let mut out = Vec::with_capacity(self.addrs.len() * 7 + 2 + self.info.len());
        let last = self.addrs.len() - 1;
        for (i, a) in self.addrs.iter().enumerate() {
            out.extend_from_slice(&a.to_wire(i == last));
        }
        out.push(self.control);
        if let Some(pid) = self.pid {
            out.push(pid);
        }
        out.extend_from_slice(&self.info);
        out
    }

    pub fn num_addr(&self) -> usize {
        self.addrs.len()
    }

    pub fn addr(&self, index: usize) -> Option<&Address> {
        self.addrs.get(index)
    }

    pub fn addr_mut(&mut self, index: usize) -> Option<&mut Address> {
        self.addrs.get_mut(index)
    }

    /// Which address-list entry did we actually hear?  The last repeater
    /// slot marked has-been-repeated, otherwise the source.  None when the
    /// payload is not AX.25 at all.
    pub fn heard_index(&self) -> Option<usize> {
        if self.addrs.is_empty() {
            return None;
        }
        let mut heard = SOURCE;
        for i in REPEATER_1..self.addrs.len() {
            if self.addrs[i].has_been_repeated() {
                heard = i;
            }
        }
        Some(heard)
    }

    /// APRS frames are UI frames with the no-layer-3 PID and at least
    /// source and destination present.
    pub fn is_aprs(&self) -> bool {
        self.addrs.len() >= 2
            && self.control & 0xEF == CONTROL_UI
            && self.pid == Some(PID_NO_LAYER_3)
    }

    pub fn info(&self) -> &[u8] {
        &self.info
    }

    /// APRS data type indicator: first info byte.
    pub fn dti(&self) -> char {
        self.info.first().map(|&b| b as char).unwrap_or(' ')
    }

    /// "SRC>DST,RPT1,RPT2*:" header, the asterisk marking the last
    /// repeater heard from.
    pub fn format_addrs(&self) -> String {
        if self.addrs.len() < 2 {
            return String::new();
        }
        let mut s = format!("{}>{}", self.addrs[SOURCE], self.addrs[0]);
        let heard = self.heard_index().unwrap_or(SOURCE);
        for (i, a) in self.addrs.iter().enumerate().skip(REPEATER_1) {
            s.push(',');
            let _ = write!(s, "{a}");
            if i == heard && a.has_been_repeated() {
                s.push('*');
            }
        }
        s.push(':');
        s
    }

    /// CRC-16/CCITT over the packed bytes, used by the candidate arbiter
    /// to recognize late duplicate recoveries of the same transmission.
    pub fn crc(&self) -> u16 {
        let mut crc: u16 = 0xFFFF;
        for &b in self.pack().iter() {
            crc ^= b as u16;
            for _ in 0..8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0x8408;
                } else {
                    crc >>= 1;
                }
            }
        }
        !crc
    }

    /// Printable rendering of the info payload.  Non-printable bytes show
    /// as <0xNN>; with `ascii_only` anything past 0x7F does too, which is
    /// the right default for non-APRS payloads likely to be binary.
    pub fn safe_print(&self, ascii_only: bool) -> String {
        let mut s = String::with_capacity(self.info.len());
        for &b in &self.info {
            let printable = (0x20..0x7F).contains(&b) || (!ascii_only && b >= 0xA0);
            if printable {
                s.push(b as char);
            } else {
                let _ = write!(s, "<0x{b:02x}>");
            }
        }
        s
    }

    /// Classic offset / hex / ascii dump of the wire bytes.
    pub fn hex_dump(&self) -> String {
        let bytes = self.pack();
        let mut out = String::new();
        for (n, row) in bytes.chunks(16).enumerate() {
            let hexpart: Vec<String> = row.iter().map(|b| format!("{b:02x}")).collect();
            let ascii: String = row
                .iter()
                .map(|&b| {
                    if (0x20..0x7F).contains(&b) {
                        b as char
                    } else {
                        '.'
                    }
                })
                .collect();
            let _ = writeln!(out, "  {:03x}:  {:<47}  {}", n * 16, hexpart.join(" "), ascii);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_frame(repeaters: &[(&str, bool)]) -> Ax25Frame {
        let reps: Vec<&str> = repeaters.iter().map(|(r, _)| *r).collect();
        let mut f = Ax25Frame::new_ui("N0CALL-9", "APDW10", &reps, b"!4237.14N/07120.83W>test").unwrap();
        for (i, (_, repeated)) in repeaters.iter().enumerate() {
            f.addr_mut(REPEATER_1 + i).unwrap().set_repeated(*repeated);
        }
        f
    }

    #[test]
    fn test_round_trip() {
        let f = test_frame(&[("WIDE1-1", true), ("WIDE2-1", false)]);
        let packed = f.pack();
        let g = Ax25Frame::from_bytes(&packed).unwrap();
        assert_eq!(f, g);
        assert_eq!(g.num_addr(), 4);
        assert!(g.addr(2).unwrap().has_been_repeated());
        assert!(!g.addr(3).unwrap().has_been_repeated());
    }

    #[test]
    fn test_heard_index_last_repeated() {
        let f = test_frame(&[("W1AB-1", true), ("W2CD-2", true), ("WIDE2-1", false)]);
        assert_eq!(f.heard_index(), Some(3));
    }

    #[test]
    fn test_heard_index_source_when_direct() {
        let f = test_frame(&[("WIDE2-2", false)]);
        assert_eq!(f.heard_index(), Some(SOURCE));
    }

    #[test]
    fn test_is_aprs() {
        let f = test_frame(&[]);
        assert!(f.is_aprs());
        let packed = f.pack();
        // An S frame (control 0x01, no PID) is not APRS.
        let mut sframe = packed[..14].to_vec();
        sframe.push(0x01);
        let g = Ax25Frame::from_bytes(&sframe).unwrap();
        assert!(!g.is_aprs());
    }

    #[test]
    fn test_non_ax25_payload() {
        let f = Ax25Frame::from_bytes(b"just some bytes").unwrap();
        assert_eq!(f.num_addr(), 0);
        assert_eq!(f.heard_index(), None);
        assert!(!f.is_aprs());
        assert_eq!(f.pack(), b"just some bytes");
    }

    #[test]
    fn test_format_addrs() {
        let f = test_frame(&[("W1AB-1", true), ("WIDE2-1", false)]);
        assert_eq!(f.format_addrs(), "N0CALL-9>APDW10,W1AB-1*,WIDE2-1:");
    }

    #[test]
    fn test_safe_print_escapes_control() {
        let f = Ax25Frame::new_ui("N0CALL", "APRS", &[], b"hi\x01there").unwrap();
        assert_eq!(f.safe_print(true), "hi<0x01>there");
    }

    #[test]
    fn test_crc_distinguishes_frames() {
        let a = test_frame(&[]);
        let b = Ax25Frame::new_ui("N0CALL-9", "APDW10", &[], b"different").unwrap();
        assert_ne!(a.crc(), b.crc());
        assert_eq!(a.crc(), a.clone().crc());
    }
}
