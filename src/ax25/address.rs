//! AX.25 address fields: callsign, SSID, has-been-repeated flag

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Index of the destination in the address list.
pub const DESTINATION: usize = 0;
/// Index of the source in the address list.
pub const SOURCE: usize = 1;
/// Index of the first repeater slot.
pub const REPEATER_1: usize = 2;
/// Maximum number of repeater slots.
pub const MAX_REPEATERS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("callsign is empty")]
    Empty,
    #[error("callsign \"{0}\" longer than 6 characters")]
    TooLong(String),
    #[error("invalid character in callsign \"{0}\"")]
    BadCharacter(String),
    #[error("SSID {0} outside 0-15")]
    BadSsid(u8),
}

/// One entry of the AX.25 address list.
///
/// The repeated flag is the H (has-been-repeated) bit; it is only
/// meaningful for repeater slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    call: [u8; 6],
    ssid: u8,
    repeated: bool,
}

impl Address {
    pub fn new(call: &str, ssid: u8) -> Result<Self, AddressError> {
        if call.is_empty() {
            return Err(AddressError::Empty);
        }
        if call.len() > 6 {
            return Err(AddressError::TooLong(call.to_string()));
        }
        if !call
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        {
            return Err(AddressError::BadCharacter(call.to_string()));
        }
        if ssid > 15 {
            return Err(AddressError::BadSsid(ssid));
        }
        let mut c = [b' '; 6];
        c[..call.len()].copy_from_slice(call.as_bytes());
        Ok(Self {
            call: c,
            ssid,
            repeated: false,
        })
    }

    /// Decode one 7-byte wire field.  Callsign bytes are shifted left one
    /// bit; the final byte carries the SSID and the H bit.
    pub fn from_wire(field: &[u8; 7]) -> Result<Self, AddressError> {
        let mut call = [b' '; 6];
        for (i, b) in field[..6].iter().enumerate() {
            call[i] = b >> 1;
        }
        let ssid = (field[6] >> 1) & 0x0F;
        let repeated = field[6] & 0x80 != 0;
        // Validate the printable form.
        let text: String = call
            .iter()
            .take_while(|&&b| b != b' ')
            .map(|&b| b as char)
            .collect();
        let mut a = Self::new(&text, ssid)?;
        a.repeated = repeated;
        Ok(a)
    }

    /// Encode as a 7-byte wire field.  `last` sets the address-extension
    /// bit that terminates the address list.
    pub fn to_wire(&self, last: bool) -> [u8; 7] {
        let mut field = [0u8; 7];
        for (i, &b) in self.call.iter().enumerate() {
            field[i] = b << 1;
        }
        field[6] = 0x60 | (self.ssid << 1) | u8::from(last);
        if self.repeated {
            field[6] |= 0x80;
        }
        field
    }

    /// Callsign without SSID.
    pub fn call(&self) -> String {
        self.call
            .iter()
            .take_while(|&&b| b != b' ')
            .map(|&b| b as char)
            .collect()
    }

    pub fn ssid(&self) -> u8 {
        self.ssid
    }

    pub fn set_ssid(&mut self, ssid: u8) {
        debug_assert!(ssid <= 15);
        self.ssid = ssid & 0x0F;
    }

    pub fn has_been_repeated(&self) -> bool {
        self.repeated
    }

    pub fn set_repeated(&mut self, repeated: bool) {
        self.repeated = repeated;
    }
}

impl FromStr for Address {
    type Err = AddressError;

    /// Parse "CALL" or "CALL-SSID" text form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('-') {
            Some((call, ssid)) => {
                let ssid: u8 = ssid
                    .parse()
                    .map_err(|_| AddressError::BadCharacter(s.to_string()))?;
                Self::new(call, ssid)
            }
            None => Self::new(s, 0),
        }
    }
}

impl fmt::Display for Address {
    /// Render with the SSID suffix only when it is nonzero, so WIDE2-0
    /// appears as "WIDE2".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ssid == 0 {
            write!(f, "{}", self.call())
        } else {
            write!(f, "{}-{}", self.call(), self.ssid)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_render() {
        let a: Address = "N0CALL-9".parse().unwrap();
        assert_eq!(a.call(), "N0CALL");
        assert_eq!(a.ssid(), 9);
        assert_eq!(a.to_string(), "N0CALL-9");
    }

    #[test]
    fn test_zero_ssid_hidden() {
        let a: Address = "WIDE2-0".parse().unwrap();
        assert_eq!(a.to_string(), "WIDE2");
    }

    #[test]
    fn test_wire_round_trip() {
        let mut a: Address = "W1ABC-7".parse().unwrap();
        a.set_repeated(true);
        let w = a.to_wire(true);
        let b = Address::from_wire(&w).unwrap();
        assert_eq!(b.call(), "W1ABC");
        assert_eq!(b.ssid(), 7);
        assert!(b.has_been_repeated());
        assert_eq!(w[6] & 0x01, 1);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(Address::new("", 0).is_err());
        assert!(Address::new("TOOLONGCALL", 0).is_err());
        assert!(Address::new("n0call", 0).is_err());
        assert!(Address::new("N0CALL", 16).is_err());
    }
}
