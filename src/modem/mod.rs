//! Demodulator-facing types: channel bounds, sub-decoder identity, audio
//! level, bit-correction retry levels, default parameter derivation and
//! the multi-decoder candidate arbiter.

mod arbiter;
mod params;
mod retry;

pub use arbiter::{Arbiter, Candidate};
pub use params::{derive_modem_params, ModemFamily, ModemParams};
pub use retry::RetryLevel;

/// Maximum number of radio channels.
pub const MAX_CHANS: usize = 2;

/// Maximum number of parallel demodulator variants per channel.
pub const MAX_SUBCHANS: usize = 9;

/// Which decoder produced a candidate frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubDecoder {
    /// Touch-tone decoder; not an RF demodulator at all.
    Dtmf,
    /// One of the parallel demodulator variants on the channel.
    Modem(usize),
}

impl SubDecoder {
    /// Decode the wire convention where -1 means the touch-tone decoder.
    pub fn from_wire(value: i32) -> Option<Self> {
        match value {
            -1 => Some(Self::Dtmf),
            n if (0..MAX_SUBCHANS as i32).contains(&n) => Some(Self::Modem(n as usize)),
            _ => None,
        }
    }

    pub fn modem_index(self) -> Option<usize> {
        match self {
            Self::Dtmf => None,
            Self::Modem(n) => Some(n),
        }
    }
}

/// Received signal quality, nominal range 0-100.
///
/// Negative values are sentinels: digipeated copies suppress the quality
/// display, touch-tone input is not an audio-level frame at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioLevel(pub i32);

impl AudioLevel {
    pub const SUPPRESS_DISPLAY: AudioLevel = AudioLevel(-1);
    pub const NOT_AUDIO: AudioLevel = AudioLevel(-2);

    /// Cranked-up input saturates; most stations should sit near 50.
    pub const TOO_HIGH: i32 = 110;

    pub fn is_displayable(self) -> bool {
        self.0 >= 0
    }

    pub fn text(self) -> String {
        if self.is_displayable() {
            self.0.to_string()
        } else {
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_decoder_wire_values() {
        assert_eq!(SubDecoder::from_wire(-1), Some(SubDecoder::Dtmf));
        assert_eq!(SubDecoder::from_wire(0), Some(SubDecoder::Modem(0)));
        assert_eq!(SubDecoder::from_wire(8), Some(SubDecoder::Modem(8)));
        assert_eq!(SubDecoder::from_wire(9), None);
        assert_eq!(SubDecoder::from_wire(-2), None);
    }

    #[test]
    fn test_audio_level_sentinels() {
        assert!(AudioLevel(50).is_displayable());
        assert!(!AudioLevel::SUPPRESS_DISPLAY.is_displayable());
        assert!(!AudioLevel::NOT_AUDIO.is_displayable());
        assert_eq!(AudioLevel(37).text(), "37");
        assert_eq!(AudioLevel::NOT_AUDIO.text(), "");
    }
}
