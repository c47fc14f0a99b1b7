//! Default demodulator parameters derived from the data rate

/// Modulation family for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemFamily {
    /// Tone-keyed audio frequency shift keying.
    Afsk,
    /// Scrambled continuous-phase encoding, no discrete tones.
    Scramble,
}

/// Per-channel demodulation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModemParams {
    pub family: ModemFamily,
    pub mark_freq: u32,
    pub space_freq: u32,
    /// Audio sample-rate division factor.
    pub decimate: u32,
}

/// Configuration default; explicit per-channel configuration overrides it.
///
/// HF-style low rates get the 1600/1800 Hz tone pair with the sample rate
/// cut to a third; the common 1200 baud VHF case gets 1200/2200 Hz; above
/// 2400 baud there are no discrete tones.
pub fn derive_modem_params(rate: u32) -> ModemParams {
    if rate < 600 {
        ModemParams {
            family: ModemFamily::Afsk,
            mark_freq: 1600,
            space_freq: 1800,
            decimate: 3,
        }
    } else if rate > 2400 {
        ModemParams {
            family: ModemFamily::Scramble,
            mark_freq: 0,
            space_freq: 0,
            decimate: 1,
        }
    } else {
        ModemParams {
            family: ModemFamily::Afsk,
            mark_freq: 1200,
            space_freq: 2200,
            decimate: 1,
        }
    }
}
