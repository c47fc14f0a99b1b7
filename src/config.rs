//! Configuration loaded from environment variables
//!
//! One immutable value is built at process start and passed explicitly to
//! everything that needs it; there is no mutable global state.

use std::path::PathBuf;

use crate::modem::{derive_modem_params, ModemParams, MAX_CHANS};

/// Per-channel settings.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Channel carries traffic at all.
    pub enabled: bool,

    /// Operator-supplied data rate in bits/sec; decides the default
    /// demodulator parameters.
    pub baud: u32,

    /// Demodulator parameters, derived from the rate unless overridden.
    pub modem: ModemParams,

    /// Parallel demodulator variants on this channel.
    pub num_subchan: usize,

    /// Whether the HDLC decoder attempts bit fixing; controls whether the
    /// retry level is worth showing on the heard line.
    pub fix_bits: bool,

    /// Suppress the heard line with the audio level.
    pub quiet_heard: bool,

    /// Suppress APRS decoding (and with it the log/waypoint path).
    pub quiet_decode: bool,

    /// Opaque internet-gateway filter expression; handed to the gateway
    /// sink uninterpreted.
    pub igate_filter: Option<String>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            baud: 1200,
            modem: derive_modem_params(1200),
            num_subchan: 1,
            fix_bits: false,
            quiet_heard: false,
            quiet_decode: false,
            igate_filter: None,
        }
    }
}

/// Internet gateway uplink settings.
#[derive(Debug, Clone)]
pub struct IgateConfig {
    pub server: String,
    pub port: u16,
    pub callsign: String,
    pub passcode: String,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub channels: [ChannelConfig; MAX_CHANS],

    /// Station callsign, used by the digipeater and the gateway login.
    pub mycall: String,

    /// Additionally display non-ASCII payload text in hexadecimal.
    pub dump_nonascii: bool,

    /// Raw hex dump of every received frame.
    pub dump_hex: bool,

    /// Directory for daily log files; disabled when absent.
    pub log_dir: Option<PathBuf>,

    /// Serial port or file that receives NMEA waypoint sentences.
    pub waypoint_port: Option<PathBuf>,

    /// Kenwood-extended waypoint sentences instead of the generic form.
    pub waypoint_kenwood: bool,

    /// TCP port for the KISS network transport; disabled when absent.
    pub kiss_tcp_port: Option<u16>,

    /// Serial device or pseudo-terminal for the KISS serial transport.
    pub kiss_serial: Option<PathBuf>,

    /// Internet gateway uplink; disabled when absent.
    pub igate: Option<IgateConfig>,

    /// Digipeater aliases handled on behalf of this station.
    pub digi_aliases: Vec<String>,

    /// Enable the digipeater sink.
    pub digi_enabled: bool,

    /// Enable the touch-tone gateway sink.
    pub tt_gateway_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut channels: [ChannelConfig; MAX_CHANS] = Default::default();
        channels[0].enabled = true;

        for (n, chan) in channels.iter_mut().enumerate() {
            if let Some(baud) = env_parse::<u32>(&format!("TNC_CHAN{n}_BAUD")) {
                chan.enabled = true;
                chan.baud = baud;
                chan.modem = derive_modem_params(baud);
            }
            if let Some(sub) = env_parse::<usize>(&format!("TNC_CHAN{n}_SUBCHANS")) {
                chan.num_subchan = sub.clamp(1, crate::modem::MAX_SUBCHANS);
            }
            chan.fix_bits = env_flag(&format!("TNC_CHAN{n}_FIX_BITS"));
            chan.quiet_heard = env_flag(&format!("TNC_CHAN{n}_QUIET_HEARD"));
            chan.quiet_decode = env_flag(&format!("TNC_CHAN{n}_QUIET_DECODE"));
            chan.igate_filter = std::env::var(format!("TNC_CHAN{n}_IG_FILTER")).ok();
        }

        let igate = std::env::var("TNC_IG_SERVER").ok().map(|server| IgateConfig {
            server,
            port: env_parse("TNC_IG_PORT").unwrap_or(14580),
            callsign: std::env::var("TNC_IG_LOGIN")
                .unwrap_or_else(|_| "N0CALL".to_string()),
            passcode: std::env::var("TNC_IG_PASSCODE").unwrap_or_else(|_| "-1".to_string()),
        });

        Self {
            channels,
            mycall: std::env::var("TNC_MYCALL").unwrap_or_else(|_| "N0CALL".to_string()),
            dump_nonascii: env_flag("TNC_DUMP_NONASCII"),
            dump_hex: env_flag("TNC_DUMP_HEX"),
            log_dir: std::env::var("TNC_LOG_DIR").ok().map(PathBuf::from),
            waypoint_port: std::env::var("TNC_WAYPOINT_PORT").ok().map(PathBuf::from),
            waypoint_kenwood: env_flag("TNC_WAYPOINT_KENWOOD"),
            kiss_tcp_port: env_parse("TNC_KISS_PORT"),
            kiss_serial: std::env::var("TNC_KISS_SERIAL").ok().map(PathBuf::from),
            igate,
            digi_aliases: std::env::var("TNC_DIGI_ALIASES")
                .map(|s| s.split(',').map(|a| a.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["WIDE".to_string()]),
            digi_enabled: env_flag("TNC_DIGIPEAT"),
            tt_gateway_enabled: env_flag("TNC_TT_GATEWAY"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
