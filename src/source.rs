//! Candidate frames piped from the external demodulator/HDLC process
//!
//! One frame per line.  The short form is just the hex bytes wrapped in
//! the usual `*...;` markers; the long form prefixes channel,
//! sub-decoder (-1 for the touch-tone decoder), audio level and retry
//! level:
//!
//! ```text
//! *82A0A4A662A86082A09C84888A62AE03F021333435;
//! 0 2 48 1 *82A0A4A662A86082A09C84888A62AE03F021333435;
//! ```

use crossbeam_channel::Sender;
use tracing::{debug, info, warn};

use crate::ax25::MAX_PACKET_LEN;
use crate::modem::{AudioLevel, RetryLevel, SubDecoder, MAX_CHANS};

/// One candidate as handed over by the demodulator.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameInput {
    pub chan: usize,
    pub sub_decoder: SubDecoder,
    pub bytes: Vec<u8>,
    pub alevel: AudioLevel,
    pub retries: RetryLevel,
}

/// Parse one line of demodulator output.  Returns None for blank lines,
/// comments and anything malformed.
pub fn parse_frame_line(line: &str) -> Option<FrameInput> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (meta, hex_part) = match line.find('*') {
        Some(star) => (line[..star].trim(), &line[star..]),
        None => return None,
    };

    let bytes = parse_hex_frame(hex_part)?;

    if meta.is_empty() {
        return Some(FrameInput {
            chan: 0,
            sub_decoder: SubDecoder::Modem(0),
            bytes,
            alevel: AudioLevel(50),
            retries: RetryLevel::None,
        });
    }

    let fields: Vec<&str> = meta.split_whitespace().collect();
    if fields.len() != 4 {
        return None;
    }
    let chan: usize = fields[0].parse().ok()?;
    if chan >= MAX_CHANS {
        return None;
    }
    let sub_decoder = SubDecoder::from_wire(fields[1].parse().ok()?)?;
    // -1 suppresses the quality display (digipeated copies), -2 marks
    // touch-tone input; anything below that is garbage.
    let level: i32 = fields[2].parse().ok()?;
    if level < AudioLevel::NOT_AUDIO.0 {
        return None;
    }
    let alevel = AudioLevel(level);
    let retries = RetryLevel::from_wire(fields[3].parse().ok()?)?;

    Some(FrameInput {
        chan,
        sub_decoder,
        bytes,
        alevel,
        retries,
    })
}

/// `*<hex bytes>;` with even length and a sane size.
fn parse_hex_frame(text: &str) -> Option<Vec<u8>> {
    let end = text.find(';')?;
    let hex_str = &text[1..end];
    if hex_str.is_empty() || hex_str.len() % 2 != 0 || hex_str.len() / 2 > MAX_PACKET_LEN {
        return None;
    }
    hex::decode(hex_str).ok()
}

/// Read frames from stdin on a dedicated thread until EOF.
pub fn spawn_stdin_source(tx: Sender<FrameInput>) {
    std::thread::Builder::new()
        .name("frame-source".to_string())
        .spawn(move || {
            info!("Waiting for frames on stdin...");
            let stdin = std::io::stdin();
            let mut line = String::new();
            loop {
                line.clear();
                match std::io::BufRead::read_line(&mut stdin.lock(), &mut line) {
                    Ok(0) => {
                        info!("Frame source closed");
                        break;
                    }
                    Ok(_) => match parse_frame_line(&line) {
                        Some(input) => {
                            if tx.send(input).is_err() {
                                break;
                            }
                        }
                        None => {
                            if !line.trim().is_empty() && !line.trim_start().starts_with('#') {
                                warn!("Ignoring malformed frame line: {}", line.trim());
                            } else {
                                debug!("skipping blank/comment line");
                            }
                        }
                    },
                    Err(e) => {
                        warn!("Error reading frame source: {e}");
                        break;
                    }
                }
            }
        })
        .expect("spawn frame source thread");
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "*82A0A4A662A86082A09C84888A62AE03F021;";

    #[test]
    fn test_short_form_defaults() {
        let f = parse_frame_line(HEX).unwrap();
        assert_eq!(f.chan, 0);
        assert_eq!(f.sub_decoder, SubDecoder::Modem(0));
        assert_eq!(f.alevel, AudioLevel(50));
        assert_eq!(f.retries, RetryLevel::None);
        assert_eq!(f.bytes.len(), 18);
    }

    #[test]
    fn test_long_form() {
        let f = parse_frame_line(&format!("1 2 48 1 {HEX}")).unwrap();
        assert_eq!(f.chan, 1);
        assert_eq!(f.sub_decoder, SubDecoder::Modem(2));
        assert_eq!(f.alevel, AudioLevel(48));
        assert_eq!(f.retries, RetryLevel::SwapSingle);
    }

    #[test]
    fn test_touch_tone_form() {
        let f = parse_frame_line(&format!("0 -1 -2 0 {HEX}")).unwrap();
        assert_eq!(f.sub_decoder, SubDecoder::Dtmf);
        assert_eq!(f.alevel, AudioLevel::NOT_AUDIO);
    }

    #[test]
    fn test_suppressed_quality_form() {
        let f = parse_frame_line(&format!("0 0 -1 0 {HEX}")).unwrap();
        assert_eq!(f.alevel, AudioLevel::SUPPRESS_DISPLAY);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(parse_frame_line("").is_none());
        assert!(parse_frame_line("# comment").is_none());
        assert!(parse_frame_line("not a frame").is_none());
        assert!(parse_frame_line("*xyz;").is_none());
        assert!(parse_frame_line("*ABC;").is_none()); // odd length
        assert!(parse_frame_line(&format!("9 0 50 0 {HEX}")).is_none()); // bad chan
        assert!(parse_frame_line(&format!("0 9 50 0 {HEX}")).is_none()); // bad subchan
        assert!(parse_frame_line(&format!("0 0 50 99 {HEX}")).is_none()); // bad retry
    }

    #[test]
    fn test_crlf_tolerated() {
        assert!(parse_frame_line(&format!("{HEX}\r\n")).is_some());
    }
}
