//! Who did we actually hear?
//!
//! Resolves the transmitting station from the address list and applies
//! the generic-wide-alias backtrack heuristic: a station calling itself
//! "WIDEn" with no visible SSID is almost always a digipeater that
//! substituted its generic alias, so the entry just before it is quite
//! likely (but not guaranteed) the station whose transmitter we heard.

use crate::ax25::{Ax25Frame, REPEATER_1, SOURCE};
use crate::modem::RetryLevel;

/// Result of heard-station resolution for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heard {
    /// Address-list index believed to be the actual transmitter.
    pub index: usize,
    /// Rendered station text.
    pub station: String,
    /// Backtrack heuristic result: (index, rendered text) of the entry
    /// that probably really transmitted.  Heuristic, not a guarantee.
    pub probably_really: Option<(usize, String)>,
}

impl Heard {
    pub fn is_digipeated(&self) -> bool {
        self.index != SOURCE
    }

    /// Text for the log heard column; the heuristic result is marked
    /// with a trailing '?' rather than presented as fact.
    pub fn log_text(&self) -> String {
        match &self.probably_really {
            Some((_, station)) => format!("{station}?"),
            None => self.station.clone(),
        }
    }
}

/// Exactly one resolution per frame, independent of whether the heard
/// line will actually be displayed.  None when the payload carried no
/// addresses at all.
pub fn resolve_heard(frame: &Ax25Frame) -> Option<Heard> {
    let index = frame.heard_index()?;
    let station = frame.addr(index)?.to_string();

    let probably_really = (index >= REPEATER_1 && is_generic_wide(&station))
        .then(|| {
            frame
                .addr(index - 1)
                .map(|a| (index - 1, a.to_string()))
        })
        .flatten();

    Some(Heard {
        index,
        station,
        probably_really,
    })
}

/// "WIDE" followed by exactly one digit and nothing else: the n-N
/// wide-area alias whose zero secondary identifier renders invisibly.
fn is_generic_wide(station: &str) -> bool {
    let b = station.as_bytes();
    b.len() == 5 && b.starts_with(b"WIDE") && b[4].is_ascii_digit()
}

/// Retry text for the heard line, shown only when the channel attempts
/// bit fixing at all.
pub fn retry_display(fix_bits_enabled: bool, retries: RetryLevel) -> String {
    if fix_bits_enabled {
        format!(" [{}] ", retries.label())
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with(repeaters: &[(&str, bool)]) -> Ax25Frame {
        let reps: Vec<&str> = repeaters.iter().map(|(r, _)| *r).collect();
        let mut f = Ax25Frame::new_ui("N0CALL-9", "APDW10", &reps, b">test").unwrap();
        for (i, (_, repeated)) in repeaters.iter().enumerate() {
            f.addr_mut(REPEATER_1 + i).unwrap().set_repeated(*repeated);
        }
        f
    }

    #[test]
    fn test_direct_frame_heard_is_source() {
        let h = resolve_heard(&frame_with(&[("WIDE2-2", false)])).unwrap();
        assert_eq!(h.index, SOURCE);
        assert_eq!(h.station, "N0CALL-9");
        assert!(!h.is_digipeated());
        assert_eq!(h.probably_really, None);
        assert_eq!(h.log_text(), "N0CALL-9");
    }

    #[test]
    fn test_generic_wide_backtracks_to_source() {
        let h = resolve_heard(&frame_with(&[("WIDE2-0", true)])).unwrap();
        assert_eq!(h.station, "WIDE2");
        assert_eq!(
            h.probably_really,
            Some((SOURCE, "N0CALL-9".to_string()))
        );
        assert_eq!(h.log_text(), "N0CALL-9?");
    }

    #[test]
    fn test_backtrack_to_preceding_repeater() {
        let h = resolve_heard(&frame_with(&[("W1AB-1", true), ("WIDE2-0", true)])).unwrap();
        assert_eq!(h.index, 3);
        assert_eq!(h.station, "WIDE2");
        assert_eq!(h.probably_really, Some((2, "W1AB-1".to_string())));
    }

    #[test]
    fn test_visible_ssid_defeats_pattern() {
        let h = resolve_heard(&frame_with(&[("WIDE1-1", true)])).unwrap();
        assert_eq!(h.station, "WIDE1-1");
        assert_eq!(h.probably_really, None);
    }

    #[test]
    fn test_real_callsign_not_backtracked() {
        let h = resolve_heard(&frame_with(&[("W1AB-5", true)])).unwrap();
        assert_eq!(h.station, "W1AB-5");
        assert_eq!(h.probably_really, None);
    }

    #[test]
    fn test_no_addresses_is_undefined() {
        let f = Ax25Frame::from_bytes(b"raw non-ax25 payload").unwrap();
        assert_eq!(resolve_heard(&f), None);
    }

    #[test]
    fn test_alias_pattern_edge_cases() {
        assert!(is_generic_wide("WIDE2"));
        assert!(is_generic_wide("WIDE9"));
        assert!(!is_generic_wide("WIDE"));
        assert!(!is_generic_wide("WIDES"));
        assert!(!is_generic_wide("WIDE25"));
    }

    #[test]
    fn test_retry_display() {
        assert_eq!(retry_display(true, RetryLevel::None), " [NONE] ");
        assert_eq!(retry_display(true, RetryLevel::SwapSingle), " [SINGLE] ");
        assert_eq!(retry_display(false, RetryLevel::SwapSingle), "");
    }
}
