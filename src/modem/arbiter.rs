//! Redundant-decode arbitration across parallel sub-decoders
//!
//! Several demodulator variants listen to the same audio, so one
//! over-the-air transmission can decode on more than one of them within a
//! few bit times.  Candidates are held briefly, scored, and the best one
//! per channel is forwarded.  Deep-search recoveries arriving seconds
//! later from the background re-decode thread bypass scoring and are only
//! checked against a bounded history of recently forwarded checksums.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::ax25::Ax25Frame;
use crate::modem::{AudioLevel, RetryLevel, SubDecoder, MAX_CHANS, MAX_SUBCHANS};

/// How many recently forwarded checksums to remember per channel.
const MAX_STORED_CRC: usize = 256;

/// A decode ready for dispatch, with the per-sub-decoder quality display.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub chan: usize,
    pub sub_decoder: SubDecoder,
    pub frame: Ax25Frame,
    pub alevel: AudioLevel,
    pub retries: RetryLevel,
    /// One character per sub-decoder: '|' bit-exact, ':' single swap,
    /// '.' deeper fix, '_' nothing.  Empty for single-decoder channels.
    pub spectrum: String,
}

struct Slot {
    frame: Ax25Frame,
    alevel: AudioLevel,
    retries: RetryLevel,
    age: u32,
    crc: u16,
}

pub struct Arbiter {
    num_subchan: [usize; MAX_CHANS],
    /// Ticks a candidate may wait for competitors before arbitration.
    settle_age: u32,
    slots: [[Option<Slot>; MAX_SUBCHANS]; MAX_CHANS],
    history: [VecDeque<u16>; MAX_CHANS],
}

impl Arbiter {
    pub fn new(num_subchan: [usize; MAX_CHANS], settle_age: u32) -> Self {
        assert!(num_subchan.iter().all(|&n| n >= 1 && n <= MAX_SUBCHANS));
        Self {
            num_subchan,
            settle_age,
            slots: Default::default(),
            history: Default::default(),
        }
    }

    /// A sub-decoder produced a frame with a valid checksum.  Returns a
    /// candidate when it should be dispatched right away; otherwise it is
    /// parked until `tick` settles the channel.
    pub fn accept(
        &mut self,
        chan: usize,
        subchan: usize,
        frame: Ax25Frame,
        alevel: AudioLevel,
        retries: RetryLevel,
    ) -> Option<Candidate> {
        assert!(chan < MAX_CHANS);
        assert!(subchan < self.num_subchan[chan]);

        // Single decoder on the channel: nothing to arbitrate.
        if self.num_subchan[chan] == 1 {
            return Some(Candidate {
                chan,
                sub_decoder: SubDecoder::Modem(subchan),
                frame,
                alevel,
                retries,
                spectrum: String::new(),
            });
        }

        // Late deep-search recovery: pass or drop, never scored, because
        // its competitors settled long ago.
        if retries.is_deep_search() {
            let crc = frame.crc();
            if self.history[chan].contains(&crc) {
                debug!("chan {chan}: dropping duplicate recovered frame, crc {crc:04x}");
                return None;
            }
            self.remember(chan, crc);
            let mut spectrum = "_".repeat(self.num_subchan[chan]);
            spectrum.replace_range(subchan..=subchan, ".");
            return Some(Candidate {
                chan,
                sub_decoder: SubDecoder::Modem(subchan),
                frame,
                alevel,
                retries,
                spectrum,
            });
        }

        if self.slots[chan][subchan].is_some() {
            trace!("chan {chan}.{subchan}: replacing unsettled candidate");
        }
        let crc = frame.crc();
        self.slots[chan][subchan] = Some(Slot {
            frame,
            alevel,
            retries,
            age: 0,
            crc,
        });
        None
    }

    /// Advance candidate ages by one demodulator tick; once the oldest
    /// candidate on the channel has waited out the settling window, pick
    /// the best and discard the rest.
    pub fn tick(&mut self, chan: usize) -> Option<Candidate> {
        assert!(chan < MAX_CHANS);
        let mut expired = false;
        for slot in self.slots[chan].iter_mut().flatten() {
            slot.age += 1;
            if slot.age > self.settle_age {
                expired = true;
            }
        }
        expired.then(|| self.pick_best(chan))
    }

    /// Prefer the frame received perfectly; settle for corrected ones.
    /// Agreement between nearby sub-decoders nudges the score up.
    fn pick_best(&mut self, chan: usize) -> Candidate {
        let n = self.num_subchan[chan];
        let mut spectrum = String::with_capacity(n);
        let mut scores = [0i32; MAX_SUBCHANS];

        for subchan in 0..n {
            let Some(slot) = &self.slots[chan][subchan] else {
                spectrum.push('_');
                continue;
            };
            spectrum.push(match slot.retries {
                RetryLevel::None => '|',
                RetryLevel::SwapSingle => ':',
                _ => '.',
            });
            let mut score =
                i32::from(RetryLevel::MAX) * 1000 - (slot.retries as u8 as i32) * 1000;
            for (k, other) in self.slots[chan][..n].iter().enumerate() {
                if k != subchan {
                    if let Some(other) = other {
                        if other.crc == slot.crc {
                            score += (MAX_SUBCHANS as i32 + 1) - (subchan as i32 - k as i32).abs();
                        }
                    }
                }
            }
            scores[subchan] = score;
        }

        let best = (0..n)
            .filter(|&s| self.slots[chan][s].is_some())
            .max_by_key(|&s| scores[s])
            .expect("tick found an expired slot");

        let slot = self.slots[chan][best].take().expect("best slot occupied");
        for s in self.slots[chan][..n].iter_mut() {
            *s = None;
        }
        self.remember(chan, slot.crc);

        Candidate {
            chan,
            sub_decoder: SubDecoder::Modem(best),
            frame: slot.frame,
            alevel: slot.alevel,
            retries: slot.retries,
            spectrum,
        }
    }

    fn remember(&mut self, chan: usize, crc: u16) {
        self.history[chan].push_back(crc);
        while self.history[chan].len() > MAX_STORED_CRC {
            self.history[chan].pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(info: &[u8]) -> Ax25Frame {
        Ax25Frame::new_ui("N0CALL-9", "APDW10", &["WIDE2-1"], info).unwrap()
    }

    fn settle(arbiter: &mut Arbiter, chan: usize) -> Candidate {
        for _ in 0..100 {
            if let Some(c) = arbiter.tick(chan) {
                return c;
            }
        }
        panic!("no candidate settled");
    }

    #[test]
    fn test_single_subchan_passes_through() {
        let mut a = Arbiter::new([1, 1], 3);
        let c = a
            .accept(0, 0, frame(b"x"), AudioLevel(50), RetryLevel::None)
            .expect("immediate");
        assert_eq!(c.sub_decoder, SubDecoder::Modem(0));
        assert_eq!(c.spectrum, "");
    }

    #[test]
    fn test_bit_exact_beats_corrected() {
        let mut a = Arbiter::new([3, 1], 3);
        assert!(a
            .accept(0, 0, frame(b"x"), AudioLevel(40), RetryLevel::SwapSingle)
            .is_none());
        assert!(a
            .accept(0, 2, frame(b"x"), AudioLevel(45), RetryLevel::None)
            .is_none());
        let c = settle(&mut a, 0);
        assert_eq!(c.sub_decoder, SubDecoder::Modem(2));
        assert_eq!(c.retries, RetryLevel::None);
        assert_eq!(c.spectrum, ":_|");
    }

    #[test]
    fn test_agreement_bonus_breaks_ties() {
        let mut a = Arbiter::new([3, 1], 3);
        for s in 0..3 {
            assert!(a
                .accept(0, s, frame(b"same"), AudioLevel(50), RetryLevel::None)
                .is_none());
        }
        let c = settle(&mut a, 0);
        // The middle decoder is closest to both neighbours.
        assert_eq!(c.sub_decoder, SubDecoder::Modem(1));
        assert_eq!(c.spectrum, "|||");
    }

    #[test]
    fn test_deep_search_duplicate_dropped() {
        let mut a = Arbiter::new([2, 1], 3);
        assert!(a
            .accept(0, 0, frame(b"x"), AudioLevel(50), RetryLevel::None)
            .is_none());
        let first = settle(&mut a, 0);
        assert_eq!(first.retries, RetryLevel::None);

        // Background thread recovers the same transmission much later.
        assert!(a
            .accept(0, 1, frame(b"x"), AudioLevel(50), RetryLevel::SwapTwoSep)
            .is_none());

        // A different frame from the deep search still gets through.
        let c = a
            .accept(0, 1, frame(b"other"), AudioLevel(50), RetryLevel::SwapTwoSep)
            .expect("new frame passes");
        assert_eq!(c.spectrum, "_.");
    }

    #[test]
    fn test_slots_clear_after_pick() {
        let mut a = Arbiter::new([2, 1], 2);
        assert!(a
            .accept(0, 0, frame(b"one"), AudioLevel(50), RetryLevel::None)
            .is_none());
        settle(&mut a, 0);
        assert!(a.tick(0).is_none());
    }
}
