//! Digipeater and regenerated-copy retransmission
//!
//! Both feed the transmit queue consumed by the external transmit chain.
//! The digipeater is the one consumer allowed to mutate the frame: it
//! marks the repeater slot it acted on.  The regenerated-copy path sends
//! a clean copy of every frame type and never modifies anything.

use crossbeam_channel::{bounded, Sender, TrySendError};
use tracing::{debug, info, warn};

use crate::ax25::{Ax25Frame, REPEATER_1};
use crate::sinks::{Digipeater, RegenTransmit};

/// One frame queued for transmission.
#[derive(Debug, Clone)]
pub struct TxFrame {
    pub chan: usize,
    pub bytes: Vec<u8>,
}

/// Handle to the transmit queue; cheap to clone into every sink that
/// transmits.
#[derive(Clone)]
pub struct TxQueue {
    tx: Sender<TxFrame>,
}

impl TxQueue {
    pub fn push(&self, chan: usize, bytes: Vec<u8>) {
        match self.tx.try_send(TxFrame { chan, bytes }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => debug!("transmit queue full, frame dropped"),
            Err(TrySendError::Disconnected(_)) => warn!("transmit queue gone"),
        }
    }
}

/// Start the worker that hands queued frames to the transmit chain.
pub fn spawn_transmitter() -> TxQueue {
    let (tx, rx) = bounded::<TxFrame>(64);
    std::thread::Builder::new()
        .name("transmit".to_string())
        .spawn(move || {
            while let Ok(frame) = rx.recv() {
                // The modulator/PTT chain is outside this program; the
                // queue is its intake.
                info!(
                    "TX[{}] {} bytes: {}",
                    frame.chan,
                    frame.bytes.len(),
                    hex::encode(&frame.bytes)
                );
            }
        })
        .expect("spawn transmit thread");
    TxQueue { tx }
}

/// Retransmits frames addressed through this station or a handled
/// wide-area alias.
pub struct AliasDigipeater {
    mycall: String,
    aliases: Vec<String>,
    tx: TxQueue,
}

impl AliasDigipeater {
    pub fn new(mycall: String, aliases: Vec<String>, tx: TxQueue) -> Self {
        Self {
            mycall,
            aliases,
            tx,
        }
    }

    /// "WIDEn" with one trailing digit, for any configured alias prefix.
    fn is_alias(&self, call: &str) -> bool {
        self.aliases.iter().any(|alias| {
            call.len() == alias.len() + 1
                && call.starts_with(alias.as_str())
                && call.as_bytes()[alias.len()].is_ascii_digit()
        })
    }
}

impl Digipeater for AliasDigipeater {
    fn process(&self, chan: usize, frame: &mut Ax25Frame) {
        // First repeater slot nobody has acted on yet.
        let Some(slot) = (REPEATER_1..frame.num_addr())
            .find(|&i| !frame.addr(i).map(|a| a.has_been_repeated()).unwrap_or(true))
        else {
            return;
        };

        let addr = frame.addr(slot).expect("slot in range");
        let call = addr.call();
        let ssid = addr.ssid();

        if call == self.mycall {
            // Addressed to us explicitly: mark it used and retransmit.
            frame.addr_mut(slot).expect("slot in range").set_repeated(true);
        } else if self.is_alias(&call) && ssid > 0 {
            // WIDEn-N: one hop consumed; exhausted aliases get marked.
            let a = frame.addr_mut(slot).expect("slot in range");
            a.set_ssid(ssid - 1);
            if ssid == 1 {
                a.set_repeated(true);
            }
        } else {
            return;
        }

        debug!("digipeating on chan {chan} via slot {slot}");
        self.tx.push(chan, frame.pack());
    }
}

/// Send out a clean regenerated copy.  Applies to all frame types,
/// independent of the trust decision, and never mutates the frame.
pub struct RegenSink {
    tx: TxQueue,
}

impl RegenSink {
    pub fn new(tx: TxQueue) -> Self {
        Self { tx }
    }
}

impl RegenTransmit for RegenSink {
    fn regen(&self, chan: usize, frame: &Ax25Frame) {
        self.tx.push(chan, frame.pack());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::Receiver;

    fn queue() -> (TxQueue, Receiver<TxFrame>) {
        let (tx, rx) = bounded(16);
        (TxQueue { tx }, rx)
    }

    fn digi(rx_queue: TxQueue) -> AliasDigipeater {
        AliasDigipeater::new("W1XYZ".to_string(), vec!["WIDE".to_string()], rx_queue)
    }

    #[test]
    fn test_wide_alias_hop_consumed() {
        let (q, rx) = queue();
        let mut f = Ax25Frame::new_ui("N0CALL-9", "APDW10", &["WIDE2-2"], b">x").unwrap();
        digi(q).process(0, &mut f);

        let slot = f.addr(REPEATER_1).unwrap();
        assert_eq!(slot.ssid(), 1);
        assert!(!slot.has_been_repeated());
        assert_eq!(rx.try_recv().unwrap().chan, 0);
    }

    #[test]
    fn test_last_hop_marks_repeated() {
        let (q, rx) = queue();
        let mut f = Ax25Frame::new_ui("N0CALL-9", "APDW10", &["WIDE2-1"], b">x").unwrap();
        digi(q).process(0, &mut f);

        let slot = f.addr(REPEATER_1).unwrap();
        assert_eq!(slot.ssid(), 0);
        assert!(slot.has_been_repeated());
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_own_call_marks_repeated() {
        let (q, rx) = queue();
        let mut f = Ax25Frame::new_ui("N0CALL-9", "APDW10", &["W1XYZ"], b">x").unwrap();
        digi(q).process(0, &mut f);

        assert!(f.addr(REPEATER_1).unwrap().has_been_repeated());
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_unrelated_path_untouched() {
        let (q, rx) = queue();
        let mut f = Ax25Frame::new_ui("N0CALL-9", "APDW10", &["W9AAA-3"], b">x").unwrap();
        let before = f.pack();
        digi(q).process(0, &mut f);

        assert_eq!(f.pack(), before);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_already_repeated_path_done() {
        let (q, rx) = queue();
        let mut f = Ax25Frame::new_ui("N0CALL-9", "APDW10", &["WIDE1-0"], b">x").unwrap();
        f.addr_mut(REPEATER_1).unwrap().set_repeated(true);
        digi(q).process(0, &mut f);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_regen_copies_verbatim() {
        let (q, rx) = queue();
        let f = Ax25Frame::new_ui("N0CALL-9", "APDW10", &["WIDE2-2"], b">x").unwrap();
        RegenSink::new(q).regen(1, &f);

        let sent = rx.try_recv().unwrap();
        assert_eq!(sent.chan, 1);
        assert_eq!(sent.bytes, f.pack());
    }
}
