//! Touch-tone gateway sink
//!
//! Receives the tone-sequence payload of touch-tone-sourced frames
//! (the dispatcher already stripped the leading type byte) and renders
//! it as text for the command interpreter.

use tracing::{info, warn};

use crate::sinks::TouchToneGateway;
use crate::tt::{classify, multipress_to_text, two_key_to_text, SequenceKind};

pub struct TtGateway;

impl TtGateway {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TtGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl TouchToneGateway for TtGateway {
    fn sequence(&self, chan: usize, payload: &[u8]) {
        let buttons = String::from_utf8_lossy(payload);
        let decoded = match classify(&buttons) {
            SequenceKind::TwoKey => two_key_to_text(&buttons),
            SequenceKind::MultiPress => multipress_to_text(&buttons),
        };
        if decoded.errors > 0 {
            warn!(
                "[{chan}.dtmf] sequence \"{buttons}\" had {} invalid element(s)",
                decoded.errors
            );
        }
        info!("[{chan}.dtmf] \"{buttons}\" -> \"{}\"", decoded.text);
    }
}
