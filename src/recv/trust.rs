//! Per-consumer trust policy
//!
//! A frame whose checksum only validated after speculative bit fixing may
//! still be corrupted; the checksum is a probabilistic defense, not a
//! guarantee.  Local consumers get every frame and judge for themselves.
//! Actions that propagate beyond this operator must not spread corrupted
//! data at scale, so they require a bit-exact, well-typed frame.

use crate::modem::RetryLevel;

/// Computed once per frame, before fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustDecision {
    /// Operator display.  Always allowed.
    pub display: bool,
    /// Delivery to local client applications.  Always allowed.
    pub local_transport: bool,
    /// Forwarding onto the internet packet network.
    pub internet_gateway: bool,
    /// RF retransmission by the digipeater.
    pub digipeat: bool,
}

impl TrustDecision {
    pub fn evaluate(retries: RetryLevel, is_aprs: bool) -> Self {
        let propagate = retries.is_none() && is_aprs;
        Self {
            display: true,
            local_transport: true,
            internet_gateway: propagate,
            digipeat: propagate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_LEVELS: [RetryLevel; 13] = [
        RetryLevel::None,
        RetryLevel::SwapSingle,
        RetryLevel::SwapDouble,
        RetryLevel::SwapTriple,
        RetryLevel::RemoveSingle,
        RetryLevel::RemoveDouble,
        RetryLevel::RemoveTriple,
        RetryLevel::InsertSingle,
        RetryLevel::InsertDouble,
        RetryLevel::SwapTwoSep,
        RetryLevel::SwapMany,
        RetryLevel::RemoveMany,
        RetryLevel::RemoveTwoSep,
    ];

    #[test]
    fn test_display_and_local_always_allowed() {
        for retries in ALL_LEVELS {
            for is_aprs in [false, true] {
                let t = TrustDecision::evaluate(retries, is_aprs);
                assert!(t.display);
                assert!(t.local_transport);
            }
        }
    }

    #[test]
    fn test_corrected_frames_never_propagate() {
        for retries in &ALL_LEVELS[1..] {
            for is_aprs in [false, true] {
                let t = TrustDecision::evaluate(*retries, is_aprs);
                assert!(!t.internet_gateway);
                assert!(!t.digipeat);
            }
        }
    }

    #[test]
    fn test_non_aprs_never_propagates() {
        let t = TrustDecision::evaluate(RetryLevel::None, false);
        assert!(!t.internet_gateway);
        assert!(!t.digipeat);
    }

    #[test]
    fn test_bit_exact_aprs_propagates() {
        let t = TrustDecision::evaluate(RetryLevel::None, true);
        assert!(t.internet_gateway);
        assert!(t.digipeat);
    }
}
