//! Fixed-order fan-out of received frames to every consumer
//!
//! The dispatcher owns each frame from receipt to destruction.  Local
//! transports receive a serialized snapshot taken before the digipeater,
//! the only consumer allowed to mutate the frame, gets the last word.
//! The whole sequence runs under one lock, so dispatches from the
//! receive thread and the background re-decode thread never interleave.

use std::sync::Mutex;

use tracing::debug;

use crate::aprs::{self, feet_to_meters};
use crate::config::Config;
use crate::modem::{AudioLevel, Candidate, SubDecoder, MAX_CHANS, MAX_SUBCHANS};
use crate::recv::{resolve_heard, retry_display, TrustDecision};
use crate::sinks::{
    Digipeater, DisplaySink, InternetGateway, LocalTransport, PacketLog, RegenTransmit,
    TouchToneGateway, Waypoint, WaypointSink,
};

/// Every consumer the dispatcher can deliver to.  Absent sinks are simply
/// skipped; present ones can all be replaced by test doubles.
#[derive(Default)]
pub struct SinkRegistry {
    pub transports: Vec<Box<dyn LocalTransport>>,
    pub logger: Option<Box<dyn PacketLog>>,
    pub waypoints: Option<Box<dyn WaypointSink>>,
    pub igate: Option<Box<dyn InternetGateway>>,
    pub digipeater: Option<Box<dyn Digipeater>>,
    pub regen: Option<Box<dyn RegenTransmit>>,
    pub tt_gateway: Option<Box<dyn TouchToneGateway>>,
}

pub struct Dispatcher {
    config: Config,
    display: DisplaySink,
    sinks: Mutex<SinkRegistry>,
}

impl Dispatcher {
    pub fn new(config: Config, display: DisplaySink, sinks: SinkRegistry) -> Self {
        Self {
            config,
            display,
            sinks: Mutex::new(sinks),
        }
    }

    /// Deliver one received frame to all configured consumers.
    ///
    /// Safe to call from any thread; one frame's dispatch is atomic with
    /// respect to any other.  Never reports failure to the caller: sink
    /// faults are sink-local.  Out-of-range channel or sub-decoder values
    /// indicate a defect in the demodulator and abort the process.
    pub fn dispatch(&self, candidate: Candidate) {
        let Candidate {
            chan,
            sub_decoder,
            mut frame,
            alevel,
            retries,
            spectrum,
        } = candidate;

        assert!(chan < MAX_CHANS, "channel {chan} out of range");
        if let Some(s) = sub_decoder.modem_index() {
            assert!(s < MAX_SUBCHANS, "sub-decoder {s} out of range");
        }

        let chan_cfg = &self.config.channels[chan];
        let heard = resolve_heard(&frame);
        let is_aprs = frame.is_aprs();
        let trust = TrustDecision::evaluate(retries, is_aprs);

        let sinks = self
            .sinks
            .lock()
            .expect("dispatch lock poisoned by earlier panic");

        // 1. Heard line.  Not for touch-tone input, not when suppressed,
        // not for copies flagged to skip the quality display, and not
        // when the payload had no stations at all.
        if trust.display
            && sub_decoder != SubDecoder::Dtmf
            && !chan_cfg.quiet_heard
            && alevel.is_displayable()
        {
            if let Some(heard) = &heard {
                let retry_text = retry_display(chan_cfg.fix_bits, retries);
                self.display
                    .heard_line(heard, &alevel.text(), &retry_text, &spectrum);
            }
            if alevel.0 > AudioLevel::TOO_HIGH {
                self.display.audio_level_warning();
            }
        }

        // 2. The frame itself.
        if trust.display {
            self.display
                .frame_body(chan, sub_decoder, chan_cfg.num_subchan, &frame);
        }

        // 3. APRS decode, log, waypoint.
        if is_aprs && !chan_cfg.quiet_decode {
            if let Ok(report) = aprs::decode(&frame) {
                self.display.decoded(&report);
                if let Some(logger) = &sinks.logger {
                    logger.log(chan, &report, &frame, alevel, retries);
                }
                if let (Some(lat), Some(lon)) = (report.latitude, report.longitude) {
                    if let Some(exporter) = &sinks.waypoints {
                        exporter.send(&Waypoint {
                            name: report.waypoint_name().to_string(),
                            latitude: lat,
                            longitude: lon,
                            symbol_table: report.symbol_table,
                            symbol_code: report.symbol_code,
                            altitude_m: report.altitude_ft.map(feet_to_meters),
                            course_deg: report.course_deg,
                            speed_knots: report.speed_knots,
                            comment: report.comment.clone(),
                        });
                    }
                }
            }
        }

        // 4. Serialize once; every local transport gets the identical
        // bytes.  This snapshot must precede step 8's mutation or client
        // applications would see a frame different from what was heard.
        let wire = frame.pack();
        if trust.local_transport {
            for transport in &sinks.transports {
                transport.deliver(chan, &wire);
                debug!("{} bytes to {}", wire.len(), transport.name());
            }
        }

        // 5. Touch-tone frames go to the gateway and nowhere else.
        if sub_decoder == SubDecoder::Dtmf {
            if frame.info().len() >= 2 {
                if let Some(gateway) = &sinks.tt_gateway {
                    gateway.sequence(chan, &frame.info()[1..]);
                }
            }
            return;
        }

        // 6. Internet gateway, only with full trust.
        if trust.internet_gateway {
            if let Some(igate) = &sinks.igate {
                igate.forward(chan, &frame);
            }
        }

        // 7. Regenerated copy, all frame types, independent of trust.
        if let Some(regen) = &sinks.regen {
            regen.regen(chan, &frame);
        }

        // 8. Digipeater last: it may mark repeater slots in place, and
        // everything that needed the original bytes already has them.
        if trust.digipeat {
            if let Some(digipeater) = &sinks.digipeater {
                digipeater.process(chan, &mut frame);
            }
        }

        // 9. Frame dropped here; nothing outlives the dispatch cycle.
    }
}
