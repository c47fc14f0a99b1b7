//! Software TNC for amateur packet radio
//!
//! Takes decoded AX.25 candidate frames from an external demodulator,
//! arbitrates redundant decodes, and distributes each frame to the
//! configured consumers: console display, KISS client transports, the
//! packet log, the waypoint exporter, the internet gateway, the
//! touch-tone gateway, and the digipeater.

mod aprs;
mod ax25;
mod config;
mod modem;
mod recv;
mod sinks;
mod source;
mod tt;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ax25::Ax25Frame;
use config::Config;
use modem::{Arbiter, Candidate, ModemFamily, SubDecoder, MAX_CHANS};
use recv::{Dispatcher, SinkRegistry};
use sinks::{
    spawn_transmitter, AliasDigipeater, ChannelFilters, DisplaySink, FileLog, IgateSink,
    KissSerialPort, KissTcpServer, NmeaWaypointPort, RegenSink, TtGateway, WaypointFormat,
};
use source::{spawn_stdin_source, FrameInput};

/// Ticks of the settling clock a candidate may wait for competitors.
const ARBITER_SETTLE_TICKS: u32 = 2;

/// Settling clock period while the frame source is quiet.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("===========================================");
    info!("   aprs-tnc - software packet radio TNC");
    info!("===========================================");

    let config = Config::from_env();

    info!("Configuration:");
    info!("  Station: {}", config.mycall);
    for (n, chan) in config.channels.iter().enumerate() {
        if !chan.enabled {
            continue;
        }
        match chan.modem.family {
            ModemFamily::Afsk => info!(
                "  Channel {n}: {} baud AFSK {}/{} Hz, decimate {}, {} decoder(s)",
                chan.baud,
                chan.modem.mark_freq,
                chan.modem.space_freq,
                chan.modem.decimate,
                chan.num_subchan
            ),
            ModemFamily::Scramble => info!(
                "  Channel {n}: {} baud scrambled, {} decoder(s)",
                chan.baud, chan.num_subchan
            ),
        }
    }

    // Consumers.  The transmit queue is shared by everything that keys
    // the radio.
    let tx_queue = spawn_transmitter();
    let mut registry = SinkRegistry {
        regen: Some(Box::new(RegenSink::new(tx_queue.clone()))),
        ..Default::default()
    };

    if let Some(port) = config.kiss_tcp_port {
        registry
            .transports
            .push(Box::new(KissTcpServer::spawn(port)));
    }
    if let Some(path) = &config.kiss_serial {
        registry
            .transports
            .push(Box::new(KissSerialPort::new(path.clone())));
    }
    if let Some(dir) = &config.log_dir {
        registry.logger = Some(Box::new(FileLog::new(dir.clone())));
    }
    if let Some(port) = &config.waypoint_port {
        let format = if config.waypoint_kenwood {
            WaypointFormat::Kenwood
        } else {
            WaypointFormat::Generic
        };
        registry.waypoints = Some(Box::new(NmeaWaypointPort::new(port.clone(), format)));
    }
    if let Some(igate_config) = config.igate.clone() {
        info!("  IGate: {}:{}", igate_config.server, igate_config.port);
        let filters =
            ChannelFilters::new(std::array::from_fn(|n| config.channels[n].igate_filter.clone()));
        registry.igate =
            Some(Box::new(IgateSink::spawn(igate_config).with_filter(Box::new(filters))));
    }
    if config.digi_enabled {
        registry.digipeater = Some(Box::new(AliasDigipeater::new(
            config.mycall.clone(),
            config.digi_aliases.clone(),
            tx_queue.clone(),
        )));
    }
    if config.tt_gateway_enabled {
        registry.tt_gateway = Some(Box::new(TtGateway::new()));
    }

    let display = DisplaySink::new(true, config.dump_nonascii, config.dump_hex);
    let num_subchan = std::array::from_fn(|n| config.channels[n].num_subchan);
    let dispatcher = Arc::new(Dispatcher::new(config, display, registry));
    let mut arbiter = Arbiter::new(num_subchan, ARBITER_SETTLE_TICKS);

    let (frame_tx, frame_rx) = crossbeam_channel::bounded::<FrameInput>(256);
    spawn_stdin_source(frame_tx);

    let mut frames_processed = 0u64;
    let mut last_report = Instant::now();

    // Main processing loop.  One frame's entire dispatch completes
    // before the next begins; the settling clock runs off the receive
    // timeout.
    loop {
        match frame_rx.recv_timeout(TICK_INTERVAL) {
            Ok(input) => {
                frames_processed += 1;
                let FrameInput {
                    chan,
                    sub_decoder,
                    bytes,
                    alevel,
                    retries,
                } = input;

                let frame = match Ax25Frame::from_bytes(&bytes) {
                    Ok(f) => f,
                    Err(e) => {
                        warn!("Dropping oversized frame: {e}");
                        continue;
                    }
                };

                match sub_decoder {
                    // Touch-tone frames have no competing decoders and
                    // carry no audio level.
                    SubDecoder::Dtmf => dispatcher.dispatch(Candidate {
                        chan,
                        sub_decoder,
                        frame,
                        alevel: modem::AudioLevel::NOT_AUDIO,
                        retries,
                        spectrum: String::new(),
                    }),
                    SubDecoder::Modem(subchan) => {
                        if let Some(candidate) =
                            arbiter.accept(chan, subchan, frame, alevel, retries)
                        {
                            dispatcher.dispatch(candidate);
                        }
                    }
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                for chan in 0..MAX_CHANS {
                    if let Some(candidate) = arbiter.tick(chan) {
                        dispatcher.dispatch(candidate);
                    }
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                break;
            }
        }

        if last_report.elapsed() >= Duration::from_secs(30) {
            info!("Frames processed: {frames_processed}");
            last_report = Instant::now();
        }
    }

    // Any candidate still settling goes out before teardown.
    for chan in 0..MAX_CHANS {
        for _ in 0..=ARBITER_SETTLE_TICKS {
            if let Some(candidate) = arbiter.tick(chan) {
                dispatcher.dispatch(candidate);
            }
        }
    }

    info!("Shutdown complete. Frames processed: {frames_processed}");
    Ok(())
}
