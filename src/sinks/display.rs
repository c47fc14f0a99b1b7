//! Console display of received frames

use crate::aprs::AprsReport;
use crate::ax25::Ax25Frame;
use crate::modem::SubDecoder;
use crate::recv::Heard;

// ANSI styles: received APRS traffic in green, everything else plain,
// warnings in red.
const STYLE_REC: &str = "\x1b[32m";
const STYLE_ERROR: &str = "\x1b[31m";
const STYLE_OFF: &str = "\x1b[0m";

/// Writes the operator-facing view of every received frame to stdout.
pub struct DisplaySink {
    color: bool,
    /// Additionally show non-ASCII payload text as hex.
    dump_nonascii: bool,
    /// Raw hex dump of every frame.
    dump_hex: bool,
}

impl DisplaySink {
    pub fn new(color: bool, dump_nonascii: bool, dump_hex: bool) -> Self {
        Self {
            color,
            dump_nonascii,
            dump_hex,
        }
    }

    fn style(&self, style: &'static str) -> &'static str {
        if self.color {
            style
        } else {
            ""
        }
    }

    /// "N0CALL-9 audio level = 52 [NONE] ||___" with the digipeater and
    /// probably-really annotations when applicable.
    pub fn heard_line(&self, heard: &Heard, alevel_text: &str, retry_text: &str, spectrum: &str) {
        let prefix = if heard.is_digipeated() {
            "Digipeater "
        } else {
            ""
        };
        println!();
        match &heard.probably_really {
            Some((_, station)) => println!(
                "{prefix}{} (probably {station}) audio level = {alevel_text} {retry_text} {spectrum}",
                heard.station
            ),
            None => println!(
                "{prefix}{} audio level = {alevel_text} {retry_text} {spectrum}",
                heard.station
            ),
        }
    }

    pub fn audio_level_warning(&self) {
        println!(
            "{}Audio input level is too high.  Reduce so most stations are around 50.{}",
            self.style(STYLE_ERROR),
            self.style(STYLE_OFF)
        );
    }

    /// The frame itself: "[chan.subchan] SRC>DST,PATH:payload", APRS in
    /// the receive color, anything else plain.
    pub fn frame_body(
        &self,
        chan: usize,
        sub_decoder: SubDecoder,
        num_subchan: usize,
        frame: &Ax25Frame,
    ) {
        let tag = match sub_decoder {
            SubDecoder::Dtmf => format!("[{chan}.dtmf] "),
            SubDecoder::Modem(s) if num_subchan > 1 => format!("[{chan}.{s}] "),
            SubDecoder::Modem(_) => format!("[{chan}] "),
        };
        let styled = frame.is_aprs() || sub_decoder == SubDecoder::Dtmf;
        let on = if styled { self.style(STYLE_REC) } else { "" };
        let off = if styled { self.style(STYLE_OFF) } else { "" };

        // APRS payloads commonly carry UTF-8 worth seeing; other payloads
        // are more likely binary, so restrict those to ASCII unless the
        // operator asked for hex alongside.
        let ascii_only = !frame.is_aprs() && !self.dump_nonascii;
        println!(
            "{on}{tag}{}{}{off}",
            frame.format_addrs(),
            frame.safe_print(ascii_only)
        );

        if self.dump_nonascii && frame.info().iter().any(|&b| b >= 0x80) {
            println!("{}", frame.safe_print(true));
        }

        if self.dump_hex {
            println!("------");
            print!("{}", frame.hex_dump());
            println!("------");
        }
    }

    /// Human-readable summary of a decoded APRS report.
    pub fn decoded(&self, report: &AprsReport) {
        let mut line = String::new();
        if !report.name.is_empty() {
            line.push_str(&format!("{}: ", report.name));
        }
        if let (Some(lat), Some(lon)) = (report.latitude, report.longitude) {
            let ns = if lat >= 0.0 { 'N' } else { 'S' };
            let ew = if lon >= 0.0 { 'E' } else { 'W' };
            line.push_str(&format!(
                "{ns} {:.4}, {ew} {:.4}",
                lat.abs(),
                lon.abs()
            ));
        }
        if let Some(speed) = report.speed_knots {
            line.push_str(&format!(", {speed:.0} knots"));
        }
        if let Some(course) = report.course_deg {
            line.push_str(&format!(", course {course:.0}"));
        }
        if let Some(alt) = report.altitude_ft {
            line.push_str(&format!(", alt {alt:.0} ft"));
        }
        if !report.comment.is_empty() {
            if !line.is_empty() {
                line.push_str(", ");
            }
            line.push_str(&report.comment);
        }
        if !line.is_empty() {
            println!("{line}");
        }
    }
}
