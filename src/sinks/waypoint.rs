//! NMEA waypoint sentences for GPS receivers and mapping software

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::sinks::WaypointSink;

/// A resolved location ready for export.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub symbol_table: char,
    pub symbol_code: char,
    pub altitude_m: Option<f64>,
    pub course_deg: Option<f32>,
    pub speed_knots: Option<f32>,
    pub comment: String,
}

/// Which sentence the attached receiver understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaypointFormat {
    /// `$GPWPL`: position and name only, understood by everything.
    Generic,
    /// `$PKWDWPL`: adds speed, course, altitude and the APRS symbol.
    Kenwood,
}

/// Writes waypoint sentences to a serial port or file.
pub struct NmeaWaypointPort {
    path: PathBuf,
    format: WaypointFormat,
    port: Mutex<Option<File>>,
}

impl NmeaWaypointPort {
    pub fn new(path: PathBuf, format: WaypointFormat) -> Self {
        Self {
            path,
            format,
            port: Mutex::new(None),
        }
    }
}

impl WaypointSink for NmeaWaypointPort {
    fn send(&self, waypoint: &Waypoint) {
        let sentence = match self.format {
            WaypointFormat::Generic => gpwpl_sentence(waypoint),
            WaypointFormat::Kenwood => pkwdwpl_sentence(waypoint, chrono::Utc::now()),
        };
        debug!("waypoint ({}): {}", waypoint.comment, sentence.trim_end());

        let mut port = self.port.lock().expect("waypoint port lock");
        if port.is_none() {
            match OpenOptions::new().append(true).create(true).open(&self.path) {
                Ok(f) => *port = Some(f),
                Err(e) => {
                    warn!("Can't open waypoint port {}: {e}", self.path.display());
                    return;
                }
            }
        }
        if let Some(f) = port.as_mut() {
            if let Err(e) = f.write_all(sentence.as_bytes()) {
                warn!("Waypoint write failed: {e}");
                // Drop the handle; the next waypoint retries the open.
                *port = None;
            }
        }
    }
}

/// Generic waypoint sentence:
/// `$GPWPL,ddmm.mmmm,ns,dddmm.mmmm,ew,name*XX`
pub fn gpwpl_sentence(waypoint: &Waypoint) -> String {
    let (lat, ns) = latitude_to_nmea(waypoint.latitude);
    let (lon, ew) = longitude_to_nmea(waypoint.longitude);
    let name = sanitize_name(&waypoint.name);
    let body = format!("GPWPL,{lat},{ns},{lon},{ew},{name}");
    format!("${body}*{:02X}\r\n", nmea_checksum(&body))
}

/// Kenwood waypoint sentence:
/// `$PKWDWPL,hhmmss,V,ddmm.mmmm,ns,dddmm.mmmm,ew,speed,course,ddmmyy,alt,name,ts*XX`
///
/// Speed is knots, altitude meters; the trailing two characters are the
/// APRS symbol table and code.
pub fn pkwdwpl_sentence(waypoint: &Waypoint, now: chrono::DateTime<chrono::Utc>) -> String {
    let (lat, ns) = latitude_to_nmea(waypoint.latitude);
    let (lon, ew) = longitude_to_nmea(waypoint.longitude);
    let name = sanitize_name(&waypoint.name);
    let speed = waypoint
        .speed_knots
        .map(|s| format!("{s:.1}"))
        .unwrap_or_default();
    let course = waypoint
        .course_deg
        .map(|c| format!("{c:.1}"))
        .unwrap_or_default();
    let alt = waypoint
        .altitude_m
        .map(|a| format!("{a:.1}"))
        .unwrap_or_default();
    let body = format!(
        "PKWDWPL,{time},V,{lat},{ns},{lon},{ew},{speed},{course},{date},{alt},{name},{table}{code}",
        time = now.format("%H%M%S"),
        date = now.format("%d%m%y"),
        table = waypoint.symbol_table,
        code = waypoint.symbol_code,
    );
    format!("${body}*{:02X}\r\n", nmea_checksum(&body))
}

/// NMEA wants degrees and decimal minutes packed together.
fn latitude_to_nmea(latitude: f64) -> (String, char) {
    let hemi = if latitude < 0.0 { 'S' } else { 'N' };
    let d = latitude.abs();
    let deg = d.trunc();
    let min = (d - deg) * 60.0;
    (format!("{:09.4}", deg * 100.0 + min), hemi)
}

fn longitude_to_nmea(longitude: f64) -> (String, char) {
    let hemi = if longitude < 0.0 { 'W' } else { 'E' };
    let d = longitude.abs();
    let deg = d.trunc();
    let min = (d - deg) * 60.0;
    (format!("{:010.4}", deg * 100.0 + min), hemi)
}

/// Commas and asterisks would break the sentence framing.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c == ',' || c == '*' { ' ' } else { c })
        .collect()
}

fn nmea_checksum(body: &str) -> u8 {
    body.bytes().fold(0, |acc, b| acc ^ b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waypoint() -> Waypoint {
        Waypoint {
            name: "N0CALL-9".to_string(),
            latitude: 42.61901,
            longitude: -71.34717,
            symbol_table: '/',
            symbol_code: '>',
            altitude_m: None,
            course_deg: None,
            speed_knots: None,
            comment: String::new(),
        }
    }

    #[test]
    fn test_sentence_format() {
        let s = gpwpl_sentence(&waypoint());
        assert!(s.starts_with("$GPWPL,4237.1406,N,07120.8302,W,N0CALL-9*"));
        assert!(s.ends_with("\r\n"));
    }

    #[test]
    fn test_checksum() {
        // Every byte between '$' and '*' XORed together.
        let s = gpwpl_sentence(&waypoint());
        let star = s.find('*').unwrap();
        let expected = s[1..star].bytes().fold(0u8, |a, b| a ^ b);
        let coded = u8::from_str_radix(&s[star + 1..star + 3], 16).unwrap();
        assert_eq!(coded, expected);
    }

    #[test]
    fn test_name_sanitized() {
        let mut w = waypoint();
        w.name = "BAD,NAME*".to_string();
        let s = gpwpl_sentence(&w);
        assert!(s.contains("BAD NAME "));
    }

    #[test]
    fn test_kenwood_sentence() {
        let mut w = waypoint();
        w.speed_knots = Some(36.0);
        w.course_deg = Some(88.0);
        w.altitude_m = Some(376.1);
        let now = chrono::DateTime::parse_from_rfc3339("2016-03-05T14:30:15Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let s = pkwdwpl_sentence(&w, now);
        assert!(s.starts_with(
            "$PKWDWPL,143015,V,4237.1406,N,07120.8302,W,36.0,88.0,050316,376.1,N0CALL-9,/>*"
        ));
    }

    #[test]
    fn test_kenwood_empty_optionals() {
        let now = chrono::Utc::now();
        let s = pkwdwpl_sentence(&waypoint(), now);
        // Unknown speed/course/altitude leave their fields empty.
        assert!(s.contains(",W,,,"));
    }

    #[test]
    fn test_southern_eastern_hemispheres() {
        let mut w = waypoint();
        w.latitude = -33.8688;
        w.longitude = 151.2093;
        let s = gpwpl_sentence(&w);
        assert!(s.contains(",S,"));
        assert!(s.contains(",E,"));
    }
}
