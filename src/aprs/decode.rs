//! Decode APRS information fields into a flat report

use thiserror::Error;

use crate::ax25::{Ax25Frame, SOURCE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AprsError {
    #[error("frame is not an APRS frame")]
    NotAprs,
}

/// Everything we could extract from one APRS payload.  Fields stay `None`
/// or empty when the report does not carry them; an unrecognized data type
/// still produces a report so every APRS frame gets a log row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AprsReport {
    /// Data type indicator, the first info byte.
    pub data_type: char,
    /// Source callsign with SSID.
    pub source: String,
    /// Object name for object reports, empty otherwise.
    pub name: String,
    pub symbol_table: char,
    pub symbol_code: char,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude_ft: Option<f64>,
    pub course_deg: Option<f32>,
    pub speed_knots: Option<f32>,
    pub comment: String,
}

impl AprsReport {
    /// Name to label a waypoint with: explicit object name if present,
    /// source callsign otherwise.
    pub fn waypoint_name(&self) -> &str {
        if self.name.is_empty() {
            &self.source
        } else {
            &self.name
        }
    }

    pub fn has_position(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

pub fn decode(frame: &Ax25Frame) -> Result<AprsReport, AprsError> {
    if !frame.is_aprs() {
        return Err(AprsError::NotAprs);
    }
    let info = frame.info();
    let mut report = AprsReport {
        data_type: frame.dti(),
        source: frame
            .addr(SOURCE)
            .map(|a| a.to_string())
            .unwrap_or_default(),
        symbol_table: '/',
        symbol_code: '/',
        ..Default::default()
    };

    match report.data_type {
        // Position, no timestamp.
        '!' | '=' => decode_position(&mut report, &info[1..]),
        // Position with 7-character timestamp.
        '/' | '@' => {
            if info.len() > 8 {
                decode_position(&mut report, &info[8..]);
            }
        }
        // Object: 9-character name, live/killed flag, timestamp, position.
        ';' => {
            if info.len() > 18 {
                report.name = String::from_utf8_lossy(&info[1..10]).trim_end().to_string();
                decode_position(&mut report, &info[18..]);
            }
        }
        _ => {
            report.comment =
                String::from_utf8_lossy(info.get(1..).unwrap_or_default()).into_owned();
        }
    }

    extract_altitude(&mut report);
    Ok(report)
}

/// Position in either representation, followed by the optional
/// course/speed data extension and the comment.
fn decode_position(report: &mut AprsReport, body: &[u8]) {
    let rest: &[u8] = if body.first().is_some_and(u8::is_ascii_digit) {
        decode_uncompressed(report, body)
    } else {
        decode_compressed(report, body)
    };
    report.comment = String::from_utf8_lossy(rest).into_owned();
}

/// "DDMM.mmN/DDDMM.mmW$" with the symbol table and code wrapped around the
/// longitude.  Returns what follows.
fn decode_uncompressed<'a>(report: &mut AprsReport, body: &'a [u8]) -> &'a [u8] {
    if body.len() < 19 {
        return body;
    }
    let lat = parse_latlon(&body[0..8], 2, body[7]);
    let lon = parse_latlon(&body[9..18], 3, body[17]);
    let (Some(lat), Some(lon)) = (lat, lon) else {
        return body;
    };
    report.latitude = Some(lat);
    report.longitude = Some(lon);
    report.symbol_table = body[8] as char;
    report.symbol_code = body[18] as char;

    let mut rest = &body[19..];
    // Data extension: "ccc/sss" course and speed.
    if rest.len() >= 7
        && rest[3] == b'/'
        && rest[..3].iter().all(u8::is_ascii_digit)
        && rest[4..7].iter().all(u8::is_ascii_digit)
    {
        report.course_deg = ascii_num(&rest[..3]).map(|v| v as f32);
        report.speed_knots = ascii_num(&rest[4..7]).map(|v| v as f32);
        rest = &rest[7..];
    }
    rest
}

/// Base-91 compressed position: table, 4 bytes latitude, 4 bytes
/// longitude, code, 2-byte course/speed, compression type.
fn decode_compressed<'a>(report: &mut AprsReport, body: &'a [u8]) -> &'a [u8] {
    if body.len() < 13 {
        return body;
    }
    let table = body[0] as char;
    let valid_table = matches!(table, '/' | '\\') || table.is_ascii_uppercase() || ('a'..='j').contains(&table);
    if !valid_table || body[1..9].iter().any(|&b| !(33..=124).contains(&b)) {
        return body;
    }
    report.symbol_table = table;
    report.symbol_code = body[9] as char;
    report.latitude = Some(90.0 - base91(&body[1..5]) / 380926.0);
    report.longitude = Some(-180.0 + base91(&body[5..9]) / 190463.0);

    let c = body[10];
    let s = body[11];
    // Space means no course/speed; '{' would be a radio range instead.
    if (b'!'..=b'z').contains(&c) {
        report.course_deg = Some(f32::from(c - 33) * 4.0);
        report.speed_knots = Some(1.08f32.powi(i32::from(s.saturating_sub(33))) - 1.0);
    }
    &body[13..]
}

fn base91(bytes: &[u8]) -> f64 {
    bytes
        .iter()
        .fold(0f64, |acc, &b| acc * 91.0 + f64::from(b - 33))
}

/// "DDMM.mm" / "DDDMM.mm" with hemisphere letter.  Position ambiguity
/// replaces trailing digits with spaces; treat those as zero.
fn parse_latlon(field: &[u8], deg_digits: usize, hemi: u8) -> Option<f64> {
    let text: String = field[..field.len() - 1]
        .iter()
        .map(|&b| if b == b' ' { '0' } else { b as char })
        .collect();
    let deg: f64 = text.get(..deg_digits)?.parse().ok()?;
    let min: f64 = text.get(deg_digits..)?.parse().ok()?;
    let value = deg + min / 60.0;
    match hemi {
        b'N' | b'E' => Some(value),
        b'S' | b'W' => Some(-value),
        _ => None,
    }
}

fn ascii_num(bytes: &[u8]) -> Option<u32> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

/// "/A=nnnnnn" altitude in feet, anywhere in the comment; removed from the
/// comment text once captured.
fn extract_altitude(report: &mut AprsReport) {
    if let Some(pos) = report.comment.find("/A=") {
        let digits = &report.comment[pos + 3..];
        if digits.len() >= 6 && digits.as_bytes()[..6].iter().all(u8::is_ascii_digit) {
            report.altitude_ft = digits[..6].parse::<f64>().ok();
            let mut c = report.comment.clone();
            c.replace_range(pos..pos + 9, "");
            report.comment = c;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(info: &[u8]) -> Ax25Frame {
        Ax25Frame::new_ui("N0CALL-9", "APDW10", &[], info).unwrap()
    }

    #[test]
    fn test_uncompressed_position() {
        let r = decode(&frame(b"!4237.14N/07120.83W>Hello")).unwrap();
        assert!((r.latitude.unwrap() - 42.619).abs() < 0.001);
        assert!((r.longitude.unwrap() + 71.3472).abs() < 0.001);
        assert_eq!(r.symbol_table, '/');
        assert_eq!(r.symbol_code, '>');
        assert_eq!(r.comment, "Hello");
    }

    #[test]
    fn test_course_speed_extension() {
        let r = decode(&frame(b"=4237.14N/07120.83W>088/036comment")).unwrap();
        assert_eq!(r.course_deg, Some(88.0));
        assert_eq!(r.speed_knots, Some(36.0));
        assert_eq!(r.comment, "comment");
    }

    #[test]
    fn test_altitude_in_comment() {
        let r = decode(&frame(b"!4237.14N/07120.83W>test /A=001234 x")).unwrap();
        assert_eq!(r.altitude_ft, Some(1234.0));
        assert_eq!(r.comment, "test  x");
    }

    #[test]
    fn test_timestamped_position() {
        let r = decode(&frame(b"@092345z4903.50N/07201.75W>")).unwrap();
        assert!((r.latitude.unwrap() - 49.0583).abs() < 0.001);
    }

    #[test]
    fn test_object_report() {
        let r = decode(&frame(b";LEADER   *092345z4903.50N/07201.75W>")).unwrap();
        assert_eq!(r.name, "LEADER");
        assert_eq!(r.waypoint_name(), "LEADER");
        assert!(r.has_position());
    }

    #[test]
    fn test_compressed_position() {
        // Example from the APRS specification.
        let r = decode(&frame(b"!/5L!!<*e7>7P[Comment")).unwrap();
        assert!((r.latitude.unwrap() - 49.5).abs() < 0.01);
        assert!((r.longitude.unwrap() + 72.75).abs() < 0.01);
        assert_eq!(r.comment, "Comment");
    }

    #[test]
    fn test_status_has_no_position() {
        let r = decode(&frame(b">Net tonight 7pm")).unwrap();
        assert!(!r.has_position());
        assert_eq!(r.waypoint_name(), "N0CALL-9");
        assert_eq!(r.comment, "Net tonight 7pm");
    }

    #[test]
    fn test_non_aprs_rejected() {
        let packed = frame(b"!4237.14N/07120.83W>").pack();
        let mut sframe = packed[..14].to_vec();
        sframe.push(0x01);
        let f = Ax25Frame::from_bytes(&sframe).unwrap();
        assert_eq!(decode(&f), Err(AprsError::NotAprs));
    }
}
