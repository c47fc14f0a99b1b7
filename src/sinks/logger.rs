//! Daily CSV log of received packets
//!
//! Rather than the raw, sometimes cryptic payload text, separated
//! properties go into CSV for easy reading and later processing.  One
//! file per UTC day, header written when the file is created.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Utc;
use tracing::{info, warn};

use crate::aprs::{feet_to_meters, AprsReport};
use crate::ax25::Ax25Frame;
use crate::modem::{AudioLevel, RetryLevel};
use crate::recv::resolve_heard;
use crate::sinks::PacketLog;

const HEADER: &str = "chan,utime,isotime,source,heard,level,error,dti,name,symbol,latitude,longitude,speed,course,altitude,comment\n";

pub struct FileLog {
    dir: PathBuf,
    state: Mutex<LogState>,
}

#[derive(Default)]
struct LogState {
    file: Option<File>,
    open_name: String,
}

impl FileLog {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            state: Mutex::new(LogState::default()),
        }
    }
}

impl PacketLog for FileLog {
    fn log(
        &self,
        chan: usize,
        report: &AprsReport,
        frame: &Ax25Frame,
        alevel: AudioLevel,
        retries: RetryLevel,
    ) {
        let now = Utc::now();
        let fname = now.format("%Y-%m-%d.log").to_string();

        let mut state = self.state.lock().expect("log state lock");

        // Roll to a new file when the UTC day changes.
        if state.open_name != fname {
            state.file = None;
            let path = self.dir.join(&fname);
            let existed = path.exists();
            match OpenOptions::new().append(true).create(true).open(&path) {
                Ok(mut file) => {
                    info!("Opening log file \"{fname}\"");
                    if !existed {
                        let _ = file.write_all(HEADER.as_bytes());
                    }
                    state.file = Some(file);
                    state.open_name = fname;
                }
                Err(e) => {
                    warn!("Can't open log file \"{}\" for write: {e}", path.display());
                    state.open_name.clear();
                    return;
                }
            }
        }

        let heard = resolve_heard(frame)
            .map(|h| h.log_text())
            .unwrap_or_default();

        let line = format!(
            "{chan},{utime},{isotime},{source},{heard},{level},{error},{dti},{name},{symbol},{lat},{lon},{speed},{course},{alt},{comment}\n",
            utime = now.timestamp(),
            isotime = now.format("%Y-%m-%dT%H:%M:%SZ"),
            source = quote_for_csv(&report.source),
            heard = quote_for_csv(&heard),
            level = alevel.0,
            error = retries as u8,
            dti = quote_for_csv(&report.data_type.to_string()),
            name = quote_for_csv(report.waypoint_name()),
            symbol = quote_for_csv(&format!("{}{}", report.symbol_table, report.symbol_code)),
            lat = opt_num(report.latitude, 6),
            lon = opt_num(report.longitude, 6),
            speed = opt_num(report.speed_knots.map(f64::from), 1),
            course = opt_num(report.course_deg.map(f64::from), 1),
            alt = opt_num(report.altitude_ft.map(feet_to_meters), 1),
            comment = quote_for_csv(&report.comment),
        );

        if let Some(file) = state.file.as_mut() {
            if let Err(e) = file.write_all(line.as_bytes()) {
                warn!("Log write failed: {e}");
                state.file = None;
                state.open_name.clear();
            }
        }
    }
}

fn opt_num(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{v:.decimals$}"))
        .unwrap_or_default()
}

/// CSV needs quotes when the value contains a comma or quote; embedded
/// quotes are doubled.
fn quote_for_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aprs;

    #[test]
    fn test_quote_for_csv() {
        assert_eq!(quote_for_csv("plain"), "plain");
        assert_eq!(quote_for_csv("a,b"), "\"a,b\"");
        assert_eq!(quote_for_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_opt_num() {
        assert_eq!(opt_num(None, 1), "");
        assert_eq!(opt_num(Some(42.61901), 6), "42.619010");
    }

    #[test]
    fn test_log_writes_header_and_row() {
        let dir = std::env::temp_dir().join(format!("aprs-tnc-log-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let log = FileLog::new(dir.clone());
        let frame = Ax25Frame::new_ui(
            "N0CALL-9",
            "APDW10",
            &[],
            b"!4237.14N/07120.83W>with, comma",
        )
        .unwrap();
        let report = aprs::decode(&frame).unwrap();
        log.log(0, &report, &frame, AudioLevel(50), RetryLevel::None);

        let fname = Utc::now().format("%Y-%m-%d.log").to_string();
        let contents = std::fs::read_to_string(dir.join(fname)).unwrap();
        assert!(contents.starts_with("chan,utime"));
        assert!(contents.contains("N0CALL-9"));
        assert!(contents.contains("\"with, comma\""));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
