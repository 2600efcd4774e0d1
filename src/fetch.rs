//! HTTP download of source archives.
//!
//! Streams the response body through a temporary file in the destination
//! directory so a failed transfer never leaves a partial archive at the
//! final path. When the server exposes a `Last-Modified` header, the
//! downloaded file inherits that timestamp.

use std::io::{Read, Write};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use filetime::FileTime;

use crate::error::{Error, Result};
use crate::output;

/// Default transfer timeout for archive downloads, in seconds.
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// Get the download timeout from the environment or use the default.
/// Cached for performance (only reads the env var once).
fn download_timeout() -> Duration {
    static TIMEOUT: OnceLock<Duration> = OnceLock::new();
    *TIMEOUT.get_or_init(|| {
        let secs = std::env::var("GEOS_BUILD_HTTP_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT_SECS);
        // Clamp to a sane range (5 seconds to 1 hour)
        Duration::from_secs(secs.clamp(5, 3600))
    })
}

/// Download `url` to `dest`, staging through a temp file next to it.
///
/// Returns the number of bytes written. The `Last-Modified` response
/// header, when present and well-formed, becomes the file's access and
/// modification time; a malformed header only produces a warning.
pub fn download_to(url: &str, dest: &Path) -> Result<u64> {
    let response = ureq::get(url)
        .timeout(download_timeout())
        .call()
        .map_err(|e| Error::Network {
            url: url.to_string(),
            source: Box::new(e),
        })?;

    let timestamp = match response.header("last-modified") {
        Some(date) => {
            let parsed = parse_http_date(date);
            if parsed.is_none() {
                output::warning(&format!("unparseable Last-Modified header: {}", date));
            }
            parsed
        }
        None => None,
    };

    let pb = match response
        .header("content-length")
        .and_then(|s| s.parse().ok())
    {
        Some(len) => output::download_progress(len),
        None => output::spinner("downloading"),
    };

    let staging_dir = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(staging_dir)
        .map_err(Error::fs(format!("cannot stage download in {}", staging_dir.display())))?;

    let mut reader = response.into_reader();
    let mut buffer = [0u8; 8192];
    let mut total_bytes = 0u64;

    loop {
        let bytes_read = reader.read(&mut buffer).map_err(|e| Error::Network {
            url: url.to_string(),
            source: Box::new(e),
        })?;

        if bytes_read == 0 {
            break;
        }

        tmp.write_all(&buffer[..bytes_read])
            .map_err(Error::fs("write error during download"))?;

        total_bytes += bytes_read as u64;
        pb.set_position(total_bytes);
    }

    pb.finish_and_clear();

    tmp.persist(dest)
        .map_err(|e| Error::Filesystem {
            context: format!("cannot move download into place at {}", dest.display()),
            source: e.error,
        })?;

    if let Some(mtime) = timestamp {
        filetime::set_file_times(dest, mtime, mtime)
            .map_err(Error::fs(format!("cannot set timestamps on {}", dest.display())))?;
    }

    Ok(total_bytes)
}

// ============================================================================
// RFC 1123 date parsing
// ============================================================================

/// Parse an RFC 1123 date like `Sun, 06 Nov 1994 08:49:37 GMT` as UTC.
///
/// Returns `None` for anything that does not match the fixed layout.
/// Hand-rolled to avoid pulling in a date-time crate for one header.
fn parse_http_date(s: &str) -> Option<FileTime> {
    // "Sun, 06 Nov 1994 08:49:37 GMT"
    let rest = s.trim();
    let (_weekday, rest) = rest.split_once(", ")?;
    let mut fields = rest.split(' ');

    let day: u64 = fields.next()?.parse().ok()?;
    let month = month_number(fields.next()?)?;
    let year: i64 = fields.next()?.parse().ok()?;
    let time = fields.next()?;
    if fields.next()? != "GMT" || fields.next().is_some() {
        return None;
    }

    let mut clock = time.split(':');
    let hour: u64 = clock.next()?.parse().ok()?;
    let minute: u64 = clock.next()?.parse().ok()?;
    let second: u64 = clock.next()?.parse().ok()?;
    if clock.next().is_some() || hour > 23 || minute > 59 || second > 60 {
        return None;
    }
    if day == 0 || day > days_in_month(year, month) {
        return None;
    }

    let days = days_from_civil(year, month, day)?;
    let secs = days * 86_400 + (hour * 3_600 + minute * 60 + second) as i64;
    Some(FileTime::from_unix_time(secs, 0))
}

fn month_number(name: &str) -> Option<u64> {
    let months = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    months
        .iter()
        .position(|m| *m == name)
        .map(|idx| idx as u64 + 1)
}

fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i64, month: u64) -> u64 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Convert a civil UTC date to days since the Unix epoch.
///
/// Inverse of Howard Hinnant's `civil_from_days` algorithm (public domain).
/// Returns `None` for pre-epoch dates, which cannot be a sane
/// `Last-Modified` value anyway.
fn days_from_civil(year: i64, month: u64, day: u64) -> Option<i64> {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y.rem_euclid(400); // year of era [0, 399]
    let mp = if month > 2 { month - 3 } else { month + 9 };
    let doy = (153 * mp + 2) / 5 + day - 1; // day of year [0, 365]
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy as i64;
    let days = era * 146_097 + doe - 719_468;
    (days >= 0).then_some(days)
}
