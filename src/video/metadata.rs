//! Basic and full metadata resolution for one file.

use super::details::VideoDetails;
use super::{estimate, sidecar};
use crate::config::Config;
use crate::error::Result;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::path::Path;
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tivoshare_av::Transcoder;
use tivoshare_common::paths::{file_name_lossy, is_native_recording, title_from_file_name};
use tivoshare_common::Tsn;

/// `showingBits` flag telling the device the program is high definition.
const HD_SHOWING_BITS: &str = "4096";

/// Resolves descriptor maps at the basic or full tier.
#[derive(Clone)]
pub struct MetadataResolver {
    config: Arc<Config>,
    transcoder: Arc<dyn Transcoder>,
}

impl MetadataResolver {
    pub fn new(config: Arc<Config>, transcoder: Arc<dyn Transcoder>) -> Self {
        Self { config, transcoder }
    }

    /// Title, air date and sidecar metadata. Never probes.
    pub fn resolve_basic(&self, path: &Path) -> Result<VideoDetails> {
        let mut details = VideoDetails::new();
        let modified = modified_secs(path)?;

        details.set("title", title_from_file_name(&file_name_lossy(path)));
        details.set("originalAirDate", iso_timestamp(epoch(modified)));
        details.update(sidecar::load(path));

        Ok(details)
    }

    /// Everything [`resolve_basic`](Self::resolve_basic) yields plus probed
    /// duration, size estimate, transcode diagnostics and showing bits.
    ///
    /// Probe failures propagate.
    pub fn resolve_full(&self, path: &Path, tsn: &Tsn) -> Result<VideoDetails> {
        let profile = self.config.profile_for(tsn);
        let info = self.transcoder.video_info(path)?;
        let verdict = self.transcoder.tivo_compatible(path, &profile)?;

        let mut details = VideoDetails::new();
        let now = Utc::now();
        let duration_ms = info.duration_ms;
        let stop = i64::try_from(duration_ms)
            .ok()
            .and_then(Duration::try_milliseconds)
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(now);

        details.set("time", iso_timestamp(now));
        details.set("startTime", iso_timestamp(now));
        details.set("stopTime", iso_timestamp(stop));
        details.set(
            "size",
            estimate::estimate(self.transcoder.as_ref(), path, &profile)?,
        );
        details.set("duration", duration_ms);

        let options: Vec<String> = if verdict.compatible {
            Vec::new()
        } else {
            self.transcoder
                .transcode_options(path, &profile)?
                .values()
                .map(str::to_string)
                .collect()
        };

        let mut host = vec![verdict.reason.clone(), "SOURCE INFO: ".to_string()];
        host.extend(
            info.source_fields()
                .iter()
                .rev()
                .map(|(key, value)| format!("{key}={value}")),
        );
        host.push("TRANSCODE OPTIONS: ".to_string());
        host.extend(options);
        host.push("SOURCE FILE: ".to_string());
        host.push(file_name_lossy(path));
        details.set("vHost", host);

        let source_hd = info.height() >= 720 || info.width() >= 1280;
        if !is_native_recording(path) && source_hd && self.config.is_hd_target(tsn) {
            details.set("showingBits", HD_SHOWING_BITS);
        }

        details.update(self.resolve_basic(path)?);
        details.set("iso_duration", iso_duration(duration_ms));

        tracing::debug!(path = %path.display(), tsn = %tsn, compatible = verdict.compatible, "Resolved full metadata");
        Ok(details)
    }
}

/// Modification time in whole seconds since the epoch, clamped at 0.
pub fn modified_secs(path: &Path) -> Result<u64> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0))
}

/// Capture date as the protocol expects it: hex epoch seconds.
pub fn capture_date(secs: u64) -> String {
    format!("{secs:#x}")
}

fn epoch(secs: u64) -> DateTime<Utc> {
    DateTime::<Utc>::from(UNIX_EPOCH + std::time::Duration::from_secs(secs))
}

pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `P{days}DT{hours}H{minutes}M{seconds}S`; sub-second remainders are dropped.
pub fn iso_duration(duration_ms: u64) -> String {
    let total = duration_ms / 1000;
    let days = total / 86_400;
    let hours = total % 86_400 / 3600;
    let minutes = total % 3600 / 60;
    let seconds = total % 60;
    format!("P{days}DT{hours}H{minutes}M{seconds}S")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_duration() {
        assert_eq!(iso_duration(3_725_000), "P0DT1H2M5S");
        assert_eq!(iso_duration(0), "P0DT0H0M0S");
        assert_eq!(iso_duration(90_061_999), "P1DT1H1M1S");
    }

    #[test]
    fn test_capture_date() {
        assert_eq!(capture_date(0), "0x0");
        assert_eq!(capture_date(1_700_000_000), "0x6553f100");
    }

    #[test]
    fn test_iso_timestamp() {
        assert_eq!(iso_timestamp(epoch(0)), "1970-01-01T00:00:00Z");
        assert_eq!(iso_timestamp(epoch(1_700_000_000)), "2023-11-14T22:13:20Z");
    }
}
