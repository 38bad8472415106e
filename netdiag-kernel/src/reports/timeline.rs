use crate::loader::HostLogs;
use crate::timestamp::Timestamped;
use serde::Serialize;
use time::{Duration, OffsetDateTime};

const LOOKBACK: Duration = Duration::hours(24);
const HIGH_WAN_LOSS_PCT: f64 = 50.0;
const WEAK_SIGNAL_DBM: f64 = -75.0;
const MAX_ENTRIES: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineKind {
    HighWanLoss,
    WeakSignal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub ts: String,
    pub host: String,
    #[serde(rename = "type")]
    pub kind: TimelineKind,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ap: Option<String>,
    pub description: String,
}

/// Problèmes notables des dernières 24 h, du plus ancien au plus récent,
/// limités aux 30 derniers. Les lignes sans horodatage lisible sont ignorées.
pub fn timeline_report(hosts: &[HostLogs], now: OffsetDateTime) -> Vec<TimelineEntry> {
    let cutoff = now.checked_sub(LOOKBACK).unwrap_or(OffsetDateTime::UNIX_EPOCH);
    let mut entries: Vec<(OffsetDateTime, TimelineEntry)> = Vec::new();

    for logs in hosts {
        for row in &logs.network {
            let Some(at) = row.instant().filter(|at| *at >= cutoff) else {
                continue;
            };
            if row.wan_loss_pct > HIGH_WAN_LOSS_PCT {
                entries.push((
                    at,
                    TimelineEntry {
                        ts: row.ts.clone(),
                        host: logs.host.clone(),
                        kind: TimelineKind::HighWanLoss,
                        value: row.wan_loss_pct,
                        ap: None,
                        description: format!("High WAN loss: {:.0}%", row.wan_loss_pct),
                    },
                ));
            }
        }
        for row in &logs.wifi {
            let Some(at) = row.instant().filter(|at| *at >= cutoff) else {
                continue;
            };
            // pas de signal = pas de lien WiFi, rien à signaler
            let Some(signal) = row.signal_dbm.filter(|s| *s < WEAK_SIGNAL_DBM) else {
                continue;
            };
            let ap = row.ap_label();
            entries.push((
                at,
                TimelineEntry {
                    ts: row.ts.clone(),
                    host: logs.host.clone(),
                    kind: TimelineKind::WeakSignal,
                    value: signal,
                    description: format!("Weak signal: {signal:.0} dBm on {ap}"),
                    ap: Some(ap),
                },
            ));
        }
    }

    entries.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| a.1.host.cmp(&b.1.host))
            .then_with(|| a.1.description.cmp(&b.1.description))
    });
    let skip = entries.len().saturating_sub(MAX_ENTRIES);
    entries.into_iter().skip(skip).map(|(_, e)| e).collect()
}
