use crate::loader::HostLogs;
use crate::models::{first_non_empty, WifiEvent, WifiEventKind};
use serde::Serialize;
use std::collections::BTreeMap;

/// Fenêtre supposée couverte par le journal d'événements
const ASSUMED_HOURS: f64 = 24.0;
const TOP_N: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stability {
    Stable,
    Moderate,
    Unstable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountEntry {
    pub key: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasonCount {
    pub code: String,
    pub description: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRoaming {
    pub host: String,
    pub total_events: usize,
    pub event_counts: BTreeMap<String, usize>,
    pub roams: usize,
    pub roam_paths: Vec<CountEntry>,
    pub disconnects: usize,
    pub disconnects_by_ap: Vec<CountEntry>,
    pub reason_codes: Vec<ReasonCount>,
    pub disconnects_per_hour: f64,
    pub roams_per_hour: f64,
    pub stability: Stability,
}

/// Codes de raison 802.11 les plus courants
pub fn reason_description(code: &str) -> &'static str {
    match code {
        "1" => "unspecified",
        "2" => "prev auth invalid",
        "3" => "leaving BSS",
        "4" => "inactivity",
        "6" => "class2 frame from non-auth",
        "7" => "class3 frame from non-assoc",
        "8" => "disassoc leaving",
        _ => "",
    }
}

pub fn classify_stability(disconnects_per_hour: f64, roams_per_hour: f64) -> Stability {
    if disconnects_per_hour < 0.5 && roams_per_hour < 1.0 {
        Stability::Stable
    } else if disconnects_per_hour < 2.0 && roams_per_hour < 5.0 {
        Stability::Moderate
    } else {
        Stability::Unstable
    }
}

fn roam_path(ev: &WifiEvent) -> String {
    let side = |ap: &Option<String>, bssid: &Option<String>| {
        first_non_empty(&[ap.as_deref().unwrap_or(""), bssid.as_deref().unwrap_or("")])
            .unwrap_or_else(|| "?".into())
    };
    format!("{} -> {}", side(&ev.from_ap, &ev.from_bssid), side(&ev.to_ap, &ev.to_bssid))
}

/// Tri par nombre décroissant puis clé, tronqué à `n`
fn top(counts: BTreeMap<String, usize>, n: usize) -> Vec<CountEntry> {
    let mut entries: Vec<CountEntry> = counts
        .into_iter()
        .map(|(key, count)| CountEntry { key, count })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries.truncate(n);
    entries
}

/// Analyse du roaming par hôte ; les hôtes sans événement sont omis
pub fn roaming_report(hosts: &[HostLogs]) -> Vec<HostRoaming> {
    hosts
        .iter()
        .filter(|h| !h.events.is_empty())
        .map(host_roaming)
        .collect()
}

fn host_roaming(logs: &HostLogs) -> HostRoaming {
    let mut event_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut paths: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_ap: BTreeMap<String, usize> = BTreeMap::new();
    let mut reasons: BTreeMap<String, usize> = BTreeMap::new();
    let mut roams = 0usize;
    let mut disconnects = 0usize;

    for ev in &logs.events {
        *event_counts.entry(ev.event.as_str().to_string()).or_default() += 1;
        match ev.event {
            WifiEventKind::Roam => {
                roams += 1;
                *paths.entry(roam_path(ev)).or_default() += 1;
            }
            WifiEventKind::Disconnect => {
                disconnects += 1;
                let ap = first_non_empty(&[
                    ev.ap_name.as_deref().unwrap_or(""),
                    ev.bssid.as_deref().unwrap_or(""),
                ])
                .unwrap_or_else(|| "unknown".into());
                *by_ap.entry(ap).or_default() += 1;
                if let Some(code) = &ev.reason_code {
                    *reasons.entry(code.clone()).or_default() += 1;
                }
            }
            _ => {}
        }
    }

    let mut reason_codes: Vec<ReasonCount> = reasons
        .into_iter()
        .map(|(code, count)| ReasonCount {
            description: reason_description(&code),
            code,
            count,
        })
        .collect();
    reason_codes.sort_by(|a, b| b.count.cmp(&a.count));

    let disconnects_per_hour = disconnects as f64 / ASSUMED_HOURS;
    let roams_per_hour = roams as f64 / ASSUMED_HOURS;

    HostRoaming {
        host: logs.host.clone(),
        total_events: logs.events.len(),
        event_counts,
        roams,
        roam_paths: top(paths, TOP_N),
        disconnects,
        disconnects_by_ap: top(by_ap, TOP_N),
        reason_codes,
        disconnects_per_hour: (disconnects_per_hour * 100.0).round() / 100.0,
        roams_per_hour: (roams_per_hour * 100.0).round() / 100.0,
        stability: classify_stability(disconnects_per_hour, roams_per_hour),
    }
}
