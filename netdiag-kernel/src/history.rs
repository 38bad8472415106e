use crate::config::Limits;
use crate::error::Result;
use crate::models::{NetProbeRow, WanProbeRow, WifiProbeRow, NET_PROBE_FILE, WAN_PROBE_FILE, WIFI_PROBE_FILE};
use crate::readers::read_tabular;
use crate::timestamp::Timestamped;
use serde::Serialize;
use std::path::Path;
use time::{Duration, OffsetDateTime};

/// Séries d'un hôte sur une fenêtre glissante
#[derive(Debug, Clone, Default, Serialize)]
pub struct HostHistory {
    pub host: String,
    pub minutes: u64,
    pub network: Vec<NetProbeRow>,
    pub wifi: Vec<WifiProbeRow>,
    pub wan: Vec<WanProbeRow>,
    /// Flux pour lesquels la fenêtre était vide et les données brutes renvoyées
    pub fallback: StreamFallback,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamFallback {
    pub network: bool,
    pub wifi: bool,
    pub wan: bool,
}

/// Nombre de lignes lues pour une fenêtre de `minutes` : min(W + padding, cap)
pub fn window_limit(minutes: u64, limits: &Limits) -> usize {
    let wanted = usize::try_from(minutes)
        .unwrap_or(usize::MAX)
        .saturating_add(limits.window_padding);
    wanted.min(limits.window_cap)
}

/// now - minutes ; une fenêtre hors des bornes de `time` part de l'epoch
pub fn window_cutoff(now: OffsetDateTime, minutes: u64) -> OffsetDateTime {
    i64::try_from(minutes)
        .ok()
        .and_then(|m| m.checked_mul(60))
        .map(Duration::seconds)
        .and_then(|window| now.checked_sub(window))
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

/// Garde les lignes horodatées >= cutoff. Si le filtre vide un flux non vide,
/// renvoie le flux brut (horloge décalée, données arrivées en retard).
pub fn filter_window<T: Timestamped>(rows: Vec<T>, cutoff: OffsetDateTime) -> (Vec<T>, bool) {
    if rows.is_empty() {
        return (rows, false);
    }
    let in_window = rows
        .iter()
        .filter(|r| r.instant().is_some_and(|ts| ts >= cutoff))
        .count();
    if in_window == 0 {
        return (rows, true);
    }
    let kept = rows
        .into_iter()
        .filter(|r| r.instant().is_some_and(|ts| ts >= cutoff))
        .collect();
    (kept, false)
}

/// Lit et fenêtre les séries réseau / WiFi / WAN d'un hôte
pub async fn load_history(
    host: &str,
    dir: &Path,
    minutes: u64,
    now: OffsetDateTime,
    limits: &Limits,
) -> Result<HostHistory> {
    let limit = window_limit(minutes, limits);
    let net_path = dir.join(NET_PROBE_FILE);
    let wifi_path = dir.join(WIFI_PROBE_FILE);
    let wan_path = dir.join(WAN_PROBE_FILE);
    let (network, wifi, wan) = tokio::try_join!(
        read_tabular::<NetProbeRow>(&net_path, limit),
        read_tabular::<WifiProbeRow>(&wifi_path, limit),
        read_tabular::<WanProbeRow>(&wan_path, limit),
    )?;

    let cutoff = window_cutoff(now, minutes);

    let (network, net_fb) = filter_window(network, cutoff);
    let (wifi, wifi_fb) = filter_window(wifi, cutoff);
    let (wan, wan_fb) = filter_window(wan, cutoff);

    if net_fb || wifi_fb || wan_fb {
        tracing::debug!(
            "[history] {} ({}min): raw fallback net={} wifi={} wan={}",
            host, minutes, net_fb, wifi_fb, wan_fb
        );
    }

    Ok(HostHistory {
        host: host.to_string(),
        minutes,
        network,
        wifi,
        wan,
        fallback: StreamFallback {
            network: net_fb,
            wifi: wifi_fb,
            wan: wan_fb,
        },
    })
}
