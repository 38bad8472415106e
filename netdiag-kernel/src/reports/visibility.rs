use crate::loader::HostLogs;
use crate::mesh::{band_from_freq, Band};
use serde::Serialize;
use std::collections::BTreeMap;

const TOP_APS: usize = 10;
/// Marge au-delà de laquelle un AP voisin est jugé nettement meilleur
const STICKY_MARGIN_DB: f64 = 5.0;
const NO_SIGNAL_DBM: f64 = -100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalQuality {
    Excellent,
    Good,
    Fair,
    Weak,
}

impl SignalQuality {
    pub fn from_dbm(dbm: f64) -> Self {
        if dbm >= -50.0 {
            Self::Excellent
        } else if dbm >= -60.0 {
            Self::Good
        } else if dbm >= -70.0 {
            Self::Fair
        } else {
            Self::Weak
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleAp {
    pub ap: String,
    pub ssid: String,
    pub signal_dbm: Option<f64>,
    pub quality: Option<SignalQuality>,
    pub band: Option<Band>,
    pub connected: bool,
}

impl VisibleAp {
    fn strength(&self) -> f64 {
        self.signal_dbm.unwrap_or(NO_SIGNAL_DBM)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostVisibility {
    pub host: String,
    pub scans: usize,
    pub visible_aps: usize,
    /// Les 10 AP les plus forts
    pub aps: Vec<VisibleAp>,
    pub connected_ap: Option<String>,
    /// AP non associés plus forts que l'AP courant de plus de 5 dB
    pub stronger_aps: Vec<String>,
    pub sticky_client: bool,
}

fn host_visibility(logs: &HostLogs) -> Option<HostVisibility> {
    if logs.scans.is_empty() {
        return None;
    }

    // meilleur signal vu par AP
    let mut strongest: BTreeMap<String, VisibleAp> = BTreeMap::new();
    for scan in &logs.scans {
        let seen = VisibleAp {
            ap: scan.ap_label(),
            ssid: scan.ssid.trim().to_string(),
            signal_dbm: scan.signal_dbm,
            quality: scan.signal_dbm.map(SignalQuality::from_dbm),
            band: scan.frequency_mhz.and_then(band_from_freq),
            connected: scan.is_connected == Some(true),
        };
        let replace = strongest
            .get(&seen.ap)
            .map_or(true, |best| seen.signal_dbm.is_some() && seen.strength() > best.strength());
        if replace {
            strongest.insert(seen.ap.clone(), seen);
        }
    }

    let mut aps: Vec<VisibleAp> = strongest.into_values().collect();
    aps.sort_by(|a, b| b.strength().total_cmp(&a.strength()));

    let connected = aps.iter().find(|a| a.connected);
    let stronger_aps: Vec<String> = match connected {
        Some(current) => aps
            .iter()
            .filter(|a| !a.connected && a.strength() > current.strength() + STICKY_MARGIN_DB)
            .map(|a| a.ap.clone())
            .collect(),
        None => Vec::new(),
    };
    let connected_ap = connected.map(|a| a.ap.clone());
    let visible_aps = aps.len();
    aps.truncate(TOP_APS);

    Some(HostVisibility {
        host: logs.host.clone(),
        scans: logs.scans.len(),
        visible_aps,
        aps,
        connected_ap,
        sticky_client: !stronger_aps.is_empty(),
        stronger_aps,
    })
}

/// AP visibles depuis chaque emplacement ; hôtes sans scan omis
pub fn visibility_report(hosts: &[HostLogs]) -> Vec<HostVisibility> {
    hosts.iter().filter_map(host_visibility).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApScanRow;

    fn scan(ap: &str, signal: Option<f64>, freq: f64, connected: bool) -> ApScanRow {
        ApScanRow {
            ts: "2024-01-15T10:00:00+00:00".into(),
            ssid: "HomeMesh".into(),
            ap_name: ap.into(),
            signal_dbm: signal,
            frequency_mhz: Some(freq),
            is_connected: Some(connected),
            ..Default::default()
        }
    }

    #[test]
    fn test_strongest_signal_per_ap() {
        let mut logs = HostLogs::empty("bureau");
        logs.scans = vec![
            scan("Salon", Some(-72.0), 5180.0, true),
            scan("Salon", Some(-68.0), 5180.0, true),
            scan("Salon", None, 5180.0, true),
            scan("Garage", Some(-61.0), 2412.0, false),
            scan("Cuisine", Some(-66.0), 5745.0, false),
            scan("Voisin", None, 2437.0, false),
        ];

        let report = visibility_report(&[logs, HostLogs::empty("eth")]);
        assert_eq!(report.len(), 1);
        let bureau = &report[0];
        assert_eq!(bureau.scans, 6);
        assert_eq!(bureau.visible_aps, 4);

        let order: Vec<&str> = bureau.aps.iter().map(|a| a.ap.as_str()).collect();
        assert_eq!(order, vec!["Garage", "Cuisine", "Salon", "Voisin"]);
        assert_eq!(bureau.aps[0].band, Some(Band::Ghz24));
        assert_eq!(bureau.aps[0].quality, Some(SignalQuality::Fair));
        assert_eq!(bureau.aps[1].band, Some(Band::Ghz5));
        assert_eq!(bureau.aps[2].signal_dbm, Some(-68.0));
        assert_eq!(bureau.aps[3].quality, None);

        // Garage : -61 > -68 + 5 ; Cuisine : -66, pas assez
        assert_eq!(bureau.connected_ap.as_deref(), Some("Salon"));
        assert_eq!(bureau.stronger_aps, vec!["Garage"]);
        assert!(bureau.sticky_client);
    }

    #[test]
    fn test_top_ten_without_connection() {
        let mut logs = HostLogs::empty("pi1");
        logs.scans = (0..14)
            .map(|i| scan(&format!("ap{i:02}"), Some(-40.0 - i as f64), 5180.0, false))
            .collect();

        let report = visibility_report(&[logs]);
        let pi1 = &report[0];
        assert_eq!(pi1.visible_aps, 14);
        assert_eq!(pi1.aps.len(), 10);
        assert_eq!(pi1.aps[0].ap, "ap00");
        assert_eq!(pi1.aps[0].quality, Some(SignalQuality::Excellent));
        assert!(pi1.connected_ap.is_none());
        assert!(!pi1.sticky_client);
    }
}
