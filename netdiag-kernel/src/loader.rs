use crate::error::Result;
use crate::models::{
    ApScanRow, BandwidthRecord, NetProbeRow, WanProbeRow, WifiEvent, WifiProbeRow, AP_SCAN_FILE,
    BANDWIDTH_FILE, NET_PROBE_FILE, WAN_PROBE_FILE, WIFI_EVENTS_FILE, WIFI_PROBE_FILE,
};
use crate::readers::{read_event_stream, read_tabular};
use serde::Serialize;
use std::path::Path;

/// Les flux d'un hôte
#[derive(Debug, Clone, Default, Serialize)]
pub struct HostLogs {
    pub host: String,
    pub network: Vec<NetProbeRow>,
    pub wifi: Vec<WifiProbeRow>,
    pub wan: Vec<WanProbeRow>,
    pub bandwidth: Vec<BandwidthRecord>,
    pub events: Vec<WifiEvent>,
    /// Scans d'AP visibles (sondes optionnelles)
    pub scans: Vec<ApScanRow>,
}

impl HostLogs {
    pub fn empty(host: &str) -> Self {
        Self {
            host: host.to_string(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.network.is_empty()
            && self.wifi.is_empty()
            && self.wan.is_empty()
            && self.bandwidth.is_empty()
            && self.events.is_empty()
            && self.scans.is_empty()
    }
}

/// Charge tous les flux d'un dossier d'hôte, `limit` enregistrements max par flux
pub async fn load_host(host: &str, dir: &Path, limit: usize) -> Result<HostLogs> {
    let net_path = dir.join(NET_PROBE_FILE);
    let wifi_path = dir.join(WIFI_PROBE_FILE);
    let wan_path = dir.join(WAN_PROBE_FILE);
    let iperf_path = dir.join(BANDWIDTH_FILE);
    let events_path = dir.join(WIFI_EVENTS_FILE);
    let scan_path = dir.join(AP_SCAN_FILE);

    let (network, wifi, wan, bandwidth, events, scans) = tokio::try_join!(
        read_tabular::<NetProbeRow>(&net_path, limit),
        read_tabular::<WifiProbeRow>(&wifi_path, limit),
        read_tabular::<WanProbeRow>(&wan_path, limit),
        read_event_stream::<BandwidthRecord>(&iperf_path, limit),
        read_event_stream::<WifiEvent>(&events_path, limit),
        read_tabular::<ApScanRow>(&scan_path, limit),
    )?;

    tracing::debug!(
        "[loader] {}: {} net, {} wifi, {} wan, {} iperf, {} events, {} scans",
        host,
        network.len(),
        wifi.len(),
        wan.len(),
        bandwidth.len(),
        events.len(),
        scans.len()
    );

    Ok(HostLogs {
        host: host.to_string(),
        network,
        wifi,
        wan,
        bandwidth,
        events,
        scans,
    })
}
