//! Schémas des flux écrits par les sondes (un fichier par flux et par hôte).
//!
//! Les lignes CSV sont désérialisées par nom de colonne ; tout champ absent,
//! vide ou illisible devient `None`, sauf les pourcentages de perte qui valent 0.

use crate::timestamp::Timestamped;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const NET_PROBE_FILE: &str = "net_probe.csv";
pub const WIFI_PROBE_FILE: &str = "wifi_probe.csv";
pub const WAN_PROBE_FILE: &str = "wan_probe.csv";
pub const BANDWIDTH_FILE: &str = "iperf.jsonl";
pub const WIFI_EVENTS_FILE: &str = "wifi_events.jsonl";
pub const AP_SCAN_FILE: &str = "ap_scan.csv";

/// net_probe.csv
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetProbeRow {
    pub ts: String,
    pub host: String,
    pub iface: String,
    pub gw: String,
    #[serde(deserialize_with = "lenient::loss")]
    pub gw_loss_pct: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub gw_avg_ms: Option<f64>,
    #[serde(deserialize_with = "lenient::loss")]
    pub wan_loss_pct: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub wan_avg_ms: Option<f64>,
    #[serde(deserialize_with = "lenient::flag")]
    pub dns_ok: Option<bool>,
    #[serde(deserialize_with = "lenient::number")]
    pub dns_ms: Option<f64>,
}

/// wifi_probe.csv
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiProbeRow {
    pub ts: String,
    pub host: String,
    pub iface: String,
    pub ssid: String,
    pub bssid: String,
    pub ap_name: String,
    #[serde(deserialize_with = "lenient::number")]
    pub signal_dbm: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub freq_mhz: Option<f64>,
    pub band: String,
    #[serde(deserialize_with = "lenient::number")]
    pub channel: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub noise_dbm: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub snr_db: Option<f64>,
    pub tx_bitrate: String,
    pub rx_bitrate: String,
    #[serde(deserialize_with = "lenient::number")]
    pub tx_retries: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub tx_failed: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub rx_drop: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub chan_busy_pct: Option<f64>,
}

impl WifiProbeRow {
    /// Une ligne sans SSID ni BSSID = hôte sans lien WiFi (Ethernet seul)
    pub fn has_link(&self) -> bool {
        !self.ssid.trim().is_empty() || !self.bssid.trim().is_empty()
    }

    /// Nom d'AP lisible : ap_name, sinon BSSID, sinon "unknown"
    pub fn ap_label(&self) -> String {
        first_non_empty(&[&self.ap_name, &self.bssid]).unwrap_or_else(|| "unknown".into())
    }
}

/// wan_probe.csv
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WanProbeRow {
    pub ts: String,
    pub host: String,
    pub iface: String,
    #[serde(deserialize_with = "lenient::loss")]
    pub cf_loss_pct: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub cf_avg_ms: Option<f64>,
    #[serde(deserialize_with = "lenient::loss")]
    pub google_loss_pct: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub google_avg_ms: Option<f64>,
    pub isp_hop: String,
    #[serde(deserialize_with = "lenient::loss")]
    pub isp_loss_pct: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub isp_avg_ms: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub http_code: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub http_ms: Option<f64>,
    #[serde(deserialize_with = "lenient::flag")]
    pub all_down: Option<bool>,
}

/// ap_scan.csv : une ligne par AP visible lors d'un scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApScanRow {
    pub ts: String,
    pub host: String,
    pub iface: String,
    pub ssid: String,
    pub bssid: String,
    pub ap_name: String,
    #[serde(deserialize_with = "lenient::number")]
    pub signal_dbm: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub frequency_mhz: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub channel: Option<f64>,
    #[serde(deserialize_with = "lenient::flag")]
    pub is_connected: Option<bool>,
}

impl ApScanRow {
    pub fn ap_label(&self) -> String {
        first_non_empty(&[&self.ap_name, &self.bssid]).unwrap_or_else(|| "unknown".into())
    }
}

/// Mode d'un test iperf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandwidthMode {
    Upload,
    Download,
    #[serde(other)]
    Unknown,
}

/// iperf.jsonl : seul `iperf.end.sum_received.bits_per_second` (ou `sum_sent`
/// pour un upload) est consommé, le reste du payload brut est conservé tel quel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandwidthRecord {
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub host: String,
    #[serde(default, deserialize_with = "lenient::mode")]
    pub mode: Option<BandwidthMode>,
    #[serde(default, deserialize_with = "lenient::json_flag")]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iperf: Option<Value>,
}

impl BandwidthRecord {
    /// Débit reçu en bits/s ; `None` si absent, null ou non numérique
    pub fn received_bps(&self) -> Option<f64> {
        self.summary_bps("sum_received")
    }

    pub fn sent_bps(&self) -> Option<f64> {
        self.summary_bps("sum_sent")
    }

    /// Débit en Mbps d'un test réussi (sum_received)
    pub fn throughput_mbps(&self) -> Option<f64> {
        if !self.ok {
            return None;
        }
        self.received_bps().map(|bps| bps / 1_000_000.0)
    }

    /// Débit selon le sens du test : download -> reçu, sinon envoyé
    pub fn directional_mbps(&self) -> Option<f64> {
        if !self.ok {
            return None;
        }
        let bps = match self.mode {
            Some(BandwidthMode::Download) => self.received_bps(),
            _ => self.sent_bps(),
        };
        bps.map(|b| b / 1_000_000.0)
    }

    fn summary_bps(&self, key: &str) -> Option<f64> {
        self.iperf
            .as_ref()?
            .get("end")?
            .get(key)?
            .get("bits_per_second")?
            .as_f64()
    }
}

/// Catégorie d'un événement WiFi
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WifiEventKind {
    Connect,
    Disconnect,
    Auth,
    Assoc,
    Scan,
    Regulatory,
    Roam,
    #[serde(other)]
    Other,
}

impl WifiEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Auth => "auth",
            Self::Assoc => "assoc",
            Self::Scan => "scan",
            Self::Regulatory => "regulatory",
            Self::Roam => "roam",
            Self::Other => "other",
        }
    }
}

/// wifi_events.jsonl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WifiEvent {
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub iface: String,
    #[serde(default = "other_kind")]
    pub event: WifiEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bssid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ap_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_ap: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_ap: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_bssid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_bssid: Option<String>,
    /// Entier ou chaîne selon la version de l'agent
    #[serde(default, deserialize_with = "lenient::reason", skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    #[serde(default)]
    pub raw: String,
}

fn other_kind() -> WifiEventKind {
    WifiEventKind::Other
}

macro_rules! impl_timestamped {
    ($($t:ty),*) => {
        $(impl Timestamped for $t {
            fn ts(&self) -> &str {
                &self.ts
            }
        })*
    };
}

impl_timestamped!(NetProbeRow, WifiProbeRow, WanProbeRow, BandwidthRecord, WifiEvent, ApScanRow);

pub(crate) fn first_non_empty(candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Désérialiseurs tolérants : ne renvoient jamais d'erreur pour une valeur mal formée.
pub(crate) mod lenient {
    use super::BandwidthMode;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        Ok(raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(text(d)?.and_then(|s| s.parse::<f64>().ok()).filter(|v| v.is_finite()))
    }

    pub fn loss<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(number(d)?.unwrap_or(0.0))
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(text(d)?.and_then(|s| parse_flag(&s)))
    }

    pub(crate) fn parse_flag(s: &str) -> Option<bool> {
        match s.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Some(true),
            "0" | "false" | "no" => Some(false),
            _ => None,
        }
    }

    /// `ok` JSON : booléen, 0/1 ou "true"/"1" ; tout le reste vaut false
    pub fn json_flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        let v = Value::deserialize(d)?;
        Ok(match v {
            Value::Bool(b) => b,
            Value::Number(n) => n.as_f64().map(|x| x != 0.0).unwrap_or(false),
            Value::String(s) => parse_flag(s.trim()).unwrap_or(false),
            _ => false,
        })
    }

    pub fn mode<'de, D: Deserializer<'de>>(d: D) -> Result<Option<BandwidthMode>, D::Error> {
        let v = Value::deserialize(d)?;
        Ok(match v {
            Value::String(s) => Some(match s.trim().to_ascii_lowercase().as_str() {
                "upload" => BandwidthMode::Upload,
                "download" => BandwidthMode::Download,
                _ => BandwidthMode::Unknown,
            }),
            _ => None,
        })
    }

    pub fn reason<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let v = Value::deserialize(d)?;
        Ok(match v {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        })
    }
}
