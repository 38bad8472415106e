/*!
Constructeurs de lignes au format des sondes

Produit des lignes CSV et des objets JSONL identiques à ce qu'écrivent les
agents de collecte, pour alimenter les fixtures sans dupliquer les en-têtes.
*/

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};

pub const NET_PROBE_HEADER: &str = "ts,host,iface,gw,gw_loss_pct,gw_avg_ms,wan_loss_pct,wan_avg_ms,dns_ok,dns_ms";
pub const WIFI_PROBE_HEADER: &str = "ts,host,iface,ssid,bssid,ap_name,signal_dbm,freq_mhz,band,channel,noise_dbm,snr_db,tx_bitrate,rx_bitrate,tx_retries,tx_failed,rx_drop,chan_busy_pct";
pub const WAN_PROBE_HEADER: &str = "ts,host,iface,cf_loss_pct,cf_avg_ms,google_loss_pct,google_avg_ms,isp_hop,isp_loss_pct,isp_avg_ms,http_code,http_ms,all_down";
pub const AP_SCAN_HEADER: &str = "ts,host,iface,ssid,bssid,ap_name,signal_dbm,frequency_mhz,channel,is_connected";

/// Horodatage RFC 3339 avec offset `+00:00`
pub fn ts(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// Variante sans deux-points dans l'offset (`+0000`), écrite par certaines sondes
pub fn ts_compact(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%z").to_string()
}

pub fn minutes_ago(minutes: i64) -> DateTime<Utc> {
    Utc::now() - Duration::minutes(minutes)
}

fn opt(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

fn flag(b: bool) -> String {
    u8::from(b).to_string()
}

/// Une ligne CSV quotée au besoin, sans fin de ligne
pub fn csv_line(fields: &[String]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(fields)?;
    let bytes = writer.into_inner().map_err(|e| anyhow::anyhow!("csv flush failed: {e}"))?;
    let line = String::from_utf8(bytes)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Ligne sérialisable dans un fichier de sonde
pub trait CsvLine {
    const HEADER: &'static str;

    /// Champs dans l'ordre de l'en-tête
    fn fields(&self) -> Vec<String>;

    /// Même ligne, attribuée à un autre hôte
    fn for_host(self, host: &str) -> Self;

    fn to_csv(&self) -> Result<String> {
        csv_line(&self.fields())
    }
}

/// Ligne de net_probe.csv
#[derive(Debug, Clone)]
pub struct NetProbeLine {
    pub ts: String,
    pub host: String,
    pub gw_loss_pct: f64,
    pub gw_avg_ms: Option<f64>,
    pub wan_loss_pct: f64,
    pub wan_avg_ms: Option<f64>,
    pub dns_ok: bool,
    pub dns_ms: Option<f64>,
}

impl NetProbeLine {
    /// Ligne saine : 0% de perte, 2 ms passerelle, 20 ms WAN
    pub fn at<S: Into<String>>(ts: S) -> Self {
        Self {
            ts: ts.into(),
            host: String::new(),
            gw_loss_pct: 0.0,
            gw_avg_ms: Some(2.0),
            wan_loss_pct: 0.0,
            wan_avg_ms: Some(20.0),
            dns_ok: true,
            dns_ms: Some(12.0),
        }
    }

    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = host.into();
        self
    }

    pub fn gw(mut self, loss_pct: f64, avg_ms: Option<f64>) -> Self {
        self.gw_loss_pct = loss_pct;
        self.gw_avg_ms = avg_ms;
        self
    }

    pub fn wan(mut self, loss_pct: f64, avg_ms: Option<f64>) -> Self {
        self.wan_loss_pct = loss_pct;
        self.wan_avg_ms = avg_ms;
        self
    }

    pub fn dns(mut self, ok: bool) -> Self {
        self.dns_ok = ok;
        self
    }
}

impl CsvLine for NetProbeLine {
    const HEADER: &'static str = NET_PROBE_HEADER;

    fn for_host(self, host: &str) -> Self {
        self.host(host)
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.ts.clone(),
            self.host.clone(),
            "wlan0".into(),
            "192.168.1.1".into(),
            self.gw_loss_pct.to_string(),
            opt(self.gw_avg_ms),
            self.wan_loss_pct.to_string(),
            opt(self.wan_avg_ms),
            flag(self.dns_ok),
            opt(self.dns_ms),
        ]
    }
}

/// Ligne de wifi_probe.csv
#[derive(Debug, Clone)]
pub struct WifiProbeLine {
    pub ts: String,
    pub host: String,
    pub ssid: String,
    pub bssid: String,
    pub ap_name: String,
    pub signal_dbm: Option<f64>,
    pub freq_mhz: Option<f64>,
    pub band: String,
    pub snr_db: Option<f64>,
    pub tx_retries: Option<f64>,
}

impl WifiProbeLine {
    /// Lien 5 GHz à -55 dBm sur l'AP "Salon"
    pub fn at<S: Into<String>>(ts: S) -> Self {
        Self {
            ts: ts.into(),
            host: String::new(),
            ssid: "HomeMesh".into(),
            bssid: "aa:bb:cc:00:00:01".into(),
            ap_name: "Salon".into(),
            signal_dbm: Some(-55.0),
            freq_mhz: Some(5180.0),
            band: "5GHz".into(),
            snr_db: Some(35.0),
            tx_retries: Some(3.0),
        }
    }

    /// Hôte sans lien WiFi (Ethernet seul)
    pub fn unlinked<S: Into<String>>(ts: S) -> Self {
        Self {
            ssid: String::new(),
            bssid: String::new(),
            ap_name: String::new(),
            signal_dbm: None,
            freq_mhz: None,
            band: String::new(),
            snr_db: None,
            tx_retries: None,
            ..Self::at(ts)
        }
    }

    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = host.into();
        self
    }

    pub fn ap<S: Into<String>>(mut self, ap_name: S) -> Self {
        self.ap_name = ap_name.into();
        self
    }

    pub fn signal(mut self, dbm: f64) -> Self {
        self.signal_dbm = Some(dbm);
        self
    }

    /// Fréquence seule, sans label de bande
    pub fn freq_only(mut self, mhz: f64) -> Self {
        self.freq_mhz = Some(mhz);
        self.band.clear();
        self
    }

    pub fn band<S: Into<String>>(mut self, band: S) -> Self {
        self.band = band.into();
        self
    }

    pub fn snr(mut self, db: f64) -> Self {
        self.snr_db = Some(db);
        self
    }

    pub fn ssid<S: Into<String>>(mut self, ssid: S) -> Self {
        self.ssid = ssid.into();
        self
    }
}

impl CsvLine for WifiProbeLine {
    const HEADER: &'static str = WIFI_PROBE_HEADER;

    fn for_host(self, host: &str) -> Self {
        self.host(host)
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.ts.clone(),
            self.host.clone(),
            "wlan0".into(),
            self.ssid.clone(),
            self.bssid.clone(),
            self.ap_name.clone(),
            opt(self.signal_dbm),
            opt(self.freq_mhz),
            self.band.clone(),
            "36".into(),
            "-92".into(),
            opt(self.snr_db),
            "866.7 MBit/s VHT-MCS 9 80MHz, short GI".into(),
            "780.0 MBit/s".into(),
            opt(self.tx_retries),
            "0".into(),
            "0".into(),
            "18".into(),
        ]
    }
}

/// Ligne de wan_probe.csv
#[derive(Debug, Clone)]
pub struct WanProbeLine {
    pub ts: String,
    pub host: String,
    pub cf_loss_pct: f64,
    pub google_loss_pct: f64,
    pub all_down: bool,
}

impl WanProbeLine {
    pub fn at<S: Into<String>>(ts: S) -> Self {
        Self {
            ts: ts.into(),
            host: String::new(),
            cf_loss_pct: 0.0,
            google_loss_pct: 0.0,
            all_down: false,
        }
    }

    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = host.into();
        self
    }

    /// Les deux cibles injoignables
    pub fn down(mut self) -> Self {
        self.cf_loss_pct = 100.0;
        self.google_loss_pct = 100.0;
        self.all_down = true;
        self
    }
}

impl CsvLine for WanProbeLine {
    const HEADER: &'static str = WAN_PROBE_HEADER;

    fn for_host(self, host: &str) -> Self {
        self.host(host)
    }

    fn fields(&self) -> Vec<String> {
        let ms = |loss: f64| if loss >= 100.0 { String::new() } else { "14.2".into() };
        vec![
            self.ts.clone(),
            self.host.clone(),
            "wlan0".into(),
            self.cf_loss_pct.to_string(),
            ms(self.cf_loss_pct),
            self.google_loss_pct.to_string(),
            ms(self.google_loss_pct),
            "10.0.0.1".into(),
            "0".into(),
            "8.1".into(),
            "200".into(),
            "180".into(),
            flag(self.all_down),
        ]
    }
}

/// Ligne de ap_scan.csv : un AP vu lors d'un scan
#[derive(Debug, Clone)]
pub struct ApScanLine {
    pub ts: String,
    pub host: String,
    pub ssid: String,
    pub bssid: String,
    pub ap_name: String,
    pub signal_dbm: Option<f64>,
    pub frequency_mhz: Option<f64>,
    pub connected: bool,
}

impl ApScanLine {
    /// AP 5 GHz non associé à -65 dBm
    pub fn at<S: Into<String>, A: Into<String>>(ts: S, ap_name: A) -> Self {
        Self {
            ts: ts.into(),
            host: String::new(),
            ssid: "HomeMesh".into(),
            bssid: "aa:bb:cc:00:00:02".into(),
            ap_name: ap_name.into(),
            signal_dbm: Some(-65.0),
            frequency_mhz: Some(5180.0),
            connected: false,
        }
    }

    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = host.into();
        self
    }

    pub fn signal(mut self, dbm: f64) -> Self {
        self.signal_dbm = Some(dbm);
        self
    }

    pub fn freq(mut self, mhz: f64) -> Self {
        self.frequency_mhz = Some(mhz);
        self
    }

    pub fn connected(mut self) -> Self {
        self.connected = true;
        self
    }
}

impl CsvLine for ApScanLine {
    const HEADER: &'static str = AP_SCAN_HEADER;

    fn for_host(self, host: &str) -> Self {
        self.host(host)
    }

    fn fields(&self) -> Vec<String> {
        let channel = match self.frequency_mhz {
            Some(mhz) if mhz < 3000.0 => "6",
            Some(_) => "36",
            None => "",
        };
        vec![
            self.ts.clone(),
            self.host.clone(),
            "wlan0".into(),
            self.ssid.clone(),
            self.bssid.clone(),
            self.ap_name.clone(),
            opt(self.signal_dbm),
            opt(self.frequency_mhz),
            channel.into(),
            flag(self.connected),
        ]
    }
}

/// Enregistrement iperf.jsonl ; `bits_per_second` va dans sum_received et sum_sent
pub fn iperf_record(ts: &str, host: &str, mode: &str, ok: bool, bits_per_second: Option<f64>) -> Value {
    let summary = |bps: Option<f64>| json!({ "bits_per_second": bps });
    json!({
        "ts": ts,
        "host": host,
        "mode": mode,
        "ok": ok,
        "iperf": {
            "end": {
                "sum_received": summary(bits_per_second),
                "sum_sent": summary(bits_per_second)
            }
        }
    })
}

/// Événement wifi_events.jsonl ; `extra` est fusionné dans l'objet
pub fn wifi_event(ts: &str, host: &str, event: &str, extra: Value) -> Value {
    let mut obj = json!({
        "ts": ts,
        "host": host,
        "iface": "wlan0",
        "event": event,
        "raw": format!("wlan0: {event}")
    });
    if let (Some(target), Value::Object(fields)) = (obj.as_object_mut(), extra) {
        target.extend(fields);
    }
    obj
}
