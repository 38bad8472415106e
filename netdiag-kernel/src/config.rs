use crate::error::{AggregatorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::UtcOffset;
use tokio::fs;

/// Configuration complète du kernel, immuable une fois chargée.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct KernelConfig {
    pub log_dir: PathBuf,
    pub bind: String,
    /// Décalage utilisé pour la heatmap horaire, ex: "+02:00". Absent = offset local.
    pub utc_offset: Option<String>,
    pub limits: Limits,
    pub thresholds: Thresholds,
    pub mesh: MeshConf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Limits {
    pub default_read: usize,
    pub loader: usize,
    pub window_padding: usize,
    pub window_cap: usize,
    pub incidents: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Thresholds {
    pub loss_warning_pct: f64,
    pub loss_critical_pct: f64,
    pub latency_warning_ms: f64,
    pub latency_critical_ms: f64,
    pub weak_signal_dbm: f64,
    pub down_loss_pct: f64,
    pub degraded_loss_pct: f64,
    pub degraded_latency_ms: f64,
    pub uptime_recommendation_pct: f64,
    pub p95_recommendation_ms: f64,
    pub hourly_issue_ratio: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct MeshConf {
    pub weights: MeshWeights,
    pub signal_floor_dbm: f64,
    pub signal_ceiling_dbm: f64,
    pub backhaul_ceiling_mbps: f64,
    pub weak_signal_issue_dbm: f64,
    pub slow_backhaul_issue_mbps: f64,
    pub steering_issue_pct: f64,
    pub interference: InterferenceKind,
    /// Score utilisé quand la source d'interférences n'a aucune donnée
    pub interference_default: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct MeshWeights {
    pub signal: f64,
    pub backhaul: f64,
    pub steering: f64,
    pub interference: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InterferenceKind {
    Fixed,
    Snr,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("/var/log/netdiag"),
            bind: "0.0.0.0:8080".into(),
            utc_offset: None,
            limits: Limits::default(),
            thresholds: Thresholds::default(),
            mesh: MeshConf::default(),
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            default_read: 100,
            loader: 10_000,
            window_padding: 100,
            window_cap: 2000,
            incidents: 100,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            loss_warning_pct: 5.0,
            loss_critical_pct: 10.0,
            latency_warning_ms: 50.0,
            latency_critical_ms: 100.0,
            weak_signal_dbm: -80.0,
            down_loss_pct: 50.0,
            degraded_loss_pct: 10.0,
            degraded_latency_ms: 100.0,
            uptime_recommendation_pct: 95.0,
            p95_recommendation_ms: 100.0,
            hourly_issue_ratio: 0.10,
        }
    }
}

impl Default for MeshConf {
    fn default() -> Self {
        Self {
            weights: MeshWeights::default(),
            signal_floor_dbm: -90.0,
            signal_ceiling_dbm: -40.0,
            backhaul_ceiling_mbps: 200.0,
            weak_signal_issue_dbm: -75.0,
            slow_backhaul_issue_mbps: 50.0,
            steering_issue_pct: 50.0,
            interference: InterferenceKind::Fixed,
            interference_default: 70.0,
        }
    }
}

impl Default for MeshWeights {
    fn default() -> Self {
        Self {
            signal: 0.35,
            backhaul: 0.30,
            steering: 0.20,
            interference: 0.15,
        }
    }
}

impl KernelConfig {
    /// Vérifie les valeurs qui rendraient les calculs absurdes
    pub fn validate(&self) -> Result<()> {
        if self.limits.loader == 0 || self.limits.window_cap == 0 {
            return Err(AggregatorError::Config("read limits must be > 0".into()));
        }
        if self.mesh.signal_ceiling_dbm <= self.mesh.signal_floor_dbm {
            return Err(AggregatorError::Config(
                "mesh.signal_ceiling_dbm must be above mesh.signal_floor_dbm".into(),
            ));
        }
        if self.mesh.backhaul_ceiling_mbps <= 0.0 {
            return Err(AggregatorError::Config(
                "mesh.backhaul_ceiling_mbps must be > 0".into(),
            ));
        }
        if let Some(raw) = &self.utc_offset {
            parse_offset(raw)?;
        }
        Ok(())
    }

    /// Offset de la heatmap horaire : `utc_offset` s'il est fourni, sinon `local`
    pub fn hour_offset(&self, local: UtcOffset) -> Result<UtcOffset> {
        match &self.utc_offset {
            Some(raw) => parse_offset(raw),
            None => Ok(local),
        }
    }
}

fn parse_offset(raw: &str) -> Result<UtcOffset> {
    let fmt = format_description!("[offset_hour sign:mandatory]:[offset_minute]");
    UtcOffset::parse(raw.trim(), &fmt)
        .map_err(|e| AggregatorError::Config(format!("invalid utc_offset '{raw}': {e}")))
}

/// Charge kernel.yaml (ou $NETDIAG_KERNEL_CONFIG) puis applique les overrides d'environnement.
pub async fn load_config() -> KernelConfig {
    let path = std::env::var("NETDIAG_KERNEL_CONFIG").unwrap_or_else(|_| "kernel.yaml".into());
    let mut cfg = read_config_file(Path::new(&path)).await;

    if let Ok(dir) = std::env::var("NETDIAG_LOG_DIR") {
        if !dir.trim().is_empty() {
            cfg.log_dir = PathBuf::from(dir);
        }
    }
    if let Ok(bind) = std::env::var("NETDIAG_BIND") {
        if !bind.trim().is_empty() {
            cfg.bind = bind;
        }
    }
    cfg
}

async fn read_config_file(path: &Path) -> KernelConfig {
    if !path.exists() {
        tracing::info!("[kernel] pas de {}, usage config par défaut", path.display());
        return KernelConfig::default();
    }
    let txt = fs::read_to_string(path).await.unwrap_or_default();
    if txt.trim().is_empty() {
        return KernelConfig::default();
    }
    serde_yaml::from_str(&txt).unwrap_or_else(|e| {
        tracing::warn!("[kernel] config invalide ({}): {e}", path.display());
        KernelConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = KernelConfig::default();
        assert_eq!(cfg.limits.default_read, 100);
        assert_eq!(cfg.limits.window_cap, 2000);
        assert_eq!(cfg.mesh.interference, InterferenceKind::Fixed);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "log_dir: /tmp/netdiag\nthresholds:\n  loss_critical_pct: 20\nmesh:\n  interference: snr\n";
        let cfg: KernelConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.log_dir, PathBuf::from("/tmp/netdiag"));
        assert_eq!(cfg.thresholds.loss_critical_pct, 20.0);
        assert_eq!(cfg.thresholds.loss_warning_pct, 5.0);
        assert_eq!(cfg.mesh.interference, InterferenceKind::Snr);
        assert_eq!(cfg.mesh.weights.signal, 0.35);
    }

    #[test]
    fn test_explicit_offset() {
        let cfg = KernelConfig {
            utc_offset: Some("+02:00".into()),
            ..KernelConfig::default()
        };
        assert_eq!(cfg.hour_offset(UtcOffset::UTC).unwrap(), UtcOffset::from_hms(2, 0, 0).unwrap());
        let local = UtcOffset::from_hms(-5, 0, 0).unwrap();
        assert_eq!(KernelConfig::default().hour_offset(local).unwrap(), local);

        let bad = KernelConfig {
            utc_offset: Some("two hours".into()),
            ..KernelConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let cfg = read_config_file(Path::new("/nonexistent/kernel.yaml")).await;
        assert_eq!(cfg.bind, "0.0.0.0:8080");
    }
}
