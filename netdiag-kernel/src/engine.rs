/**
 * ENGINE - Façade de lecture de l'agrégateur
 *
 * RÔLE :
 * Point d'entrée unique de la couche présentation : liste des hôtes, dernier
 * état, historique fenêtré, analytics, bandes, santé mesh et rapports.
 *
 * FONCTIONNEMENT :
 * - Aucun cache : chaque appel relit les fichiers puis recalcule
 * - Configuration immuable injectée à la construction
 * - Résolution des hôtes derrière le trait `HostDirectory`
 * - Seule une erreur d'E/S inattendue remonte (fichier absent = vide)
 */

use crate::analytics::{AnalyticsEngine, AnalyticsReport};
use crate::config::KernelConfig;
use crate::error::Result;
use crate::history::{load_history, HostHistory};
use crate::hosts::{FsHostDirectory, HostDirectory};
use crate::loader::{load_host, HostLogs};
use crate::mesh::{band_usage_by_host, BandUsage, MeshHealth, MeshScorer};
use crate::reports::{
    self, ApBackhaul, ApStats, CoverageReport, FailuresReport, HostRoaming, HostVisibility, LocationComparison,
    TimelineEntry,
};
use crate::summary::{latest_snapshot, MetricsSnapshot};
use std::collections::BTreeMap;
use std::sync::Arc;
use time::{OffsetDateTime, UtcOffset};

pub struct Aggregator {
    hosts: Arc<dyn HostDirectory>,
    config: KernelConfig,
    analytics: AnalyticsEngine,
    mesh: MeshScorer,
}

impl Aggregator {
    pub fn new(hosts: Arc<dyn HostDirectory>, config: KernelConfig, hour_offset: UtcOffset) -> Self {
        let analytics = AnalyticsEngine::from_config(&config, hour_offset);
        let mesh = MeshScorer::from_config(&config.mesh);
        Self {
            hosts,
            config,
            analytics,
            mesh,
        }
    }

    /// Résolution par le système de fichiers, racine = `log_dir`
    pub fn from_config(config: KernelConfig, hour_offset: UtcOffset) -> Self {
        let hosts = Arc::new(FsHostDirectory::new(config.log_dir.clone()));
        Self::new(hosts, config, hour_offset)
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Listage hors des workers tokio : la résolution peut bloquer sur le disque
    pub async fn list_hosts(&self) -> Vec<String> {
        let hosts = Arc::clone(&self.hosts);
        match tokio::task::spawn_blocking(move || hosts.list_host_directories()).await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!("[hosts] listing task failed: {e}");
                Vec::new()
            }
        }
    }

    /// Flux d'un hôte ; identifiant inconnu ou invalide = hôte vide
    pub async fn load_host(&self, host: &str, limit: usize) -> Result<HostLogs> {
        match self.hosts.host_dir(host) {
            Some(dir) => load_host(host, &dir, limit).await,
            None => Ok(HostLogs::empty(host)),
        }
    }

    pub async fn load_all(&self, limit: usize) -> Result<Vec<HostLogs>> {
        let mut all = Vec::new();
        for host in self.list_hosts().await {
            all.push(self.load_host(&host, limit).await?);
        }
        Ok(all)
    }

    /// Historique complet utilisé par les calculs globaux
    async fn full_history(&self) -> Result<Vec<HostLogs>> {
        self.load_all(self.config.limits.loader).await
    }

    pub async fn latest_metrics(&self) -> Result<BTreeMap<String, MetricsSnapshot>> {
        let logs = self.load_all(self.config.limits.default_read).await?;
        Ok(logs
            .iter()
            .map(|l| (l.host.clone(), latest_snapshot(l, &self.config.thresholds)))
            .collect())
    }

    pub async fn host_history(&self, host: &str, minutes: u64) -> Result<HostHistory> {
        self.history_at(host, minutes, OffsetDateTime::now_utc()).await
    }

    /// Comme `host_history`, avec un "maintenant" fourni par l'appelant
    pub async fn history_at(&self, host: &str, minutes: u64, now: OffsetDateTime) -> Result<HostHistory> {
        match self.hosts.host_dir(host) {
            Some(dir) => load_history(host, &dir, minutes, now, &self.config.limits).await,
            None => Ok(HostHistory {
                host: host.to_string(),
                minutes,
                ..HostHistory::default()
            }),
        }
    }

    pub async fn analytics(&self) -> Result<AnalyticsReport> {
        let logs = self.full_history().await?;
        Ok(self.analytics.analyze(&logs))
    }

    pub async fn band_usage(&self) -> Result<BTreeMap<String, BandUsage>> {
        let logs = self.full_history().await?;
        Ok(band_usage_by_host(&logs))
    }

    pub async fn mesh_health(&self) -> Result<MeshHealth> {
        let logs = self.full_history().await?;
        Ok(self.mesh.score(&logs))
    }

    pub async fn failures(&self) -> Result<FailuresReport> {
        Ok(reports::failures_report(&self.full_history().await?))
    }

    /// Problèmes des dernières 24 h
    pub async fn timeline(&self) -> Result<Vec<TimelineEntry>> {
        self.timeline_at(OffsetDateTime::now_utc()).await
    }

    pub async fn timeline_at(&self, now: OffsetDateTime) -> Result<Vec<TimelineEntry>> {
        Ok(reports::timeline_report(&self.full_history().await?, now))
    }

    pub async fn visibility(&self) -> Result<Vec<HostVisibility>> {
        Ok(reports::visibility_report(&self.full_history().await?))
    }

    pub async fn ap_stats(&self) -> Result<Vec<ApStats>> {
        Ok(reports::ap_stats(&self.full_history().await?))
    }

    pub async fn roaming(&self) -> Result<Vec<HostRoaming>> {
        Ok(reports::roaming_report(&self.full_history().await?))
    }

    pub async fn coverage(&self) -> Result<CoverageReport> {
        Ok(reports::coverage_report(&self.full_history().await?))
    }

    pub async fn backhaul(&self) -> Result<Vec<ApBackhaul>> {
        Ok(reports::backhaul_report(&self.full_history().await?))
    }

    pub async fn compare(&self) -> Result<LocationComparison> {
        Ok(reports::compare_locations(&self.full_history().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Registre en mémoire : aucun hôte n'a de dossier
    struct StaticHosts(Vec<String>);

    impl HostDirectory for StaticHosts {
        fn list_host_directories(&self) -> Vec<String> {
            self.0.clone()
        }

        fn host_dir(&self, _host: &str) -> Option<PathBuf> {
            None
        }
    }

    /// Note le thread qui effectue le listage
    struct ThreadProbe(parking_lot::Mutex<Option<std::thread::ThreadId>>);

    impl HostDirectory for ThreadProbe {
        fn list_host_directories(&self) -> Vec<String> {
            *self.0.lock() = Some(std::thread::current().id());
            vec!["pi1".into()]
        }

        fn host_dir(&self, _host: &str) -> Option<PathBuf> {
            None
        }
    }

    fn aggregator() -> Aggregator {
        let hosts = Arc::new(StaticHosts(vec!["a".into(), "b".into()]));
        Aggregator::new(hosts, KernelConfig::default(), UtcOffset::UTC)
    }

    #[tokio::test]
    async fn test_custom_host_directory() {
        let agg = aggregator();
        assert_eq!(agg.list_hosts().await, vec!["a", "b"]);

        let metrics = agg.latest_metrics().await.unwrap();
        assert_eq!(metrics.len(), 2);
        assert!(metrics["a"].timestamp.is_none());

        let history = agg.host_history("a", 30).await.unwrap();
        assert_eq!(history.minutes, 30);
        assert!(history.network.is_empty());
    }

    #[tokio::test]
    async fn test_listing_runs_off_the_runtime_thread() {
        let dir = Arc::new(ThreadProbe(parking_lot::Mutex::new(None)));
        let agg = Aggregator::new(dir.clone(), KernelConfig::default(), UtcOffset::UTC);
        assert_eq!(agg.list_hosts().await, vec!["pi1"]);
        let listed_on = (*dir.0.lock()).expect("listing ran");
        assert_ne!(listed_on, std::thread::current().id());
    }

    #[tokio::test]
    async fn test_defaults_without_data() {
        let health = aggregator().mesh_health().await.unwrap();
        assert_eq!(health.overall, 53);
        let report = aggregator().analytics().await.unwrap();
        assert_eq!(report.hourly_patterns.len(), 24);
        assert!(report.incidents.is_empty());
    }
}
