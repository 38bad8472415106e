/**
 * REPORTS - Rapports de diagnostic complémentaires
 *
 * RÔLE :
 * Vues d'analyse ponctuelles reprises des outils de diagnostic en ligne de
 * commande : pannes, chronologie, statistiques par AP, roaming, visibilité
 * des AP, couverture, backhaul, comparaison entre emplacements.
 *
 * FONCTIONNEMENT :
 * - Chaque rapport est une fonction pure sur les `HostLogs` déjà chargés
 * - Même tolérance que le reste du moteur : flux absent = vide
 * - Recalculé à chaque appel, rien n'est persisté
 */

pub mod backhaul;
pub mod compare;
pub mod coverage;
pub mod failures;
pub mod roaming;
pub mod timeline;
pub mod visibility;

use crate::analytics::mean;
use crate::loader::HostLogs;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub use backhaul::{backhaul_report, ApBackhaul};
pub use compare::{compare_locations, LocationComparison};
pub use coverage::{coverage_report, CoverageReport};
pub use failures::{failures_report, FailureRates, FailuresReport};
pub use roaming::{roaming_report, HostRoaming};
pub use timeline::{timeline_report, TimelineEntry};
pub use visibility::{visibility_report, HostVisibility};

/// Statistiques d'un AP vu par l'ensemble des sondes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApStats {
    pub ap: String,
    pub samples: usize,
    pub avg_signal_dbm: Option<f64>,
    pub hosts: Vec<String>,
}

/// Regroupe les sondes WiFi par AP, du plus échantillonné au moins échantillonné
pub fn ap_stats(hosts: &[HostLogs]) -> Vec<ApStats> {
    let mut groups: BTreeMap<String, (usize, Vec<f64>, BTreeSet<String>)> = BTreeMap::new();
    for logs in hosts {
        for row in &logs.wifi {
            let entry = groups.entry(row.ap_label()).or_default();
            entry.0 += 1;
            entry.2.insert(logs.host.clone());
            if let Some(signal) = row.signal_dbm {
                entry.1.push(signal);
            }
        }
    }

    let mut stats: Vec<ApStats> = groups
        .into_iter()
        .map(|(ap, (samples, signals, hosts))| ApStats {
            ap,
            samples,
            avg_signal_dbm: mean(&signals).map(f64::round),
            hosts: hosts.into_iter().collect(),
        })
        .collect();
    stats.sort_by(|a, b| b.samples.cmp(&a.samples).then_with(|| a.ap.cmp(&b.ap)));
    stats
}
