/*!
# NetDiag DevKit - Fixtures pour tests du kernel

Bibliothèque facilitant l'écriture de tests d'intégration avec:
- Racines de logs temporaires, un dossier par hôte
- Constructeurs de lignes CSV / JSONL au format des sondes
- Horodatages relatifs à "maintenant" pour les fenêtres d'historique
*/

pub mod builders;
pub mod fixtures;

pub use builders::{
    iperf_record, minutes_ago, ts, ts_compact, wifi_event, ApScanLine, CsvLine, NetProbeLine, WanProbeLine,
    WifiProbeLine,
};
pub use fixtures::LogFixture;
