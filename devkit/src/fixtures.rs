/*!
Fixture de racine de logs

Crée une racine de collecte temporaire avec un dossier par hôte, et y écrit
les flux au format des sondes. L'hôte "local" désigne la racine elle-même.
*/

use crate::builders::{ApScanLine, CsvLine, NetProbeLine, WanProbeLine, WifiProbeLine};
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const LOCAL_HOST: &str = "local";

/// Racine de logs jetable, supprimée au drop
pub struct LogFixture {
    dir: TempDir,
}

impl LogFixture {
    pub fn new() -> Result<Self> {
        env_logger::try_init().ok(); // Init logging pour tests
        let dir = TempDir::new().context("failed to create fixture root")?;
        log::debug!("fixture root at {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Dossier de l'hôte, créé au besoin
    pub fn host_dir(&self, host: &str) -> Result<PathBuf> {
        if host == LOCAL_HOST {
            return Ok(self.root().to_path_buf());
        }
        let dir = self.root().join(host);
        std::fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
        Ok(dir)
    }

    /// Ajoute du texte brut tel quel à un fichier d'hôte (lignes partielles incluses)
    pub fn append_raw(&self, host: &str, file: &str, text: &str) -> Result<PathBuf> {
        let path = self.host_dir(host)?.join(file);
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        f.write_all(text.as_bytes())?;
        Ok(path)
    }

    /// Écrit un fichier CSV complet : en-tête puis un enregistrement par entrée
    pub fn write_csv(&self, host: &str, file: &str, header: &str, records: &[Vec<String>]) -> Result<PathBuf> {
        let path = self.host_dir(host)?.join(file);
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        writer.write_record(header.split(','))?;
        for record in records {
            writer.write_record(record)?;
        }
        writer.flush()?;
        log::debug!("wrote {} rows to {}", records.len(), path.display());
        Ok(path)
    }

    /// Lignes typées : l'hôte de chaque ligne est forcé à `host`
    pub fn write_lines<L: CsvLine + Clone>(&self, host: &str, file: &str, rows: &[L]) -> Result<PathBuf> {
        let records: Vec<Vec<String>> = rows.iter().map(|r| r.clone().for_host(host).fields()).collect();
        self.write_csv(host, file, L::HEADER, &records)
    }

    pub fn write_net(&self, host: &str, rows: &[NetProbeLine]) -> Result<PathBuf> {
        self.write_lines(host, "net_probe.csv", rows)
    }

    pub fn write_wifi(&self, host: &str, rows: &[WifiProbeLine]) -> Result<PathBuf> {
        self.write_lines(host, "wifi_probe.csv", rows)
    }

    pub fn write_wan(&self, host: &str, rows: &[WanProbeLine]) -> Result<PathBuf> {
        self.write_lines(host, "wan_probe.csv", rows)
    }

    pub fn write_scans(&self, host: &str, rows: &[ApScanLine]) -> Result<PathBuf> {
        self.write_lines(host, "ap_scan.csv", rows)
    }

    /// Un objet JSON par ligne
    pub fn write_jsonl(&self, host: &str, file: &str, records: &[Value]) -> Result<PathBuf> {
        let mut text = String::new();
        for rec in records {
            text.push_str(&serde_json::to_string(rec)?);
            text.push('\n');
        }
        let path = self.host_dir(host)?.join(file);
        std::fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    pub fn write_iperf(&self, host: &str, records: &[Value]) -> Result<PathBuf> {
        self.write_jsonl(host, "iperf.jsonl", records)
    }

    pub fn write_events(&self, host: &str, records: &[Value]) -> Result<PathBuf> {
        self.write_jsonl(host, "wifi_events.jsonl", records)
    }

    /// Dossier quelconque à la racine (ex: "archive", ".git")
    pub fn mkdir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.root().join(name);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}
