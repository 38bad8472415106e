/**
 * RECORD READERS - Lecture tolérante des flux de sondes
 *
 * RÔLE : Lire les N derniers enregistrements d'un fichier CSV (avec en-tête)
 * ou JSONL, dans l'ordre d'origine.
 *
 * TOLÉRANCE :
 * - Fichier absent / en-tête illisible -> séquence vide, jamais d'erreur
 * - Ligne JSON invalide -> ignorée
 * - Dernière ligne partielle (écriture concurrente d'une sonde) -> ignorée
 * - Autre erreur d'E/S -> remontée à la frontière de requête
 */

use crate::error::{AggregatorError, Result};
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;

pub const DEFAULT_READ_LIMIT: usize = 100;

/// Charge le fichier entier ; `None` si absent
async fn load(path: &Path) -> Result<Option<String>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AggregatorError::io(path, e)),
    }
}

fn keep_last<T>(mut rows: Vec<T>, limit: usize) -> Vec<T> {
    if rows.len() > limit {
        rows.drain(..rows.len() - limit);
    }
    rows
}

/// Les `limit` dernières lignes d'un CSV, désérialisées par nom de colonne
pub async fn read_tabular<T: DeserializeOwned>(path: &Path, limit: usize) -> Result<Vec<T>> {
    let Some(content) = load(path).await? else {
        return Ok(Vec::new());
    };
    Ok(keep_last(parse_tabular(&content, path), limit))
}

pub(crate) fn parse_tabular<T: DeserializeOwned>(content: &str, path: &Path) -> Vec<T> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = match reader.headers() {
        Ok(h) if h.iter().any(|f| !f.is_empty()) => h.clone(),
        Ok(_) => return Vec::new(),
        Err(e) => {
            tracing::debug!("[readers] unreadable header in {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    let header_len = headers.len();
    let unterminated = !content.ends_with('\n');

    let mut records: Vec<csv::StringRecord> = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        match record {
            Ok(r) if r.iter().all(|f| f.is_empty()) => {}
            Ok(r) => records.push(r),
            Err(_) => dropped += 1,
        }
    }
    // Ligne finale sans saut de ligne et tronquée : écriture en cours
    if unterminated && records.last().is_some_and(|r| r.len() < header_len) {
        records.pop();
        dropped += 1;
    }

    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        match record.deserialize::<T>(Some(&headers)) {
            Ok(row) => rows.push(row),
            Err(_) => dropped += 1,
        }
    }
    if dropped > 0 {
        tracing::debug!("[readers] dropped {} malformed rows from {}", dropped, path.display());
    }
    rows
}

/// Les `limit` derniers objets d'un fichier JSON ligne par ligne
pub async fn read_event_stream<T: DeserializeOwned>(path: &Path, limit: usize) -> Result<Vec<T>> {
    let Some(content) = load(path).await? else {
        return Ok(Vec::new());
    };
    Ok(keep_last(parse_event_stream(&content, path), limit))
}

pub(crate) fn parse_event_stream<T: DeserializeOwned>(content: &str, path: &Path) -> Vec<T> {
    let mut dropped = 0usize;
    let rows: Vec<T> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<T>(line) {
            Ok(v) => Some(v),
            Err(_) => {
                dropped += 1;
                None
            }
        })
        .collect();
    if dropped > 0 {
        tracing::debug!("[readers] skipped {} invalid JSON lines in {}", dropped, path.display());
    }
    rows
}
