use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Erreurs remontées jusqu'à la frontière de requête.
///
/// Fichier absent, ligne illisible ou champ numérique invalide ne sont PAS des
/// erreurs : ils deviennent des données vides ou des valeurs nulles.
#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl AggregatorError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AggregatorError>;

impl IntoResponse for AggregatorError {
    fn into_response(self) -> Response {
        tracing::error!("[http] request failed: {}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "internal error" })),
        )
            .into_response()
    }
}
