//! Model persistence as JSON artifacts

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

pub const VAR_MODEL_FILE: &str = "var_model.json";
pub const LSTM_MODEL_FILE: &str = "lstm_model.json";
pub const MARKOV_MODEL_FILE: &str = "markov_model.json";
pub const ARIMA_MODEL_FILE: &str = "arima_model.json";

/// Envelope written around every saved model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact<T> {
    pub id: Uuid,
    pub kind: String,
    pub created_at: DateTime<Utc>,
    pub model: T,
}

/// Write `model` to `path` as pretty JSON, creating parent directories
pub fn save_model<T: Serialize>(model: &T, kind: &str, path: &Path) -> Result<Uuid> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let artifact = ModelArtifact {
        id: Uuid::new_v4(),
        kind: kind.to_string(),
        created_at: Utc::now(),
        model,
    };
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &artifact)?;
    info!("{} model saved to {} ({})", kind, path.display(), artifact.id);
    Ok(artifact.id)
}

pub fn load_model<T: DeserializeOwned>(path: &Path) -> Result<ModelArtifact<T>> {
    let reader = BufReader::new(File::open(path)?);
    let artifact: ModelArtifact<T> = serde_json::from_reader(reader)?;
    info!("{} model loaded from {}", artifact.kind, path.display());
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VarModel;

    #[test]
    fn test_var_model_survives_save_and_load() {
        let data = vec![
            ("a".to_string(), (0..40).map(|i| (i as f64 * 0.3).sin()).collect()),
            ("b".to_string(), (0..40).map(|i| (i as f64 * 0.7).cos()).collect()),
        ];
        let model = VarModel::fit(&data, 1).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(VAR_MODEL_FILE);
        let id = save_model(&model, "var", &path).unwrap();

        let loaded = load_model::<VarModel>(&path).unwrap();
        assert_eq!(loaded.id, id);
        assert_eq!(loaded.kind, "var");
        assert!((&loaded.model.coefs[0] - &model.coefs[0]).norm() < 1e-12);
        assert!((loaded.model.forecast(3) - model.forecast(3)).norm() < 1e-12);
    }

    #[test]
    fn test_missing_file() {
        assert!(load_model::<VarModel>(Path::new("does/not/exist.json")).is_err());
    }
}
