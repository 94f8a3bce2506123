use dotenv::dotenv;
use std::path::PathBuf;

pub const DEFAULT_PRICES_CSV: &str = "data/BrentOilPrices.csv";
pub const DEFAULT_EVENTS_CSV: &str = "data/additional_economic_indicators.csv";
pub const DEFAULT_WORLD_BANK_BASE_URL: &str = "https://api.worldbank.org/v2";

#[derive(Debug, Clone)]
pub struct Config {
    pub prices_csv: PathBuf,
    pub events_csv: PathBuf,
    pub metrics_path: Option<PathBuf>,
    pub api_bind_addr: String,
    pub artifacts_dir: PathBuf,
    pub plots_dir: PathBuf,
    pub log_file: Option<PathBuf>,
    pub log_json: bool,
    pub world_bank_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenv().ok();

        Ok(Config {
            prices_csv: std::env::var("PRICES_CSV")
                .unwrap_or_else(|_| DEFAULT_PRICES_CSV.to_string())
                .into(),
            events_csv: std::env::var("EVENTS_CSV")
                .unwrap_or_else(|_| DEFAULT_EVENTS_CSV.to_string())
                .into(),
            metrics_path: std::env::var("METRICS_PATH").ok().map(PathBuf::from),
            api_bind_addr: std::env::var("API_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:5000".to_string()),
            artifacts_dir: std::env::var("ARTIFACTS_DIR")
                .unwrap_or_else(|_| "models/saved_model_files".to_string())
                .into(),
            plots_dir: std::env::var("PLOTS_DIR")
                .unwrap_or_else(|_| "plots".to_string())
                .into(),
            log_file: std::env::var("LOG_FILE").ok().map(PathBuf::from),
            log_json: std::env::var("LOG_JSON")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            world_bank_base_url: std::env::var("WORLD_BANK_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_WORLD_BANK_BASE_URL.to_string()),
        })
    }

    /// Path of a named artifact inside the artifacts directory.
    pub fn artifact_path(&self, file_name: &str) -> PathBuf {
        self.artifacts_dir.join(file_name)
    }

    pub fn plot_path(&self, file_name: &str) -> PathBuf {
        self.plots_dir.join(file_name)
    }
}
