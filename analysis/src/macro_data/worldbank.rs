//! World Bank v2 indicators API client

use crate::error::{AnalysisError, Result};
use crate::macro_data::IndicatorTable;
use serde::Deserialize;
use serde_json::Value;
use std::ops::RangeInclusive;
use tracing::{error, info};

pub const DEFAULT_BASE_URL: &str = "https://api.worldbank.org/v2";
pub const DEFAULT_COUNTRY: &str = "WLD";
pub const DEFAULT_YEARS: RangeInclusive<i32> = 1987..=2022;
const PER_PAGE: u32 = 1000;

/// Indicator code and the column name it is stored under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorSpec {
    pub code: String,
    pub name: String,
}

impl IndicatorSpec {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// GDP, inflation, unemployment and exchange rate
pub fn default_indicators() -> Vec<IndicatorSpec> {
    vec![
        IndicatorSpec::new("NY.GDP.MKTP.CD", "GDP"),
        IndicatorSpec::new("FP.CPI.TOTL.ZG", "Inflation"),
        IndicatorSpec::new("SL.UEM.TOTL.ZS", "Unemployment"),
        IndicatorSpec::new("PA.NUS.FCRF", "Exchange Rate"),
    ]
}

#[derive(Debug, Deserialize)]
struct Observation {
    date: String,
    value: Option<f64>,
}

/// One page of an indicator response
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPage {
    pub page: u32,
    pub pages: u32,
    pub observations: Vec<(i32, Option<f64>)>,
}

/// World Bank client
#[derive(Debug, Clone)]
pub struct WorldBankClient {
    base_url: String,
    client: reqwest::Client,
}

impl Default for WorldBankClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl WorldBankClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn indicator_url(&self, code: &str, country: &str, years: &RangeInclusive<i32>, page: u32) -> String {
        format!(
            "{}/country/{}/indicator/{}?format=json&date={}:{}&per_page={}&page={}",
            self.base_url,
            country,
            code,
            years.start(),
            years.end(),
            PER_PAGE,
            page
        )
    }

    /// All observations of one indicator, following pagination
    pub async fn fetch_indicator(
        &self,
        code: &str,
        country: &str,
        years: &RangeInclusive<i32>,
    ) -> Result<Vec<(i32, Option<f64>)>> {
        let mut observations = Vec::new();
        let mut page = 1;
        loop {
            let url = self.indicator_url(code, country, years, page);
            let body = self.get(&url).await?;
            let parsed = parse_indicator_page(&body).map_err(|e| {
                error!("Data retrieval failed for {}: {}", code, e);
                e
            })?;
            observations.extend(parsed.observations);
            // the echoed page number is not trusted to advance
            if page >= parsed.pages {
                break;
            }
            page += 1;
        }
        Ok(observations)
    }

    /// Fetch every indicator into one year-keyed table
    pub async fn fetch_indicators(
        &self,
        indicators: &[IndicatorSpec],
        country: &str,
        years: RangeInclusive<i32>,
    ) -> Result<IndicatorTable> {
        info!("Fetching World Bank data...");
        let mut table = IndicatorTable::new();
        for indicator in indicators {
            let values = self.fetch_indicator(&indicator.code, country, &years).await?;
            table.insert_column(&indicator.name, &values)?;
        }
        info!(
            "Data fetched successfully: {} indicators over {} years",
            indicators.len(),
            table.len()
        );
        Ok(table)
    }

    async fn get(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await.map_err(|e| {
            error!("An error occurred: {}", e);
            AnalysisError::Http(e)
        })?;
        let response = response.error_for_status().map_err(|e| {
            error!("World Bank request failed: {}", e);
            AnalysisError::Http(e)
        })?;
        Ok(response.text().await?)
    }
}

fn as_u32(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => n.as_u64().map(|n| n as u32),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Parse a `[metadata, observations]` response body. An error body
/// (`[{"message": [...]}]`) becomes [`AnalysisError::WorldBank`].
pub fn parse_indicator_page(body: &str) -> Result<IndicatorPage> {
    let value: Value = serde_json::from_str(body)?;
    let parts = value
        .as_array()
        .ok_or_else(|| AnalysisError::Parse("World Bank response is not an array".to_string()))?;
    let meta = parts
        .first()
        .ok_or_else(|| AnalysisError::Parse("empty World Bank response".to_string()))?;

    if let Some(messages) = meta.get("message").and_then(Value::as_array) {
        let text = messages
            .iter()
            .map(|m| {
                let field = |k: &str| m.get(k).and_then(Value::as_str).unwrap_or("").to_string();
                format!("{} {}: {}", field("id"), field("key"), field("value"))
            })
            .collect::<Vec<_>>()
            .join("; ");
        return Err(AnalysisError::WorldBank(text));
    }

    let page = as_u32(meta.get("page")).unwrap_or(1);
    let pages = as_u32(meta.get("pages")).unwrap_or(page);
    let observations = match parts.get(1) {
        None | Some(Value::Null) => Vec::new(),
        Some(records) => {
            let records: Vec<Observation> = serde_json::from_value(records.clone())?;
            records
                .into_iter()
                .map(|r| {
                    let year = r.date.trim().parse::<i32>().map_err(|_| {
                        AnalysisError::Parse(format!("unexpected observation date {:?}", r.date))
                    })?;
                    Ok((year, r.value))
                })
                .collect::<Result<Vec<_>>>()?
        }
    };

    Ok(IndicatorPage {
        page,
        pages,
        observations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"[
        {"page":1,"pages":2,"per_page":"2","total":3,"sourceid":"2","lastupdated":"2024-06-28"},
        [
            {"indicator":{"id":"FP.CPI.TOTL.ZG","value":"Inflation, consumer prices (annual %)"},
             "country":{"id":"1W","value":"World"},"countryiso3code":"WLD",
             "date":"2022","value":7.96,"unit":"","obs_status":"","decimal":1},
            {"indicator":{"id":"FP.CPI.TOTL.ZG","value":"Inflation, consumer prices (annual %)"},
             "country":{"id":"1W","value":"World"},"countryiso3code":"WLD",
             "date":"2021","value":null,"unit":"","obs_status":"","decimal":1}
        ]
    ]"#;

    #[test]
    fn test_parse_page() {
        let page = parse_indicator_page(PAGE).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.pages, 2);
        assert_eq!(page.observations, vec![(2022, Some(7.96)), (2021, None)]);
    }

    #[test]
    fn test_parse_error_payload() {
        let body = r#"[{"message":[{"id":"120","key":"Invalid value","value":"The provided parameter value is not valid"}]}]"#;
        match parse_indicator_page(body) {
            Err(AnalysisError::WorldBank(msg)) => assert!(msg.contains("Invalid value")),
            other => panic!("expected a World Bank error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_empty_and_malformed() {
        let empty = parse_indicator_page(r#"[{"page":1,"pages":0,"total":0},null]"#).unwrap();
        assert!(empty.observations.is_empty());
        assert!(parse_indicator_page("{}").is_err());
        assert!(parse_indicator_page("not json").is_err());
    }

    #[test]
    fn test_indicator_url() {
        let client = WorldBankClient::new("https://api.worldbank.org/v2/");
        assert_eq!(
            client.indicator_url("NY.GDP.MKTP.CD", "WLD", &DEFAULT_YEARS, 1),
            "https://api.worldbank.org/v2/country/WLD/indicator/NY.GDP.MKTP.CD?format=json&date=1987:2022&per_page=1000&page=1"
        );
        assert_eq!(default_indicators().len(), 4);
    }

    #[tokio::test]
    async fn test_fetch_follows_pagination() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        const PAGE_2: &str = r#"[{"page":2,"pages":2},[{"date":"2020","value":1.92}]]"#;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 8192];
                let n = socket.read(&mut buf).await.unwrap();
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                let body = if request.contains("&page=2") { PAGE_2 } else { PAGE };
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
            }
        });

        let client = WorldBankClient::new(format!("http://{}", addr));
        let mut table = client
            .fetch_indicators(
                &[IndicatorSpec::new("FP.CPI.TOTL.ZG", "Inflation")],
                DEFAULT_COUNTRY,
                DEFAULT_YEARS,
            )
            .await
            .unwrap();
        assert_eq!(table.years(), vec![2020, 2021, 2022]);
        assert_eq!(table.get(2020, "Inflation"), Some(1.92));
        assert!(table.insert_column("Inflation", &[]).is_err());
    }

    #[tokio::test]
    async fn test_fetch_stops_when_server_repeats_first_page() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = requests.clone();
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 8192];
                let _ = socket.read(&mut buf).await.unwrap();
                counter.fetch_add(1, Ordering::SeqCst);
                // always claims page 1 of 2
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    PAGE.len(),
                    PAGE
                );
                socket.write_all(response.as_bytes()).await.unwrap();
            }
        });

        let client = WorldBankClient::new(format!("http://{}", addr));
        let observations = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            client.fetch_indicator("FP.CPI.TOTL.ZG", DEFAULT_COUNTRY, &DEFAULT_YEARS),
        )
        .await
        .expect("pagination did not terminate")
        .unwrap();
        assert_eq!(requests.load(Ordering::SeqCst), 2);
        assert_eq!(observations.len(), 4);
        assert_eq!(observations[2], (2022, Some(7.96)));
    }
}
