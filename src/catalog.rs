use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::ClientConfig;
use crate::error::{Result, TriageError};

/// Catalog entry as returned by the search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicineSummary {
    pub id: i64,
    pub name: String,
    pub generic_name: String,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
}

/// Full catalog record for the detail view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicineDetail {
    pub id: i64,
    pub name: String,
    pub generic_name: String,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub indications: Option<String>,
    #[serde(default)]
    pub side_effects: Option<String>,
    #[serde(default)]
    pub precautions: Option<String>,
    #[serde(default)]
    pub contraindications: Option<String>,
}

/// Input to the remote dosage calculator. The computation itself lives
/// entirely behind the service; the client only validates ranges.
#[derive(Debug, Clone, Serialize)]
pub struct DosageRequest {
    pub medicine_id: i64,
    pub age: u32,
    pub weight: f64,
    pub condition: String,
}

impl DosageRequest {
    pub fn new(medicine_id: i64, age: u32, weight: f64, condition: impl Into<String>) -> Result<Self> {
        if !(1..=120).contains(&age) {
            return Err(TriageError::Validation(format!(
                "age must be between 1 and 120 years, got {age}"
            )));
        }
        if !(1.0..=300.0).contains(&weight) {
            return Err(TriageError::Validation(format!(
                "weight must be between 1 and 300 kg, got {weight}"
            )));
        }
        Ok(Self {
            medicine_id,
            age,
            weight,
            condition: condition.into(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DosageResult {
    pub medicine_name: String,
    pub calculated_dosage: String,
    pub instructions: String,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Stateless catalog and dosage utilities layered on the same remote
/// service as the interview flow. Independent of the flow controller and
/// of any session.
pub struct MedicineCatalog {
    http: reqwest::Client,
    base_url: String,
}

impl MedicineCatalog {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TriageError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    /// Search by free-text query and/or category. At least one criterion
    /// is required; the original client clears results instead of
    /// calling the service with nothing to match.
    pub async fn search(&self, query: &str, category: Option<&str>) -> Result<Vec<MedicineSummary>> {
        let query = query.trim();
        let category = category.map(str::trim).filter(|c| !c.is_empty());
        if query.is_empty() && category.is_none() {
            return Err(TriageError::Validation(
                "a search query or a category is required".to_string(),
            ));
        }

        let mut params = Vec::new();
        if !query.is_empty() {
            params.push(format!("q={}", urlencoding::encode(query)));
        }
        if let Some(category) = category {
            params.push(format!("category={}", urlencoding::encode(category)));
        }
        let url = format!("{}/medicines/search?{}", self.base_url, params.join("&"));
        debug!(%url, "searching medicine catalog");

        self.get_json(&url).await
    }

    pub async fn detail(&self, medicine_id: i64) -> Result<MedicineDetail> {
        let url = format!("{}/medicine/{}", self.base_url, medicine_id);
        self.get_json(&url).await
    }

    pub async fn categories(&self) -> Result<Vec<String>> {
        let url = format!("{}/categories", self.base_url);
        self.get_json(&url).await
    }

    /// Ask the service for a dose tailored to the patient. Range
    /// validation already happened in [`DosageRequest::new`].
    pub async fn calculate_dosage(&self, request: &DosageRequest) -> Result<DosageResult> {
        let url = format!("{}/dosage-calculator", self.base_url);
        info!(medicine_id = request.medicine_id, "requesting dosage calculation");

        let response = self.http.post(&url).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TriageError::Transport(format!(
                "dosage-calculator returned status {status}"
            )));
        }
        Ok(response.json().await?)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TriageError::Transport(format!(
                "{url} returned status {status}"
            )));
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_needs_at_least_one_criterion() {
        let catalog = MedicineCatalog::new(ClientConfig::default()).unwrap();
        let err = catalog.search("  ", None).await.unwrap_err();
        assert!(matches!(err, TriageError::Validation(_)));

        let err = catalog.search("", Some("   ")).await.unwrap_err();
        assert!(matches!(err, TriageError::Validation(_)));
    }

    #[test]
    fn dosage_request_validates_demographic_ranges() {
        assert!(DosageRequest::new(1, 0, 70.0, "").is_err());
        assert!(DosageRequest::new(1, 35, 350.0, "").is_err());
        assert!(DosageRequest::new(1, 35, 70.0, "asthma").is_ok());
    }

    #[test]
    fn dosage_result_tolerates_missing_warnings() {
        let result: DosageResult = serde_json::from_value(serde_json::json!({
            "medicine_name": "Paracetamol",
            "calculated_dosage": "500mg",
            "instructions": "Take with food"
        }))
        .unwrap();
        assert!(result.warnings.is_empty());
    }
}
