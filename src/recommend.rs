use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::models::MedicineRecommendation;

/// Source of recommendations for the direct-resolution path, where the
/// service skips follow-up and the client resolves by disease id.
///
/// Kept behind a trait so the current built-in table can be swapped for
/// a real backend call without touching the flow controller.
#[async_trait]
pub trait RecommendationSource: Send + Sync {
    async fn for_disease(&self, disease_id: &str) -> Result<Vec<MedicineRecommendation>>;
}

/// The recommendation table the current system ships: a fixed pair of
/// over-the-counter medicines regardless of disease id.
pub struct BuiltinRecommendationSource;

#[async_trait]
impl RecommendationSource for BuiltinRecommendationSource {
    async fn for_disease(&self, disease_id: &str) -> Result<Vec<MedicineRecommendation>> {
        debug!(disease_id, "resolving recommendations from builtin table");
        Ok(vec![
            MedicineRecommendation {
                name: "Paracetamol".to_string(),
                dosage: "500mg every 6 hours".to_string(),
                duration: "3-5 days".to_string(),
                note: None,
            },
            MedicineRecommendation {
                name: "Ibuprofen".to_string(),
                dosage: "400mg every 8 hours".to_string(),
                duration: "3-5 days".to_string(),
                note: None,
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builtin_source_always_yields_recommendations() {
        let source = BuiltinRecommendationSource;
        let recommendations = source.for_disease("flu").await.unwrap();
        assert_eq!(recommendations.len(), 2);
        assert_eq!(recommendations[0].name, "Paracetamol");
    }
}
