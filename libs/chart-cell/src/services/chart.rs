use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use patient_cell::store::PatientStore;
use shared_utils::Clock;

use crate::models::{Chart, ChartError, CreateChartRequest};
use crate::store::ChartStore;

pub struct ChartService {
    store: Arc<dyn ChartStore>,
    patients: Arc<dyn PatientStore>,
    clock: Arc<dyn Clock>,
}

impl ChartService {
    pub fn new(
        store: Arc<dyn ChartStore>,
        patients: Arc<dyn PatientStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            patients,
            clock,
        }
    }

    pub async fn create(&self, request: CreateChartRequest) -> Result<Chart, ChartError> {
        let tooth = request.tooth.trim().to_string();
        if tooth.is_empty() {
            return Err(ChartError::Validation("tooth is required".to_string()));
        }

        if !self.patients.is_active(request.patient_id).await? {
            return Err(ChartError::PatientNotFound);
        }

        let now = self.clock.now();
        let chart = Chart {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            tooth,
            diagnosis: request
                .diagnosis
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            date: request.date.unwrap_or_else(|| self.clock.today()),
            active: true,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.store.begin().await?;
        tx.upsert(&chart).await?;
        tx.commit().await?;

        info!("Chart {} opened for patient {}", chart.id, chart.patient_id);
        Ok(chart)
    }

    pub async fn get(&self, id: Uuid) -> Result<Chart, ChartError> {
        match self.store.get(id).await? {
            Some(chart) if chart.active => Ok(chart),
            _ => Err(ChartError::NotFound),
        }
    }

    pub async fn list_by_patient(&self, patient_id: Uuid) -> Result<Vec<Chart>, ChartError> {
        if !self.patients.is_active(patient_id).await? {
            return Err(ChartError::PatientNotFound);
        }
        Ok(self.store.list_by_patient(patient_id).await?)
    }

    pub async fn deactivate(&self, id: Uuid) -> Result<(), ChartError> {
        let mut tx = self.store.begin().await?;

        let mut chart = match tx.get(id).await? {
            Some(c) if c.active => c,
            _ => {
                tx.rollback().await?;
                return Err(ChartError::NotFound);
            }
        };

        chart.active = false;
        chart.updated_at = self.clock.now();

        tx.upsert(&chart).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use patient_cell::models::CreatePatientRequest;
    use patient_cell::services::PatientService;
    use patient_cell::store::MemoryPatientStore;
    use shared_utils::FixedClock;

    use crate::store::MemoryChartStore;

    async fn setup() -> (ChartService, Uuid) {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(Utc::now()));
        let patients = Arc::new(MemoryPatientStore::new());

        let patient = PatientService::new(patients.clone(), clock.clone())
            .create(CreatePatientRequest {
                record_number: "HC-100".to_string(),
                first_name: "Luz".to_string(),
                last_name: "Mora".to_string(),
                age: None,
                address: None,
                phone: None,
            })
            .await
            .unwrap();

        let service = ChartService::new(Arc::new(MemoryChartStore::new()), patients, clock);
        (service, patient.id)
    }

    #[tokio::test]
    async fn create_requires_known_patient() {
        let (service, _) = setup().await;

        let err = service
            .create(CreateChartRequest {
                patient_id: Uuid::new_v4(),
                tooth: "26".to_string(),
                diagnosis: None,
                date: None,
            })
            .await
            .unwrap_err();

        assert_matches!(err, ChartError::PatientNotFound);
    }

    #[tokio::test]
    async fn deactivated_chart_is_gone() {
        let (service, patient_id) = setup().await;

        let chart = service
            .create(CreateChartRequest {
                patient_id,
                tooth: "11".to_string(),
                diagnosis: Some("irreversible pulpitis".to_string()),
                date: None,
            })
            .await
            .unwrap();

        service.deactivate(chart.id).await.unwrap();

        assert_matches!(service.get(chart.id).await, Err(ChartError::NotFound));
        assert!(service.list_by_patient(patient_id).await.unwrap().is_empty());
    }
}
