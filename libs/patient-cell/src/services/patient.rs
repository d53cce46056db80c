use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use shared_utils::Clock;

use crate::models::{
    CreatePatientRequest, Patient, PatientError, PatientPage, PatientSearchQuery,
    UpdatePatientRequest,
};
use crate::store::PatientStore;

const MAX_PAGE_SIZE: i64 = 100;

pub struct PatientService {
    store: Arc<dyn PatientStore>,
    clock: Arc<dyn Clock>,
}

impl PatientService {
    pub fn new(store: Arc<dyn PatientStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create(&self, request: CreatePatientRequest) -> Result<Patient, PatientError> {
        let record_number = required(&request.record_number, "record_number")?;
        let first_name = required(&request.first_name, "first_name")?;
        let last_name = required(&request.last_name, "last_name")?;
        validate_age(request.age)?;

        let mut tx = self.store.begin().await?;

        if let Some(existing) = tx.find_record_number(&record_number).await? {
            debug!("Record number {} already taken by {}", record_number, existing);
            tx.rollback().await?;
            return Err(PatientError::DuplicateRecordNumber(record_number));
        }

        let now = self.clock.now();
        let patient = Patient {
            id: Uuid::new_v4(),
            record_number,
            first_name,
            last_name,
            age: request.age,
            address: optional(request.address),
            phone: optional(request.phone),
            active: true,
            created_at: now,
            updated_at: now,
        };

        tx.upsert(&patient).await?;
        tx.commit().await?;

        info!("Patient {} registered", patient.id);
        Ok(patient)
    }

    /// Active-only read; deactivated patients behave as absent.
    pub async fn get(&self, id: Uuid) -> Result<Patient, PatientError> {
        match self.store.get(id).await? {
            Some(patient) if patient.active => Ok(patient),
            _ => Err(PatientError::NotFound),
        }
    }

    pub async fn search(&self, query: PatientSearchQuery) -> Result<PatientPage, PatientError> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(10).clamp(1, MAX_PAGE_SIZE);

        let (patients, total) = self
            .store
            .search(query.search.as_deref(), page, limit)
            .await?;

        Ok(PatientPage {
            patients,
            page,
            limit,
            total,
        })
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: UpdatePatientRequest,
    ) -> Result<Patient, PatientError> {
        validate_age(request.age)?;
        if let Some(name) = &request.first_name {
            required(name, "first_name")?;
        }
        if let Some(name) = &request.last_name {
            required(name, "last_name")?;
        }

        let mut tx = self.store.begin().await?;

        let mut patient = match tx.get(id).await? {
            Some(p) if p.active => p,
            _ => {
                tx.rollback().await?;
                return Err(PatientError::NotFound);
            }
        };

        if let Some(first_name) = request.first_name {
            patient.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = request.last_name {
            patient.last_name = last_name.trim().to_string();
        }
        if let Some(age) = request.age {
            patient.age = Some(age);
        }
        if let Some(address) = request.address {
            patient.address = optional(Some(address));
        }
        if let Some(phone) = request.phone {
            patient.phone = optional(Some(phone));
        }
        patient.updated_at = self.clock.now();

        tx.upsert(&patient).await?;
        tx.commit().await?;

        Ok(patient)
    }

    /// Soft delete: the record survives but drops out of every active-only
    /// read, including the scheduler's subject lookups.
    pub async fn deactivate(&self, id: Uuid) -> Result<(), PatientError> {
        let mut tx = self.store.begin().await?;

        let mut patient = match tx.get(id).await? {
            Some(p) if p.active => p,
            _ => {
                tx.rollback().await?;
                return Err(PatientError::NotFound);
            }
        };

        patient.active = false;
        patient.updated_at = self.clock.now();

        tx.upsert(&patient).await?;
        tx.commit().await?;

        info!("Patient {} deactivated", id);
        Ok(())
    }
}

fn required(value: &str, field: &str) -> Result<String, PatientError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PatientError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_age(age: Option<i32>) -> Result<(), PatientError> {
    if let Some(age) = age {
        if !(0..=120).contains(&age) {
            return Err(PatientError::Validation(
                "age must be between 0 and 120".to_string(),
            ));
        }
    }
    Ok(())
}
