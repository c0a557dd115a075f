// crates/hcp-store/src/anomalies.rs
//
// Anomaly records and their resolution workflow on RocksDB.

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use hcp_core::anomaly::{Anomaly, AnomalyFilter, AnomalyUpdate};
use hcp_core::error::HcpError;
use hcp_core::query::{paginate, Filter, Page, PageRequest};
use hcp_core::traits::AnomalyRepository;

use crate::keys::uuid_key;
use crate::rocks::{RocksStore, StoreInner};
use crate::schema::CF_ANOMALIES;

/// Contract order for anomaly listings: most recently detected first.
pub(crate) fn newest_anomaly_first(a: &Anomaly, b: &Anomaly) -> std::cmp::Ordering {
    b.detected_at.cmp(&a.detected_at).then_with(|| b.id.cmp(&a.id))
}

impl StoreInner {
    fn create_anomaly_sync(&self, mut anomaly: Anomaly) -> Result<Anomaly, HcpError> {
        anomaly.validate()?;
        let id = anomaly.prepare_for_create(Utc::now());
        let _latch = self.latch()?;

        if !self.benchmark_exists(&anomaly.benchmark_id)? {
            return Err(HcpError::Validation(format!(
                "benchmark {} does not exist",
                anomaly.benchmark_id
            )));
        }
        if self.exists(CF_ANOMALIES, &uuid_key(&id))? {
            return Err(HcpError::Conflict(format!("anomaly {} already exists", id)));
        }
        self.put_json(CF_ANOMALIES, &uuid_key(&id), &anomaly)?;
        tracing::info!(
            parent: &self.span,
            anomaly_id = %id,
            anomaly_type = %anomaly.anomaly_type,
            severity = %anomaly.severity,
            "anomaly recorded"
        );
        Ok(anomaly)
    }

    fn update_anomaly_status_sync(&self, id: &Uuid, update: &AnomalyUpdate) -> Result<Anomaly, HcpError> {
        let _latch = self.latch()?;
        let mut anomaly: Anomaly = self
            .get_json(CF_ANOMALIES, &uuid_key(id))?
            .ok_or_else(|| HcpError::NotFound(format!("anomaly {}", id)))?;
        anomaly.apply_update(update, Utc::now())?;
        self.put_json(CF_ANOMALIES, &uuid_key(id), &anomaly)?;
        tracing::debug!(parent: &self.span, anomaly_id = %id, status = %anomaly.status, "anomaly updated");
        Ok(anomaly)
    }
}

#[async_trait]
impl AnomalyRepository for RocksStore {
    async fn create_anomaly(&self, anomaly: Anomaly) -> Result<Anomaly, HcpError> {
        self.run(move |inner| inner.create_anomaly_sync(anomaly)).await
    }

    async fn get_anomaly(&self, id: &Uuid) -> Result<Option<Anomaly>, HcpError> {
        let id = *id;
        self.run(move |inner| inner.get_json(CF_ANOMALIES, &uuid_key(&id))).await
    }

    async fn list_anomalies(&self, filter: &AnomalyFilter, page: PageRequest) -> Result<Page<Anomaly>, HcpError> {
        let filter = filter.clone();
        self.run(move |inner| {
            let mut rows: Vec<Anomaly> = inner.scan_json(CF_ANOMALIES)?;
            rows.retain(|a| filter.matches(a));
            rows.sort_by(newest_anomaly_first);
            Ok(paginate(rows, page))
        })
        .await
    }

    async fn update_anomaly_status(&self, id: &Uuid, update: &AnomalyUpdate) -> Result<Anomaly, HcpError> {
        let id = *id;
        let update = update.clone();
        self.run(move |inner| inner.update_anomaly_status_sync(&id, &update)).await
    }
}
