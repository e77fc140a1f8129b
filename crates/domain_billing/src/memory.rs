//! In-memory implementation of [`BillingPort`]
//!
//! Bills are kept whole (items and payments inline) behind a single
//! `tokio::sync::RwLock`, so every write is trivially atomic and the version
//! comparison in `save_bill`/`delete_bill` happens under the write lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use core_kernel::{
    AdapterHealth, BillId, DomainPort, HealthCheckResult, HealthCheckable, PortError,
};

use crate::bill::Bill;
use crate::ports::{BillChange, BillQuery, BillingPort};

const ADAPTER_ID: &str = "in-memory-billing-store";

/// In-memory bill store
#[derive(Debug, Clone, Default)]
pub struct InMemoryBillingStore {
    bills: Arc<RwLock<HashMap<BillId, Bill>>>,
    offline: Arc<AtomicBool>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates the store, bypassing the ledger
    pub async fn with_bills(bills: Vec<Bill>) -> Self {
        let store = Self::new();
        {
            let mut guard = store.bills.write().await;
            for bill in bills {
                guard.insert(bill.id, bill);
            }
        }
        store
    }

    /// Simulates losing the backing store; every call fails with a connection error
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of stored bills
    pub async fn len(&self) -> usize {
        self.bills.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.bills.read().await.is_empty()
    }

    fn ensure_online(&self) -> Result<(), PortError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PortError::connection("in-memory store is offline"));
        }
        Ok(())
    }
}

impl DomainPort for InMemoryBillingStore {}

#[async_trait]
impl HealthCheckable for InMemoryBillingStore {
    async fn health_check(&self) -> HealthCheckResult {
        let offline = self.offline.load(Ordering::SeqCst);
        HealthCheckResult {
            adapter_id: ADAPTER_ID.to_string(),
            status: if offline {
                AdapterHealth::Unhealthy
            } else {
                AdapterHealth::Healthy
            },
            latency_ms: 0,
            message: offline.then(|| "store is offline".to_string()),
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl BillingPort for InMemoryBillingStore {
    async fn insert_bill(&self, bill: &Bill) -> Result<(), PortError> {
        self.ensure_online()?;
        let mut bills = self.bills.write().await;
        if bills.contains_key(&bill.id) {
            return Err(PortError::conflict(format!("bill {} already exists", bill.id)));
        }
        bills.insert(bill.id, bill.clone());
        Ok(())
    }

    async fn load_bill(&self, id: BillId) -> Result<Bill, PortError> {
        self.ensure_online()?;
        self.bills
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Bill", id))
    }

    async fn find_bills(&self, query: &BillQuery) -> Result<Vec<Bill>, PortError> {
        self.ensure_online()?;
        let bills = self.bills.read().await;
        let mut results: Vec<Bill> = bills
            .values()
            .filter(|bill| query.matches(bill))
            .cloned()
            .collect();
        results.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.id.as_uuid().cmp(a.id.as_uuid()))
        });

        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        Ok(results.into_iter().skip(offset).take(limit).collect())
    }

    async fn save_bill(
        &self,
        bill: &Bill,
        change: &BillChange,
        expected_version: i64,
    ) -> Result<(), PortError> {
        self.ensure_online()?;
        let mut bills = self.bills.write().await;
        let stored = bills
            .get_mut(&bill.id)
            .ok_or_else(|| PortError::not_found("Bill", bill.id))?;

        if stored.version != expected_version {
            return Err(PortError::conflict(format!(
                "bill {} is at version {}, expected {} ({})",
                bill.id,
                stored.version,
                expected_version,
                change.name()
            )));
        }
        *stored = bill.clone();
        Ok(())
    }

    async fn delete_bill(&self, id: BillId, expected_version: i64) -> Result<(), PortError> {
        self.ensure_online()?;
        let mut bills = self.bills.write().await;
        let stored = bills
            .get(&id)
            .ok_or_else(|| PortError::not_found("Bill", id))?;

        if stored.version != expected_version || stored.is_finalized {
            return Err(PortError::conflict(format!(
                "bill {} changed before it could be deleted",
                id
            )));
        }
        bills.remove(&id);
        Ok(())
    }

    async fn sum_paid_created_between(
        &self,
        from: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Decimal, PortError> {
        self.ensure_online()?;
        Ok(self
            .bills
            .read()
            .await
            .values()
            .filter(|b| b.created_at >= from && b.created_at < before)
            .map(|b| b.paid.amount())
            .sum())
    }

    async fn count_outstanding(&self) -> Result<u64, PortError> {
        self.ensure_online()?;
        Ok(self
            .bills
            .read()
            .await
            .values()
            .filter(|b| b.due.is_positive())
            .count() as u64)
    }
}
