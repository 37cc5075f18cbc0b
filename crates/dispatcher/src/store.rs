use std::collections::HashMap;

use async_trait::async_trait;
use balancer_core::{
    BalancerError, BalancerResult, JsonMap, LookupError, RequestRecord, RequestRepository,
    StatusCounts,
};
use tokio::sync::RwLock;
use uuid::Uuid;

/// 内存中的请求存储
///
/// 记录只增不减，进程重启后全部丢失。
#[derive(Debug, Default)]
pub struct InMemoryRequestStore {
    records: RwLock<HashMap<Uuid, RequestRecord>>,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn not_found(id: Uuid) -> BalancerError {
    LookupError::NotFound { id: id.to_string() }.into()
}

#[async_trait]
impl RequestRepository for InMemoryRequestStore {
    async fn insert(&self, record: RequestRecord) -> BalancerResult<()> {
        let mut records = self.records.write().await;
        let id = record.id();
        if records.contains_key(&id) {
            return Err(BalancerError::Internal(format!("请求ID重复: {id}")));
        }
        records.insert(id, record);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> BalancerResult<Option<RequestRecord>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn mark_done(&self, id: Uuid, response_body: JsonMap) -> BalancerResult<bool> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or_else(|| not_found(id))?;
        Ok(record.complete(response_body))
    }

    async fn mark_failed(&self, id: Uuid, reason: String) -> BalancerResult<bool> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or_else(|| not_found(id))?;
        Ok(record.fail(reason))
    }

    async fn count_by_status(&self) -> BalancerResult<StatusCounts> {
        let records = self.records.read().await;
        let mut counts = StatusCounts::default();
        for record in records.values() {
            counts.record(record.status);
        }
        Ok(counts)
    }
}
