//! 内存存储（测试与试运行）

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{RowFilter, RuleStore, UpsertOutcome};
use crate::error::{SeedError, SeedResult};
use crate::rule::StratagemRow;

/// 以名称为键的内存表
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<String, StratagemRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由已有行构建（FileStore 载入快照时使用）
    pub fn from_rows(rows: impl IntoIterator<Item = StratagemRow>) -> Self {
        let rows = rows.into_iter().map(|row| (row.name.clone(), row)).collect();
        Self {
            rows: Mutex::new(rows),
        }
    }

    pub fn get(&self, name: &str) -> SeedResult<Option<StratagemRow>> {
        Ok(self.lock()?.get(name).cloned())
    }

    /// 按名称排序的全部行
    pub fn snapshot(&self) -> SeedResult<Vec<StratagemRow>> {
        let mut rows: Vec<StratagemRow> = self.lock()?.values().cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    fn lock(&self) -> SeedResult<std::sync::MutexGuard<'_, HashMap<String, StratagemRow>>> {
        self.rows
            .lock()
            .map_err(|e| SeedError::StoreError(format!("内存表锁已损坏：{}", e)))
    }
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn upsert(&self, row: &StratagemRow) -> SeedResult<UpsertOutcome> {
        let previous = self.lock()?.insert(row.name.clone(), row.clone());
        Ok(match previous {
            Some(_) => UpsertOutcome::Updated,
            None => UpsertOutcome::Created,
        })
    }

    async fn count(&self, filter: RowFilter) -> SeedResult<u64> {
        Ok(self.lock()?.values().filter(|row| filter.matches(row)).count() as u64)
    }

    async fn close(&self) -> SeedResult<()> {
        Ok(())
    }
}
