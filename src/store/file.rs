//! MessagePack 快照存储
//! 打开时载入快照，运行期在内存中 upsert，close 时整体写回
//! 写回先落到同目录临时文件再 rename，中途失败不会破坏旧快照

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rmp_serde::{from_slice, Serializer};
use serde::Serialize;
use tracing::debug;

use super::memory::MemoryStore;
use super::{RowFilter, RuleStore, UpsertOutcome};
use crate::error::{SeedError, SeedResult};
use crate::rule::StratagemRow;

/// 快照文件存储
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    rows: MemoryStore,
}

impl FileStore {
    /// 打开快照文件，不存在时从空表开始
    pub async fn open(path: PathBuf) -> SeedResult<Self> {
        let rows = if tokio::fs::try_exists(&path).await? {
            let data = tokio::fs::read(&path).await?;
            let rows: Vec<StratagemRow> = from_slice(&data)
                .map_err(|e| SeedError::MsgPackError(format!("反序列化失败：{}", e)))?;
            debug!("快照载入成功：{}，行数：{}", path.display(), rows.len());
            MemoryStore::from_rows(rows)
        } else {
            debug!("快照文件不存在，从空表开始：{}", path.display());
            MemoryStore::new()
        };

        Ok(Self { path, rows })
    }

    /// 将当前全部行写回快照文件
    pub async fn flush(&self) -> SeedResult<()> {
        let rows = self.rows.snapshot()?;
        let mut data = Vec::new();
        rows.serialize(&mut Serializer::new(&mut data).with_struct_map())
            .map_err(|e| SeedError::MsgPackError(format!("序列化失败：{}", e)))?;

        debug!("快照序列化成功，行数：{}，大小：{} 字节", rows.len(), data.len());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = temp_path(&self.path);
        tokio::fs::write(&tmp, data).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        debug!("快照已写回：{}", self.path.display());
        Ok(())
    }
}

// 同目录下的 `<文件名>.tmp`，保证 rename 不跨文件系统
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[async_trait]
impl RuleStore for FileStore {
    async fn upsert(&self, row: &StratagemRow) -> SeedResult<UpsertOutcome> {
        self.rows.upsert(row).await
    }

    async fn count(&self, filter: RowFilter) -> SeedResult<u64> {
        self.rows.count(filter).await
    }

    async fn close(&self) -> SeedResult<()> {
        self.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::tests::sample_row;

    #[tokio::test]
    async fn test_snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/rows.mp");

        let store = FileStore::open(path.clone()).await.unwrap();
        store.upsert(&sample_row("Go to Ground", "Your opponent's Shooting phase.", true)).await.unwrap();
        store.upsert(&sample_row("Insane Bravery", "Your Command phase.", false)).await.unwrap();
        store.close().await.unwrap();

        let reopened = FileStore::open(path).await.unwrap();
        assert_eq!(reopened.count(RowFilter::All).await.unwrap(), 2);
        assert_eq!(reopened.count(RowFilter::CalculatorRelevant).await.unwrap(), 1);

        let row = reopened.rows.get("Go to Ground").unwrap().unwrap();
        assert!(row.is_reactive);
        assert_eq!(row, sample_row("Go to Ground", "Your opponent's Shooting phase.", true));

        // 再次写入同名行只覆盖
        assert_eq!(
            reopened.upsert(&row).await.unwrap(),
            UpsertOutcome::Updated
        );
    }

    #[tokio::test]
    async fn test_flush_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.mp");

        let store = FileStore::open(path.clone()).await.unwrap();
        store.upsert(&sample_row("Grenade", "Your Shooting phase.", true)).await.unwrap();
        store.close().await.unwrap();

        assert_eq!(temp_path(&path), dir.path().join("rows.mp.tmp"));
        assert!(!temp_path(&path).exists());
        assert_eq!(FileStore::open(path).await.unwrap().count(RowFilter::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_flush_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.mp");

        let store = FileStore::open(path.clone()).await.unwrap();
        store.upsert(&sample_row("Grenade", "Your Shooting phase.", true)).await.unwrap();
        store.close().await.unwrap();

        // 临时文件位置被目录占住，写回必然失败
        std::fs::create_dir(temp_path(&path)).unwrap();
        let store = FileStore::open(path.clone()).await.unwrap();
        store.upsert(&sample_row("Smokescreen", "Your opponent's Shooting phase.", false)).await.unwrap();
        assert!(matches!(store.close().await.unwrap_err(), SeedError::IoError(_)));

        let reopened = FileStore::open(path).await.unwrap();
        assert_eq!(reopened.count(RowFilter::All).await.unwrap(), 1);
        assert!(reopened.rows.get("Grenade").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.mp");
        tokio::fs::write(&path, b"\xc1not msgpack").await.unwrap();

        let err = FileStore::open(path).await.unwrap_err();
        assert!(matches!(err, SeedError::MsgPackError(_)));
    }
}
