use course_core::SortEntry;
use course_core::model::{CourseId, ModuleId};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64};
use crate::repository::{OrderingRepository, StorageError};

impl SqliteRepository {
    /// Write every position in one transaction; an unknown id rolls back all of them.
    async fn write_positions(
        &self,
        table: &'static str,
        entries: &[(i64, u32)],
    ) -> Result<(), StorageError> {
        let sql = format!("UPDATE {table} SET sort_order = ?1 WHERE id = ?2");
        let mut tx = self.pool.begin().await.map_err(conn)?;

        for &(id, sort_order) in entries {
            let res = sqlx::query(&sql)
                .bind(i64::from(sort_order))
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
            if res.rows_affected() == 0 {
                tracing::warn!(table, id, "reorder target missing");
                return Err(StorageError::NotFound);
            }
        }

        tx.commit().await.map_err(conn)?;
        tracing::debug!(table, count = entries.len(), "stored positions");
        Ok(())
    }
}

#[async_trait::async_trait]
impl OrderingRepository for SqliteRepository {
    async fn reorder_courses(&self, entries: &[SortEntry<CourseId>]) -> Result<(), StorageError> {
        let positions = entries
            .iter()
            .map(|e| -> Result<(i64, u32), StorageError> {
                Ok((id_to_i64("course_id", e.id.value())?, e.sort_order))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.write_positions("courses", &positions).await
    }

    async fn reorder_modules(&self, entries: &[SortEntry<ModuleId>]) -> Result<(), StorageError> {
        let positions = entries
            .iter()
            .map(|e| -> Result<(i64, u32), StorageError> {
                Ok((id_to_i64("module_id", e.id.value())?, e.sort_order))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.write_positions("modules", &positions).await
    }
}
