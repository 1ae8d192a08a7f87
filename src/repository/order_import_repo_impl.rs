// ==========================================
// 订单批量导入 - 订单导入 Repository 实现
// ==========================================
// 职责: 实现导入相关数据访问（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::{ensure_schema, open_sqlite_connection};
use crate::domain::import::ImportBatch;
use crate::domain::order::{ExistingOrderRef, OrderCandidate, StoredOrder};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::order_import_repo::{BulkInsertOutcome, OrderImportRepository};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

/// IN 查询单次参数上限（低于 SQLite 默认变量上限）
const LOOKUP_CHUNK_SIZE: usize = 500;

const INSERT_ORDER_SQL: &str = r#"
    INSERT INTO orders (
        order_id, order_date, delivery_address, quantity, unit_price, total_amount,
        status, payment_status, payment_mode, billing_month, billing_year,
        customer_name, customer_phone, source, extra_json, import_batch_id,
        created_at, updated_at
    ) VALUES (
        ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?17
    )
"#;

// ==========================================
// OrderImportRepositoryImpl
// ==========================================
pub struct OrderImportRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl OrderImportRepositoryImpl {
    /// 创建新的 Repository 实例（自动建表）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（与 ConfigManager 共享同一连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            ensure_schema(&guard)?;
        }
        Ok(Self { conn })
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn extra_json(order: &OrderCandidate) -> RepositoryResult<Option<String>> {
        if order.extra_fields.is_empty() {
            Ok(None)
        } else {
            Ok(Some(serde_json::to_string(&order.extra_fields)?))
        }
    }

    /// 执行单条插入（调用方持有连接或事务）
    fn insert_with(
        conn: &Connection,
        order: &OrderCandidate,
        batch_id: &str,
        extra_json: Option<String>,
    ) -> RepositoryResult<i64> {
        let order_id = order.trimmed_order_id().ok_or_else(|| RepositoryError::FieldValueError {
            field: "order_id".to_string(),
            message: format!("第 {} 行缺少订单号", order.row_number),
        })?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            INSERT_ORDER_SQL,
            params![
                order_id,
                order.order_date.format("%Y-%m-%d").to_string(),
                order.delivery_address,
                order.quantity,
                order.unit_price,
                order.recomputed_total(),
                order.status,
                order.payment_status.to_string(),
                order.payment_mode,
                order.billing_month,
                order.billing_year,
                order.customer_name,
                order.customer_phone,
                order.source,
                extra_json,
                batch_id,
                now,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn map_stored_order(row: &Row<'_>) -> rusqlite::Result<StoredOrder> {
        let order_date: String = row.get(2)?;
        let created_at: String = row.get(16)?;
        let updated_at: String = row.get(17)?;

        Ok(StoredOrder {
            row_key: row.get(0)?,
            order_id: row.get(1)?,
            order_date: NaiveDate::parse_from_str(&order_date, "%Y-%m-%d").map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
            })?,
            delivery_address: row.get(3)?,
            quantity: row.get(4)?,
            unit_price: row.get(5)?,
            total_amount: row.get(6)?,
            status: row.get(7)?,
            payment_status: row.get(8)?,
            payment_mode: row.get(9)?,
            billing_month: row.get(10)?,
            billing_year: row.get(11)?,
            customer_name: row.get(12)?,
            customer_phone: row.get(13)?,
            source: row.get(14)?,
            import_batch_id: row.get(15)?,
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
        })
    }

    fn map_batch(row: &Row<'_>) -> rusqlite::Result<ImportBatch> {
        Ok(ImportBatch {
            batch_id: row.get(0)?,
            file_name: row.get(1)?,
            sheet_name: row.get(2)?,
            total_rows: row.get::<_, i64>(3)? as usize,
            imported: row.get::<_, i64>(4)? as usize,
            updated: row.get::<_, i64>(5)? as usize,
            skipped: row.get::<_, i64>(6)? as usize,
            validation_errors: row.get::<_, i64>(7)? as usize,
            write_errors: row.get::<_, i64>(8)? as usize,
            options_json: row.get(9)?,
            config_snapshot_json: row.get(10)?,
            imported_at: row
                .get::<_, Option<String>>(11)?
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
            elapsed_ms: row.get(12)?,
        })
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

#[async_trait]
impl OrderImportRepository for OrderImportRepositoryImpl {
    async fn find_existing_by_order_ids(
        &self,
        order_ids: &[String],
    ) -> RepositoryResult<Vec<ExistingOrderRef>> {
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let mut found = Vec::with_capacity(order_ids.len());

        for chunk in order_ids.chunks(LOOKUP_CHUNK_SIZE) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT order_id, id FROM orders WHERE order_id IN ({})",
                placeholders
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
                Ok(ExistingOrderRef {
                    order_id: row.get(0)?,
                    row_key: row.get(1)?,
                })
            })?;
            for row in rows {
                found.push(row?);
            }
        }

        Ok(found)
    }

    async fn update_order_by_order_id(
        &self,
        order: &OrderCandidate,
        batch_id: &str,
    ) -> RepositoryResult<usize> {
        let order_id = order.trimmed_order_id().ok_or_else(|| RepositoryError::FieldValueError {
            field: "order_id".to_string(),
            message: format!("第 {} 行缺少订单号", order.row_number),
        })?;
        let extra_json = Self::extra_json(order)?;
        let conn = self.lock()?;

        let affected = conn.execute(
            r#"
            UPDATE orders SET
                order_date = ?2,
                delivery_address = ?3,
                quantity = ?4,
                unit_price = ?5,
                total_amount = ?6,
                status = ?7,
                payment_status = ?8,
                payment_mode = ?9,
                billing_month = ?10,
                billing_year = ?11,
                customer_name = ?12,
                customer_phone = ?13,
                extra_json = ?14,
                import_batch_id = ?15,
                updated_at = ?16
            WHERE order_id = ?1
            "#,
            params![
                order_id,
                order.order_date.format("%Y-%m-%d").to_string(),
                order.delivery_address,
                order.quantity,
                order.unit_price,
                order.recomputed_total(),
                order.status,
                order.payment_status.to_string(),
                order.payment_mode,
                order.billing_month,
                order.billing_year,
                order.customer_name,
                order.customer_phone,
                extra_json,
                batch_id,
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(affected)
    }

    async fn bulk_insert_orders(
        &self,
        orders: &[OrderCandidate],
        batch_id: &str,
    ) -> RepositoryResult<BulkInsertOutcome> {
        let mut outcome = BulkInsertOutcome::default();
        if orders.is_empty() {
            return Ok(outcome);
        }

        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        // 约束失败只回滚当前语句,事务继续
        for order in orders {
            let result = Self::extra_json(order)
                .and_then(|extra| Self::insert_with(&tx, order, batch_id, extra));
            match result {
                Ok(_) => outcome.inserted_rows.push(order.row_number),
                Err(e) => outcome.failures.push((order.row_number, e.to_string())),
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(outcome)
    }

    async fn insert_order(&self, order: &OrderCandidate, batch_id: &str) -> RepositoryResult<i64> {
        let extra_json = Self::extra_json(order)?;
        let conn = self.lock()?;
        Self::insert_with(&conn, order, batch_id, extra_json)
    }

    async fn insert_batch(&self, batch: &ImportBatch) -> RepositoryResult<()> {
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT INTO import_batch (
                batch_id, file_name, sheet_name, total_rows,
                imported, updated, skipped, validation_errors, write_errors,
                options_json, config_snapshot_json, imported_at, elapsed_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                batch.batch_id,
                batch.file_name,
                batch.sheet_name,
                batch.total_rows as i64,
                batch.imported as i64,
                batch.updated as i64,
                batch.skipped as i64,
                batch.validation_errors as i64,
                batch.write_errors as i64,
                batch.options_json,
                batch.config_snapshot_json,
                batch.imported_at.map(|dt| dt.to_rfc3339()),
                batch.elapsed_ms,
            ],
        )?;

        Ok(())
    }

    async fn get_recent_batches(&self, limit: usize) -> RepositoryResult<Vec<ImportBatch>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT batch_id, file_name, sheet_name, total_rows,
                   imported, updated, skipped, validation_errors, write_errors,
                   options_json, config_snapshot_json, imported_at, elapsed_ms
            FROM import_batch
            ORDER BY imported_at DESC
            LIMIT ?1
            "#,
        )?;

        let batches = stmt
            .query_map(params![limit as i64], Self::map_batch)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(batches)
    }

    async fn count_orders(&self) -> RepositoryResult<i64> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))?;
        Ok(count)
    }

    async fn get_order_by_order_id(&self, order_id: &str) -> RepositoryResult<Option<StoredOrder>> {
        let conn = self.lock()?;

        let order = conn
            .query_row(
                r#"
                SELECT id, order_id, order_date, delivery_address, quantity, unit_price,
                       total_amount, status, payment_status, payment_mode,
                       billing_month, billing_year, customer_name, customer_phone,
                       source, import_batch_id, created_at, updated_at
                FROM orders
                WHERE order_id = ?1
                "#,
                params![order_id.trim()],
                Self::map_stored_order,
            )
            .optional()?;

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn repo() -> OrderImportRepositoryImpl {
        let conn = Connection::open_in_memory().unwrap();
        OrderImportRepositoryImpl::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    fn order(order_id: &str, row_number: usize, quantity: u32, unit_price: f64) -> OrderCandidate {
        let mut extra = BTreeMap::new();
        extra.insert("table_no".to_string(), "7".to_string());
        OrderCandidate::new(
            row_number,
            Some(order_id.to_string()),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            "A1".to_string(),
            quantity,
            unit_price,
            "DELIVERED".to_string(),
            "Online".to_string(),
            Some("Ravi".to_string()),
            None,
            extra,
        )
    }

    #[tokio::test]
    async fn test_bulk_insert_partial_success() {
        let repo = repo();
        let outcome = repo
            .bulk_insert_orders(&[order("X1", 2, 1, 1.0), order("X1", 3, 1, 1.0), order("X2", 4, 2, 5.0)], "b1")
            .await
            .unwrap();

        assert_eq!(outcome.inserted_rows, vec![2, 4]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].0, 3);
        assert!(outcome.failures[0].1.contains("唯一约束"));
        assert_eq!(repo.count_orders().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_find_existing_and_update() {
        let repo = repo();
        repo.insert_order(&order("X1", 2, 1, 10.0), "b1").await.unwrap();

        let found = repo
            .find_existing_by_order_ids(&["X1".to_string(), "NOPE".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].order_id, "X1");

        let affected = repo
            .update_order_by_order_id(&order("X1", 2, 3, 10.0), "b2")
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let stored = repo.get_order_by_order_id("X1").await.unwrap().unwrap();
        assert_eq!(stored.quantity, 3);
        assert_eq!(stored.total_amount, 30.0);
        assert_eq!(stored.import_batch_id.as_deref(), Some("b2"));
        assert_eq!(stored.payment_status, "Paid");
    }

    #[tokio::test]
    async fn test_update_missing_order_affects_nothing() {
        let repo = repo();
        let affected = repo
            .update_order_by_order_id(&order("GHOST", 2, 1, 1.0), "b1")
            .await
            .unwrap();
        assert_eq!(affected, 0);
    }

    #[tokio::test]
    async fn test_lookup_chunks_large_id_sets() {
        let repo = repo();
        let orders: Vec<_> = (0..1200).map(|i| order(&format!("X{}", i), i + 2, 1, 1.0)).collect();
        repo.bulk_insert_orders(&orders, "b1").await.unwrap();

        let ids: Vec<String> = (0..1300).map(|i| format!("X{}", i)).collect();
        let found = repo.find_existing_by_order_ids(&ids).await.unwrap();
        assert_eq!(found.len(), 1200);
    }

    #[tokio::test]
    async fn test_batch_ledger_round_trip() {
        let repo = repo();
        let batch = ImportBatch {
            batch_id: "b1".to_string(),
            file_name: Some("orders.xlsx".to_string()),
            sheet_name: Some("All Data".to_string()),
            total_rows: 3,
            imported: 1,
            updated: 1,
            skipped: 0,
            validation_errors: 1,
            write_errors: 0,
            options_json: Some("{}".to_string()),
            config_snapshot_json: None,
            imported_at: Some(Utc::now()),
            elapsed_ms: Some(12),
        };
        repo.insert_batch(&batch).await.unwrap();

        let batches = repo.get_recent_batches(10).await.unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].sheet_name.as_deref(), Some("All Data"));
        assert_eq!(batches[0].validation_errors, 1);
    }
}
