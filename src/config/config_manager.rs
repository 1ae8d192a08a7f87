// ==========================================
// 订单批量导入 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::IngestConfigReader;
use crate::db::{configure_sqlite_connection, ensure_schema, open_sqlite_connection};
use crate::domain::types::SlashDateConvention;
use crate::importer::error::{ImportError, IngestResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> IngestResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> IngestResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))?;
            configure_sqlite_connection(&guard)?;
            ensure_schema(&guard)?;
        }

        Ok(Self { conn })
    }

    fn lock(&self) -> IngestResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> IngestResult<Option<String>> {
        let conn = self.lock()?;

        conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![GLOBAL_SCOPE, key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| ImportError::ConfigReadError {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// 写入配置值（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> IngestResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![GLOBAL_SCOPE, key, value],
        )?;
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 随导入批次台账保存,便于回溯当次生效的配置
    pub fn get_config_snapshot(&self) -> IngestResult<String> {
        let conn = self.lock()?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        serde_json::to_string(&json!(config_map))
            .map_err(|e| ImportError::InternalError(format!("配置快照序列化失败: {}", e)))
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> IngestResult<String> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 读取数值配置;格式错误时告警并回退默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> IngestResult<T>
    where
        T: FromStr + Copy + std::fmt::Display,
    {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    warn!(config_key = key, raw_value = %raw, fallback = %default, "配置格式错误，使用默认值");
                    Ok(default)
                }
            },
        }
    }
}

// ==========================================
// IngestConfigReader Trait 实现
// ==========================================
#[async_trait]
impl IngestConfigReader for ConfigManager {
    async fn get_error_detail_cap(&self) -> IngestResult<usize> {
        self.get_parsed_or_default(config_keys::ERROR_DETAIL_CAP, 10)
    }

    async fn get_slash_date_convention(&self) -> IngestResult<SlashDateConvention> {
        let value = self.get_config_or_default(config_keys::SLASH_DATE_CONVENTION, "MONTH_FIRST")?;
        Ok(SlashDateConvention::parse(&value).unwrap_or_else(|| {
            warn!(
                config_key = config_keys::SLASH_DATE_CONVENTION,
                raw_value = %value,
                "斜杠日期约定无法识别，使用 MONTH_FIRST"
            );
            SlashDateConvention::MonthFirst
        }))
    }

    async fn get_date_window(&self) -> IngestResult<(i32, i32)> {
        let min_year = self.get_parsed_or_default(config_keys::DATE_WINDOW_MIN_YEAR, 2000)?;
        let max_year = self.get_parsed_or_default(config_keys::DATE_WINDOW_MAX_YEAR, 2100)?;

        if min_year > max_year {
            return Err(ImportError::ConfigValueError {
                key: config_keys::DATE_WINDOW_MIN_YEAR.to_string(),
                value: min_year.to_string(),
                message: format!("最小年份大于最大年份 {}", max_year),
            });
        }
        Ok((min_year, max_year))
    }

    async fn get_write_concurrency(&self) -> IngestResult<usize> {
        let value = self.get_parsed_or_default(config_keys::WRITE_CONCURRENCY, 4usize)?;
        Ok(value.max(1))
    }

    async fn get_default_status(&self) -> IngestResult<String> {
        self.get_config_or_default(config_keys::DEFAULT_STATUS, "DELIVERED")
    }

    async fn get_default_payment_mode(&self) -> IngestResult<String> {
        self.get_config_or_default(config_keys::DEFAULT_PAYMENT_MODE, "Online")
    }

    async fn get_config_snapshot_json(&self) -> IngestResult<Option<String>> {
        self.get_config_snapshot().map(Some)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 结果展示
    pub const ERROR_DETAIL_CAP: &str = "ingest/error_detail_cap";

    // 日期归一化
    pub const SLASH_DATE_CONVENTION: &str = "ingest/slash_date_convention";
    pub const DATE_WINDOW_MIN_YEAR: &str = "ingest/date_window_min_year";
    pub const DATE_WINDOW_MAX_YEAR: &str = "ingest/date_window_max_year";

    // 写入
    pub const WRITE_CONCURRENCY: &str = "ingest/write_concurrency";

    // 字段默认值
    pub const DEFAULT_STATUS: &str = "ingest/default_status";
    pub const DEFAULT_PAYMENT_MODE: &str = "ingest/default_payment_mode";
}
