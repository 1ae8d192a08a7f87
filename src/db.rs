// ==========================================
// 订单批量导入 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发导入时的偶发 busy 错误
// - 幂等建表（orders / import_batch / config_kv / schema_version）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 建表语句（幂等）
///
/// 说明：
/// - orders.order_id 唯一索引是并发导入时插入竞争的最终裁决
/// - 更新竞争为"最后写入者胜出"
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    order_id          TEXT    NOT NULL UNIQUE,
    order_date        TEXT    NOT NULL,
    delivery_address  TEXT    NOT NULL,
    quantity          INTEGER NOT NULL DEFAULT 1 CHECK (quantity > 0),
    unit_price        REAL    NOT NULL DEFAULT 0 CHECK (unit_price >= 0),
    total_amount      REAL    NOT NULL DEFAULT 0,
    status            TEXT    NOT NULL,
    payment_status    TEXT    NOT NULL,
    payment_mode      TEXT    NOT NULL,
    billing_month     INTEGER NOT NULL CHECK (billing_month BETWEEN 1 AND 12),
    billing_year      INTEGER NOT NULL,
    customer_name     TEXT,
    customer_phone    TEXT,
    source            TEXT    NOT NULL DEFAULT 'excel',
    extra_json        TEXT,
    import_batch_id   TEXT,
    created_at        TEXT    NOT NULL,
    updated_at        TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_orders_billing ON orders (billing_year, billing_month);

CREATE TABLE IF NOT EXISTS import_batch (
    batch_id              TEXT PRIMARY KEY,
    file_name             TEXT,
    sheet_name            TEXT,
    total_rows            INTEGER NOT NULL DEFAULT 0,
    imported              INTEGER NOT NULL DEFAULT 0,
    updated               INTEGER NOT NULL DEFAULT 0,
    skipped               INTEGER NOT NULL DEFAULT 0,
    validation_errors     INTEGER NOT NULL DEFAULT 0,
    write_errors          INTEGER NOT NULL DEFAULT 0,
    options_json          TEXT,
    config_snapshot_json  TEXT,
    imported_at           TEXT,
    elapsed_ms            INTEGER
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id    TEXT NOT NULL DEFAULT 'global',
    key         TEXT NOT NULL,
    value       TEXT NOT NULL,
    updated_at  TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 幂等建表并登记 schema_version
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    let before = read_schema_version(conn)?;
    conn.execute_batch(SCHEMA_SQL)?;

    match before {
        None => {
            conn.execute(
                "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
                [CURRENT_SCHEMA_VERSION],
            )?;
            debug!(version = CURRENT_SCHEMA_VERSION, "schema 初始化完成");
        }
        Some(v) if v != CURRENT_SCHEMA_VERSION => {
            warn!(
                found = v,
                expected = CURRENT_SCHEMA_VERSION,
                "schema_version 与当前代码不一致"
            );
        }
        Some(_) => {}
    }
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "ORDER_INGEST_DB_PATH";

/// 默认数据库路径
///
/// 优先级: 环境变量 ORDER_INGEST_DB_PATH → 用户数据目录/order-ingest/orders.db → ./orders.db
pub fn default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./orders.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("order-ingest");
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!(dir = %dir.display(), error = %e, "无法创建数据目录，使用当前目录");
        } else {
            path = dir.join("orders.db");
        }
    }

    path.to_string_lossy().to_string()
}
