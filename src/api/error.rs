// ==========================================
// 订单批量导入 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换导入/仓储错误为用户友好的错误消息
// 说明: status_code() 提供类 HTTP 状态码,传输层由调用方负责
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 请求错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 类 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidInput(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::BusinessRuleViolation(_) => 409,
            ApiError::ImportError(_) => 422,
            ApiError::DatabaseConnectionError(_) => 503,
            ApiError::DatabaseError(_)
            | ApiError::DatabaseTransactionError(_)
            | ApiError::InternalError(_)
            | ApiError::Other(_) => 500,
        }
    }
}

// ==========================================
// 从 ImportError 转换
// 目的: 只有"中止整个请求"的错误会到达这里
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::FileNotFound(path) => ApiError::NotFound(format!("文件不存在: {}", path)),
            ImportError::UnsupportedFormat(_)
            | ImportError::EmptySheet(_)
            | ImportError::InvalidOptions(_) => ApiError::InvalidInput(err.to_string()),
            ImportError::FileReadError(_)
            | ImportError::ExcelParseError(_)
            | ImportError::CsvParseError(_) => ApiError::ImportError(err.to_string()),
            ImportError::ExistingLookupFailed(_) | ImportError::DatabaseError(_) => {
                ApiError::DatabaseError(err.to_string())
            }
            ImportError::ConfigReadError { .. }
            | ImportError::ConfigValueError { .. }
            | ImportError::InternalError(_) => ApiError::InternalError(err.to_string()),
            ImportError::Other(e) => ApiError::Other(e),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_error_status_codes() {
        let cases: Vec<(ImportError, u16)> = vec![
            (ImportError::FileNotFound("a.xlsx".to_string()), 404),
            (ImportError::EmptySheet("Sheet1".to_string()), 400),
            (ImportError::InvalidOptions("bad json".to_string()), 400),
            (ImportError::CsvParseError("bad row".to_string()), 422),
            (ImportError::ExistingLookupFailed("db down".to_string()), 500),
        ];
        for (err, expected) in cases {
            let api_err: ApiError = err.into();
            assert_eq!(api_err.status_code(), expected, "错误 {} 状态码不符", api_err);
        }
    }

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::NotFound {
            entity: "Order".to_string(),
            id: "X1".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("Order"));
                assert!(msg.contains("X1"));
            }
            _ => panic!("Expected NotFound"),
        }

        let api_err: ApiError = RepositoryError::LockError("poisoned".to_string()).into();
        assert_eq!(api_err.status_code(), 503);
    }
}
