// ==========================================
// 喷涂线引擎 - API 层错误类型
// ==========================================
// 职责: 面向调用方的错误分类，转换下层错误为可读消息
// 约定: kind() 返回稳定的错误代码，写入错误响应
// ==========================================

use crate::engine::error::RegistrationError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API 层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ===== 鉴权 =====
    #[error("未授权: {0}")]
    Unauthorized(String),

    // ===== 业务错误 =====
    #[error("资源未找到: {0}")]
    NotFound(String),

    /// 前置条件不满足（喷房/设备/库存）
    #[error("前置条件不满足: {reason}")]
    PreconditionFailed {
        reason: String,
        shortfall: Option<f64>,
    },

    #[error("无效输入: {0}")]
    InvalidInput(String),

    // ===== 持久化错误 =====
    // 消息面向调用方，完整上下文只写日志
    #[error("登记未完成，数据已回滚，请稍后重试")]
    TransactionFailure(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 错误代码
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::PreconditionFailed { .. } => "PRECONDITION_FAILED",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::TransactionFailure(_)
            | ApiError::DatabaseError(_)
            | ApiError::InternalError(_)
            | ApiError::Other(_) => "TRANSACTION_FAILURE",
        }
    }
}

// ==========================================
// 从 RepositoryError 转换（查询类接口）
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::InsufficientStock {
                entity,
                id,
                requested,
                available,
            } => ApiError::PreconditionFailed {
                reason: format!(
                    "{}(id={}) 库存不足: 需要 {}, 可用 {}",
                    entity, id, requested, available
                ),
                shortfall: Some((requested - available).max(0.0)),
            },
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

// ==========================================
// 从 RegistrationError 转换（登记接口）
// ==========================================
impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::InvalidInput { field, message } => {
                ApiError::InvalidInput(format!("{}: {}", field, message))
            }
            RegistrationError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RegistrationError::PreconditionFailed { reason, shortfall } => {
                ApiError::PreconditionFailed { reason, shortfall }
            }
            RegistrationError::TransactionFailure(source) => {
                ApiError::TransactionFailure(source.to_string())
            }
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(ApiError::Unauthorized("x".into()).kind(), "UNAUTHORIZED");
        assert_eq!(
            ApiError::from(RepositoryError::not_found("piece", 3)).kind(),
            "NOT_FOUND"
        );
        assert_eq!(
            ApiError::from(RegistrationError::precondition("喷房停用")).kind(),
            "PRECONDITION_FAILED"
        );
        assert_eq!(
            ApiError::from(RegistrationError::invalid_input("quantity", "0")).kind(),
            "INVALID_INPUT"
        );
    }

    #[test]
    fn test_transaction_failure_hides_details() {
        let err = ApiError::from(RegistrationError::TransactionFailure(
            RepositoryError::DatabaseQueryError("disk I/O error at page 42".into()),
        ));
        assert_eq!(err.kind(), "TRANSACTION_FAILURE");
        assert!(!err.to_string().contains("page 42"));
    }
}
