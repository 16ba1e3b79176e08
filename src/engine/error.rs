// ==========================================
// 喷涂线引擎 - 登记引擎错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 重复提交不是错误，由 RegistrationOutcome::Duplicate 表达
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 登记引擎错误类型
#[derive(Error, Debug)]
pub enum RegistrationError {
    // ===== 输入错误 =====
    #[error("输入参数非法 (field={field}): {message}")]
    InvalidInput { field: String, message: String },

    // ===== 实体缺失 =====
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    // ===== 前置条件 =====
    // shortfall: 缺口数量（件或 kg），非库存类前置条件为 None
    #[error("前置条件不满足: {reason}")]
    PreconditionFailed {
        reason: String,
        shortfall: Option<f64>,
    },

    // ===== 持久化失败（已回滚）=====
    #[error("登记事务失败: {0}")]
    TransactionFailure(RepositoryError),
}

pub type RegistrationResult<T> = Result<T, RegistrationError>;

impl RegistrationError {
    pub fn invalid_input(field: &str, message: impl Into<String>) -> Self {
        RegistrationError::InvalidInput {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn precondition(reason: impl Into<String>) -> Self {
        RegistrationError::PreconditionFailed {
            reason: reason.into(),
            shortfall: None,
        }
    }

    pub fn shortage(reason: impl Into<String>, shortfall: f64) -> Self {
        RegistrationError::PreconditionFailed {
            reason: reason.into(),
            shortfall: Some(shortfall),
        }
    }
}

impl From<RepositoryError> for RegistrationError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => RegistrationError::NotFound { entity, id },
            RepositoryError::InsufficientStock {
                entity,
                id,
                requested,
                available,
            } => RegistrationError::shortage(
                format!(
                    "{}(id={}) 库存不足: 需要 {}, 可用 {}",
                    entity, id, requested, available
                ),
                (requested - available).max(0.0),
            ),
            other => RegistrationError::TransactionFailure(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_mapping() {
        let err: RegistrationError = RepositoryError::not_found("cabin", 7).into();
        assert!(matches!(err, RegistrationError::NotFound { ref id, .. } if id == "7"));

        let err: RegistrationError = RepositoryError::InsufficientStock {
            entity: "paint".to_string(),
            id: 1,
            requested: 1.5,
            available: 1.0,
        }
        .into();
        match err {
            RegistrationError::PreconditionFailed { shortfall, .. } => {
                assert!((shortfall.unwrap() - 0.5).abs() < 1e-12)
            }
            other => panic!("unexpected {:?}", other),
        }

        let err: RegistrationError = RepositoryError::LockError("busy".to_string()).into();
        assert!(matches!(err, RegistrationError::TransactionFailure(_)));
    }
}
