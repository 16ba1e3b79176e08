// ==========================================
// 喷涂线引擎 - 会话鉴权
// ==========================================
// 职责: 校验调用方会话与权限（resource:action 形式，支持 resource:* 通配）
// 红线: 鉴权失败时不做任何读写
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use std::collections::HashSet;
use std::fmt;

// ==========================================
// Permission - 权限词表
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ProductionRegister, // 登记喷涂批次
    MaintenanceView,    // 查看维护报表 / 喷房状态 / 用量
    AlertsManage,       // 查看并处理告警
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ProductionRegister => "production:register",
            Permission::MaintenanceView => "maintenance:view",
            Permission::AlertsManage => "alerts:manage",
        }
    }

    pub fn resource(&self) -> &'static str {
        self.as_str().split(':').next().unwrap_or_default()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// SessionContext - 会话上下文
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub actor: String,
    pub permissions: HashSet<String>,
}

impl SessionContext {
    pub fn new<I, S>(actor: &str, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            actor: actor.to_string(),
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    /// 精确匹配或 resource:* 通配；"*" 表示全部权限
    pub fn has_permission(&self, required: Permission) -> bool {
        self.permissions.contains("*")
            || self.permissions.contains(required.as_str())
            || self
                .permissions
                .contains(&format!("{}:*", required.resource()))
    }
}

// ==========================================
// Trait: SessionAuthorizer
// ==========================================
pub trait SessionAuthorizer: Send + Sync {
    /// 校验会话并返回操作人
    fn authorize(&self, session: Option<&SessionContext>, required: Permission)
        -> ApiResult<String>;
}

/// 基于会话权限集合的鉴权实现
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionAuthorizer;

impl SessionAuthorizer for PermissionAuthorizer {
    fn authorize(
        &self,
        session: Option<&SessionContext>,
        required: Permission,
    ) -> ApiResult<String> {
        let session = session.ok_or_else(|| ApiError::Unauthorized("缺少会话".to_string()))?;

        if session.actor.trim().is_empty() {
            return Err(ApiError::Unauthorized("会话缺少操作人".to_string()));
        }
        if !session.has_permission(required) {
            tracing::warn!(actor = %session.actor, permission = %required, "权限不足");
            return Err(ApiError::Unauthorized(format!(
                "操作人 {} 缺少权限 {}",
                session.actor, required
            )));
        }
        Ok(session.actor.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_wildcard_permissions() {
        let exact = SessionContext::new("ana", ["production:register"]);
        assert!(exact.has_permission(Permission::ProductionRegister));
        assert!(!exact.has_permission(Permission::AlertsManage));

        let wildcard = SessionContext::new("luis", ["alerts:*"]);
        assert!(wildcard.has_permission(Permission::AlertsManage));
        assert!(!wildcard.has_permission(Permission::MaintenanceView));

        let admin = SessionContext::new("root", ["*"]);
        assert!(admin.has_permission(Permission::MaintenanceView));
    }

    #[test]
    fn test_authorizer_rejections() {
        let auth = PermissionAuthorizer;
        assert!(matches!(
            auth.authorize(None, Permission::ProductionRegister),
            Err(ApiError::Unauthorized(_))
        ));

        let blank = SessionContext::new("  ", ["*"]);
        assert!(auth
            .authorize(Some(&blank), Permission::ProductionRegister)
            .is_err());

        let ok = SessionContext::new("ana", ["production:register"]);
        assert_eq!(
            auth.authorize(Some(&ok), Permission::ProductionRegister)
                .unwrap(),
            "ana"
        );
    }
}
