// ==========================================
// 喷涂线引擎 - 应用状态
// ==========================================
// 职责: 打开数据库、加载配置、组装仓储/引擎/API
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{PermissionAuthorizer, ProductionApi, SessionAuthorizer};
use crate::config::{ConfigManager, RegistrationConfig};
use crate::db::{ensure_schema, open_sqlite_connection, read_schema_version};
use crate::engine::BatchRegistrar;
use crate::perf::install_sqlite_tracing;
use crate::repository::{
    ActionLogRepository, AlertRepository, EquipmentRepository, UsageEventRepository,
};

/// 应用状态
///
/// 共享一个连接；并发登记的工作线程应通过 `open_registrar` 取得独立连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 登记参数（启动时从 config_kv 加载）
    pub registration_config: RegistrationConfig,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 生产登记 API
    pub production_api: Arc<ProductionApi>,
}

impl AppState {
    /// 创建新的 AppState 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（不存在时自动建库建表）
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_connection(&db_path)?;
        let conn = Arc::new(Mutex::new(conn));

        let config_manager = Arc::new(ConfigManager::from_connection(conn.clone()));
        let registration_config = config_manager
            .load_registration_config()
            .map_err(|e| format!("无法加载登记配置: {}", e))?;
        tracing::info!(?registration_config, "登记配置已加载");

        let registrar = Arc::new(BatchRegistrar::new(
            conn.clone(),
            registration_config.clone(),
        ));
        let authorizer: Arc<dyn SessionAuthorizer> = Arc::new(PermissionAuthorizer);

        let production_api = Arc::new(ProductionApi::new(
            registrar,
            Arc::new(EquipmentRepository::new(conn.clone())),
            Arc::new(AlertRepository::new(conn.clone())),
            Arc::new(UsageEventRepository::new(conn.clone())),
            Arc::new(ActionLogRepository::new(conn.clone())),
            authorizer,
        ));

        Ok(Self {
            db_path,
            registration_config,
            config_manager,
            production_api,
        })
    }

    /// 为工作线程打开独立连接的登记引擎（同一数据库文件、同一配置）
    pub fn open_registrar(&self) -> Result<BatchRegistrar, String> {
        let conn = open_connection(&self.db_path)?;
        Ok(BatchRegistrar::new(
            Arc::new(Mutex::new(conn)),
            self.registration_config.clone(),
        ))
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

fn open_connection(db_path: &str) -> Result<Connection, String> {
    let mut conn =
        open_sqlite_connection(db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
    ensure_schema(&conn).map_err(|e| format!("建表失败: {}", e))?;
    if let Ok(Some(version)) = read_schema_version(&conn) {
        tracing::debug!(schema_version = version, "数据库 schema 就绪");
    }
    install_sqlite_tracing(&mut conn);
    Ok(conn)
}

/// 获取默认数据库路径
///
/// 优先级: PAINT_LINE_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("PAINT_LINE_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./paint_line.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("paint-line");
        // best-effort: 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("paint_line.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_bootstraps_empty_database() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_string_lossy().to_string();

        let state = AppState::new(path.clone()).unwrap();
        assert_eq!(state.get_db_path(), path);
        assert_eq!(state.registration_config, RegistrationConfig::default());

        let registrar = state.open_registrar().unwrap();
        assert_eq!(registrar.config().idempotency_window_secs, 5);
    }
}
