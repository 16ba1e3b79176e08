// ==========================================
// 喷涂线引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// 说明: 配置缺失或非法时回退默认值，并输出 warn 日志
// ==========================================

use crate::db::open_sqlite_connection;
use crate::engine::alert::WearThresholds;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    /// 防重时间窗（秒）
    pub const IDEMPOTENCY_WINDOW_SECS: &str = "registration/idempotency_window_secs";
    /// 每件工时（小时）
    pub const HOURS_PER_PIECE: &str = "registration/hours_per_piece";
    /// 安排维护阈值（磨损比例）
    pub const PROGRAMAR_RATIO: &str = "alert/programar_ratio";
    /// 尽快维护阈值
    pub const PRONTO_RATIO: &str = "alert/pronto_ratio";
    /// 紧急维护阈值
    pub const URGENTE_RATIO: &str = "alert/urgente_ratio";
}

/// 默认防重时间窗（秒）
pub const DEFAULT_IDEMPOTENCY_WINDOW_SECS: i64 = 5;

/// 默认每件工时（小时）
pub const DEFAULT_HOURS_PER_PIECE: f64 = 0.1;

// ==========================================
// ConfigScope - 配置作用域
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigScope {
    Global,
    Cabin(i64),
}

impl ConfigScope {
    pub fn scope_id(&self) -> String {
        match self {
            ConfigScope::Global => "global".to_string(),
            ConfigScope::Cabin(id) => format!("cabin/{}", id),
        }
    }
}

// ==========================================
// RegistrationConfig - 登记引擎运行参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationConfig {
    pub idempotency_window_secs: i64,
    pub hours_per_piece: f64,
    pub thresholds: WearThresholds,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            idempotency_window_secs: DEFAULT_IDEMPOTENCY_WINDOW_SECS,
            hours_per_piece: DEFAULT_HOURS_PER_PIECE,
            thresholds: WearThresholds::default(),
        }
    }
}

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
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 读取指定作用域的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(
        &self,
        scope: &ConfigScope,
        key: &str,
    ) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![scope.scope_id(), key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(&ConfigScope::Global, key)
    }

    /// 写入配置值（UPSERT）
    pub fn set_config_value(
        &self,
        scope: &ConfigScope,
        key: &str,
        value: &str,
    ) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![scope.scope_id(), key, value],
        )?;
        Ok(())
    }

    /// 读取数值配置，缺失或非法时回退默认值
    fn get_f64_or(&self, key: &str, default: f64) -> Result<f64, Box<dyn Error>> {
        match self.get_global_config_value(key)? {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(v),
                _ => {
                    tracing::warn!(key, value = %raw, default, "配置值非法，使用默认值");
                    Ok(default)
                }
            },
        }
    }

    // ===== 登记参数 =====

    /// 获取防重时间窗（秒），负数视为非法
    pub fn get_idempotency_window_secs(&self) -> Result<i64, Box<dyn Error>> {
        let raw = self.get_f64_or(
            config_keys::IDEMPOTENCY_WINDOW_SECS,
            DEFAULT_IDEMPOTENCY_WINDOW_SECS as f64,
        )?;
        if raw < 0.0 {
            tracing::warn!(value = raw, "防重时间窗不能为负，使用默认值");
            return Ok(DEFAULT_IDEMPOTENCY_WINDOW_SECS);
        }
        Ok(raw.round() as i64)
    }

    /// 获取每件工时（小时），必须为正
    pub fn get_hours_per_piece(&self) -> Result<f64, Box<dyn Error>> {
        let v = self.get_f64_or(config_keys::HOURS_PER_PIECE, DEFAULT_HOURS_PER_PIECE)?;
        if v <= 0.0 {
            tracing::warn!(value = v, "每件工时必须为正，使用默认值");
            return Ok(DEFAULT_HOURS_PER_PIECE);
        }
        Ok(v)
    }

    /// 获取磨损阈值（必须严格递增，否则整体回退默认值）
    pub fn get_wear_thresholds(&self) -> Result<WearThresholds, Box<dyn Error>> {
        let defaults = WearThresholds::default();
        let candidate = WearThresholds {
            programar: self.get_f64_or(config_keys::PROGRAMAR_RATIO, defaults.programar)?,
            pronto: self.get_f64_or(config_keys::PRONTO_RATIO, defaults.pronto)?,
            urgente: self.get_f64_or(config_keys::URGENTE_RATIO, defaults.urgente)?,
        };

        if !candidate.is_valid() {
            tracing::warn!(?candidate, "磨损阈值非递增，使用默认值");
            return Ok(defaults);
        }
        Ok(candidate)
    }

    /// 汇总加载登记引擎参数
    pub fn load_registration_config(&self) -> Result<RegistrationConfig, Box<dyn Error>> {
        Ok(RegistrationConfig {
            idempotency_window_secs: self.get_idempotency_window_secs()?,
            hours_per_piece: self.get_hours_per_piece()?,
            thresholds: self.get_wear_thresholds()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, ensure_schema};

    fn setup() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_defaults_when_empty() {
        let cfg = setup().load_registration_config().unwrap();
        assert_eq!(cfg, RegistrationConfig::default());
        assert_eq!(cfg.idempotency_window_secs, 5);
        assert!((cfg.hours_per_piece - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_overrides_and_invalid_values() {
        let manager = setup();
        let global = ConfigScope::Global;

        manager
            .set_config_value(&global, config_keys::IDEMPOTENCY_WINDOW_SECS, "10")
            .unwrap();
        manager
            .set_config_value(&global, config_keys::HOURS_PER_PIECE, "abc")
            .unwrap();
        // 非递增阈值 -> 整体回退
        manager
            .set_config_value(&global, config_keys::PRONTO_RATIO, "0.5")
            .unwrap();

        let cfg = manager.load_registration_config().unwrap();
        assert_eq!(cfg.idempotency_window_secs, 10);
        assert!((cfg.hours_per_piece - DEFAULT_HOURS_PER_PIECE).abs() < 1e-12);
        assert_eq!(cfg.thresholds, WearThresholds::default());

        // UPSERT 覆盖
        manager
            .set_config_value(&global, config_keys::IDEMPOTENCY_WINDOW_SECS, "3")
            .unwrap();
        assert_eq!(manager.get_idempotency_window_secs().unwrap(), 3);
    }

    #[test]
    fn test_scope_isolation() {
        let manager = setup();
        manager
            .set_config_value(&ConfigScope::Cabin(2), config_keys::HOURS_PER_PIECE, "0.2")
            .unwrap();
        assert!(manager
            .get_global_config_value(config_keys::HOURS_PER_PIECE)
            .unwrap()
            .is_none());
        assert_eq!(
            manager
                .get_config_value(&ConfigScope::Cabin(2), config_keys::HOURS_PER_PIECE)
                .unwrap()
                .as_deref(),
            Some("0.2")
        );
    }
}
