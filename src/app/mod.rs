// ==========================================
// 喷涂线引擎 - 应用层
// ==========================================
// 职责: 应用启动装配（数据库、配置、API）
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
