// ==========================================
// 喷涂线引擎 - 性能统计
// ==========================================
// 职责: 统计单次操作的耗时、SQL 语句数、写语句数、慢 SQL 数
// 说明: 计数挂在线程局部变量上，登记操作在单线程内完成，互不串扰
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

static PERF_SQL_ENABLED: AtomicBool = AtomicBool::new(false);
static SLOW_SQL_THRESHOLD_MS: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static ACTIVE_GUARDS: Cell<u32> = const { Cell::new(0) };
    static STATS: Cell<SqlStats> = const { Cell::new(SqlStats::ZERO) };
}

/// SQL 计数快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SqlStats {
    pub statements: u64,
    pub writes: u64,
    pub slow: u64,
}

impl SqlStats {
    const ZERO: SqlStats = SqlStats {
        statements: 0,
        writes: 0,
        slow: 0,
    };

    fn delta_since(self, start: SqlStats) -> SqlStats {
        SqlStats {
            statements: self.statements.saturating_sub(start.statements),
            writes: self.writes.saturating_sub(start.writes),
            slow: self.slow.saturating_sub(start.slow),
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| {
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn is_write_statement(sql: &str) -> bool {
    let head = sql.trim_start();
    let upper = head.get(..6).unwrap_or(head).to_ascii_uppercase();
    upper.starts_with("INSERT") || upper.starts_with("UPDATE") || upper.starts_with("DELETE")
}

fn shorten(sql: &str, max_chars: usize) -> String {
    let flat = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}…", cut)
}

/// 安装 SQLite 语句 trace/profile
///
/// 开关：
/// - Debug 默认开启；Release 默认关闭
/// - `PAINT_LINE_PERF_SQL=1` 强制开启，`=0` 强制关闭
/// - `PAINT_LINE_SLOW_SQL_MS=50` 配置慢 SQL 阈值（毫秒）
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let enabled = env_flag("PAINT_LINE_PERF_SQL").unwrap_or(cfg!(debug_assertions));
    PERF_SQL_ENABLED.store(enabled, Ordering::Relaxed);

    if !enabled {
        conn.trace(None);
        conn.profile(None);
        return;
    }

    let slow_ms = std::env::var("PAINT_LINE_SLOW_SQL_MS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(if cfg!(debug_assertions) { 50 } else { 200 });
    SLOW_SQL_THRESHOLD_MS.store(slow_ms, Ordering::Relaxed);

    conn.trace(Some(on_sql_trace));
    conn.profile(Some(on_sql_profile));
}

fn guard_active() -> bool {
    ACTIVE_GUARDS.with(|g| g.get() > 0)
}

fn bump(f: impl FnOnce(&mut SqlStats)) {
    STATS.with(|s| {
        let mut stats = s.get();
        f(&mut stats);
        s.set(stats);
    });
}

fn on_sql_trace(sql: &str) {
    if !PERF_SQL_ENABLED.load(Ordering::Relaxed) || !guard_active() {
        return;
    }
    let write = is_write_statement(sql);
    bump(|s| {
        s.statements = s.statements.saturating_add(1);
        if write {
            s.writes = s.writes.saturating_add(1);
        }
    });
}

fn on_sql_profile(sql: &str, duration: Duration) {
    if !PERF_SQL_ENABLED.load(Ordering::Relaxed) {
        return;
    }

    let ms = duration.as_millis() as u64;
    let threshold = SLOW_SQL_THRESHOLD_MS.load(Ordering::Relaxed);
    if threshold == 0 || ms < threshold {
        return;
    }

    tracing::warn!(
        target: "slow_sql",
        duration_ms = ms,
        sql = %shorten(sql, 400),
        "slow sql"
    );
    if guard_active() {
        bump(|s| s.slow = s.slow.saturating_add(1));
    }
}

/// 性能统计 Guard：Drop 时输出 elapsed_ms + SQL 计数
///
/// ```ignore
/// let _perf = paint_line_engine::perf::PerfGuard::new("register_batch");
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    baseline: SqlStats,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        ACTIVE_GUARDS.with(|g| g.set(g.get().saturating_add(1)));
        Self {
            op,
            start: Instant::now(),
            baseline: STATS.with(|s| s.get()),
        }
    }

    /// 当前已累计的 SQL 计数（相对 Guard 创建时刻）
    pub fn sql_stats(&self) -> SqlStats {
        STATS.with(|s| s.get()).delta_since(self.baseline)
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let stats = self.sql_stats();
        tracing::info!(
            target: "perf",
            op = self.op,
            elapsed_ms = self.start.elapsed().as_millis() as u64,
            sql_count = stats.statements,
            write_count = stats.writes,
            slow_sql_count = stats.slow,
            "done"
        );
        ACTIVE_GUARDS.with(|g| g.set(g.get().saturating_sub(1)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_statement_detection() {
        assert!(is_write_statement("  INSERT INTO piece VALUES (1)"));
        assert!(is_write_statement("update paint set remaining_kg = 1"));
        assert!(!is_write_statement("SELECT * FROM cabin"));
        assert!(!is_write_statement("BEGIN"));
    }

    #[test]
    fn test_shorten_collapses_whitespace() {
        assert_eq!(shorten("SELECT\n   1", 100), "SELECT 1");
        assert_eq!(shorten("abcdef", 3), "abc…");
    }
}
