// ==========================================
// 喷涂线引擎 - 日志系统
// ==========================================
// 输出: stderr（stdout 留给命令行 JSON 结果）
// 环境变量:
// - RUST_LOG: 过滤器，缺省 info（如 RUST_LOG=paint_line_engine::engine=debug,perf=debug）
// - PAINT_LINE_LOG_JSON: 1/true/yes 时输出 JSON 行日志
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn json_requested() -> bool {
    std::env::var("PAINT_LINE_LOG_JSON")
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// 初始化日志系统（进程内只调用一次）
///
/// ```no_run
/// paint_line_engine::logging::init();
/// ```
pub fn init() {
    let builder = fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(true);

    if json_requested() {
        builder.json().with_current_span(false).init();
    } else {
        builder.with_line_number(true).init();
    }
}

/// 测试用：debug 级别，写入测试捕获输出；重复调用无副作用
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
