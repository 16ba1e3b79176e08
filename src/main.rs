// ==========================================
// 喷涂线引擎 - 命令行入口
// ==========================================
// 用法:
//   paint-line-engine [--db PATH] [--actor NAME] [--permissions a,b] <命令> [参数]
// 命令:
//   init-db                      建库建表
//   register <request.json>...   登记喷涂批次（多个文件并发提交）
//   alerts [--limit N]           未读告警
//   mark-read <alert_id>         告警标记已读
//   maintenance-report           设备维护报表
//   cabin-status <cabin_id>      喷房当日状态
//   usage <cabin_id> [YYYY-MM-DD] 喷房用量记录
// 会话: --actor / --permissions，缺省读取 PAINT_LINE_ACTOR / PAINT_LINE_PERMISSIONS
// ==========================================

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde_json::{json, Value};

use futures::future::join_all;
use paint_line_engine::api::{
    ApiError, ApiResult, ErrorResponse, RegisterBatchRequest, RegisterBatchResponse,
    SessionContext,
};
use paint_line_engine::app::{get_default_db_path, AppState};
use paint_line_engine::db::DATE_FORMAT;

const DEFAULT_ALERT_LIMIT: i64 = 50;

#[derive(Debug, Default)]
struct CliArgs {
    db_path: Option<String>,
    actor: Option<String>,
    permissions: Option<String>,
    limit: Option<i64>,
    command: Option<String>,
    positional: Vec<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs> {
    let mut cli = CliArgs::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => cli.db_path = Some(args.next().context("--db 需要路径参数")?),
            "--actor" => cli.actor = Some(args.next().context("--actor 需要操作人参数")?),
            "--permissions" => {
                cli.permissions = Some(args.next().context("--permissions 需要权限列表")?)
            }
            "--limit" => {
                let raw = args.next().context("--limit 需要数值参数")?;
                cli.limit = Some(raw.parse().with_context(|| format!("非法 limit: {}", raw))?);
            }
            _ if cli.command.is_none() => cli.command = Some(arg),
            _ => cli.positional.push(arg),
        }
    }
    Ok(cli)
}

/// 由命令行/环境变量构造会话；缺少操作人时视为无会话
fn build_session(cli: &CliArgs) -> Option<SessionContext> {
    let actor = cli
        .actor
        .clone()
        .or_else(|| std::env::var("PAINT_LINE_ACTOR").ok())
        .filter(|a| !a.trim().is_empty())?;
    let permissions = cli
        .permissions
        .clone()
        .or_else(|| std::env::var("PAINT_LINE_PERMISSIONS").ok())
        .unwrap_or_default();

    Some(SessionContext::new(
        &actor,
        permissions
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from),
    ))
}

fn positional_i64(cli: &CliArgs, index: usize, name: &str) -> Result<i64> {
    let raw = cli
        .positional
        .get(index)
        .ok_or_else(|| anyhow!("缺少参数 <{}>", name))?;
    raw.parse()
        .with_context(|| format!("参数 <{}> 不是整数: {}", name, raw))
}

/// 输出结果；错误以 { ok:false, kind, message } 输出并返回退出码 1
fn emit<T: Serialize>(result: ApiResult<T>, shape: impl FnOnce(T) -> Value) -> Result<i32> {
    match result {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&shape(value))?);
            Ok(0)
        }
        Err(err) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&ErrorResponse::from(&err))?
            );
            Ok(1)
        }
    }
}

/// 读取一个请求文件并登记；JSON 解析失败按 INVALID_INPUT 返回
async fn register_file(
    state: &Arc<AppState>,
    session: Option<SessionContext>,
    path: &str,
) -> Result<ApiResult<RegisterBatchResponse>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取请求文件: {}", path))?;

    let request: RegisterBatchRequest = match serde_json::from_str(&raw) {
        Ok(r) => r,
        Err(e) => {
            return Ok(Err(ApiError::InvalidInput(format!(
                "请求 JSON 解析失败 ({}): {}",
                path, e
            ))))
        }
    };

    let api = state.production_api.clone();
    let result =
        tokio::task::spawn_blocking(move || api.register_batch(session.as_ref(), &request))
            .await?;
    Ok(result)
}

async fn run(cli: CliArgs) -> Result<i32> {
    let command = cli.command.clone().unwrap_or_default();
    let db_path = cli.db_path.clone().unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = {
        let db_path = db_path.clone();
        tokio::task::spawn_blocking(move || AppState::new(db_path))
            .await?
            .map_err(|e| anyhow!(e))?
    };
    let state = Arc::new(state);
    let session = build_session(&cli);

    match command.as_str() {
        "init-db" => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "ok": true, "db_path": db_path }))?
            );
            Ok(0)
        }
        "register" => {
            if cli.positional.is_empty() {
                bail!("缺少参数 <request.json>");
            }
            if cli.positional.len() == 1 {
                let result = register_file(&state, session, &cli.positional[0]).await?;
                return emit(result, |resp| json!(resp));
            }

            // 多个请求文件并发提交；写入由登记事务串行化
            let tasks = cli
                .positional
                .iter()
                .map(|path| register_file(&state, session.clone(), path));
            let results = join_all(tasks).await;

            let mut failed = 0;
            let mut items = Vec::with_capacity(results.len());
            for (path, result) in cli.positional.iter().zip(results) {
                match result? {
                    Ok(resp) => items.push(json!({ "file": path, "result": resp })),
                    Err(err) => {
                        failed += 1;
                        items.push(json!({ "file": path, "result": ErrorResponse::from(&err) }));
                    }
                }
            }
            tracing::info!(total = items.len(), failed, "批量登记完成");
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "ok": failed == 0, "results": items }))?
            );
            Ok(if failed == 0 { 0 } else { 1 })
        }
        "alerts" => {
            let limit = cli.limit.unwrap_or(DEFAULT_ALERT_LIMIT);
            let api = state.production_api.clone();
            let result =
                tokio::task::spawn_blocking(move || api.list_unread_alerts(session.as_ref(), limit))
                    .await?;
            emit(result, |alerts| json!({ "ok": true, "alerts": alerts }))
        }
        "mark-read" => {
            let alert_id = positional_i64(&cli, 0, "alert_id")?;
            let api = state.production_api.clone();
            let result =
                tokio::task::spawn_blocking(move || api.mark_alert_read(session.as_ref(), alert_id))
                    .await?;
            emit(result, |resp| json!(resp))
        }
        "maintenance-report" => {
            let api = state.production_api.clone();
            let result =
                tokio::task::spawn_blocking(move || api.maintenance_report(session.as_ref()))
                    .await?;
            emit(result, |rows| json!({ "ok": true, "equipment": rows }))
        }
        "cabin-status" => {
            let cabin_id = positional_i64(&cli, 0, "cabin_id")?;
            let today = Local::now().date_naive();
            let api = state.production_api.clone();
            let result = tokio::task::spawn_blocking(move || {
                api.cabin_status(session.as_ref(), cabin_id, today)
            })
            .await?;
            emit(result, |cabin| json!({ "ok": true, "cabin": cabin }))
        }
        "usage" => {
            let cabin_id = positional_i64(&cli, 0, "cabin_id")?;
            let date = match cli.positional.get(1) {
                Some(raw) => NaiveDate::parse_from_str(raw, DATE_FORMAT)
                    .with_context(|| format!("日期格式错误（应为YYYY-MM-DD）: {}", raw))?,
                None => Local::now().date_naive(),
            };
            let api = state.production_api.clone();
            let result = tokio::task::spawn_blocking(move || {
                api.usage_history(session.as_ref(), cabin_id, date)
            })
            .await?;
            emit(result, |events| json!({ "ok": true, "events": events }))
        }
        "" => bail!("缺少命令，可用: init-db | register | alerts | mark-read | maintenance-report | cabin-status | usage"),
        other => bail!("未知命令: {}", other),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    paint_line_engine::logging::init();

    tracing::info!("{} v{}", paint_line_engine::APP_NAME, paint_line_engine::VERSION);

    let cli = parse_args(std::env::args().skip(1))?;
    let code = run(cli).await?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_parse_args() {
        let cli = parse_args(args(&[
            "--actor", "ana", "register", "req.json", "--permissions", "production:register",
        ]))
        .unwrap();
        assert_eq!(cli.command.as_deref(), Some("register"));
        assert_eq!(cli.positional, vec!["req.json".to_string()]);

        let session = build_session(&cli).unwrap();
        assert_eq!(session.actor, "ana");
        assert!(session.permissions.contains("production:register"));

        assert!(parse_args(args(&["--limit", "abc"])).is_err());
    }
}
