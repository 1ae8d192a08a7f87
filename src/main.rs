// ==========================================
// 订单批量导入 - 命令行入口
// ==========================================
// 用法: order-ingest <file> [db_path] [options_json]
// 输出: stdout 打印响应信封 JSON { success, data | error }
// ==========================================

use order_ingest::api::ImportApi;
use order_ingest::db::default_db_path;
use order_ingest::logging;
use std::process::ExitCode;

const USAGE: &str = "用法: order-ingest <file> [db_path] [options_json]";

#[tokio::main]
async fn main() -> ExitCode {
    // 初始化日志系统
    logging::init();

    let mut args = std::env::args().skip(1);
    let Some(file_path) = args.next() else {
        eprintln!("{}", USAGE);
        return ExitCode::from(2);
    };
    let db_path = args
        .next()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(default_db_path);
    let options_json = args.next();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", order_ingest::APP_NAME, order_ingest::VERSION);
    tracing::info!(db_path = %db_path, file_path = %file_path, "使用数据库");
    tracing::info!("==================================================");

    let api = ImportApi::new(db_path);
    let response = api.handle_upload(&file_path, options_json.as_deref()).await;

    match serde_json::to_string_pretty(&response) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("响应序列化失败: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if response.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
