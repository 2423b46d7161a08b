//! todo バイナリのエントリポイント
//! 環境変数の設定でホスト型の ToDo API に接続します。

use anyhow::Context;
use domain::TodoItem;
use infrastructure::HttpTodoStore;
use shared::{init_tracing, Config, LogFormat};
use std::io::{BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;
use todo_cli::{App, Command, USAGE};

#[tokio::main]
async fn main() -> ExitCode {
    // ログは RUST_LOG / TODO_LOG_FORMAT で制御（出力先は標準エラー）
    if let Err(e) = init_tracing(LogFormat::from_env()) {
        eprintln!("warning: {e}");
    }

    let command = match Command::parse(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("error: {e}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    match run(command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    tracing::debug!(base_url = %config.base_url, tenant = %config.tenant_id, "Configuration loaded");

    let page_size = config.page_size;
    let store = Arc::new(HttpTodoStore::new(config)?);
    let mut app = App::new(store, page_size, std::io::stdout().lock());

    app.run(command, &mut ask).await
}

/// 標準入力で削除の確認を取る
fn ask(item: &TodoItem) -> std::io::Result<bool> {
    let mut stderr = std::io::stderr();
    write!(stderr, "delete #{} \"{}\"? [y/N] ", item.id, item.title)?;
    stderr.flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
