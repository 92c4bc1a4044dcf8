//! Sumire 模擬スクリプトホスト
//!
//! 実際のスクリプトエンジンの代わりに、スクリプトの1行ずつの
//! 実行を模擬してデバッグセッションを一通り動かすデモ。
//! 先にフロントエンドを起動してから実行する。

use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use sumire_core::{DebugSession, SessionConfig, Variable, VariableProvider};

/// Sumire mock script host
#[derive(Parser)]
#[command(name = "mock_engine")]
#[command(version = "0.1.0")]
#[command(about = "Simulated script host for exercising a debug session", long_about = None)]
struct Cli {
    /// Frontend host to connect to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Frontend port to connect to
    #[arg(long, default_value_t = 4712)]
    port: u16,

    /// Simulated script file name
    #[arg(long, default_value = "player.as")]
    script: String,

    /// Number of script lines to execute
    #[arg(long, default_value_t = 30)]
    lines: u32,

    /// Delay between executed lines in milliseconds
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,
}

/// 模擬エンジンのグローバル変数
struct MockVariables;

impl VariableProvider for MockVariables {
    fn variables(&self) -> Vec<Variable> {
        vec![
            Variable::new("initial_player_life", "123"),
            Variable::new("player_damage", "0xFFE0"),
            Variable::new("player_life", "987"),
        ]
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    println!("Sumire mock engine");
    println!("Connecting to {}:{}", cli.host, cli.port);
    println!();

    let config = SessionConfig {
        host: cli.host,
        port: cli.port,
    };
    let session = DebugSession::start_with_variables(&config, Some(Box::new(MockVariables)))?;

    // ブレークポイント一覧の受信を少し待つ
    thread::sleep(Duration::from_millis(500));
    println!(
        "Received {} breakpoint(s) from frontend",
        session.registry().count()
    );
    println!();

    // スクリプトの実行を1行ずつ模擬する
    for line in 1..=cli.lines {
        if !session.is_running() {
            println!("Session ended; continuing without debugger");
            break;
        }

        println!("Executing {}:{}", cli.script, line);
        session.on_executed_line(&cli.script, line);

        thread::sleep(Duration::from_millis(cli.interval_ms));
    }

    session.shutdown();
    println!();
    println!("Done");

    Ok(())
}
