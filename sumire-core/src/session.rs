//! セッションコントローラ
//!
//! トランスポートとレシーバスレッドを所有し、スクリプトエンジンが
//! 呼び出す操作（ブレークポイント照会と停止・待機）を公開します。
//! セッションは Idle → Connected → Running → Stopped → Running →
//! … → Disconnected と遷移し、切断は終端です（再接続しない）。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use sumire_net::Transport;
use sumire_wire::message::{encode_get_breakpoints, encode_stop, encode_variables};
use sumire_wire::{Breakpoint, DebugCommand, MessageFramer, ServerMessage, Variable};
use tracing::{debug, error, info, warn};

use crate::command::CommandSlot;
use crate::registry::BreakpointRegistry;
use crate::Result;

/// 受信バッファのサイズ
const RECV_BUFFER_SIZE: usize = 1024;

/// セッションの接続先設定
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// フロントエンドのホスト
    pub host: String,
    /// フロントエンドのポート
    pub port: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4712,
        }
    }
}

/// 停止時の変数レポートを供給するホスト側のフック
///
/// スクリプトエンジンが現在のスコープの変数を報告するために
/// 実装する。未設定の場合、レポートは0件になる。
pub trait VariableProvider: Send + Sync {
    /// 報告する変数の一覧を返す
    fn variables(&self) -> Vec<Variable>;
}

/// デバッグセッション
///
/// startで接続してレシーバスレッドを起動し、shutdownまたは
/// 切断で終了する。レジストリとコマンドスロットはレシーバ
/// スレッドと実行スレッドで共有され、トランスポートは本体が
/// 専有する。
pub struct DebugSession {
    transport: Arc<Transport>,
    registry: Arc<BreakpointRegistry>,
    commands: Arc<CommandSlot>,
    running: Arc<AtomicBool>,
    /// 直前の停止でステップ実行が指示された（次の行で再停止する）
    step_armed: AtomicBool,
    variables: Option<Box<dyn VariableProvider>>,
    receiver: Mutex<Option<JoinHandle<()>>>,
}

impl DebugSession {
    /// フロントエンドへ接続してセッションを開始する
    ///
    /// 接続に失敗した場合はエラーを返し、セッションは開始されない。
    /// 再試行は行わない。
    pub fn start(config: &SessionConfig) -> Result<Self> {
        Self::start_with_variables(config, None)
    }

    /// 変数プロバイダ付きでセッションを開始する
    pub fn start_with_variables(
        config: &SessionConfig,
        variables: Option<Box<dyn VariableProvider>>,
    ) -> Result<Self> {
        let transport = Arc::new(Transport::connect(&config.host, config.port)?);
        let registry = Arc::new(BreakpointRegistry::new());
        let commands = Arc::new(CommandSlot::new());
        let running = Arc::new(AtomicBool::new(true));

        let receiver = spawn_receiver(
            Arc::clone(&transport),
            Arc::clone(&registry),
            Arc::clone(&commands),
            Arc::clone(&running),
        )?;

        // 現在のブレークポイント一覧を要求する
        if let Err(err) = transport.send(encode_get_breakpoints().as_bytes()) {
            running.store(false, Ordering::SeqCst);
            transport.shutdown();
            let _ = receiver.join();
            return Err(err.into());
        }

        info!(host = %config.host, port = config.port, "debug session started");

        Ok(Self {
            transport,
            registry,
            commands,
            running,
            step_armed: AtomicBool::new(false),
            variables,
            receiver: Mutex::new(Some(receiver)),
        })
    }

    /// スクリプトエンジンが1文実行するごとに呼び出すフック
    ///
    /// ブレークポイントに一致するか、直前の停止でステップ実行が
    /// 指示されていた場合、フロントエンドへ停止を通知して再開
    /// コマンドを待つ。その間、呼び出したスレッドはブロックする。
    pub fn on_executed_line(&self, file: &str, line: u32) {
        if !self.is_running() {
            return;
        }

        // フロントエンドが登録したパス表記で停止を報告する
        let resolved = self.registry.resolve_path(file);

        let bp = match self.registry.find(&resolved, line) {
            Some(bp) => bp,
            None if self.step_armed.load(Ordering::SeqCst) => Breakpoint::new(resolved, line),
            None => return,
        };

        match self.trigger_stop(&bp) {
            DebugCommand::StepOver | DebugCommand::StepIn => {
                // プロトコルは両者を区別しないため、どちらも
                // 次の行での停止として扱う
                self.step_armed.store(true, Ordering::SeqCst);
            }
            DebugCommand::Continue => {
                self.step_armed.store(false, Ordering::SeqCst);
            }
        }
    }

    /// フロントエンドへ停止を通知し、再開コマンドを待つ
    ///
    /// STOP通知と変数レポートを送ったあと、コマンドが届くまで
    /// 呼び出したスレッドをブロックする。送信に失敗した場合や
    /// セッションが終了した場合はContinueを返し、ホストは
    /// デバッガなしで実行を継続する。
    pub fn trigger_stop(&self, bp: &Breakpoint) -> DebugCommand {
        info!(path = %bp.path, line = bp.line, "stopped at breakpoint");

        if let Err(err) = self.transport.send(encode_stop(bp).as_bytes()) {
            error!(%err, "failed to send stop notification");
            self.terminate();
            return DebugCommand::Continue;
        }

        let vars = self
            .variables
            .as_ref()
            .map(|provider| provider.variables())
            .unwrap_or_default();
        if let Err(err) = self.transport.send(encode_variables(&vars).as_bytes()) {
            error!(%err, "failed to send variable report");
            self.terminate();
            return DebugCommand::Continue;
        }

        match self.commands.take_blocking() {
            Some(cmd) => {
                debug!(?cmd, "resuming execution");
                cmd
            }
            None => {
                // セッション終了によって解放された
                debug!("command wait cancelled; continuing without debugger");
                DebugCommand::Continue
            }
        }
    }

    /// (パス, 行) に一致するブレークポイントを照会する
    pub fn find_breakpoint(&self, file: &str, line: u32) -> Option<Breakpoint> {
        self.registry.find(file, line)
    }

    /// ブレークポイントレジストリへの参照
    pub fn registry(&self) -> &BreakpointRegistry {
        &self.registry
    }

    /// セッションが生きているか
    ///
    /// レシーバループが切断を検出するか、shutdownが呼ばれると
    /// falseになる。
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// セッションを明示的に終了する
    ///
    /// 実行フラグを下ろし、コマンド待ちのスレッドを解放し、
    /// 接続を閉じてレシーバスレッドを回収する。二重に呼んでも
    /// 安全で、すでに切断済みの接続に対しても安全。
    pub fn shutdown(&self) {
        self.terminate();

        if let Some(handle) = self.receiver.lock().take() {
            if handle.join().is_err() {
                error!("receiver thread panicked");
            }
        }

        info!("debug session shut down");
    }

    /// 接続を閉じてスレッドを解放する（join はしない）
    fn terminate(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.commands.cancel();
        // 閉じることでブロック中のreceiveが戻る
        self.transport.shutdown();
    }
}

impl Drop for DebugSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// レシーバループを起動する
///
/// セッションの生存期間中、受信とメッセージの振り分けを続ける。
/// 切断や入出力エラーの検出が、ネットワーク側からセッションを
/// 終わらせる唯一の経路になる。
fn spawn_receiver(
    transport: Arc<Transport>,
    registry: Arc<BreakpointRegistry>,
    commands: Arc<CommandSlot>,
    running: Arc<AtomicBool>,
) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("sumire-receiver".to_string())
        .spawn(move || {
            let mut framer = MessageFramer::new();
            let mut buf = [0u8; RECV_BUFFER_SIZE];

            while running.load(Ordering::SeqCst) {
                let len = match transport.receive(&mut buf) {
                    Ok(len) => len,
                    Err(err) => {
                        warn!(%err, "disconnected from debugger frontend");
                        running.store(false, Ordering::SeqCst);
                        // 停止中のスレッドを残さない
                        commands.cancel();
                        break;
                    }
                };

                framer.push(&buf[..len]);
                while let Some(msg) = framer.next_message() {
                    dispatch(msg, &registry, &commands);
                }
            }
        })?;

    Ok(handle)
}

/// 受信メッセージを各コンポーネントへ振り分ける
fn dispatch(msg: ServerMessage, registry: &BreakpointRegistry, commands: &CommandSlot) {
    match msg {
        ServerMessage::Breakpoints(entries) => registry.replace_all(entries),
        ServerMessage::Command(cmd) => {
            debug!(?cmd, "received debug command");
            commands.set(cmd);
        }
        ServerMessage::Unknown(line) => {
            warn!(%line, "unknown message from frontend");
        }
    }
}
