//! プロトコルメッセージの定義と変換

use thiserror::Error;

/// ブレークポイント一覧の開始マーカー
pub const MSG_BREAKPOINTS: &str = "BREAKPOINTS";

/// ブレークポイント一覧の終端マーカー
pub const MSG_END_BREAKPOINTS: &str = "END_BREAKPOINTS";

/// 再開コマンドのヘッダ
pub const MSG_COMMAND: &str = "COMMAND";

/// ブレークポイント
///
/// 実行を停止すべき位置を (パス, 1始まりの行番号) で表す。
/// 構築後は変更しない。レジストリはスナップショットの一覧を
/// 保持し、個々のエントリを書き換えることはない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    pub path: String,
    pub line: u32,
}

impl Breakpoint {
    /// 新しいブレークポイントを作成する
    pub fn new(path: impl Into<String>, line: u32) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }
}

/// フロントエンドから届く再開コマンド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugCommand {
    /// 次の行で停止する
    StepOver,
    /// 次の行で停止する
    ///
    /// プロトコルがステップインとステップオーバーを区別しないため、
    /// 現状の動作はStepOverと同一。
    StepIn,
    /// 次のブレークポイントまで実行を継続する
    Continue,
}

impl DebugCommand {
    /// コマンド動詞をパースする
    pub fn parse(verb: &str) -> Option<Self> {
        match verb {
            "STEP_OVER" => Some(DebugCommand::StepOver),
            "STEP_IN" => Some(DebugCommand::StepIn),
            "CONTINUE" => Some(DebugCommand::Continue),
            _ => None,
        }
    }
}

/// フロントエンドから受信する論理メッセージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// ブレークポイント集合の一括置き換え
    Breakpoints(Vec<Breakpoint>),
    /// 再開コマンド
    Command(DebugCommand),
    /// 解釈できない行。ログして破棄する対象で、後続の行の
    /// 処理を妨げてはならない。
    Unknown(String),
}

/// 変数レポートの1エントリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub value: String,
}

impl Variable {
    /// 新しい変数エントリを作成する
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// ブレークポイント行の解析エラー
///
/// 一覧中の1行の失敗はその行だけをスキップする回復可能な
/// エラーであり、一覧全体の処理を中断しない。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing comma in breakpoint entry: {0:?}")]
    MissingComma(String),

    #[error("missing line number in breakpoint entry: {0:?}")]
    MissingLine(String),

    #[error("invalid line number {number:?} in breakpoint entry: {entry:?}")]
    InvalidLine { entry: String, number: String },
}

/// `<path>,<line>` 形式のエントリをパースする
///
/// 最初のカンマで分割し、残りは非負整数でなければならない。
pub fn parse_breakpoint_entry(entry: &str) -> Result<Breakpoint, ParseError> {
    let (path, number) = entry
        .split_once(',')
        .ok_or_else(|| ParseError::MissingComma(entry.to_string()))?;

    if number.is_empty() {
        return Err(ParseError::MissingLine(entry.to_string()));
    }

    let line: u32 = number.parse().map_err(|_| ParseError::InvalidLine {
        entry: entry.to_string(),
        number: number.to_string(),
    })?;

    Ok(Breakpoint::new(path, line))
}

/// ブレークポイント一覧の送信要求を組み立てる
pub fn encode_get_breakpoints() -> String {
    "GET_BREAKPOINTS\n".to_string()
}

/// 停止通知を組み立てる
pub fn encode_stop(bp: &Breakpoint) -> String {
    format!("STOP\n{},{}\n", bp.path, bp.line)
}

/// 変数レポートを組み立てる
///
/// 件数行のあとに (名前, 値) の組を1行ずつ並べる。
pub fn encode_variables(variables: &[Variable]) -> String {
    let mut out = format!("VARIABLES\n{}\n", variables.len());
    for var in variables {
        out.push_str(&var.name);
        out.push('\n');
        out.push_str(&var.value);
        out.push('\n');
    }
    out
}
