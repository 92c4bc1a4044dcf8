//! ブレークポイントレジストリ
//!
//! フロントエンドが送ってくるブレークポイント集合を保持します。
//! レシーバスレッドによる一括置き換えと、スクリプト実行スレッド
//! からの検索が並行するため、単一のミューテックスで保護します。

use parking_lot::Mutex;
use sumire_wire::Breakpoint;
use tracing::debug;

use crate::path::are_same_files;

/// 現在有効なブレークポイント集合
///
/// 置き換えは完成済みのVecを単一のロック区間で差し替える。
/// 読み手が「消去済みでまだ再投入されていない」中間状態を
/// 観測することはない。
#[derive(Debug, Default)]
pub struct BreakpointRegistry {
    breakpoints: Mutex<Vec<Breakpoint>>,
}

impl BreakpointRegistry {
    /// 新しい空のレジストリを作成する
    pub fn new() -> Self {
        Self::default()
    }

    /// ブレークポイント集合を一括で置き換える
    pub fn replace_all(&self, entries: Vec<Breakpoint>) {
        debug!(count = entries.len(), "replacing breakpoint list");
        *self.breakpoints.lock() = entries;
    }

    /// (パス, 行) に一致する最初のブレークポイントを探す
    ///
    /// 行番号が等しく、かつパスが同一ファイルと判定される
    /// エントリを返す。
    pub fn find(&self, path: &str, line: u32) -> Option<Breakpoint> {
        self.breakpoints
            .lock()
            .iter()
            .find(|bp| bp.line == line && are_same_files(&bp.path, path))
            .cloned()
    }

    /// スクリプトエンジンが知るファイル名から、フロントエンドが
    /// 登録したパス表記を引く
    ///
    /// 一致する登録がなければ入力をそのまま返す。停止通知に
    /// フロントエンド側の元の絶対パスを使うための解決。
    pub fn resolve_path(&self, filename: &str) -> String {
        self.breakpoints
            .lock()
            .iter()
            .find(|bp| are_same_files(&bp.path, filename))
            .map(|bp| bp.path.clone())
            .unwrap_or_else(|| filename.to_string())
    }

    /// 登録されているブレークポイントの数
    pub fn count(&self) -> usize {
        self.breakpoints.lock().len()
    }
}
