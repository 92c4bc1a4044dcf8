//! コマンドチャネル
//!
//! フロントエンドから届いた最新の再開コマンドを1つだけ保持する
//! 単一スロットのメールボックスです。プロトコル上、停止1回に
//! つき未処理の決定は1つだけという前提のため、消費されていない
//! コマンドは新しいコマンドで上書きされます（損失は仕様）。

use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use sumire_wire::DebugCommand;
use tracing::trace;

/// take_blockingの1回の待機の上限
const WAIT_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
struct Slot {
    pending: Option<DebugCommand>,
    cancelled: bool,
}

/// 単一スロットのコマンドメールボックス
///
/// 書き手はレシーバスレッド、読み手は停止中のスクリプト実行
/// スレッド。cancelはセッションの終了処理と結び付いていて、
/// ブレークポイントで停止したままのスレッドを確実に解放する。
#[derive(Debug, Default)]
pub struct CommandSlot {
    slot: Mutex<Slot>,
    cond: Condvar,
}

impl CommandSlot {
    /// 新しい空のスロットを作成する
    pub fn new() -> Self {
        Self::default()
    }

    /// コマンドを設定する
    ///
    /// ブロックせず常に成功する。保留中のコマンドは上書きされる。
    pub fn set(&self, cmd: DebugCommand) {
        {
            let mut slot = self.slot.lock();
            if let Some(prev) = slot.pending.replace(cmd) {
                trace!(?prev, ?cmd, "overwriting pending command");
            }
        }
        self.cond.notify_all();
    }

    /// コマンドが届くまでブロックして待つ
    ///
    /// 取り出したコマンドはスロットから取り除かれ、次の停止は
    /// 改めてコマンドを待つ。cancel済みの場合はNoneを返す。
    pub fn take_blocking(&self) -> Option<DebugCommand> {
        let mut slot = self.slot.lock();
        loop {
            if let Some(cmd) = slot.pending.take() {
                return Some(cmd);
            }
            if slot.cancelled {
                return None;
            }
            let _ = self.cond.wait_for(&mut slot, WAIT_INTERVAL);
        }
    }

    /// 待機中のスレッドを解放する
    ///
    /// 以後のtake_blockingは即座にNoneを返す。
    pub fn cancel(&self) {
        self.slot.lock().cancelled = true;
        self.cond.notify_all();
    }
}
