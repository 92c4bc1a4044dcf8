//! 受信バイト列のフレーミング
//!
//! ソケットから届くバイト列は、行の途中やセクションの途中で
//! 分断されることがあります。MessageFramerは受信分を蓄積し、
//! 完結した論理メッセージだけを取り出せるようにします。

use std::collections::VecDeque;

use tracing::warn;

use crate::message::{
    parse_breakpoint_entry, DebugCommand, ServerMessage, MSG_BREAKPOINTS, MSG_COMMAND,
    MSG_END_BREAKPOINTS,
};

/// 受信ストリームを論理メッセージ列へ変換するフレーマ
///
/// '\n' を行区切りとし、区切りが届いていない末尾の書きかけ行は
/// 保持したまま出力しない。行の上にはセクション構造を認識する:
/// BREAKPOINTS〜END_BREAKPOINTS の一括リストと、COMMANDと動詞の
/// 2行組。終端が届くまでセクションは処理せず、以降のpushを待つ。
#[derive(Debug, Default)]
pub struct MessageFramer {
    /// 改行がまだ届いていない末尾の書きかけ行
    partial: Vec<u8>,
    /// 完結したがまだ消費されていない行
    lines: VecDeque<String>,
}

impl MessageFramer {
    /// 新しいフレーマを作成する
    pub fn new() -> Self {
        Self::default()
    }

    /// 受信したバイト列を追加する
    pub fn push(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if byte == b'\n' {
                let line = String::from_utf8_lossy(&self.partial).into_owned();
                self.partial.clear();
                self.lines.push_back(line);
            } else {
                self.partial.push(byte);
            }
        }
    }

    /// 完結したメッセージをひとつ取り出す
    ///
    /// セクションの終端（END_BREAKPOINTSまたはコマンド動詞）が
    /// まだ届いていない場合はNoneを返す。部分的なリストが処理
    /// されることはない。
    pub fn next_message(&mut self) -> Option<ServerMessage> {
        let head = self.lines.front()?;

        if head == MSG_BREAKPOINTS {
            self.take_breakpoint_list()
        } else if head == MSG_COMMAND {
            self.take_command()
        } else {
            self.lines.pop_front().map(ServerMessage::Unknown)
        }
    }

    /// BREAKPOINTSセクションを取り出す
    fn take_breakpoint_list(&mut self) -> Option<ServerMessage> {
        // 終端行が現れるまでリストには手を付けない
        let end = self
            .lines
            .iter()
            .position(|line| line == MSG_END_BREAKPOINTS)?;

        let mut entries = Vec::new();
        for line in self.lines.drain(..=end).skip(1) {
            if line == MSG_END_BREAKPOINTS {
                break;
            }

            // 1行の失敗はその行だけをスキップする
            match parse_breakpoint_entry(&line) {
                Ok(bp) => entries.push(bp),
                Err(err) => warn!(%err, "skipping malformed breakpoint entry"),
            }
        }

        Some(ServerMessage::Breakpoints(entries))
    }

    /// COMMANDと動詞の2行組を取り出す
    fn take_command(&mut self) -> Option<ServerMessage> {
        // 動詞の行が届くまで待つ
        if self.lines.len() < 2 {
            return None;
        }

        self.lines.pop_front();
        let verb = self.lines.pop_front()?;

        match DebugCommand::parse(&verb) {
            Some(cmd) => Some(ServerMessage::Command(cmd)),
            None => Some(ServerMessage::Unknown(verb)),
        }
    }

    /// 保留中の行数（書きかけ行は含まない）
    pub fn pending_lines(&self) -> usize {
        self.lines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Breakpoint;

    fn drain(framer: &mut MessageFramer) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Some(msg) = framer.next_message() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn test_single_chunk_breakpoint_list() {
        let mut framer = MessageFramer::new();
        framer.push(b"BREAKPOINTS\na.as,1\nb.as,2\nEND_BREAKPOINTS\n");

        assert_eq!(
            drain(&mut framer),
            vec![ServerMessage::Breakpoints(vec![
                Breakpoint::new("a.as", 1),
                Breakpoint::new("b.as", 2),
            ])]
        );
    }

    #[test]
    fn test_reassembly_across_chunks() {
        // 任意の位置で分断されたバイト列は、一括で与えた場合と
        // 同じ解析結果にならなければならない
        let mut framer = MessageFramer::new();

        framer.push(b"BREAK");
        assert_eq!(framer.next_message(), None);

        framer.push(b"POINTS\na.as,1\nEND_BRE");
        assert_eq!(framer.next_message(), None);

        framer.push(b"AKPOINTS\n");
        assert_eq!(
            framer.next_message(),
            Some(ServerMessage::Breakpoints(vec![Breakpoint::new("a.as", 1)]))
        );
        assert_eq!(framer.next_message(), None);
    }

    #[test]
    fn test_partial_list_is_not_processed() {
        let mut framer = MessageFramer::new();
        framer.push(b"BREAKPOINTS\na.as,1\nb.as,2\n");

        // 終端が届くまでは何も出てこない
        assert_eq!(framer.next_message(), None);
        assert_eq!(framer.pending_lines(), 3);

        framer.push(b"END_BREAKPOINTS\n");
        assert!(matches!(
            framer.next_message(),
            Some(ServerMessage::Breakpoints(ref bps)) if bps.len() == 2
        ));
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let mut framer = MessageFramer::new();
        framer.push(b"BREAKPOINTS\na.as,3\nbad_entry\nb.as,7\nEND_BREAKPOINTS\n");

        assert_eq!(
            framer.next_message(),
            Some(ServerMessage::Breakpoints(vec![
                Breakpoint::new("a.as", 3),
                Breakpoint::new("b.as", 7),
            ]))
        );
    }

    #[test]
    fn test_command_split_across_chunks() {
        let mut framer = MessageFramer::new();

        framer.push(b"COMMAND\n");
        assert_eq!(framer.next_message(), None);

        framer.push(b"CONTINUE\n");
        assert_eq!(
            framer.next_message(),
            Some(ServerMessage::Command(DebugCommand::Continue))
        );
    }

    #[test]
    fn test_unknown_lines_do_not_stall_later_messages() {
        let mut framer = MessageFramer::new();
        framer.push(b"PING\nHELLO\nCOMMAND\nSTEP_OVER\n");

        assert_eq!(
            drain(&mut framer),
            vec![
                ServerMessage::Unknown("PING".to_string()),
                ServerMessage::Unknown("HELLO".to_string()),
                ServerMessage::Command(DebugCommand::StepOver),
            ]
        );
    }

    #[test]
    fn test_unknown_command_verb() {
        let mut framer = MessageFramer::new();
        framer.push(b"COMMAND\nPAUSE\n");

        assert_eq!(
            framer.next_message(),
            Some(ServerMessage::Unknown("PAUSE".to_string()))
        );
    }

    #[test]
    fn test_trailing_partial_line_is_retained() {
        let mut framer = MessageFramer::new();
        framer.push(b"COMMAND\nCONT");

        assert_eq!(framer.next_message(), None);
        assert_eq!(framer.pending_lines(), 1);

        framer.push(b"INUE\n");
        assert_eq!(
            framer.next_message(),
            Some(ServerMessage::Command(DebugCommand::Continue))
        );
    }

    #[test]
    fn test_empty_list() {
        let mut framer = MessageFramer::new();
        framer.push(b"BREAKPOINTS\nEND_BREAKPOINTS\n");

        assert_eq!(
            framer.next_message(),
            Some(ServerMessage::Breakpoints(Vec::new()))
        );
    }
}
