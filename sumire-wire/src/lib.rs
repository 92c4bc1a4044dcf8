//! Sumire ワイヤプロトコル
//!
//! このクレートは、デバッガフロントエンドとの間で交わされる
//! 改行区切りテキストプロトコルの解析と組み立てを提供します。
//! ソケットの読み書きには関与せず、バイト列と論理メッセージの
//! 変換だけを担当します。

pub mod framer;
pub mod message;

pub use framer::MessageFramer;
pub use message::{Breakpoint, DebugCommand, ParseError, ServerMessage, Variable};
