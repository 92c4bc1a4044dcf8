//! Sumire ネットワークトランスポート
//!
//! このクレートは、デバッガフロントエンドとの1本のTCP接続を
//! 管理する低レベル機能を提供します。接続の確立、バイト列の
//! 送受信、切断の検出を行います。

pub mod transport;

pub use transport::{NetError, Transport};

/// トランスポートの結果型
pub type Result<T> = std::result::Result<T, NetError>;
