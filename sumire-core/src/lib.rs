//! Sumire デバッグセッションのコア機能
//!
//! このクレートは、スクリプトホストに組み込まれるデバッガ
//! クライアントの中核を提供します。フロントエンドとの
//! ブレークポイント同期、停止・再開の状態遷移、コマンドの
//! 往復を統合します。

pub mod command;
pub mod path;
pub mod registry;
pub mod session;

pub use command::CommandSlot;
pub use registry::BreakpointRegistry;
pub use session::{DebugSession, SessionConfig, VariableProvider};

// 他のクレートから使用するために再エクスポート
pub use sumire_wire::{Breakpoint, DebugCommand, Variable};

/// デバッグセッションの結果型
pub type Result<T> = anyhow::Result<T>;
