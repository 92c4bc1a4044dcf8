//! デバッガフロントエンドへのTCP接続

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

use crate::Result;

/// トランスポート層のエラー
#[derive(Debug, Error)]
pub enum NetError {
    /// 接続の確立に失敗した。セッション開始を中断する致命的エラーで、
    /// 再試行は行わない。
    #[error("failed to connect to debugger frontend at {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// 接続確立後の入出力エラー。セッションを終了させる。
    #[error("I/O error on debugger connection: {0}")]
    Io(#[from] std::io::Error),

    /// フロントエンドが接続を閉じた
    #[error("debugger frontend closed the connection")]
    Closed,
}

/// フロントエンドとの1本のTCP接続
///
/// 受信はレシーバスレッドが専有する。送信は実行スレッドと
/// レシーバスレッドのどちらからも呼ばれうるため、内部で
/// 直列化して通知どうしが交錯しないようにする。
pub struct Transport {
    stream: TcpStream,
    /// 送信の直列化用
    send_lock: Mutex<()>,
}

impl Transport {
    /// フロントエンドへ接続する
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let addr = format!("{host}:{port}");
        let stream = TcpStream::connect(&addr).map_err(|source| NetError::Connect {
            addr: addr.clone(),
            source,
        })?;

        debug!(%addr, "connected to debugger frontend");

        Ok(Self {
            stream,
            send_lock: Mutex::new(()),
        })
    }

    /// バイト列をすべて送信する
    pub fn send(&self, bytes: &[u8]) -> Result<()> {
        let _guard = self.send_lock.lock();
        (&self.stream).write_all(bytes)?;
        Ok(())
    }

    /// 受信を待つ
    ///
    /// データが届くか、相手が接続を閉じるか、エラーが起きるまで
    /// 呼び出したスレッドをブロックする。0バイトの受信は相手側の
    /// クローズを意味し、Closedを返す。
    pub fn receive(&self, buf: &mut [u8]) -> Result<usize> {
        let len = (&self.stream).read(buf)?;
        if len == 0 {
            return Err(NetError::Closed);
        }
        Ok(len)
    }

    /// 接続を閉じる
    ///
    /// ブロック中のreceiveはエラーで戻る。すでに閉じている場合の
    /// エラーは無視するため、二重に呼んでも安全。
    pub fn shutdown(&self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_send_and_receive() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local addr");

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("Failed to accept");

            let mut buf = [0u8; 16];
            let len = stream.read(&mut buf).expect("Failed to read");
            assert_eq!(&buf[..len], b"ping\n");

            stream.write_all(b"pong\n").expect("Failed to write");
        });

        let transport =
            Transport::connect("127.0.0.1", addr.port()).expect("Failed to connect");
        transport.send(b"ping\n").expect("Failed to send");

        let mut buf = [0u8; 16];
        let len = transport.receive(&mut buf).expect("Failed to receive");
        assert_eq!(&buf[..len], b"pong\n");

        server.join().expect("Server thread panicked");
    }

    #[test]
    fn test_receive_reports_closed_on_peer_close() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local addr");

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("Failed to accept");
            drop(stream);
        });

        let transport =
            Transport::connect("127.0.0.1", addr.port()).expect("Failed to connect");
        server.join().expect("Server thread panicked");

        let mut buf = [0u8; 16];
        assert!(matches!(
            transport.receive(&mut buf),
            Err(NetError::Closed)
        ));
    }

    #[test]
    fn test_connect_failure() {
        // リスナーを閉じたポートへの接続は拒否される
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
        let port = listener.local_addr().expect("Failed to get local addr").port();
        drop(listener);

        assert!(matches!(
            Transport::connect("127.0.0.1", port),
            Err(NetError::Connect { .. })
        ));
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local addr");

        let server = thread::spawn(move || {
            let _ = listener.accept();
        });

        let transport =
            Transport::connect("127.0.0.1", addr.port()).expect("Failed to connect");
        transport.shutdown();
        transport.shutdown();

        server.join().expect("Server thread panicked");
    }
}
