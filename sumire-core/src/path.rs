//! パス同一性の判定
//!
//! フロントエンドは絶対パスで、スクリプトエンジンは相対パスや
//! ファイル名だけで同じソースファイルを参照することがあります。
//! 末尾からパス区切りまでを比較することで両者を同一視します。

/// 2つのパスが同じファイルを指すか判定する
///
/// 末尾から1文字ずつ大文字小文字を無視して比較し、どちらかが
/// パス区切り（'/' または '\\'）に達するか文字列が尽きた時点で
/// 打ち切る。比較した文字がすべて一致し、かつ走査停止後に両側とも
/// 「尽きている」または「ちょうど区切りで止まっている」場合のみ
/// 一致とみなす。
///
/// 単純な末尾一致では "ayer.as" が "player.as" に誤って一致する。
/// 区切り境界の検査によって、ファイル名の途中で切れた一致を
/// 排除する。
pub fn are_same_files(lhs: &str, rhs: &str) -> bool {
    let mut l = lhs.chars().rev().peekable();
    let mut r = rhs.chars().rev().peekable();

    loop {
        match (l.peek(), r.peek()) {
            (Some(&cl), Some(&cr)) => {
                if is_separator(cl) || is_separator(cr) {
                    break;
                }
                if !cl.eq_ignore_ascii_case(&cr) {
                    return false;
                }
                l.next();
                r.next();
            }
            _ => break,
        }
    }

    at_boundary(l.peek()) && at_boundary(r.peek())
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// 走査停止位置が「尽きた」か「区切り」のどちらかであること
fn at_boundary(next: Option<&char>) -> bool {
    next.map_or(true, |&c| is_separator(c))
}
