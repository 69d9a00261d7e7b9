//! スコープ判定ヘルパー。

use crate::domain::entity::claims::Claims;

/// Claims のスコープに指定スコープが含まれるかを判定する。
///
/// スコープは単一スペースで分割し、完全一致で比較する。
/// 空のスコープ指定は常に不一致とする。
pub fn has_scope(claims: &Claims, required: &str) -> bool {
    if required.is_empty() {
        return false;
    }
    claims.scopes().any(|s| s == required)
}
