/*
 * Responsibility
 * - Handler から見える「認証済みコンテキスト」の型
 * - gate middleware が検証/refresh して request extensions に格納し、handler はこの型だけを受け取る
 *
 * Notes
 * - ID token の検証や refresh の実体は services/identity 側の責務
 * - ここは「型（契約）」として固定化する
 */
use crate::services::identity::VerifiedIdentity;

/// 認証済みのリクエストに付与されるコンテキスト
///
/// - `uid` は Identity Platform のユーザーID (ID token の `sub`)
/// - `email` は検証済み token に含まれていた場合のみ (refresh 経由では None)
/// - `refreshed` はこのリクエスト中に refresh token で ID token を取り直したかどうか
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCtx {
    pub uid: String,
    pub email: Option<String>,
    pub refreshed: bool,
}

impl AuthCtx {
    pub fn verified(identity: VerifiedIdentity) -> Self {
        Self {
            uid: identity.uid,
            email: identity.email,
            refreshed: false,
        }
    }

    pub fn refreshed(uid: String) -> Self {
        Self {
            uid,
            email: None,
            refreshed: true,
        }
    }
}
