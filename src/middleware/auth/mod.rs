/*
 * Responsibility
 * - gate: 保護 route の認証 (verify → refresh → Authorization 書き戻し)
 * - mirror: 全 route で Authorization を response に返す
 */
pub mod gate;
pub mod mirror;
