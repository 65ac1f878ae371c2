/*
 * Responsibility
 * - 外部サービス (Identity Platform) とのやり取り
 */
pub mod identity;
