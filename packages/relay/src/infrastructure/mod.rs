//! Infrastructure 層
//!
//! ドメイン層の trait の具体的な実装（インメモリのレジストリ・ルーム状態、JSON ファイル保存、
//! 永続化スケジューラ）と、外部表現との変換（DTO）を提供します。

pub mod dto;
pub mod persistence;
pub mod repository;
