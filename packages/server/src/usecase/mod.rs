//! UseCase 層
//!
//! ビジネスロジックを実装するレイヤー。
//! UI 層から呼び出され、Domain 層と配信基盤を操作します。

pub mod error;
pub mod friend_notice;
pub mod room_coordinator;

pub use error::CoordinatorError;
pub use friend_notice::{FriendAction, FriendNoticeUseCase};
pub use room_coordinator::RoomCoordinator;
