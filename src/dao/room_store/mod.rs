mod memory;

pub use memory::MemoryRoomStore;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{PlayerEntity, QuestionEntity, RoomEntity, RoomStatus},
    storage::StorageResult,
};

/// Abstraction over the persistence layer for rooms, their questions and players.
pub trait RoomStore: Send + Sync {
    /// Insert a new room. Fails with a conflict when the id or code is taken.
    fn create_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_room(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>>;
    fn find_room_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>>;
    /// Replace an existing room.
    fn update_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Move a room from `from` to `to` atomically, failing with a conflict when
    /// it is in any other status.
    fn transition_room(
        &self,
        id: Uuid,
        from: RoomStatus,
        to: RoomStatus,
    ) -> BoxFuture<'static, StorageResult<RoomEntity>>;
    /// Delete a room with its questions and players. Returns whether it existed.
    fn delete_room(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    fn list_rooms(&self) -> BoxFuture<'static, StorageResult<Vec<RoomEntity>>>;
    /// Replace the questions of a room.
    fn save_questions(
        &self,
        room_id: Uuid,
        questions: Vec<QuestionEntity>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn questions_for_room(
        &self,
        room_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>>;
    /// Append a player to an open room, refusing it once `capacity` players joined.
    fn add_player(
        &self,
        room_id: Uuid,
        player: PlayerEntity,
        capacity: usize,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Players of a room in join order.
    fn players_for_room(
        &self,
        room_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
