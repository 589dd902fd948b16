use std::{sync::Arc, time::SystemTime};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use uuid::Uuid;

use super::RoomStore;
use crate::dao::{
    models::{PlayerEntity, QuestionEntity, RoomEntity, RoomStatus},
    storage::{StorageError, StorageResult},
};

#[derive(Debug, Clone)]
struct RoomRecord {
    room: RoomEntity,
    questions: Vec<QuestionEntity>,
    players: Vec<PlayerEntity>,
}

/// Process-local [`RoomStore`] backed by concurrent maps.
#[derive(Clone, Default)]
pub struct MemoryRoomStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    rooms: DashMap<Uuid, RoomRecord>,
    codes: DashMap<String, Uuid>,
}

impl MemoryRoomStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn create_room(&self, room: RoomEntity) -> StorageResult<()> {
        if self.inner.rooms.contains_key(&room.id) {
            return Err(StorageError::Conflict(format!("room `{}` already exists", room.id)));
        }
        match self.inner.codes.entry(room.code.clone()) {
            Entry::Occupied(_) => Err(StorageError::Conflict(format!(
                "room code `{}` already in use",
                room.code
            ))),
            Entry::Vacant(slot) => {
                slot.insert(room.id);
                self.inner.rooms.insert(
                    room.id,
                    RoomRecord {
                        room,
                        questions: Vec::new(),
                        players: Vec::new(),
                    },
                );
                Ok(())
            }
        }
    }

    fn find_room(&self, id: Uuid) -> Option<RoomEntity> {
        self.inner.rooms.get(&id).map(|record| record.room.clone())
    }

    fn find_room_by_code(&self, code: &str) -> Option<RoomEntity> {
        let id = *self.inner.codes.get(code)?;
        self.find_room(id)
    }

    fn update_room(&self, room: RoomEntity) -> StorageResult<()> {
        let mut record = self
            .inner
            .rooms
            .get_mut(&room.id)
            .ok_or(StorageError::RoomNotFound(room.id))?;
        if record.room.code != room.code {
            return Err(StorageError::Conflict("room code cannot change".into()));
        }
        record.room = room;
        Ok(())
    }

    fn transition_room(
        &self,
        id: Uuid,
        from: RoomStatus,
        to: RoomStatus,
    ) -> StorageResult<RoomEntity> {
        let mut record = self
            .inner
            .rooms
            .get_mut(&id)
            .ok_or(StorageError::RoomNotFound(id))?;
        if record.room.status != from {
            return Err(StorageError::Conflict(format!(
                "room `{id}` is {:?}, expected {from:?}",
                record.room.status
            )));
        }
        record.room.status = to;
        record.room.updated_at = SystemTime::now();
        Ok(record.room.clone())
    }

    fn delete_room(&self, id: Uuid) -> bool {
        match self.inner.rooms.remove(&id) {
            Some((_, record)) => {
                self.inner.codes.remove(&record.room.code);
                true
            }
            None => false,
        }
    }

    fn list_rooms(&self) -> Vec<RoomEntity> {
        let mut rooms: Vec<RoomEntity> = self
            .inner
            .rooms
            .iter()
            .map(|record| record.room.clone())
            .collect();
        rooms.sort_by_key(|room| room.created_at);
        rooms
    }

    fn save_questions(&self, room_id: Uuid, questions: Vec<QuestionEntity>) -> StorageResult<()> {
        let mut record = self
            .inner
            .rooms
            .get_mut(&room_id)
            .ok_or(StorageError::RoomNotFound(room_id))?;
        record.questions = questions;
        Ok(())
    }

    fn questions_for_room(&self, room_id: Uuid) -> StorageResult<Vec<QuestionEntity>> {
        self.inner
            .rooms
            .get(&room_id)
            .map(|record| record.questions.clone())
            .ok_or(StorageError::RoomNotFound(room_id))
    }

    fn add_player(
        &self,
        room_id: Uuid,
        player: PlayerEntity,
        capacity: usize,
    ) -> StorageResult<()> {
        let mut record = self
            .inner
            .rooms
            .get_mut(&room_id)
            .ok_or(StorageError::RoomNotFound(room_id))?;
        if record.room.status != RoomStatus::Open {
            return Err(StorageError::Conflict(format!(
                "room `{room_id}` no longer accepts players"
            )));
        }
        if record.players.len() >= capacity {
            return Err(StorageError::Conflict(format!(
                "room `{room_id}` is full ({capacity} players)"
            )));
        }
        record.players.push(player);
        Ok(())
    }

    fn players_for_room(&self, room_id: Uuid) -> StorageResult<Vec<PlayerEntity>> {
        self.inner
            .rooms
            .get(&room_id)
            .map(|record| record.players.clone())
            .ok_or(StorageError::RoomNotFound(room_id))
    }
}

impl RoomStore for MemoryRoomStore {
    fn create_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.create_room(room) })
    }

    fn find_room(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.find_room(id)) })
    }

    fn find_room_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.find_room_by_code(&code)) })
    }

    fn update_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.update_room(room) })
    }

    fn transition_room(
        &self,
        id: Uuid,
        from: RoomStatus,
        to: RoomStatus,
    ) -> BoxFuture<'static, StorageResult<RoomEntity>> {
        let store = self.clone();
        Box::pin(async move { store.transition_room(id, from, to) })
    }

    fn delete_room(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.delete_room(id)) })
    }

    fn list_rooms(&self) -> BoxFuture<'static, StorageResult<Vec<RoomEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.list_rooms()) })
    }

    fn save_questions(
        &self,
        room_id: Uuid,
        questions: Vec<QuestionEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_questions(room_id, questions) })
    }

    fn questions_for_room(
        &self,
        room_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.questions_for_room(room_id) })
    }

    fn add_player(
        &self,
        room_id: Uuid,
        player: PlayerEntity,
        capacity: usize,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.add_player(room_id, player, capacity) })
    }

    fn players_for_room(
        &self,
        room_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.players_for_room(room_id) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
