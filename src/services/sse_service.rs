use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info};
use uuid::Uuid;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    dao::models::RoomStatus,
    dto::sse::ServerEvent,
    error::ServiceError,
    services::sse_events,
    state::SharedState,
};

/// Receiver attached to a room's SSE channel plus the greeting for that client.
pub struct RoomSubscription {
    pub receiver: broadcast::Receiver<ServerEvent>,
    pub handshake: Option<ServerEvent>,
}

async fn ensure_streamable(state: &SharedState, room_id: Uuid) -> Result<(), ServiceError> {
    let room = state
        .room_store()
        .find_room(room_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("room `{room_id}`")))?;
    if room.status == RoomStatus::Closed {
        return Err(ServiceError::InvalidState(format!(
            "room `{room_id}` is closed"
        )));
    }
    Ok(())
}

/// Subscribe to the event stream of `room_id`.
///
/// Rooms are closed before their channel is released, so the second check
/// catches a cleanup or deletion that ran while the channel was being opened.
pub async fn subscribe_room(
    state: &SharedState,
    room_id: Uuid,
) -> Result<RoomSubscription, ServiceError> {
    ensure_streamable(state, room_id).await?;
    let receiver = state.room_sse(room_id).subscribe();
    if let Err(err) = ensure_streamable(state, room_id).await {
        state.release_room_sse(room_id);
        return Err(err);
    }
    let phase = state
        .sessions()
        .get_session(room_id)
        .map(|session| session.phase());
    Ok(RoomSubscription {
        receiver,
        handshake: sse_events::handshake_event(room_id, phase),
    })
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

/// Convert a room subscription into an SSE response, forwarding events until
/// the client disconnects or the room channel is released.
pub fn to_sse_stream(
    subscription: RoomSubscription,
    room_id: Uuid,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let RoomSubscription {
        mut receiver,
        handshake,
    } = subscription;
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: reads from broadcast and pushes into mpsc
    tokio::spawn(async move {
        if let Some(handshake) = handshake {
            if tx.send(Ok(to_event(handshake))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(room_id = %room_id, skipped, "SSE client lagging; events skipped");
                            continue;
                        }
                    }
                }
            }
        }

        info!(room_id = %room_id, "room SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
        time::SystemTime,
    };

    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{PlayerEntity, QuestionEntity, RoomEntity},
            room_store::{MemoryRoomStore, RoomStore},
            storage::StorageResult,
        },
        state::AppState,
    };

    /// Store that closes the room right after handing out its first read,
    /// as a cleanup landing between two lookups would.
    struct CloseAfterFirstRead {
        inner: MemoryRoomStore,
        closed: AtomicBool,
    }

    impl RoomStore for CloseAfterFirstRead {
        fn create_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<()>> {
            RoomStore::create_room(&self.inner, room)
        }

        fn find_room(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
            let inner = self.inner.clone();
            let close = !self.closed.swap(true, Ordering::SeqCst);
            Box::pin(async move {
                let room = RoomStore::find_room(&inner, id).await?;
                if close {
                    RoomStore::transition_room(&inner, id, RoomStatus::Open, RoomStatus::Closed)
                        .await?;
                }
                Ok(room)
            })
        }

        fn find_room_by_code(
            &self,
            code: String,
        ) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
            RoomStore::find_room_by_code(&self.inner, code)
        }

        fn update_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<()>> {
            RoomStore::update_room(&self.inner, room)
        }

        fn transition_room(
            &self,
            id: Uuid,
            from: RoomStatus,
            to: RoomStatus,
        ) -> BoxFuture<'static, StorageResult<RoomEntity>> {
            RoomStore::transition_room(&self.inner, id, from, to)
        }

        fn delete_room(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
            RoomStore::delete_room(&self.inner, id)
        }

        fn list_rooms(&self) -> BoxFuture<'static, StorageResult<Vec<RoomEntity>>> {
            RoomStore::list_rooms(&self.inner)
        }

        fn save_questions(
            &self,
            room_id: Uuid,
            questions: Vec<QuestionEntity>,
        ) -> BoxFuture<'static, StorageResult<()>> {
            RoomStore::save_questions(&self.inner, room_id, questions)
        }

        fn questions_for_room(
            &self,
            room_id: Uuid,
        ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
            RoomStore::questions_for_room(&self.inner, room_id)
        }

        fn add_player(
            &self,
            room_id: Uuid,
            player: PlayerEntity,
            capacity: usize,
        ) -> BoxFuture<'static, StorageResult<()>> {
            RoomStore::add_player(&self.inner, room_id, player, capacity)
        }

        fn players_for_room(
            &self,
            room_id: Uuid,
        ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
            RoomStore::players_for_room(&self.inner, room_id)
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            RoomStore::health_check(&self.inner)
        }
    }

    #[tokio::test]
    async fn room_closed_while_subscribing_leaves_no_channel_behind() {
        let inner = MemoryRoomStore::new();
        let now = SystemTime::now();
        let room = RoomEntity {
            id: Uuid::new_v4(),
            code: "RACE01".into(),
            name: "Geography".into(),
            owner_token: "secret".into(),
            max_players: 10,
            status: RoomStatus::Open,
            created_at: now,
            updated_at: now,
        };
        RoomStore::create_room(&inner, room.clone()).await.unwrap();

        let store = Arc::new(CloseAfterFirstRead {
            inner,
            closed: AtomicBool::new(false),
        });
        let state = AppState::new(AppConfig::default(), store);

        let result = subscribe_room(&state, room.id).await;
        assert!(matches!(result, Err(ServiceError::InvalidState(_))));
        assert_eq!(state.sse_room_count(), 0);
    }

    #[tokio::test]
    async fn open_room_keeps_its_channel() {
        let store = MemoryRoomStore::new();
        let now = SystemTime::now();
        let room = RoomEntity {
            id: Uuid::new_v4(),
            code: "OPEN01".into(),
            name: "History".into(),
            owner_token: "secret".into(),
            max_players: 10,
            status: RoomStatus::Open,
            created_at: now,
            updated_at: now,
        };
        RoomStore::create_room(&store, room.clone()).await.unwrap();
        let state = AppState::new(AppConfig::default(), Arc::new(store));

        let subscription = subscribe_room(&state, room.id).await.unwrap();
        assert!(subscription.handshake.is_some());
        assert_eq!(state.sse_room_count(), 1);
    }
}
