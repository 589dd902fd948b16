use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex},
    time::Duration,
};

use quiz_live_back::state::{
    SessionRegistry,
    events::{RoomEvent, RoomEventKind, StateChange},
    game::{Player, Question},
    hub::ListenerError,
    registry::{PhaseDelays, SessionError},
    state_machine::GamePhase,
};
use tokio::time;
use uuid::Uuid;

const DELAYS: PhaseDelays = PhaseDelays {
    starting: Duration::from_millis(100),
    reveal: Duration::from_millis(100),
    leaderboard: Duration::from_millis(100),
};

fn capital_question() -> Question {
    Question {
        id: Uuid::new_v4(),
        text: "Which one is the capital?".into(),
        options: vec!["A".into(), "B".into(), "C".into()],
        correct_options: BTreeSet::from([0]),
        points: 100,
        time_limit_secs: 10,
        order: 0,
    }
}

fn record(registry: &SessionRegistry, room_id: Uuid) -> Arc<Mutex<Vec<RoomEvent>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    registry.subscribe(
        room_id,
        Arc::new(move |event: &RoomEvent| -> Result<(), ListenerError> {
            sink.lock().unwrap().push(event.clone());
            Ok(())
        }),
    );
    log
}

#[tokio::test(start_paused = true)]
async fn single_question_game_runs_to_completion() {
    let registry = SessionRegistry::new(DELAYS);
    let room = Uuid::new_v4();
    let p1 = Player::new(Uuid::new_v4(), "p1");
    let p2 = Player::new(Uuid::new_v4(), "p2");
    let (p1_id, p2_id) = (p1.id, p2.id);

    registry
        .create_session(room, vec![capital_question()], vec![p1, p2])
        .unwrap();
    let log = record(&registry, room);

    registry.start_game(room).unwrap();
    assert_eq!(
        registry.get_session(room).unwrap().phase(),
        GamePhase::Starting
    );

    time::sleep(Duration::from_millis(150)).await;
    let session = registry.get_session(room).unwrap();
    assert_eq!(session.phase(), GamePhase::Question);
    assert_eq!(session.time_remaining, 10);
    assert!(registry.is_countdown_armed(room));

    let first = registry.submit_answer(room, p1_id, &[0], 2.0).unwrap();
    assert!(first.is_correct);
    assert_eq!(first.points, 90);
    assert_eq!(first.total_score, 90);

    let second = registry.submit_answer(room, p2_id, &[1], 9.0).unwrap();
    assert!(!second.is_correct);
    assert_eq!(second.points, 0);

    assert_eq!(
        registry.submit_answer(room, p1_id, &[0], 3.0),
        Err(SessionError::AlreadyAnswered(p1_id))
    );

    time::sleep(Duration::from_secs(11)).await;

    let session = registry.get_session(room).unwrap();
    assert_eq!(session.phase(), GamePhase::Finished);
    assert!(!session.is_active);
    assert_eq!(session.current_question_index, session.questions.len());
    assert!(!registry.is_countdown_armed(room));

    let events = log.lock().unwrap();
    let ticks: Vec<u32> = events
        .iter()
        .filter_map(|event| match event.kind {
            RoomEventKind::TimeUpdate { time_remaining } => Some(time_remaining),
            _ => None,
        })
        .collect();
    assert_eq!(ticks, (0..10).rev().collect::<Vec<u32>>());

    let names: Vec<_> = events
        .iter()
        .filter(|event| !matches!(event.kind, RoomEventKind::TimeUpdate { .. }))
        .map(RoomEvent::name)
        .collect();
    assert_eq!(
        names,
        vec![
            "state_change",
            "question_start",
            "player_answer",
            "player_answer",
            "state_change",
            "leaderboard_update",
            "state_change",
        ]
    );

    let leaderboard = events
        .iter()
        .find_map(|event| match &event.kind {
            RoomEventKind::LeaderboardUpdate { leaderboard } => Some(leaderboard.clone()),
            _ => None,
        })
        .expect("a leaderboard_update after the countdown");
    assert_eq!(leaderboard.len(), 2);
    assert_eq!(leaderboard[0].player_id, p1_id);
    assert_eq!(leaderboard[0].rank, 1);
    assert_eq!(leaderboard[0].total_score, 90);
    assert_eq!(leaderboard[1].player_id, p2_id);
    assert_eq!(leaderboard[1].rank, 2);
    assert_eq!(leaderboard[1].total_score, 0);

    let Some(RoomEventKind::StateChange(StateChange::Finished { final_leaderboard })) =
        events.last().map(|event| event.kind.clone())
    else {
        panic!("last event should be the finished state change");
    };
    assert_eq!(final_leaderboard.len(), 2);
    assert_eq!(final_leaderboard[0].entry.player_id, p1_id);
    assert_eq!(final_leaderboard[0].entry.rank, 1);
    assert_eq!(final_leaderboard[0].entry.total_score, 90);
    assert_eq!(final_leaderboard[0].accuracy_percent, 100);
    assert_eq!(final_leaderboard[1].entry.player_id, p2_id);
    assert_eq!(final_leaderboard[1].accuracy_percent, 0);
}

#[tokio::test(start_paused = true)]
async fn cleanup_mid_game_silences_the_room() {
    let registry = SessionRegistry::new(DELAYS);
    let room = Uuid::new_v4();
    registry
        .create_session(
            room,
            vec![capital_question()],
            vec![Player::new(Uuid::new_v4(), "solo")],
        )
        .unwrap();
    let log = record(&registry, room);

    registry.start_game(room).unwrap();
    time::sleep(Duration::from_millis(1_500)).await;
    let seen = log.lock().unwrap().len();
    assert!(seen >= 3);

    registry.cleanup(room);
    registry.cleanup(room);
    time::sleep(Duration::from_secs(15)).await;

    assert!(registry.get_session(room).is_none());
    assert!(!registry.is_countdown_armed(room));
    assert_eq!(log.lock().unwrap().len(), seen);

    // The room can host a fresh session afterwards.
    registry
        .create_session(room, vec![capital_question()], Vec::new())
        .unwrap();
    assert_eq!(
        registry.get_session(room).unwrap().phase(),
        GamePhase::Waiting
    );
}
