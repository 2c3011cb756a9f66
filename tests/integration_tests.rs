//! Integration tests for the ranked-arena engine
//!
//! These tests drive the engine through its public operations the way the
//! command gateway does:
//! - Queue admission and match formation per mode
//! - Outcome reporting, consensus and disputes
//! - Rating updates and the leaderboard
//! - Scope isolation and state store write-through

mod fixtures;

use ranked_arena::types::{
    JoinOutcome, MatchStatus, Mode, ReportOutcome, TeamSide,
};
use ranked_arena::RankedError;
use std::collections::HashSet;

use fixtures::{create_test_engine, form_match, players, report_all};

const SCOPE: &str = "guild_1";

#[tokio::test]
async fn test_one_vs_one_match_formation() {
    let (engine, _store) = create_test_engine();

    let first = engine
        .join_queue(SCOPE, "alice", Mode::OneVsOne)
        .await
        .unwrap();
    assert_eq!(
        first,
        JoinOutcome::Waiting {
            mode: Mode::OneVsOne,
            count: 1,
            required: 2,
            rating: 200
        }
    );

    let formed = match engine
        .join_queue(SCOPE, "bob", Mode::OneVsOne)
        .await
        .unwrap()
    {
        JoinOutcome::MatchFormed { formed } => formed,
        other => panic!("expected a match, got {:?}", other),
    };

    assert_eq!(formed.team1, vec!["alice"]);
    assert_eq!(formed.team2, vec!["bob"]);
    assert_eq!(formed.status, MatchStatus::Active);
    assert_eq!(formed.match_id.len(), 8);
    assert!(formed
        .match_id
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));

    let status = engine.queue_status(SCOPE).await.unwrap();
    assert_eq!(status.queues[0].count, 0);
    assert_eq!(status.active_matches, 1);
    assert_eq!(
        engine.get_match(SCOPE, &formed.match_id).await.unwrap(),
        formed
    );
}

#[tokio::test]
async fn test_two_vs_two_forms_only_on_fourth_join() {
    let (engine, _store) = create_test_engine();
    let ids = players("duo", 4);

    for (i, id) in ids.iter().take(3).enumerate() {
        match engine.join_queue(SCOPE, id, Mode::TwoVsTwo).await.unwrap() {
            JoinOutcome::Waiting {
                count, required, ..
            } => {
                assert_eq!(count, i + 1);
                assert_eq!(required, 4);
            }
            other => panic!("unexpected match before quorum: {:?}", other),
        }
        assert_eq!(engine.queue_status(SCOPE).await.unwrap().active_matches, 0);
    }

    let formed = match engine
        .join_queue(SCOPE, &ids[3], Mode::TwoVsTwo)
        .await
        .unwrap()
    {
        JoinOutcome::MatchFormed { formed } => formed,
        other => panic!("expected a match, got {:?}", other),
    };

    assert_eq!(formed.team1.len(), 2);
    assert_eq!(formed.team2.len(), 2);
    let participants: HashSet<_> = formed.participants().cloned().collect();
    assert_eq!(participants, ids.iter().cloned().collect());

    let status = engine.queue_status(SCOPE).await.unwrap();
    assert_eq!(status.queues[1].count, 0);
    assert_eq!(status.active_matches, 1);
}

#[tokio::test]
async fn test_three_vs_three_takes_oldest_six() {
    let (engine, _store) = create_test_engine();
    let ids = players("trio", 6);

    let formed = form_match(&engine, SCOPE, Mode::ThreeVsThree, &ids).await;
    assert_eq!(formed.team1.len(), 3);
    assert_eq!(formed.team2.len(), 3);

    // A seventh player starts a fresh queue
    let outcome = engine
        .join_queue(SCOPE, "late", Mode::ThreeVsThree)
        .await
        .unwrap();
    assert!(matches!(outcome, JoinOutcome::Waiting { count: 1, .. }));
}

#[tokio::test]
async fn test_already_queued_in_any_mode() {
    let (engine, store) = create_test_engine();
    engine
        .join_queue(SCOPE, "alice", Mode::TwoVsTwo)
        .await
        .unwrap();
    let saves_before = store.get_save_calls().len();

    for mode in Mode::ALL {
        let err = engine.join_queue(SCOPE, "alice", mode).await.unwrap_err();
        assert_eq!(
            err,
            RankedError::AlreadyQueued {
                player_id: "alice".to_string(),
                mode: Mode::TwoVsTwo
            }
        );
    }

    let status = engine.queue_status(SCOPE).await.unwrap();
    assert_eq!(status.queues[1].count, 1);
    assert_eq!(status.queues[0].count + status.queues[2].count, 0);
    assert_eq!(store.get_save_calls().len(), saves_before);
}

#[tokio::test]
async fn test_match_participant_cannot_requeue_until_resolved() {
    let (engine, _store) = create_test_engine();
    let formed = form_match(&engine, SCOPE, Mode::OneVsOne, &players("p", 2)).await;

    let err = engine
        .join_queue(SCOPE, "p_1", Mode::ThreeVsThree)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        RankedError::AlreadyInMatch {
            player_id: "p_1".to_string(),
            match_id: formed.match_id.clone()
        }
    );

    report_all(&engine, SCOPE, &formed, TeamSide::Team1).await;
    assert!(engine
        .join_queue(SCOPE, "p_1", Mode::ThreeVsThree)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_repeat_report_keeps_latest_claim() {
    let (engine, _store) = create_test_engine();
    let formed = form_match(&engine, SCOPE, Mode::TwoVsTwo, &players("r", 4)).await;
    let reporter = formed.team1[0].clone();

    for side in [TeamSide::Team1, TeamSide::Team1, TeamSide::Team2] {
        engine
            .report_outcome(SCOPE, &formed.match_id, &reporter, side)
            .await
            .unwrap();
    }

    let current = engine.get_match(SCOPE, &formed.match_id).await.unwrap();
    assert_eq!(current.reports.len(), 1);
    assert_eq!(current.tally(), (0, 1));
    assert_eq!(current.status, MatchStatus::Active);
}

#[tokio::test]
async fn test_tied_vote_disputes_match() {
    let (engine, _store) = create_test_engine();
    let formed = form_match(&engine, SCOPE, Mode::OneVsOne, &["a".into(), "b".into()]).await;

    let pending = engine
        .report_outcome(SCOPE, &formed.match_id, "a", TeamSide::Team1)
        .await
        .unwrap();
    assert_eq!(
        pending,
        ReportOutcome::Pending {
            match_id: formed.match_id.clone(),
            votes_team1: 1,
            votes_team2: 0,
            received: 1,
            required: 2
        }
    );

    let resolved = engine
        .report_outcome(SCOPE, &formed.match_id, "b", TeamSide::Team2)
        .await
        .unwrap();
    let resolution = match resolved {
        ReportOutcome::Resolved(resolution) => resolution,
        other => panic!("expected resolution, got {:?}", other),
    };
    assert_eq!(resolution.status, MatchStatus::Disputed);
    assert_eq!(resolution.winning_team, None);
    assert!(resolution.rating_deltas.is_empty());

    for id in ["a", "b"] {
        let record = engine.get_player(SCOPE, id).await.unwrap().unwrap();
        assert_eq!(record.rating, 200);
        assert_eq!(record.matches_played, 0);
    }

    let history = engine.get_match(SCOPE, &formed.match_id).await.unwrap();
    assert_eq!(history.status, MatchStatus::Disputed);
    assert_eq!(engine.queue_status(SCOPE).await.unwrap().active_matches, 0);

    // Resolved matches no longer accept reports
    let err = engine
        .report_outcome(SCOPE, &formed.match_id, "a", TeamSide::Team1)
        .await
        .unwrap_err();
    assert!(matches!(err, RankedError::MatchNotFound { .. }));
}

#[tokio::test]
async fn test_end_to_end_one_vs_one_ratings() {
    let (engine, _store) = create_test_engine();
    let formed = form_match(&engine, SCOPE, Mode::OneVsOne, &["p1".into(), "p2".into()]).await;

    let resolution = report_all(&engine, SCOPE, &formed, TeamSide::Team1).await;
    assert_eq!(resolution.status, MatchStatus::Completed);
    assert_eq!(resolution.winning_team, Some(TeamSide::Team1));
    assert_eq!(resolution.rating_deltas.len(), 2);
    assert_eq!(resolution.rating_deltas[0].delta, 20);
    assert_eq!(resolution.rating_deltas[1].delta, -20);

    let p1 = engine.get_player(SCOPE, "p1").await.unwrap().unwrap();
    let p2 = engine.get_player(SCOPE, "p2").await.unwrap().unwrap();
    assert_eq!((p1.rating, p1.wins, p1.matches_played), (220, 1, 1));
    assert_eq!((p2.rating, p2.losses, p2.matches_played), (180, 1, 1));

    let history = engine.get_match(SCOPE, &formed.match_id).await.unwrap();
    assert_eq!(history.status, MatchStatus::Completed);
    assert_eq!(history.winner, Some(TeamSide::Team1));
    assert_eq!(engine.queue_status(SCOPE).await.unwrap().active_matches, 0);
}

#[tokio::test]
async fn test_majority_decides_and_first_loser_absorbs_losses() {
    let (engine, _store) = create_test_engine();
    let formed = form_match(&engine, SCOPE, Mode::ThreeVsThree, &players("m", 6)).await;

    // Five claim team2, one dissenter claims team1
    let participants: Vec<_> = formed.participants().cloned().collect();
    for (i, player) in participants.iter().enumerate() {
        let side = if i == 0 {
            TeamSide::Team1
        } else {
            TeamSide::Team2
        };
        engine
            .report_outcome(SCOPE, &formed.match_id, player, side)
            .await
            .unwrap();
    }

    let history = engine.get_match(SCOPE, &formed.match_id).await.unwrap();
    assert_eq!(history.winner, Some(TeamSide::Team2));

    for winner in &formed.team2 {
        let record = engine.get_player(SCOPE, winner).await.unwrap().unwrap();
        assert_eq!((record.rating, record.wins), (220, 1));
    }

    let opponent = engine
        .get_player(SCOPE, &formed.team1[0])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(opponent.losses, 3);
    assert_eq!(opponent.matches_played, 3);
    assert_eq!(opponent.rating, 140);

    for untouched in &formed.team1[1..] {
        let record = engine.get_player(SCOPE, untouched).await.unwrap().unwrap();
        assert_eq!((record.rating, record.matches_played), (200, 0));
    }
}

#[tokio::test]
async fn test_report_rejections_leave_match_untouched() {
    let (engine, _store) = create_test_engine();
    let formed = form_match(&engine, SCOPE, Mode::OneVsOne, &players("x", 2)).await;

    let err = engine
        .report_outcome(SCOPE, "ZZZZZZZZ", "x_1", TeamSide::Team1)
        .await
        .unwrap_err();
    assert!(matches!(err, RankedError::MatchNotFound { .. }));

    let err = engine
        .report_outcome(SCOPE, &formed.match_id, "outsider", TeamSide::Team1)
        .await
        .unwrap_err();
    assert!(matches!(err, RankedError::NotAParticipant { .. }));

    let err = engine
        .report_outcome_token(SCOPE, &formed.match_id, "x_1", "team3")
        .await
        .unwrap_err();
    assert!(matches!(err, RankedError::InvalidVote { .. }));

    let current = engine.get_match(SCOPE, &formed.match_id).await.unwrap();
    assert!(current.reports.is_empty());
}

#[tokio::test]
async fn test_leave_queue() {
    let (engine, _store) = create_test_engine();

    let err = engine.leave_queue(SCOPE, "nobody").await.unwrap_err();
    assert!(matches!(err, RankedError::NotQueued { .. }));

    for id in players("l", 3) {
        engine
            .join_queue(SCOPE, &id, Mode::ThreeVsThree)
            .await
            .unwrap();
    }
    let outcome = engine.leave_queue(SCOPE, "l_2").await.unwrap();
    assert_eq!(outcome.modes_left, vec![Mode::ThreeVsThree]);
    assert_eq!(engine.queue_status(SCOPE).await.unwrap().queues[2].count, 2);

    // A player who left can queue again
    assert!(engine.join_queue(SCOPE, "l_2", Mode::OneVsOne).await.is_ok());
}

#[tokio::test]
async fn test_leaderboard_ordering_and_win_rates() {
    let (engine, _store) = create_test_engine();

    let first = form_match(&engine, SCOPE, Mode::OneVsOne, &["ace".into(), "bee".into()]).await;
    report_all(&engine, SCOPE, &first, TeamSide::Team1).await;
    let second = form_match(&engine, SCOPE, Mode::OneVsOne, &["ace".into(), "cat".into()]).await;
    report_all(&engine, SCOPE, &second, TeamSide::Team1).await;
    engine
        .join_queue(SCOPE, "newbie", Mode::TwoVsTwo)
        .await
        .unwrap();

    let board = engine.leaderboard(SCOPE, None).await.unwrap();
    assert_eq!(board.len(), 4);
    assert!(board.windows(2).all(|w| w[0].rating >= w[1].rating));
    assert_eq!(board[0].player_id, "ace");
    assert_eq!(board[0].rank, 1);
    assert_eq!(board[0].win_rate_percent, 100.0);

    let newbie = board.iter().find(|e| e.player_id == "newbie").unwrap();
    assert_eq!(newbie.matches_played, 0);
    assert_eq!(newbie.win_rate_percent, 0.0);

    let top_two = engine.leaderboard(SCOPE, Some(2)).await.unwrap();
    assert_eq!(top_two.len(), 2);
}

#[tokio::test]
async fn test_scopes_never_share_state() {
    let (engine, _store) = create_test_engine();
    let formed = form_match(&engine, "guild_a", Mode::OneVsOne, &players("s", 2)).await;

    let status = engine.queue_status("guild_b").await.unwrap();
    assert_eq!(status.active_matches, 0);
    assert!(engine.get_player("guild_b", "s_1").await.unwrap().is_none());
    assert!(matches!(
        engine.get_match("guild_b", &formed.match_id).await,
        Err(RankedError::MatchNotFound { .. })
    ));
    assert!(matches!(
        engine
            .report_outcome("guild_b", &formed.match_id, "s_1", TeamSide::Team1)
            .await,
        Err(RankedError::MatchNotFound { .. })
    ));
}

#[tokio::test]
async fn test_state_written_through_after_each_mutation() {
    let (engine, store) = create_test_engine();
    let formed = form_match(&engine, SCOPE, Mode::OneVsOne, &players("w", 2)).await;
    report_all(&engine, SCOPE, &formed, TeamSide::Team2).await;

    let saves = store.get_save_calls();
    // two joins and two reports
    assert_eq!(saves.len(), 4);
    assert!(saves.iter().all(|(scope, _)| scope == SCOPE));

    let (_, last) = saves.last().unwrap();
    assert!(last.active_matches.is_empty());
    assert_eq!(last.history.len(), 1);
    assert_eq!(last.players.get("w_2").unwrap().rating, 220);
}

#[tokio::test]
async fn test_engine_stats_track_operations() {
    let (engine, _store) = create_test_engine();
    let formed = form_match(&engine, SCOPE, Mode::OneVsOne, &players("t", 2)).await;
    report_all(&engine, SCOPE, &formed, TeamSide::Team1).await;
    let tied = form_match(&engine, SCOPE, Mode::OneVsOne, &players("u", 2)).await;
    engine
        .report_outcome(SCOPE, &tied.match_id, "u_1", TeamSide::Team1)
        .await
        .unwrap();
    engine
        .report_outcome(SCOPE, &tied.match_id, "u_2", TeamSide::Team2)
        .await
        .unwrap();

    let stats = engine.stats().unwrap();
    assert_eq!(stats.players_queued, 4);
    assert_eq!(stats.matches_formed, 2);
    assert_eq!(stats.reports_received, 4);
    assert_eq!(stats.matches_completed, 1);
    assert_eq!(stats.matches_disputed, 1);
    assert_eq!(stats.loaded_scopes, 1);
}
