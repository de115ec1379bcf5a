//! End-to-end goal resolution: progress, deadline worker, goal-finished
//! worker, and the race between them.

mod common;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use common::*;
use hon_rs::config::WorkerSettings;
use hon_rs::db::pgmq::PgmqMessage;
use hon_rs::dispatch::{DEADLINE_QUEUE, FINISHED_QUEUE};
use hon_rs::error::{Error, Result};
use hon_rs::model::{GoalOutcome, GoalStatus, NewProgress, Resolution};
use hon_rs::notify::TemplateKind;
use hon_rs::worker::{DeadlineHandler, FinishedHandler, MessageHandler, QueueWorker};
use serde_json::json;
use std::sync::Arc;
use tracing::Span;

fn progress(book: &hon_rs::model::Book, until_page: i32) -> NewProgress {
    NewProgress {
        book_id: book.id,
        user_id: book.user_id,
        until_page,
        description: "evening session".to_string(),
    }
}

#[tokio::test]
#[ignore] // Requires running Postgres with pgmq
async fn reaching_the_target_finishes_the_goal() {
    let db = Arc::new(test_db().await);
    let notifier = Arc::new(RecordingNotifier::default());
    let user = reader(&db).await;
    let b = book(&db, &user, 200).await;
    let g = goal(&db, &b, 150, Duration::days(1)).await;

    // Short of the target: nothing happens.
    let recorded = db.record_progress(progress(&b, 100)).await.unwrap();
    assert!(recorded.finished_goals.is_empty());
    assert_eq!(db.get_goal(g.id).await.unwrap().status, GoalStatus::InProgress);

    let recorded = db.record_progress(progress(&b, 160)).await.unwrap();
    assert_eq!(recorded.finished_goals, vec![g.id]);
    assert!(!recorded.book_completed);

    let finished = db.get_goal(g.id).await.unwrap();
    assert_eq!(finished.status, GoalStatus::Finished);
    assert!(finished.resolved_at.is_some());
    assert_eq!(queued_for_goal(FINISHED_QUEUE, g.id).await, 1);

    // The goal-finished consumer mails it.
    let handler = FinishedHandler::new(notifier.clone());
    handler
        .handle(&deadline_delivery(&g, &user, &b), &Span::none())
        .await
        .unwrap();
    assert_eq!(notifier.sent_for(g.id), vec![TemplateKind::GoalFinished]);

    // The deadline message arriving later is a no-op.
    let deadline = DeadlineHandler::new(db.clone(), notifier.clone());
    deadline
        .handle(&deadline_delivery(&g, &user, &b), &Span::none())
        .await
        .unwrap();
    assert_eq!(db.get_goal(g.id).await.unwrap().status, GoalStatus::Finished);
    assert_eq!(notifier.sent_for(g.id), vec![TemplateKind::GoalFinished]);

    // Further progress does not resolve it again.
    let recorded = db.record_progress(progress(&b, 180)).await.unwrap();
    assert!(recorded.finished_goals.is_empty());
    assert_eq!(queued_for_goal(FINISHED_QUEUE, g.id).await, 1);
}

#[tokio::test]
#[ignore] // Requires running Postgres with pgmq
async fn one_progress_can_finish_several_goals() {
    let db = test_db().await;
    let user = reader(&db).await;
    let b = book(&db, &user, 300).await;
    let near = goal(&db, &b, 100, Duration::days(1)).await;
    let far = goal(&db, &b, 150, Duration::days(1)).await;
    let beyond = goal(&db, &b, 250, Duration::days(1)).await;

    let recorded = db.record_progress(progress(&b, 150)).await.unwrap();
    assert_eq!(recorded.finished_goals.len(), 2);
    assert!(recorded.finished_goals.contains(&near.id));
    assert!(recorded.finished_goals.contains(&far.id));
    assert_eq!(
        db.get_goal(beyond.id).await.unwrap().status,
        GoalStatus::InProgress
    );
}

#[tokio::test]
#[ignore] // Requires running Postgres with pgmq
async fn missed_deadline_expires_the_goal() {
    let db = Arc::new(test_db().await);
    let notifier = Arc::new(RecordingNotifier::default());
    let user = reader(&db).await;
    let b = book(&db, &user, 200).await;
    let g = goal(&db, &b, 150, Duration::seconds(2)).await;

    // Not due yet.
    assert_eq!(db.get_goal(g.id).await.unwrap().status, GoalStatus::InProgress);
    assert!(deadline_visible_at(g.id).await > Utc::now());

    let worker = QueueWorker::new(
        db.clone(),
        DeadlineHandler::new(db.clone(), notifier.clone()),
        WorkerSettings::default(),
    );
    let mut status = GoalStatus::InProgress;
    for _ in 0..20 {
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        while worker.poll_once().await.unwrap() {}
        status = db.get_goal(g.id).await.unwrap().status;
        if status.is_terminal() {
            break;
        }
    }
    assert_eq!(status, GoalStatus::Expired);
    assert_eq!(notifier.sent_for(g.id), vec![TemplateKind::GoalExpired]);
    assert_eq!(queued_for_goal(DEADLINE_QUEUE, g.id).await, 0);

    // Progress past the target after expiry changes nothing.
    let recorded = db.record_progress(progress(&b, 160)).await.unwrap();
    assert!(recorded.finished_goals.is_empty());
    assert_eq!(db.get_goal(g.id).await.unwrap().status, GoalStatus::Expired);
}

#[tokio::test]
#[ignore] // Requires running Postgres with pgmq
async fn deadline_is_hidden_until_expiry() {
    let db = test_db().await;
    let user = reader(&db).await;
    let b = book(&db, &user, 200).await;
    let g = goal(&db, &b, 150, Duration::days(1)).await;

    assert_eq!(queued_for_goal(DEADLINE_QUEUE, g.id).await, 1);
    let visible_at = deadline_visible_at(g.id).await;
    // Delay is whole seconds from the app clock; vt comes from the db clock.
    assert!(
        visible_at + Duration::seconds(1) >= g.expired_at,
        "deadline visible at {visible_at}, before expiry {}",
        g.expired_at
    );
    assert!(visible_at > Utc::now() + Duration::hours(23));
}

#[tokio::test]
#[ignore] // Requires running Postgres with pgmq
async fn redelivered_deadline_notifies_once() {
    let db = Arc::new(test_db().await);
    let notifier = Arc::new(RecordingNotifier::default());
    let user = reader(&db).await;
    let b = book(&db, &user, 200).await;
    let g = goal(&db, &b, 150, Duration::days(1)).await;

    let handler = DeadlineHandler::new(db.clone(), notifier.clone());
    let msg = deadline_delivery(&g, &user, &b);
    handler.handle(&msg, &Span::none()).await.unwrap();
    handler.handle(&msg, &Span::none()).await.unwrap();

    assert_eq!(db.get_goal(g.id).await.unwrap().status, GoalStatus::Expired);
    assert_eq!(notifier.sent_for(g.id), vec![TemplateKind::GoalExpired]);
}

#[tokio::test]
#[ignore] // Requires running Postgres with pgmq
async fn failed_mail_keeps_the_resolution() {
    let db = Arc::new(test_db().await);
    let notifier = Arc::new(RecordingNotifier::failing());
    let user = reader(&db).await;
    let b = book(&db, &user, 200).await;
    let g = goal(&db, &b, 150, Duration::days(1)).await;

    let handler = DeadlineHandler::new(db.clone(), notifier.clone());
    handler
        .handle(&deadline_delivery(&g, &user, &b), &Span::none())
        .await
        .unwrap();

    assert_eq!(db.get_goal(g.id).await.unwrap().status, GoalStatus::Expired);
    assert_eq!(notifier.sent_for(g.id).len(), 1);
}

#[tokio::test]
#[ignore] // Requires running Postgres with pgmq
async fn progress_and_deadline_race_resolves_once() {
    for _ in 0..10 {
        let db = Arc::new(test_db().await);
        let notifier = Arc::new(RecordingNotifier::default());
        let user = reader(&db).await;
        let b = book(&db, &user, 200).await;
        let g = goal(&db, &b, 150, Duration::days(1)).await;

        let handler = DeadlineHandler::new(db.clone(), notifier.clone());
        let msg = deadline_delivery(&g, &user, &b);
        let span = Span::none();
        let (recorded, expired) = tokio::join!(
            db.record_progress(progress(&b, 160)),
            handler.handle(&msg, &span),
        );
        let recorded = recorded.unwrap();
        expired.unwrap();

        let status = db.get_goal(g.id).await.unwrap().status;
        let finished_by_progress = recorded.finished_goals.contains(&g.id);
        let expired_mails = notifier.sent_for(g.id).len();
        match status {
            GoalStatus::Finished => {
                assert!(finished_by_progress);
                assert_eq!(expired_mails, 0);
                assert_eq!(queued_for_goal(FINISHED_QUEUE, g.id).await, 1);
            }
            GoalStatus::Expired => {
                assert!(!finished_by_progress);
                assert_eq!(expired_mails, 1);
                assert_eq!(queued_for_goal(FINISHED_QUEUE, g.id).await, 0);
            }
            GoalStatus::InProgress => panic!("goal left unresolved"),
        }
    }
}

#[tokio::test]
#[ignore] // Requires running Postgres
async fn concurrent_resolutions_have_one_winner() {
    let db = test_db().await;
    let user = reader(&db).await;
    let b = book(&db, &user, 200).await;
    let g = goal(&db, &b, 150, Duration::days(1)).await;

    let (a, b2, c) = tokio::join!(
        db.resolve_goal(g.id, GoalOutcome::Expired),
        db.resolve_goal(g.id, GoalOutcome::Finished),
        db.resolve_goal(g.id, GoalOutcome::Expired),
    );
    let results = [a.unwrap(), b2.unwrap(), c.unwrap()];
    let winners: Vec<_> = results
        .iter()
        .filter_map(|r| match r {
            Resolution::Resolved(msg) => Some(msg),
            Resolution::AlreadyResolved(_) => None,
        })
        .collect();
    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].goal_id, g.id);
    assert_eq!(winners[0].email, user.email);
    assert_eq!(winners[0].book_title, b.title);

    let final_status = db.get_goal(g.id).await.unwrap().status;
    for r in &results {
        if let Resolution::AlreadyResolved(seen) = r {
            assert_eq!(*seen, final_status);
        }
    }
}

#[tokio::test]
#[ignore] // Requires running Postgres
async fn resolving_unknown_goal_is_not_found() {
    let db = test_db().await;
    let err = db
        .resolve_goal(hon_rs::model::GoalId::new(), GoalOutcome::Expired)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(!err.is_transient());
}

/// Runs a real handler on a private queue.
struct OnQueue<H>(&'static str, H);

#[async_trait]
impl<H: MessageHandler> MessageHandler for OnQueue<H> {
    fn queue(&self) -> &'static str {
        self.0
    }

    async fn handle(&self, msg: &PgmqMessage, span: &Span) -> Result<()> {
        self.1.handle(msg, span).await
    }
}

#[tokio::test]
#[ignore] // Requires running Postgres with pgmq
async fn undecodable_and_unknown_messages_are_dropped() {
    const QUEUE: &str = "hon_test_dropped";
    let db = Arc::new(test_db().await);
    db.create_queue(QUEUE).await.unwrap();
    let notifier = Arc::new(RecordingNotifier::default());
    let worker = QueueWorker::new(
        db.clone(),
        OnQueue(QUEUE, DeadlineHandler::new(db.clone(), notifier.clone())),
        WorkerSettings::default(),
    );
    while worker.poll_once().await.unwrap() {}

    db.send_to_queue(QUEUE, &json!({"not": "a goal"}), 0)
        .await
        .unwrap();
    let unknown = delivery(json!({
        "goal_id": uuid::Uuid::new_v4(),
        "email": "ghost@example.com",
        "goal_name": "gone",
        "book_title": "Nobody's Book",
        "target_page": 10,
        "expired_at": "2026-01-01T00:00:00Z",
    }));
    db.send_to_queue(QUEUE, &unknown.message, 0).await.unwrap();

    assert!(worker.poll_once().await.unwrap());
    assert!(worker.poll_once().await.unwrap());
    // Both archived, not left for redelivery.
    assert!(!worker.poll_once().await.unwrap());
    assert!(notifier.sent.lock().unwrap().is_empty());
}
