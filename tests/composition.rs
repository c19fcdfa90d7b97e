// Composition tests: the aggregator and engagement controllers sharing one
// event channel.
//
// These exercise the full data flow:
//   backend -> load -> live events -> controller updates -> reduced list
// with the in-memory backend standing in for the network.

mod common;

use std::sync::Arc;

use castfeed::engagement::{EngagementController, Outcome};
use castfeed::feed::aggregator::{event_channel, FeedAggregator, FeedStatus};
use castfeed::feed::events::RemoteEvent;
use castfeed::output::format_count;
use castfeed::session::Session;

use common::{ids, nairobi, post, post_by, recast, MockBackend, RecordingChannel};

fn backend() -> Arc<MockBackend> {
    Arc::new(MockBackend::new().with_posts(vec![post("A", 10), post_by("B", "viewer", 5)]))
}

// ============================================================
// Chain: load -> push -> delete -> like
// ============================================================

#[tokio::test]
async fn live_feed_with_local_engagement() {
    let backend = backend();
    let channel = Arc::new(RecordingChannel::new());
    let mut feed = FeedAggregator::new(backend.clone(), channel.clone());
    let (tx, mut rx) = event_channel();

    feed.set_level(nairobi()).await.unwrap();
    assert_eq!(ids(feed.items()), vec!["A", "B"]);
    assert_eq!(feed.status(), &FeedStatus::Ready);

    tx.send(RemoteEvent::NewPost(post("C", 20)).into()).await.unwrap();
    tx.send(RemoteEvent::NewPost(post("C", 20)).into()).await.unwrap();
    tx.send(RemoteEvent::DeletePost("B".to_string()).into())
        .await
        .unwrap();

    let item = feed.item("A").cloned().unwrap();
    let mut controller = EngagementController::new(item, Session::new("viewer"), backend.clone())
        .with_updates(tx.clone());
    assert_eq!(controller.toggle_like().await, Outcome::Committed);

    drop(controller);
    drop(tx);
    feed.run(&mut rx, |_, _| {}).await;

    assert_eq!(ids(feed.items()), vec!["C", "A"]);
    let a = feed.item("A").unwrap().engagement();
    assert!(a.is_liked_by("viewer"));
    assert_eq!(a.like_count(), 1);
    assert_eq!(a.views, 1);
    assert_eq!(format_count(a.like_count() as u64), "1");
}

#[tokio::test]
async fn like_toggled_twice_leaves_feed_unliked() {
    let backend = backend();
    let channel = Arc::new(RecordingChannel::new());
    let mut feed = FeedAggregator::new(backend.clone(), channel.clone());
    let (tx, mut rx) = event_channel();
    feed.set_level(nairobi()).await.unwrap();

    let item = feed.item("A").cloned().unwrap();
    let mut controller =
        EngagementController::new(item, Session::new("viewer"), backend.clone()).with_updates(tx);
    controller.toggle_like().await;
    controller.toggle_like().await;
    drop(controller);
    feed.run(&mut rx, |_, _| {}).await;

    let a = feed.item("A").unwrap().engagement();
    assert!(!a.is_liked_by("viewer"));
    assert!(backend.server_likes("A").is_empty());
    assert_eq!(a.views, 2);
}

#[tokio::test]
async fn author_delete_removes_row_from_feed() {
    let backend = backend();
    let channel = Arc::new(RecordingChannel::new());
    let mut feed = FeedAggregator::new(backend.clone(), channel.clone());
    let (tx, mut rx) = event_channel();
    feed.set_level(nairobi()).await.unwrap();

    let item = feed.item("B").cloned().unwrap();
    let mut controller =
        EngagementController::new(item, Session::new("viewer"), backend.clone()).with_updates(tx);
    assert_eq!(controller.delete_post().await, Outcome::Committed);
    drop(controller);
    feed.run(&mut rx, |_, _| {}).await;

    assert_eq!(ids(feed.items()), vec!["A"]);
}

#[tokio::test]
async fn recast_bumps_then_local_like_keeps_the_bump() {
    let backend = backend();
    let channel = Arc::new(RecordingChannel::new());
    let mut feed = FeedAggregator::new(backend.clone(), channel.clone());
    let (tx, mut rx) = event_channel();
    feed.set_level(nairobi()).await.unwrap();

    tx.send(RemoteEvent::NewRecast(recast("rc", "B", 30)).into())
        .await
        .unwrap();
    let item = feed.item("B").cloned().unwrap();
    let mut controller = EngagementController::new(item, Session::new("someone"), backend.clone())
        .with_updates(tx.clone());
    controller.toggle_like().await;
    drop(controller);
    drop(tx);
    feed.run(&mut rx, |_, _| {}).await;

    assert_eq!(ids(feed.items()), vec!["B", "A"]);
    let b = feed.item("B").unwrap();
    assert!(b.engagement().is_liked_by("someone"));
    assert_eq!(b.body().bumped_by.as_ref().unwrap().recast_id, "rc");
}

#[tokio::test]
async fn late_controller_updates_after_close_are_dropped() {
    let backend = backend();
    let channel = Arc::new(RecordingChannel::new());
    let mut feed = FeedAggregator::new(backend.clone(), channel.clone());
    let (tx, mut rx) = event_channel();
    feed.set_level(nairobi()).await.unwrap();
    feed.close().await.unwrap();

    let item = feed.item("A").cloned().unwrap();
    let mut controller =
        EngagementController::new(item, Session::new("viewer"), backend.clone()).with_updates(tx);
    controller.toggle_like().await;
    drop(controller);
    feed.run(&mut rx, |_, _| {}).await;

    assert!(!feed.item("A").unwrap().engagement().is_liked_by("viewer"));
}
