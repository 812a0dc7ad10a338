// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use syftbox_backend::{MemoryBackend, MemoryStore, RetryPolicy};

const DO: &str = "do@example.com";

fn router() -> ConnectionRouter {
    let store = MemoryStore::shared();
    ConnectionRouter::new(Box::new(MemoryBackend::new(store, DO)))
        .with_policy(RetryPolicy::none())
}

#[tokio::test]
async fn downloads_preserve_input_order() {
    let router = router();
    let mut ids = Vec::new();
    for timestamp in [30.0, 10.0, 20.0] {
        let id = router
            .write_events_message_to_log(&AcceptedEventsMessage::new(vec![], timestamp))
            .await
            .unwrap();
        ids.push(id);
    }

    let results = download_events_messages(&router, ids, 2).await.unwrap();
    let timestamps: Vec<f64> =
        results.into_iter().map(|result| result.unwrap().timestamp()).collect();
    assert_eq!(timestamps, vec![30.0, 10.0, 20.0]);
}

#[tokio::test]
async fn per_item_failures_do_not_poison_the_batch() {
    let router = router();
    let good = router
        .write_events_message_to_log(&AcceptedEventsMessage::new(vec![], 10.0))
        .await
        .unwrap();

    let results =
        download_events_messages(&router, vec![good, "obj-404".to_string()], 4).await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
}

#[tokio::test]
async fn empty_input_short_circuits() {
    let router = router();
    let results = download_files(&router, vec![], 4).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn limit_of_zero_still_makes_progress() {
    let router = router();
    let id = router
        .write_events_message_to_log(&AcceptedEventsMessage::new(vec![], 10.0))
        .await
        .unwrap();
    let results = download_files(&router, vec![id], 0).await.unwrap();
    assert!(results[0].is_ok());
}
