use super::*;
use crate::test_support::ManualClock;
use serde_json::json;
use shared::domain::{AuthoringMode, ContentType, FormData, PostStatus, PromptAnalysis};
use storage::{MemoryStore, UnavailableStore};

const T0_MILLIS: i64 = 1_760_000_000_000;

fn cats_draft() -> DraftInput {
    DraftInput {
        mode: AuthoringMode::AiGenerate,
        prompt: "write about cats".to_string(),
        prompt_analysis: Some(PromptAnalysis(json!({ "topic": "cats", "tone": "playful" }))),
        form_data: FormData {
            title: "Why cats rule".to_string(),
            content: "# Cats\n\nThey sit on keyboards.".to_string(),
            content_type: ContentType::Markdown,
            excerpt: "A short case for cats".to_string(),
            featured_image: "https://img.example/cat.png".to_string(),
            category: "pets".to_string(),
            status: PostStatus::Draft,
        },
    }
}

fn store_with_clock() -> (Arc<MemoryStore>, Arc<ManualClock>, DraftStore) {
    let backing = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::starting_at_epoch_millis(T0_MILLIS));
    let drafts = DraftStore::with_clock(backing.clone(), clock.clone());
    (backing, clock, drafts)
}

#[tokio::test]
async fn save_then_load_returns_saved_draft_with_fresh_timestamp() {
    let (_backing, clock, drafts) = store_with_clock();
    drafts.save(cats_draft()).await;

    let loaded = drafts.load().await.expect("draft");
    assert_eq!(loaded.timestamp, clock.now());
    assert_eq!(loaded.into_input(), cats_draft());
}

#[tokio::test]
async fn save_overwrites_previous_draft() {
    let (_backing, _clock, drafts) = store_with_clock();
    drafts.save(cats_draft()).await;

    let other = DraftInput {
        prompt: "dogs".to_string(),
        ..DraftInput::default()
    };
    drafts.save(other.clone()).await;

    assert_eq!(drafts.load().await.expect("draft").into_input(), other);
}

#[tokio::test]
async fn draft_within_ttl_loads_without_mutating_slot() {
    let (backing, clock, drafts) = store_with_clock();
    drafts.save(cats_draft()).await;
    let stored_before = backing.get(DRAFT_STORAGE_KEY).await.expect("get");

    clock.advance(Duration::days(3));
    assert!(drafts.load().await.is_some());
    assert!(drafts.load().await.is_some());

    let stored_after = backing.get(DRAFT_STORAGE_KEY).await.expect("get");
    assert_eq!(stored_before, stored_after);
}

#[tokio::test]
async fn draft_exactly_at_ttl_is_still_valid() {
    let (_backing, clock, drafts) = store_with_clock();
    drafts.save(cats_draft()).await;

    clock.advance(Duration::days(7));
    assert!(drafts.peek_validity().await);
    assert!(drafts.load().await.is_some());
}

#[tokio::test]
async fn expired_draft_is_absent_and_purged() {
    let (backing, clock, drafts) = store_with_clock();
    drafts.save(cats_draft()).await;

    clock.advance(Duration::days(7) + Duration::milliseconds(1));
    assert!(drafts.load().await.is_none());
    assert_eq!(backing.get(DRAFT_STORAGE_KEY).await.expect("get"), None);
}

#[tokio::test]
async fn three_day_old_draft_survives_until_day_eight() {
    let (backing, clock, drafts) = store_with_clock();
    drafts.save(cats_draft()).await;

    clock.advance(Duration::days(3));
    let loaded = drafts.load().await.expect("still valid after three days");
    assert_eq!(loaded.mode, AuthoringMode::AiGenerate);
    assert_eq!(loaded.prompt, "write about cats");

    clock.advance(Duration::days(5));
    assert!(drafts.load().await.is_none());
    assert!(drafts.load().await.is_none());
    assert_eq!(backing.get(DRAFT_STORAGE_KEY).await.expect("get"), None);
}

#[tokio::test]
async fn peek_validity_does_not_purge_expired_draft() {
    let (backing, clock, drafts) = store_with_clock();
    drafts.save(cats_draft()).await;
    assert!(drafts.peek_validity().await);

    clock.advance(Duration::days(9));
    assert!(!drafts.peek_validity().await);
    assert!(backing
        .get(DRAFT_STORAGE_KEY)
        .await
        .expect("get")
        .is_some());
}

#[tokio::test]
async fn clear_is_idempotent() {
    let (_backing, _clock, drafts) = store_with_clock();
    drafts.save(cats_draft()).await;

    drafts.clear().await;
    assert!(drafts.load().await.is_none());
    drafts.clear().await;
    assert!(drafts.load().await.is_none());
}

#[tokio::test]
async fn malformed_draft_is_treated_as_absent_and_purged() {
    let (backing, _clock, drafts) = store_with_clock();
    backing
        .set(DRAFT_STORAGE_KEY, "{not json")
        .await
        .expect("seed");

    assert!(!drafts.peek_validity().await);
    assert!(drafts.load().await.is_none());
    assert_eq!(backing.get(DRAFT_STORAGE_KEY).await.expect("get"), None);
}

#[tokio::test]
async fn partial_record_from_older_shape_is_rejected() {
    let (backing, _clock, drafts) = store_with_clock();
    let legacy = json!({
        "prompt": "cats",
        "formData": { "title": "Cats" },
        "timestamp": T0_MILLIS
    });
    backing
        .set(DRAFT_STORAGE_KEY, &legacy.to_string())
        .await
        .expect("seed");

    assert!(drafts.load().await.is_none());
    assert_eq!(backing.get(DRAFT_STORAGE_KEY).await.expect("get"), None);
}

#[tokio::test]
async fn future_timestamp_from_clock_skew_is_valid() {
    let (_backing, clock, drafts) = store_with_clock();
    drafts.save(cats_draft()).await;
    clock.advance(-Duration::days(2));

    assert!(drafts.load().await.is_some());
}

#[tokio::test]
async fn custom_ttl_is_honoured() {
    let backing = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::starting_at_epoch_millis(T0_MILLIS));
    let drafts =
        DraftStore::with_clock(backing, clock.clone()).with_ttl(Duration::hours(1));
    drafts.save(cats_draft()).await;

    clock.advance(Duration::minutes(59));
    assert!(drafts.peek_validity().await);
    clock.advance(Duration::minutes(2));
    assert!(drafts.load().await.is_none());
}

#[tokio::test]
async fn unavailable_storage_degrades_to_no_draft() {
    let drafts = DraftStore::new(Arc::new(UnavailableStore));

    drafts.save(cats_draft()).await;
    assert!(drafts.load().await.is_none());
    assert!(!drafts.peek_validity().await);
    drafts.clear().await;
}

#[tokio::test]
async fn drafts_persist_in_sqlite_store() {
    let backing = Arc::new(storage::Storage::new("sqlite::memory:").await.expect("db"));
    let clock = Arc::new(ManualClock::starting_at_epoch_millis(T0_MILLIS));
    let drafts = DraftStore::with_clock(backing, clock.clone());

    drafts.save(cats_draft()).await;
    assert_eq!(
        drafts.load().await.expect("draft").into_input(),
        cats_draft()
    );

    clock.advance(Duration::days(8));
    assert!(drafts.load().await.is_none());
}
