use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use tokio_util::sync::CancellationToken;

use adgen_adplatform::fake::{FakeAdPlatform, FakeFailure, FakeIds};
use adgen_adplatform::{FailureKind, UploadError};
use adgen_core::ad::{AdBundle, CompleteAdRequest, Targeting};
use adgen_core::retry::RetryPolicy;
use adgen_core::steps::Step;
use adgen_imagegen::fake::png_fixture_bytes;
use adgen_pipeline::{AdPublisher, PipelineError, PublishOptions, RecordingSleeper};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Fixture {
    _dir: tempfile::TempDir,
    image: PathBuf,
}

async fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("ad.png");
    tokio::fs::write(&image, png_fixture_bytes()).await.unwrap();
    Fixture { _dir: dir, image }
}

fn request(image: &Path) -> CompleteAdRequest {
    CompleteAdRequest::new(
        "Luxury Apartments",
        "Ocean View",
        image,
        "Ocean view apartment",
        "Schedule a visit",
        "https://example.com/apartments",
        10_000,
        Targeting::default_audience(),
    )
}

fn publisher(
    platform: &FakeAdPlatform,
    sleeper: &RecordingSleeper,
) -> AdPublisher<FakeAdPlatform> {
    AdPublisher::new(platform.clone(), PublishOptions::default())
        .with_sleeper(Arc::new(sleeper.clone()))
}

fn scenario_ids() -> FakeIds {
    FakeIds {
        image_hash: "abc".into(),
        campaign_id: "111".into(),
        ad_set_id: "222".into(),
        creative_id: "333".into(),
        ad_id: "444".into(),
    }
}

// ---------------------------------------------------------------------------
// Single attempt
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scenario_ids_form_the_bundle() {
    let fx = fixture().await;
    let platform = FakeAdPlatform::new().with_ids(scenario_ids());
    let publisher = publisher(&platform, &RecordingSleeper::new());

    let bundle = publisher
        .create_complete_ad(&request(&fx.image), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        bundle,
        AdBundle {
            campaign_id: "111".into(),
            ad_set_id: "222".into(),
            creative_id: "333".into(),
            ad_id: "444".into(),
            image_hash: "abc".into(),
        }
    );
    assert!(bundle.is_complete());

    let record = platform.record().await;
    assert_eq!(record.calls, Step::ORDER.to_vec());
    assert_eq!(record.ad_sets[0].campaign_id, "111");
    assert_eq!(record.creatives[0].image_hash, "abc");
    assert_eq!(record.creatives[0].page_id, "page-1");
    assert_eq!(record.ads[0].ad_set_id, "222");
    assert_eq!(record.ads[0].creative_id, "333");
}

#[tokio::test]
async fn ids_are_not_reused_across_calls() {
    let fx = fixture().await;
    let platform = FakeAdPlatform::new();
    let publisher = publisher(&platform, &RecordingSleeper::new());
    let cancel = CancellationToken::new();

    let first = publisher
        .create_complete_ad(&request(&fx.image), &cancel)
        .await
        .unwrap();
    let second = publisher
        .create_complete_ad(&request(&fx.image), &cancel)
        .await
        .unwrap();

    let mut ids = vec![
        first.campaign_id,
        first.ad_set_id,
        first.creative_id,
        first.ad_id,
        second.campaign_id,
        second.ad_set_id,
        second.creative_id,
        second.ad_id,
    ];
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
    assert_ne!(first.image_hash, second.image_hash);
}

#[tokio::test]
async fn ad_set_failure_stops_before_creative() {
    let fx = fixture().await;
    let platform = FakeAdPlatform::new();
    platform.fail_always(Step::AdSet, FakeFailure::Permanent).await;
    let publisher = publisher(&platform, &RecordingSleeper::new());

    let failure = publisher
        .create_complete_ad(&request(&fx.image), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_matches!(
        failure.error,
        PipelineError::Platform {
            step: Step::AdSet,
            ..
        }
    );
    assert_eq!(
        failure.created.iter().map(|r| r.step).collect::<Vec<_>>(),
        vec![Step::Upload, Step::Campaign]
    );

    let record = platform.record().await;
    assert_eq!(record.count(Step::Creative), 0);
    assert_eq!(record.count(Step::Ad), 0);
}

#[tokio::test]
async fn default_bid_is_tenth_of_budget() {
    let fx = fixture().await;
    let platform = FakeAdPlatform::new();
    let publisher = publisher(&platform, &RecordingSleeper::new());
    let cancel = CancellationToken::new();

    let mut req = request(&fx.image);
    req.daily_budget = 5_005;
    publisher.create_complete_ad(&req, &cancel).await.unwrap();

    req.bid_amount = Some(42);
    publisher.create_complete_ad(&req, &cancel).await.unwrap();

    let record = platform.record().await;
    assert_eq!(record.ad_sets[0].bid_amount, 500);
    assert_eq!(record.ad_sets[1].bid_amount, 42);
}

#[tokio::test]
async fn invalid_request_makes_no_calls() {
    let fx = fixture().await;
    let platform = FakeAdPlatform::new();
    let publisher = publisher(&platform, &RecordingSleeper::new());

    let mut req = request(&fx.image);
    req.daily_budget = 0;
    let failure = publisher
        .create_complete_ad(&req, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_matches!(failure.error, PipelineError::Validation(_));
    assert!(platform.record().await.calls.is_empty());
}

#[tokio::test]
async fn missing_page_detected_before_any_call() {
    let fx = fixture().await;
    let platform = FakeAdPlatform::new().with_page_id(None);
    let publisher = publisher(&platform, &RecordingSleeper::new());

    let failure = publisher
        .create_complete_ad(&request(&fx.image), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_matches!(
        failure.error,
        PipelineError::DependencyMissing {
            step: Step::Creative,
            dependency: "page_id"
        }
    );
    assert!(platform.record().await.calls.is_empty());
}

#[tokio::test]
async fn request_page_overrides_default() {
    let fx = fixture().await;
    let platform = FakeAdPlatform::new().with_page_id(None);
    let publisher = publisher(&platform, &RecordingSleeper::new());

    let mut req = request(&fx.image);
    req.page_id = Some("page-77".into());
    publisher
        .create_complete_ad(&req, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(platform.record().await.creatives[0].page_id, "page-77");
}

#[tokio::test]
async fn missing_image_fails_upload_locally() {
    let fx = fixture().await;
    let platform = FakeAdPlatform::new();
    let publisher = publisher(&platform, &RecordingSleeper::new());

    let req = request(&fx.image.with_file_name("gone.png"));
    let failure = publisher
        .create_complete_ad(&req, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_matches!(
        failure.error,
        PipelineError::Upload(UploadError::Missing { .. })
    );
    assert!(platform.record().await.calls.is_empty());
}

#[tokio::test]
async fn empty_id_is_dependency_missing() {
    let fx = fixture().await;
    let platform = FakeAdPlatform::new();
    platform.fail_next(Step::Campaign, FakeFailure::EmptyId).await;
    let publisher = publisher(&platform, &RecordingSleeper::new());

    let failure = publisher
        .create_complete_ad(&request(&fx.image), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_matches!(
        failure.error,
        PipelineError::DependencyMissing {
            step: Step::AdSet,
            dependency: "campaign_id"
        }
    );
    assert!(!failure.is_transient());
    assert_eq!(platform.record().await.count(Step::AdSet), 0);
}

#[tokio::test]
async fn page_identity_failure_is_reported() {
    let fx = fixture().await;
    let platform = FakeAdPlatform::new();
    platform
        .fail_always(Step::Creative, FakeFailure::PageIdentity)
        .await;
    let publisher = publisher(&platform, &RecordingSleeper::new());

    let failure = publisher
        .create_complete_ad(&request(&fx.image), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(failure.error.failure_kind(), Some(FailureKind::PageIdentity));
    assert_eq!(failure.created.len(), 3);
}

#[tokio::test]
async fn cancelled_token_creates_nothing() {
    let fx = fixture().await;
    let platform = FakeAdPlatform::new();
    let publisher = publisher(&platform, &RecordingSleeper::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let failure = publisher
        .create_complete_ad(&request(&fx.image), &cancel)
        .await
        .unwrap_err();

    assert_matches!(
        failure.error,
        PipelineError::Cancelled { step: Step::Upload }
    );
    assert!(platform.record().await.calls.is_empty());
}

#[tokio::test]
async fn slow_call_times_out_as_transient() {
    let fx = fixture().await;
    let platform = FakeAdPlatform::new();
    platform
        .delay(Step::Campaign, Duration::from_millis(500))
        .await;
    let publisher = AdPublisher::new(
        platform.clone(),
        PublishOptions {
            call_timeout: Duration::from_millis(20),
            retry: RetryPolicy::new(1, Duration::from_secs(5)),
        },
    );

    let failure = publisher
        .create_complete_ad(&request(&fx.image), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_matches!(
        failure.error,
        PipelineError::Timeout {
            step: Step::Campaign,
            ..
        }
    );
    assert!(failure.is_transient());
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn transient_twice_then_success() {
    let fx = fixture().await;
    let platform = FakeAdPlatform::new();
    platform
        .fail_times(Step::Campaign, FakeFailure::Transient, 2)
        .await;
    let sleeper = RecordingSleeper::new();
    let publisher = publisher(&platform, &sleeper);

    let published = publisher
        .publish(&request(&fx.image), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(published.attempts, 3);
    assert!(published.value.is_complete());
    assert_eq!(
        sleeper.delays().await,
        vec![Duration::from_secs(5), Duration::from_secs(10)]
    );

    let record = platform.record().await;
    assert_eq!(record.count(Step::Upload), 3);
    assert_eq!(record.count(Step::Campaign), 3);
    // Each failed attempt uploaded an image before the campaign step.
    assert_eq!(published.orphaned.len(), 2);
    assert!(published.orphaned.iter().all(|r| r.step == Step::Upload));
}

#[tokio::test]
async fn transient_upload_rejection_retries() {
    let fx = fixture().await;
    let platform = FakeAdPlatform::new();
    platform.fail_next(Step::Upload, FakeFailure::Transient).await;
    let sleeper = RecordingSleeper::new();
    let publisher = publisher(&platform, &sleeper);

    let published = publisher
        .publish(&request(&fx.image), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(published.attempts, 2);
    assert!(published.value.is_complete());
    assert_eq!(sleeper.delays().await, vec![Duration::from_secs(5)]);
    assert_eq!(platform.record().await.count(Step::Upload), 2);
    assert!(published.orphaned.is_empty());
}

#[tokio::test]
async fn missing_image_is_not_retried() {
    let fx = fixture().await;
    let platform = FakeAdPlatform::new();
    let sleeper = RecordingSleeper::new();
    let publisher = publisher(&platform, &sleeper);

    let req = request(&fx.image.with_file_name("gone.png"));
    let err = publisher
        .publish(&req, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.attempts, 1);
    assert_matches!(
        err.error.error,
        PipelineError::Upload(UploadError::Missing { .. })
    );
    assert!(sleeper.delays().await.is_empty());
}

#[tokio::test]
async fn permanent_error_raised_without_sleep() {
    let fx = fixture().await;
    let platform = FakeAdPlatform::new();
    platform
        .fail_always(Step::Campaign, FakeFailure::Permanent)
        .await;
    let sleeper = RecordingSleeper::new();
    let publisher = publisher(&platform, &sleeper);

    let err = publisher
        .publish(&request(&fx.image), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.attempts, 1);
    assert!(sleeper.delays().await.is_empty());
    assert_eq!(platform.record().await.count(Step::Campaign), 1);
    assert!(err.to_string().contains("Invalid parameter in campaign request"));
}

#[tokio::test]
async fn transient_every_time_exhausts_budget() {
    let fx = fixture().await;
    let platform = FakeAdPlatform::new();
    platform.fail_always(Step::Ad, FakeFailure::Transient).await;
    let sleeper = RecordingSleeper::new();
    let publisher = publisher(&platform, &sleeper);

    let err = publisher
        .publish(&request(&fx.image), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.attempts, 3);
    assert!(err.error.is_transient());
    let delays = sleeper.delays().await;
    assert_eq!(delays.iter().sum::<Duration>(), Duration::from_secs(15));
    assert_eq!(platform.record().await.count(Step::Ad), 3);
    // Upload, campaign, ad set and creative from each of the three attempts.
    assert_eq!(err.orphaned.len(), 12);
}
