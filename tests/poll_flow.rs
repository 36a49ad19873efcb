//! End-to-end poll flow tests against a temporary SQLite database.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use tempfile::TempDir;

use shotqueue::auth::{hash_password, PasswordVerifier};
use shotqueue::models::version::{DISABLED, ENABLED};
use shotqueue::models::{ColorDepth, NewBrowser, NewFactory, NewRequestGroup, ScreenSize};
use shotqueue::repository::DbContext;
use shotqueue::services::{PollError, PollService, SubmitService};
use shotqueue::work_queue::DbWorkQueue;

const LEASE_SECONDS: i64 = 300;

struct Harness {
    ctx: DbContext,
    poll: PollService,
    _dir: TempDir,
}

async fn harness() -> Harness {
    harness_with(false).await
}

async fn harness_with(release_on_browser_mismatch: bool) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let ctx = DbContext::from_sqlite_path(&dir.path().join("queue.db"));
    ctx.init_schema().await.unwrap();

    let queue = Arc::new(DbWorkQueue::new(
        ctx.requests(),
        Duration::seconds(LEASE_SECONDS),
    ));
    let poll = PollService::new(&ctx, queue, Arc::new(PasswordVerifier))
        .with_release_on_browser_mismatch(release_on_browser_mismatch);
    Harness {
        ctx,
        poll,
        _dir: dir,
    }
}

/// Linux factory with Firefox 2.0, 1024x768 and 24bpp.
async fn add_factory(ctx: &DbContext, name: &str) {
    add_factory_with(ctx, name, &[NewBrowser::new("Firefox", "2.0.0.4", 2, 0)]).await;
}

async fn add_factory_with(ctx: &DbContext, name: &str, browsers: &[NewBrowser]) -> i32 {
    let factories = ctx.factories();
    let factory = factories
        .create(
            &NewFactory {
                name: name.to_string(),
                operating_system: "linux".to_string(),
                password_hash: Some(hash_password("secret")),
            },
            Utc::now(),
        )
        .await
        .unwrap();
    factories
        .add_screen_size(factory.id, ScreenSize { width: 1024, height: 768 })
        .await
        .unwrap();
    factories
        .add_color_depth(factory.id, ColorDepth { bits_per_pixel: 24 })
        .await
        .unwrap();
    for browser in browsers {
        factories.add_browser(factory.id, browser).await.unwrap();
    }
    factory.id
}

/// Firefox without flash next to an Opera that has it. The capability
/// filter accepts a flash request for Firefox, browser resolution does not.
async fn add_split_flash_factory(ctx: &DbContext, name: &str) -> i32 {
    let mut firefox = NewBrowser::new("Firefox", "2.0.0.4", 2, 0);
    firefox.flash = DISABLED;
    let mut opera = NewBrowser::new("Opera", "9.0", 9, 0);
    opera.flash = 9;
    add_factory_with(ctx, name, &[firefox, opera]).await
}

async fn submit_flash_request(ctx: &DbContext, now: DateTime<Utc>) -> i32 {
    let mut group = NewRequestGroup::new("http://example.com/", now + Duration::minutes(30))
        .browser("Firefox".parse().unwrap());
    group.flash = Some(ENABLED);
    let (_, requests) = ctx.requests().submit(&group, 0, now).await.unwrap();
    requests[0].id
}

async fn submit(ctx: &DbContext, website: &str, browser: &str, priority: i32, now: DateTime<Utc>) -> i32 {
    let (_, requests) = ctx
        .requests()
        .submit(
            &NewRequestGroup::new(website, now + Duration::minutes(30))
                .browser(browser.parse().unwrap()),
            priority,
            now,
        )
        .await
        .unwrap();
    requests[0].id
}

#[tokio::test]
async fn test_poll_resolves_assignment_and_hides_claimed_work() {
    let h = harness().await;
    add_factory(&h.ctx, "shot01").await;
    add_factory(&h.ctx, "shot02").await;
    let now = Utc::now();
    let id = submit(&h.ctx, "http://example.com/", "Firefox:2", 0, now).await;

    let assignment = h.poll.poll("shot01", "secret", Some("10.0.0.7"), now).await.unwrap();
    assert_eq!(assignment.request, id);
    assert_eq!(assignment.browser, "Firefox");
    assert_eq!(assignment.version, "2.0.0.4");
    assert_eq!((assignment.major, assignment.minor), (2, 0));
    assert_eq!((assignment.width, assignment.height), (1024, 768));
    assert_eq!(assignment.bpp, 24);
    assert_eq!(assignment.javascript, "");

    let second = h.poll.poll("shot02", "secret", None, now).await;
    assert!(matches!(second, Err(PollError::NoMatchingRequest)));

    let seen = h.ctx.factories().get_by_name("shot01").await.unwrap().unwrap();
    assert_eq!(seen.ip.as_deref(), Some("10.0.0.7"));
    assert!(seen.last_poll.is_some());
}

#[tokio::test]
async fn test_bad_credentials_rejected() {
    let h = harness().await;
    add_factory(&h.ctx, "shot01").await;
    let now = Utc::now();
    submit(&h.ctx, "http://example.com/", "Firefox", 0, now).await;

    assert!(matches!(
        h.poll.poll("shot01", "wrong", None, now).await,
        Err(PollError::Unauthorized)
    ));
    assert!(matches!(
        h.poll.poll("ghost", "secret", None, now).await,
        Err(PollError::UnknownFactory(_))
    ));

    // The rejected poll left the request claimable.
    assert!(h.poll.poll("shot01", "secret", None, now).await.is_ok());
}

#[tokio::test]
async fn test_concurrent_pollers_single_winner() {
    let h = harness().await;
    let names: Vec<String> = (0..8).map(|i| format!("shot{:02}", i)).collect();
    for name in &names {
        add_factory(&h.ctx, name).await;
    }
    let now = Utc::now();
    let id = submit(&h.ctx, "http://example.com/", "Firefox", 0, now).await;

    let results = join_all(
        names
            .iter()
            .map(|name| h.poll.poll(name, "secret", None, now)),
    )
    .await;

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].request, id);
    for result in &results {
        if let Err(e) = result {
            assert!(matches!(e, PollError::NoMatchingRequest), "unexpected {:?}", e);
        }
    }
}

#[tokio::test]
async fn test_stale_claim_is_reclaimed() {
    let h = harness().await;
    add_factory(&h.ctx, "shot01").await;
    add_factory(&h.ctx, "shot02").await;
    let t0 = Utc::now();
    let id = submit(&h.ctx, "http://example.com/", "Firefox", 0, t0).await;

    h.poll.poll("shot01", "secret", None, t0).await.unwrap();

    let within_lease = t0 + Duration::seconds(LEASE_SECONDS - 1);
    assert!(matches!(
        h.poll.poll("shot02", "secret", None, within_lease).await,
        Err(PollError::NoMatchingRequest)
    ));

    let after_lease = t0 + Duration::seconds(LEASE_SECONDS + 1);
    let reclaimed = h.poll.poll("shot02", "secret", None, after_lease).await.unwrap();
    assert_eq!(reclaimed.request, id);

    // The first factory lost its claim and can no longer fulfill.
    assert!(matches!(
        h.poll.fulfill("shot01", "secret", id, after_lease).await,
        Err(PollError::ClaimInvalid(rid)) if rid == id
    ));
    h.poll.fulfill("shot02", "secret", id, after_lease).await.unwrap();
}

#[tokio::test]
async fn test_fulfill_after_lease_is_rejected() {
    let h = harness().await;
    add_factory(&h.ctx, "shot01").await;
    let t0 = Utc::now();
    let id = submit(&h.ctx, "http://example.com/", "Firefox", 0, t0).await;

    h.poll.poll("shot01", "secret", None, t0).await.unwrap();
    let late = t0 + Duration::seconds(LEASE_SECONDS + 1);
    assert!(matches!(
        h.poll.fulfill("shot01", "secret", id, late).await,
        Err(PollError::ClaimInvalid(_))
    ));
    assert!(matches!(
        h.poll.fulfill("shot01", "secret", 9999, t0).await,
        Err(PollError::RequestNotFound(9999))
    ));
}

#[tokio::test]
async fn test_fulfilled_request_never_handed_out_again() {
    let h = harness().await;
    add_factory(&h.ctx, "shot01").await;
    let t0 = Utc::now();
    let id = submit(&h.ctx, "http://example.com/", "Firefox", 0, t0).await;

    h.poll.poll("shot01", "secret", None, t0).await.unwrap();
    h.poll.fulfill("shot01", "secret", id, t0).await.unwrap();

    let later = t0 + Duration::seconds(LEASE_SECONDS * 2);
    assert!(matches!(
        h.poll.poll("shot01", "secret", None, later).await,
        Err(PollError::NoMatchingRequest)
    ));

    let factory = h.ctx.factories().get_by_name("shot01").await.unwrap().unwrap();
    assert!(factory.last_upload.is_some());
}

#[tokio::test]
async fn test_higher_priority_served_first() {
    let h = harness().await;
    add_factory(&h.ctx, "shot01").await;
    let now = Utc::now();
    let low = submit(&h.ctx, "http://a.example/", "Firefox", 1, now).await;
    let high = submit(&h.ctx, "http://b.example/", "Firefox", 5, now).await;
    let mid = submit(&h.ctx, "http://c.example/", "Firefox", 3, now).await;

    let mut order = Vec::new();
    for _ in 0..3 {
        order.push(h.poll.poll("shot01", "secret", None, now).await.unwrap().request);
    }
    assert_eq!(order, vec![high, mid, low]);
}

#[tokio::test]
async fn test_expired_group_not_served() {
    let h = harness().await;
    add_factory(&h.ctx, "shot01").await;
    let now = Utc::now();
    h.ctx
        .requests()
        .submit(
            &NewRequestGroup::new("http://example.com/", now + Duration::minutes(1))
                .browser("Firefox".parse().unwrap()),
            0,
            now,
        )
        .await
        .unwrap();

    let after_expiry = now + Duration::minutes(2);
    assert!(matches!(
        h.poll.poll("shot01", "secret", None, after_expiry).await,
        Err(PollError::NoMatchingRequest)
    ));

    let (requests, groups) = h.ctx.requests().purge_expired(after_expiry).await.unwrap();
    assert_eq!((requests, groups), (1, 1));
}

#[tokio::test]
async fn test_unservable_request_skipped() {
    let h = harness().await;
    add_factory(&h.ctx, "shot01").await;
    let now = Utc::now();
    // Submitted first and with a higher priority, but needs Firefox 3.
    submit(&h.ctx, "http://example.com/", "Firefox:3", 9, now).await;
    let servable = submit(&h.ctx, "http://example.org/", "Firefox:2", 0, now).await;

    let assignment = h.poll.poll("shot01", "secret", None, now).await.unwrap();
    assert_eq!(assignment.request, servable);
}

#[tokio::test]
async fn test_domain_priority_orders_submissions() {
    let h = harness().await;
    add_factory(&h.ctx, "shot01").await;
    let now = Utc::now();
    h.ctx
        .priorities()
        .set("news.example", 10, now + Duration::days(1))
        .await
        .unwrap();

    let submit_service = SubmitService::new(&h.ctx, 0);
    let expire = now + Duration::minutes(30);
    submit_service
        .submit(
            &NewRequestGroup::new("http://plain.example/", expire).browser("Firefox".parse().unwrap()),
            now,
        )
        .await
        .unwrap();
    let (_, boosted) = submit_service
        .submit(
            &NewRequestGroup::new("https://www.news.example/today", expire)
                .browser("Firefox".parse().unwrap()),
            now,
        )
        .await
        .unwrap();

    let assignment = h.poll.poll("shot01", "secret", None, now).await.unwrap();
    assert_eq!(assignment.request, boosted[0].id);
}

#[tokio::test]
async fn test_browser_mismatch_holds_claim() {
    let h = harness().await;
    let factory_id = add_split_flash_factory(&h.ctx, "shot01").await;
    let now = Utc::now();
    let id = submit_flash_request(&h.ctx, now).await;

    let result = h.poll.poll("shot01", "secret", None, now).await;
    assert!(matches!(
        result,
        Err(PollError::NoMatchingBrowser { request_id }) if request_id == id
    ));

    let stored = h.ctx.requests().get(id).await.unwrap().unwrap();
    let claim = stored.request.claim.expect("claim held after mismatch");
    assert_eq!(claim.factory_id, factory_id);

    assert!(matches!(
        h.poll.poll("shot01", "secret", None, now).await,
        Err(PollError::NoMatchingRequest)
    ));
}

#[tokio::test]
async fn test_browser_mismatch_releases_claim_when_configured() {
    let h = harness_with(true).await;
    add_split_flash_factory(&h.ctx, "shot01").await;
    let now = Utc::now();
    let id = submit_flash_request(&h.ctx, now).await;

    let result = h.poll.poll("shot01", "secret", None, now).await;
    assert!(matches!(
        result,
        Err(PollError::NoMatchingBrowser { request_id }) if request_id == id
    ));

    let stored = h.ctx.requests().get(id).await.unwrap().unwrap();
    assert!(stored.request.claim.is_none());
    assert!(stored.request.fulfilled_at.is_none());
}
