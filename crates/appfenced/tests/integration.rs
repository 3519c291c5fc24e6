//! Integration tests for appfenced
//!
//! These tests exercise the enforcement pipeline end-to-end: store, limit
//! engine, restriction service, and the mock platform host.

use appfence_api::{BlockPage, CommandRequest, CommandOutcome, RestrictionCommand, UiNode};
use appfence_core::{
    ActivityLog, DisableGuard, Effect, EngineEvent, LimitEngine, RestrictionService, ServiceSignal,
};
use appfence_host_api::{HostCapabilities, MockHost, MockPolicyLayer, PlatformHost, RecordedAction};
use appfence_store::{RestrictionStore, SqliteStore};
use appfence_util::{now, MonotonicInstant, PackageId};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const OWN_PACKAGE: &str = "io.appfence";

fn engine_fixture() -> (LimitEngine, Arc<SqliteStore>) {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let engine = LimitEngine::new(
        PackageId::new(OWN_PACKAGE),
        store.clone(),
        Arc::new(Mutex::new(ActivityLog::new())),
    );
    (engine, store)
}

fn foreground(package: &PackageId, at: MonotonicInstant) -> EngineEvent {
    EngineEvent::Foreground {
        package: package.clone(),
        class_name: format!("{}.MainActivity", package),
        at,
        now: now(),
    }
}

/// Drive effects against the mock host the way the daemon loop does,
/// returning whatever deferred block ends up armed.
async fn apply(host: &MockHost, effects: Vec<Effect>) -> Option<(u64, Duration)> {
    let mut armed = None;
    for effect in effects {
        match effect {
            Effect::LaunchBlockPage(page) => host.launch_block_page(page).await.unwrap(),
            Effect::NavigateBack => host.navigate_back().await.unwrap(),
            Effect::ShowNotice(message) => host.show_notice(&message).await.unwrap(),
            Effect::ArmDeferredBlock { generation, after } => armed = Some((generation, after)),
            Effect::CancelDeferredBlock => armed = None,
        }
    }
    armed
}

#[tokio::test]
async fn exhausted_budget_blocks_on_entry() {
    let (mut engine, store) = engine_fixture();
    let host = MockHost::new();
    let game = PackageId::new("org.example.game");

    store.set_limit_minutes(&game, 30).unwrap();
    store.add_used_millis(&game, 30 * 60_000).unwrap();

    let effects = engine.handle_event(foreground(&game, MonotonicInstant::now()));
    let armed = apply(&host, effects).await;

    assert!(armed.is_none());
    assert_eq!(
        host.actions(),
        vec![RecordedAction::BlockPage(BlockPage::TimeUp {
            package: game,
            limit_minutes: 30,
        })]
    );
}

#[tokio::test]
async fn deferred_block_fires_after_remaining_budget() {
    let (mut engine, store) = engine_fixture();
    let host = MockHost::new();
    let game = PackageId::new("org.example.game");

    store.set_limit_minutes(&game, 30).unwrap();
    store.add_used_millis(&game, 29 * 60_000).unwrap();

    let t0 = MonotonicInstant::now();
    let effects = engine.handle_event(foreground(&game, t0));
    let (generation, after) = apply(&host, effects).await.expect("deferred block armed");

    assert_eq!(after, Duration::from_secs(60));
    assert!(host.actions().is_empty());

    let effects = engine.handle_event(EngineEvent::DeferredBlockFired {
        generation,
        at: t0 + after,
    });
    apply(&host, effects).await;

    assert_eq!(
        host.actions(),
        vec![RecordedAction::BlockPage(BlockPage::TimeUp {
            package: game,
            limit_minutes: 30,
        })]
    );
}

#[tokio::test]
async fn leaving_a_package_flushes_usage() {
    let (mut engine, store) = engine_fixture();
    let host = MockHost::new();
    let game = PackageId::new("org.example.game");
    let launcher = PackageId::new("org.example.launcher");

    let t0 = MonotonicInstant::now();
    apply(&host, engine.handle_event(foreground(&game, t0))).await;
    apply(
        &host,
        engine.handle_event(foreground(&launcher, t0 + Duration::from_secs(5))),
    )
    .await;

    assert_eq!(store.used_millis(&game).unwrap(), 5_000);
}

#[tokio::test]
async fn reentry_during_cooldown_shows_cooldown_page() {
    let (mut engine, store) = engine_fixture();
    let host = MockHost::new();
    let game = PackageId::new("org.example.game");
    let launcher = PackageId::new("org.example.launcher");

    // Cooldowns only gate packages with a budget
    store.set_limit_minutes(&game, 30).unwrap();
    store.set_reopen_seconds(&game, 60).unwrap();

    let t0 = MonotonicInstant::now();
    apply(&host, engine.handle_event(foreground(&game, t0))).await;
    // Leaving records the close time for the cooldown gate
    apply(&host, engine.handle_event(foreground(&launcher, t0))).await;

    let effects = engine.handle_event(foreground(&game, t0 + Duration::from_secs(30)));
    apply(&host, effects).await;

    assert_eq!(
        host.actions(),
        vec![RecordedAction::BlockPage(BlockPage::Cooldown {
            package: game,
            remaining_seconds: 30,
        })]
    );
}

#[tokio::test]
async fn blocked_activity_is_bounced_with_a_notice() {
    let (mut engine, store) = engine_fixture();
    let host = MockHost::new();
    let game = PackageId::new("org.example.game");
    let class_name = "org.example.game.CasinoActivity";

    store.set_activity_blocker_enabled(true).unwrap();
    store.set_activity_blocked(class_name, true).unwrap();

    let effects = engine.handle_event(EngineEvent::Foreground {
        package: game,
        class_name: class_name.into(),
        at: MonotonicInstant::now(),
        now: now(),
    });
    apply(&host, effects).await;

    assert_eq!(
        host.actions(),
        vec![
            RecordedAction::NavigateBack,
            RecordedAction::Notice("CasinoActivity is blocked".into()),
        ]
    );
}

#[tokio::test]
async fn limit_change_while_tracked_blocks_immediately() {
    let (mut engine, store) = engine_fixture();
    let host = MockHost::new();
    let policy = Arc::new(MockPolicyLayer::new());
    let mut service = RestrictionService::new(
        store.clone(),
        policy,
        HostCapabilities::full(),
        Arc::new(Mutex::new(ActivityLog::new())),
    );
    let game = PackageId::new("org.example.game");

    store.add_used_millis(&game, 5 * 60_000).unwrap();

    // Unlimited at entry, so the engine just tracks
    apply(&host, engine.handle_event(foreground(&game, MonotonicInstant::now()))).await;
    assert!(host.actions().is_empty());

    // A parent sets a 1-minute limit mid-session
    let request = CommandRequest {
        request_id: 7,
        passphrase: None,
        command: RestrictionCommand::SetLimit {
            package: game.clone(),
            minutes: 1,
        },
    };
    let (outcome, signal) = service.handle_command(&request, now(), Instant::now()).await;
    assert!(matches!(outcome, CommandOutcome::Ok));
    assert_eq!(
        signal,
        Some(ServiceSignal::LimitChanged {
            package: game.clone()
        })
    );

    let effects = engine.handle_event(EngineEvent::LimitChanged {
        package: game.clone(),
        at: MonotonicInstant::now(),
    });
    apply(&host, effects).await;

    assert_eq!(
        host.actions(),
        vec![RecordedAction::BlockPage(BlockPage::TimeUp {
            package: game,
            limit_minutes: 1,
        })]
    );
}

#[tokio::test]
async fn new_managed_browser_gets_the_blocklist() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let policy = Arc::new(MockPolicyLayer::new());
    let mut service = RestrictionService::new(
        store.clone(),
        policy.clone(),
        HostCapabilities::full(),
        Arc::new(Mutex::new(ActivityLog::new())),
    );

    let request = CommandRequest {
        request_id: 1,
        passphrase: None,
        command: RestrictionCommand::SaveSiteList {
            list: appfence_api::SiteList::new("Social", vec!["a.example".into()]),
        },
    };
    service.handle_command(&request, now(), Instant::now()).await;

    let chrome = PackageId::new("com.android.chrome");
    let oddball = PackageId::new("org.example.browser");
    policy.add_browser(chrome.clone(), true);
    policy.add_browser(oddball.clone(), false);

    service.browser_policy().handle_package_added(&chrome).await.unwrap();
    service.browser_policy().handle_package_added(&oddball).await.unwrap();

    assert_eq!(
        policy.applied_blocklists.lock().unwrap().get(&chrome),
        Some(&vec!["a.example".to_string()])
    );
    // A browser that ignores managed configuration is suspended instead
    assert_eq!(policy.suspended.lock().unwrap().get(&oddball), Some(&true));
}

#[test]
fn guard_bounces_the_service_settings_pane() {
    let label = "Monitors app usage and enforces screen-time limits";
    let guard = DisableGuard::new(label);

    let pane = UiNode::with_children(vec![
        UiNode::with_text("Appfence"),
        UiNode::with_children(vec![UiNode::with_text(label)]),
    ]);
    assert!(guard.should_bounce(&pane));

    let other_pane = UiNode::with_children(vec![UiNode::with_text("Screen reader")]);
    assert!(!guard.should_bounce(&other_pane));
}
