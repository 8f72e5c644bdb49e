use super::fake::{FakeSurface, LoginBehavior, PageBehavior};
use super::init_tracing;
use crate::auth::{solve_keypad, Authenticator};
use crate::config::PortalConfig;
use crate::diagnostics::Diagnostics;
use crate::errors::RobotError;
use crate::selectors::SelectorMap;
use crate::types::{Mode, Task};
use std::time::Duration;

fn test_config() -> PortalConfig {
    PortalConfig {
        diagnostics_dir: std::env::temp_dir().join("issbot-tests"),
        ..PortalConfig::default()
    }
}

fn test_task() -> Task {
    Task::new("/tmp/decl.txt", "173254880116", Mode::Headless).with_task_id("auth-test")
}

#[tokio::test(start_paused = true)]
async fn solver_clicks_one_key_per_digit_in_order() {
    init_tracing();
    let surface = FakeSurface::new(PageBehavior::default());
    let keys = SelectorMap::current().login.keypad_keys;

    solve_keypad(&surface, &keys, "2580", Duration::from_millis(1))
        .await
        .unwrap();

    let clicks = surface.state.lock().unwrap().keypad_clicks.clone();
    // "2 ou 7" -> btn2, "5 ou 0" -> btn5, "3 ou 8" -> btn3, "5 ou 0" -> btn5
    assert_eq!(clicks, vec!["#btn2", "#btn5", "#btn3", "#btn5"]);
}

#[tokio::test(start_paused = true)]
async fn solver_fails_fatally_on_unrepresentable_digit() {
    init_tracing();
    let behavior = PageBehavior {
        // No key ever shows '9'.
        keypad: vec![
            ("#btn1".into(), "1 ou 2".into()),
            ("#btn2".into(), "3 ou 4".into()),
        ],
        ..PageBehavior::default()
    };
    let surface = FakeSurface::new(behavior);
    let keys = SelectorMap::current().login.keypad_keys;

    let err = solve_keypad(&surface, &keys, "1942", Duration::from_millis(1))
        .await
        .unwrap_err();

    assert!(matches!(err, RobotError::Authentication(_)));
    assert!(err.to_string().contains('9'));
    // The leading '1' was clicked, then resolution stopped dead.
    let clicks = surface.state.lock().unwrap().keypad_clicks.clone();
    assert_eq!(clicks, vec!["#btn1"]);
}

#[tokio::test(start_paused = true)]
async fn login_accepts_when_post_login_marker_is_reached() {
    init_tracing();
    let surface = FakeSurface::new(PageBehavior::default());
    let selectors = SelectorMap::current();
    let config = test_config();
    let task = test_task();
    let diagnostics = Diagnostics::new(&config.diagnostics_dir, &task.task_id);

    Authenticator::new(&surface, &selectors, &config, &diagnostics)
        .login(&task, "17325488000161", "2580")
        .await
        .unwrap();

    let state = surface.state.lock().unwrap();
    assert_eq!(state.fills[0].1, "17325488000161");
    assert!(state.clicks.contains(&selectors.login.submit_button));
}

#[tokio::test(start_paused = true)]
async fn explicit_rejection_is_fatal_and_carries_the_portal_text() {
    init_tracing();
    let behavior = PageBehavior {
        login: LoginBehavior::Reject("Senha incorreta. Tente novamente.".into()),
        ..PageBehavior::default()
    };
    let surface = FakeSurface::new(behavior);
    let selectors = SelectorMap::current();
    let config = test_config();
    let task = test_task();
    let diagnostics = Diagnostics::new(&config.diagnostics_dir, &task.task_id);

    let err = Authenticator::new(&surface, &selectors, &config, &diagnostics)
        .login(&task, "17325488000161", "2580")
        .await
        .unwrap_err();

    match err {
        RobotError::Authentication(reason) => {
            assert!(reason.contains("Senha incorreta"));
        }
        other => panic!("expected Authentication, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn ambiguous_login_timeout_is_retryable() {
    init_tracing();
    let behavior = PageBehavior {
        login: LoginBehavior::Hang,
        ..PageBehavior::default()
    };
    let surface = FakeSurface::new(behavior);
    let selectors = SelectorMap::current();
    let config = test_config();
    let task = test_task();
    let diagnostics = Diagnostics::new(&config.diagnostics_dir, &task.task_id);

    let err = Authenticator::new(&surface, &selectors, &config, &diagnostics)
        .login(&task, "17325488000161", "2580")
        .await
        .unwrap_err();

    assert!(matches!(err, RobotError::PortalOffline(_)));
    assert!(err.is_retryable());
}

#[tokio::test(start_paused = true)]
async fn interstitial_grace_is_ridden_out_without_failing_the_login() {
    init_tracing();
    let behavior = PageBehavior {
        title: "Just a moment...".into(),
        body: "Checking your browser before accessing the portal".into(),
        ..PageBehavior::default()
    };
    let surface = FakeSurface::new(behavior);
    let selectors = SelectorMap::current();
    let config = test_config();
    let task = test_task();
    let diagnostics = Diagnostics::new(&config.diagnostics_dir, &task.task_id);

    // The interstitial never clears, but the sign-in form is reachable
    // behind it; the grace period elapses and the flow carries on.
    Authenticator::new(&surface, &selectors, &config, &diagnostics)
        .login(&task, "17325488000161", "2580")
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn missing_sign_in_form_reads_as_unavailability() {
    init_tracing();
    let behavior = PageBehavior {
        login_form_present: false,
        ..PageBehavior::default()
    };
    let surface = FakeSurface::new(behavior);
    let selectors = SelectorMap::current();
    let config = test_config();
    let task = test_task();
    let diagnostics = Diagnostics::new(&config.diagnostics_dir, &task.task_id);

    let err = Authenticator::new(&surface, &selectors, &config, &diagnostics)
        .login(&task, "17325488000161", "2580")
        .await
        .unwrap_err();

    assert!(matches!(err, RobotError::PortalOffline(_)));
    // Nothing was typed into a page that never rendered its form.
    assert!(surface.state.lock().unwrap().fills.is_empty());
}
