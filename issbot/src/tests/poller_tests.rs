use super::fake::{FakeSurface, PageBehavior};
use super::init_tracing;
use crate::config::PortalConfig;
use crate::errors::RobotError;
use crate::poller::{PollVerdict, Poller};
use crate::selectors::SelectorMap;
use crate::types::{Mode, Task};

fn poll_config(max_attempts: u32) -> PortalConfig {
    PortalConfig {
        poll_max_attempts: max_attempts,
        ..PortalConfig::default()
    }
}

fn poll_task() -> Task {
    Task::new("/tmp/decl_2026_07.txt", "173254880116", Mode::Headless).with_task_id("poll-test")
}

#[tokio::test(start_paused = true)]
async fn pending_then_success_terminates_on_the_second_refresh() {
    init_tracing();
    let behavior = PageBehavior {
        status_timeline: vec![
            vec!["decl_2026_07.txt - Aguardando processamento".into()],
            vec!["decl_2026_07.txt - Processado com sucesso".into()],
        ],
        ..PageBehavior::default()
    };
    let surface = FakeSurface::new(behavior);
    let selectors = SelectorMap::current();
    let config = poll_config(20);
    let task = poll_task();

    let verdict = Poller::new(&surface, &selectors, &config)
        .poll(&task)
        .await
        .unwrap();

    match verdict {
        PollVerdict::Accepted(row) => assert!(row.contains("decl_2026_07.txt")),
        other => panic!("expected Accepted, got {other:?}"),
    }
    assert_eq!(surface.state.lock().unwrap().refresh_count, 2);
}

#[tokio::test(start_paused = true)]
async fn error_row_is_terminal_with_the_row_text_as_details() {
    init_tracing();
    let behavior = PageBehavior {
        status_timeline: vec![vec![
            "decl_2026_07.txt - ERRO: CNPJ do tomador não cadastrado".into(),
        ]],
        ..PageBehavior::default()
    };
    let surface = FakeSurface::new(behavior);
    let selectors = SelectorMap::current();
    let config = poll_config(20);
    let task = poll_task();

    let verdict = Poller::new(&surface, &selectors, &config)
        .poll(&task)
        .await
        .unwrap();

    match verdict {
        PollVerdict::Rejected(row) => assert!(row.contains("CNPJ do tomador")),
        other => panic!("expected Rejected, got {other:?}"),
    }
    // Terminal on the first classified row, no further refreshes.
    assert_eq!(surface.state.lock().unwrap().refresh_count, 1);
}

#[tokio::test(start_paused = true)]
async fn missing_row_exhausts_the_budget_into_poll_timeout() {
    init_tracing();
    let behavior = PageBehavior {
        status_timeline: vec![vec!["outro_arquivo.txt - Processado com sucesso".into()]],
        ..PageBehavior::default()
    };
    let surface = FakeSurface::new(behavior);
    let selectors = SelectorMap::current();
    let config = poll_config(4);
    let task = poll_task();

    let err = Poller::new(&surface, &selectors, &config)
        .poll(&task)
        .await
        .unwrap_err();

    match err {
        RobotError::PollTimeout { attempts, .. } => assert_eq!(attempts, 4),
        other => panic!("expected PollTimeout, got {other:?}"),
    }
    // Exactly max_attempts refreshes, then it stopped.
    assert_eq!(surface.state.lock().unwrap().refresh_count, 4);
}

#[tokio::test(start_paused = true)]
async fn pending_forever_times_out_rather_than_looping() {
    init_tracing();
    let behavior = PageBehavior {
        status_timeline: vec![vec!["decl_2026_07.txt - Em processamento".into()]],
        ..PageBehavior::default()
    };
    let surface = FakeSurface::new(behavior);
    let selectors = SelectorMap::current();
    let config = poll_config(3);
    let task = poll_task();

    let err = Poller::new(&surface, &selectors, &config)
        .poll(&task)
        .await
        .unwrap_err();

    assert!(matches!(err, RobotError::PollTimeout { attempts: 3, .. }));
    assert!(!err.is_retryable());
}
