use research_core::{update, AppState, Msg};

#[test]
fn tick_without_job_is_noop() {
    let state = AppState::new();
    let (next, effects) = update(state.clone(), Msg::Tick);

    assert_eq!(state, next);
    assert!(effects.is_empty());
}

#[test]
fn job_controls_without_job_are_noop() {
    let state = AppState::new();
    for msg in [
        Msg::RefreshClicked,
        Msg::AutoRefreshToggled,
        Msg::PollTick {
            job_id: "42".to_string(),
        },
    ] {
        let (next, effects) = update(state.clone(), msg);
        assert_eq!(state, next);
        assert!(effects.is_empty());
    }
}
