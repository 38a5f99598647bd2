use std::sync::Once;

use pretty_assertions::assert_eq;
use scout_core::{update, Effect, Msg, PageRequest, Phase, RunState, Termination};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(scout_logging::initialize_for_tests);
}

/// Feed one page of `items` collected items and return the state plus the
/// effects produced by the last message.
fn feed_page(state: RunState, items: usize, has_cursor: bool) -> (RunState, Vec<Effect>) {
    let (mut state, mut effects) = update(state, Msg::PageReceived { items, has_cursor });
    assert_eq!(effects, vec![Effect::ExtractItems]);
    for _ in 0..items {
        let (next, next_effects) = update(state, Msg::ItemCollected);
        state = next;
        effects = next_effects;
        if state.is_finished() {
            return (state, effects);
        }
    }
    update(state, Msg::PageProcessed)
}

#[test]
fn start_requests_first_page() {
    init_logging();
    let (state, effects) = update(RunState::new(5), Msg::Start);

    assert_eq!(state.phase(), Phase::Fetching);
    assert_eq!(effects, vec![Effect::AcquireAndFetch(PageRequest::First)]);
}

#[test]
fn target_cap_truncates_the_third_page() {
    init_logging();
    let (state, _) = update(RunState::new(45), Msg::Start);

    let (state, effects) = feed_page(state, 20, true);
    assert_eq!(effects, vec![Effect::AcquireAndFetch(PageRequest::Next)]);
    let (state, effects) = feed_page(state, 20, true);
    assert_eq!(effects, vec![Effect::AcquireAndFetch(PageRequest::Next)]);
    let (state, effects) = feed_page(state, 10, true);

    assert_eq!(effects, vec![Effect::Finish(Termination::TargetReached)]);
    assert_eq!(state.collected(), 45);
    assert_eq!(state.pages(), 3);
    assert_eq!(state.phase(), Phase::Done);
}

#[test]
fn missing_cursor_is_exhaustion_not_failure() {
    init_logging();
    let (state, _) = update(RunState::new(100), Msg::Start);
    let (state, effects) = feed_page(state, 7, false);

    assert_eq!(effects, vec![Effect::Finish(Termination::Exhausted)]);
    assert_eq!(state.collected(), 7);
    assert_eq!(state.termination(), Some(Termination::Exhausted));
    assert_eq!(state.phase(), Phase::Done);
}

#[test]
fn empty_page_is_exhaustion() {
    init_logging();
    let (state, _) = update(RunState::new(100), Msg::Start);
    let (state, effects) = update(
        state,
        Msg::PageReceived {
            items: 0,
            has_cursor: true,
        },
    );

    assert_eq!(effects, vec![Effect::Finish(Termination::Exhausted)]);
    assert_eq!(state.pages(), 0);
}

#[test]
fn skipped_items_do_not_count_towards_the_target() {
    init_logging();
    let (state, _) = update(RunState::new(2), Msg::Start);
    let (state, _) = update(
        state,
        Msg::PageReceived {
            items: 3,
            has_cursor: false,
        },
    );
    let (state, _) = update(state, Msg::ItemSkipped);
    let (state, effects) = update(state, Msg::ItemCollected);
    assert!(effects.is_empty());
    let (state, effects) = update(state, Msg::ItemCollected);

    assert_eq!(effects, vec![Effect::Finish(Termination::TargetReached)]);
    assert_eq!(state.collected(), 2);
    assert_eq!(state.skipped(), 1);
}

#[test]
fn failure_mid_page_keeps_counts() {
    init_logging();
    let (state, _) = update(RunState::new(50), Msg::Start);
    let (state, _) = update(
        state,
        Msg::PageReceived {
            items: 20,
            has_cursor: true,
        },
    );
    let (state, _) = update(state, Msg::ItemCollected);
    let (state, _) = update(state, Msg::ItemCollected);
    let (state, effects) = update(state, Msg::Failed);

    assert_eq!(effects, vec![Effect::Finish(Termination::Failed)]);
    assert_eq!(state.phase(), Phase::Failed);
    assert_eq!(state.collected(), 2);
}

#[test]
fn cancellation_while_fetching_is_a_clean_stop() {
    init_logging();
    let (state, _) = update(RunState::new(50), Msg::Start);
    let (state, effects) = update(state, Msg::Cancelled);

    assert_eq!(effects, vec![Effect::Finish(Termination::Cancelled)]);
    assert_eq!(state.phase(), Phase::Done);
}
