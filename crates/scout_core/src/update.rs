use crate::{Effect, Msg, PageRequest, Phase, RunState, Termination};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages that do not apply to the current phase are ignored.
pub fn update(mut state: RunState, msg: Msg) -> (RunState, Vec<Effect>) {
    if state.is_finished() {
        return (state, Vec::new());
    }

    let effects = match (state.phase(), msg) {
        (Phase::Init, Msg::Start) => {
            state.begin_fetch();
            vec![Effect::AcquireAndFetch(PageRequest::First)]
        }
        (Phase::Fetching, Msg::PageReceived { items, has_cursor }) => {
            if items == 0 {
                finish(&mut state, Termination::Exhausted)
            } else {
                state.begin_page(has_cursor);
                vec![Effect::ExtractItems]
            }
        }
        (Phase::Extracting, Msg::ItemCollected) => {
            state.count_collected();
            if state.target_reached() {
                finish(&mut state, Termination::TargetReached)
            } else {
                Vec::new()
            }
        }
        (Phase::Extracting, Msg::ItemSkipped) => {
            state.count_skipped();
            Vec::new()
        }
        (Phase::Extracting, Msg::PageProcessed) => {
            if state.page_has_cursor() {
                state.begin_fetch();
                vec![Effect::AcquireAndFetch(PageRequest::Next)]
            } else {
                finish(&mut state, Termination::Exhausted)
            }
        }
        (_, Msg::Cancelled) => finish(&mut state, Termination::Cancelled),
        (_, Msg::Failed) => finish(&mut state, Termination::Failed),
        _ => Vec::new(),
    };

    (state, effects)
}

fn finish(state: &mut RunState, termination: Termination) -> Vec<Effect> {
    state.finish(termination);
    vec![Effect::Finish(termination)]
}
