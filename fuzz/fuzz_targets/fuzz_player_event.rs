#![no_main]

use libfuzzer_sys::fuzz_target;
use remote_player_client::protocol::PlayerEvent;
use remote_player_client::state::PlayerState;

fuzz_target!(|data: &[u8]| {
    // One event per line, folded in order like the push loop does.
    let mut state = PlayerState::default();
    for line in data.split(|b| *b == b'\n') {
        let Ok(event) = serde_json::from_slice::<PlayerEvent>(line) else {
            continue;
        };
        state.apply(&event);

        assert!(state.position_seconds.is_finite());
        assert!(state.position_seconds >= 0.0);
        assert!(state.volume_percent <= 100);
        if let Some(duration) = state.duration_seconds() {
            if duration.is_finite() && duration >= 0.0 {
                assert!(state.position_seconds <= duration);
            }
        }
    }
});
