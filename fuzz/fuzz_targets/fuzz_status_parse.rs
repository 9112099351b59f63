#![no_main]
use libfuzzer_sys::fuzz_target;
use vr_training_admin::sessions::{SessionStatus, TransitionPolicy};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(status) = s.parse::<SessionStatus>() {
            assert_eq!(status.as_str().parse::<SessionStatus>().ok(), Some(status));
        }
        let _ = TransitionPolicy::parse(s);
    }
});
