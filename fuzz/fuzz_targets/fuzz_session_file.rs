#![no_main]
use libfuzzer_sys::fuzz_target;
use vr_training_admin::sessions::Session;

fuzz_target!(|data: &[u8]| {
    if let Ok(sessions) = serde_json::from_slice::<Vec<Session>>(data) {
        let encoded = serde_json::to_vec(&sessions).unwrap();
        let decoded: Vec<Session> = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded.len(), sessions.len());
    }
});
