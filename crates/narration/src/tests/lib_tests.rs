use super::*;

#[tokio::test]
async fn silent_narration_resolves_immediately_without_audio() {
    let engine = SilentNarration;
    engine.speak_and_wait("hola").await.expect("silent speak");
    assert!(!engine.produces_audio());
}

#[tokio::test]
async fn inflight_slot_releases_superseded_waiter() {
    let slot = InflightSlot::default();
    let (first, first_released, superseded) = slot.begin();
    assert!(!superseded);

    let (second, _second_released, superseded) = slot.begin();
    assert!(superseded);
    assert_ne!(first, second);
    first_released.await.expect("first waiter released");

    slot.finish(first);
    assert!(slot.release(), "finishing a stale id must not clear the active one");
    assert!(!slot.release());
}
