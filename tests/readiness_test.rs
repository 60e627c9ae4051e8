use skinpost_ngin::{
    Features,
    error::{FrameError, InitError},
    render::{FrameStage, FrameState, validate_targets},
};

#[test]
fn not_ready_state_refuses_every_frame() {
    let mut state = FrameState::new(false, 1);
    assert!(!state.is_ready());
    assert!(matches!(state.begin(1), Err(FrameError::NotReady)));
    assert!(matches!(
        state.advance(FrameStage::SceneDrawn),
        Err(FrameError::NotReady)
    ));
    assert_eq!(state.stage(), FrameStage::Idle);
}

#[test]
fn invalid_targets_keep_the_renderer_uninitialized() {
    let err = validate_targets(1024, 0, 8192, Features::empty()).unwrap_err();
    assert!(matches!(err, InitError::ZeroSizedTarget));
    assert!(!err.to_string().is_empty());

    let err = validate_targets(1024, 16384, 8192, Features::empty()).unwrap_err();
    assert!(matches!(
        err,
        InitError::TargetTooLarge {
            height: 16384,
            max: 8192,
            ..
        }
    ));
}

#[test]
fn presenting_before_drawing_is_out_of_order() {
    let mut state = FrameState::new(true, 0);
    state.begin(0).unwrap();
    let err = state.advance(FrameStage::Presented).unwrap_err();
    assert!(matches!(
        err,
        FrameError::OutOfOrder {
            from: FrameStage::Idle,
            to: FrameStage::Presented
        }
    ));
}
