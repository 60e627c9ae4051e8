use skinpost_ngin::{
    config::{POST_PASSES, RendererConfig},
    post_process::{BlurAxis, PingPong, blur_schedule},
    render::{FrameStage, FrameState},
};

#[test]
fn two_iterations_draw_four_quads() {
    let passes = blur_schedule(2);
    assert_eq!(passes.len(), 4);
    assert_eq!(
        passes.iter().filter(|p| p.axis == BlurAxis::Horizontal).count(),
        2
    );
    assert_eq!(passes.first().map(|p| p.source), Some(0));
    assert_eq!(passes.last().map(|p| p.target), Some(0));
    for pair in passes.windows(2) {
        assert_eq!(pair[0].target, pair[1].source);
    }
}

#[test]
fn buffer_zero_holds_the_image_after_any_pass_count() {
    for iterations in [0, 1, 2, 3, POST_PASSES] {
        let mut buffers = PingPong::new("scene", "scratch");
        for pass in blur_schedule(iterations) {
            buffers.apply(&pass);
        }
        assert_eq!(*buffers.current(), "scene", "{iterations} iterations");
    }
}

#[test]
fn frame_stages_follow_the_blur_schedule() {
    let config = RendererConfig::default().with_post_passes(2);
    let mut state = FrameState::new(true, config.post_passes);
    state.begin(config.post_passes).unwrap();
    state.advance(FrameStage::SceneDrawn).unwrap();
    for pass in blur_schedule(config.post_passes) {
        if pass.axis.is_vertical() {
            state.advance(FrameStage::Blurred(pass.iteration + 1)).unwrap();
        }
    }
    assert_eq!(state.stage(), FrameStage::Blurred(2));
    state.advance(FrameStage::Presented).unwrap();
    state.advance(FrameStage::Idle).unwrap();
}

#[test]
fn default_pass_count() {
    assert_eq!(RendererConfig::default().post_passes, POST_PASSES);
}
