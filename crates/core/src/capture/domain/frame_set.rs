use crate::shared::depth_frame::DepthFrame;
use crate::shared::frame::Frame;

/// What the driver delivered for one capture instant.
///
/// Either component may be missing; the synchronizer refuses to pass a
/// half-filled set downstream.
#[derive(Clone, Debug)]
pub struct FrameSet {
    pub depth: Option<DepthFrame>,
    pub color: Option<Frame>,
}

impl FrameSet {
    pub fn complete(depth: DepthFrame, color: Frame) -> Self {
        Self {
            depth: Some(depth),
            color: Some(color),
        }
    }
}

/// A complete frame set with depth re-sampled onto the color pixel grid.
#[derive(Clone, Debug)]
pub struct AlignedFrameSet {
    pub depth: DepthFrame,
    pub color: Frame,
}
