/// Camera state the host exposes to passes for one frame.
///
/// Only the clip planes reach the pipeline; the host keeps the transform and
/// projection, since culling and drawing happen on its side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub near_clip: f32,
    pub far_clip: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            near_clip: 0.3,
            far_clip: 1000.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clip_planes(mut self, near: f32, far: f32) -> Self {
        self.near_clip = near;
        self.far_clip = far;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_planes_replace_the_defaults() {
        let camera = Camera::new().with_clip_planes(0.1, 42.0);
        assert_eq!(camera.near_clip, 0.1);
        assert_eq!(camera.far_clip, 42.0);
        assert_eq!(Camera::default().far_clip, 1000.0);
    }
}
