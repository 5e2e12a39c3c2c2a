use bytemuck::{Pod, Zeroable};

use crate::runtime::TimeSample;

/// CPU mirror of the `PreviewParams` std140 block declared by the shader prologue.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PreviewUniforms {
    pub u_resolution: [f32; 2],
    pub u_mouse: [f32; 2],
    pub u_time: f32,
    pub u_time_delta: f32,
    pub u_frame: i32,
    pub padding0: f32,
}

impl PreviewUniforms {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            u_resolution: [width as f32, height as f32],
            ..Self::zeroed()
        }
    }

    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.u_resolution = [width.max(1) as f32, height.max(1) as f32];
    }

    /// Mouse position in pixels with a bottom-left origin.
    pub fn set_mouse(&mut self, mouse: [f32; 2]) {
        self.u_mouse = mouse;
    }

    /// Advances time from a sample; the delta resets whenever the frame
    /// counter restarts.
    pub fn apply_sample(&mut self, sample: TimeSample) {
        self.u_time_delta = if sample.frame_index == 0 {
            0.0
        } else {
            (sample.seconds - self.u_time).max(0.0)
        };
        self.u_time = sample.seconds;
        self.u_frame = sample.frame_index.min(i32::MAX as u64) as i32;
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

impl Default for PreviewUniforms {
    fn default() -> Self {
        Self::new(1, 1)
    }
}
