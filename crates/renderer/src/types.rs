use crate::pipeline::BuildStrategy;

/// GPU power preference requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    #[default]
    Low,
    High,
}

/// Immutable configuration passed to the preview window at start-up.
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Optional FPS cap; `None` redraws as fast as the event loop allows.
    pub target_fps: Option<f32>,
    /// Whether shader builds block the frame or run on worker threads.
    pub build_strategy: BuildStrategy,
    pub gpu_power: GpuPowerPreference,
    pub title: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            surface_size: (800, 600),
            target_fps: Some(60.0),
            build_strategy: BuildStrategy::Threaded,
            gpu_power: GpuPowerPreference::default(),
            title: "shaderbook".to_string(),
        }
    }
}

/// What we learned about the selected adapter.
#[derive(Debug, Clone)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
}

impl AdapterProfile {
    pub fn from_wgpu(info: &wgpu::AdapterInfo) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
        }
    }

    /// True for CPU rasterizers such as llvmpipe or WARP.
    pub fn is_software(&self) -> bool {
        matches!(self.device_type, wgpu::DeviceType::Cpu)
            || self.name.to_ascii_lowercase().contains("llvmpipe")
    }
}
