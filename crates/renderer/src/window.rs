use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use anyhow::{anyhow, Result};
use bus::NotificationBus;
use crossbeam_channel::{bounded, Sender};
use tracing::{debug, error, info, warn};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use winit::window::{Window, WindowBuilder};

use crate::gpu::{GpuContext, GpuProgramBuilder, ProgramLayouts, SurfaceSink};
use crate::pipeline::{CompilePipeline, PipelineInput};
use crate::preview::PreviewRenderer;
use crate::runtime::{FrameScheduler, SystemTimeSource, TimeSource};
use crate::types::PreviewConfig;

const SOFTWARE_FPS_CAP: f32 = 15.0;

type WindowRenderer = PreviewRenderer<GpuProgramBuilder, SurfaceSink>;

/// Everything the event loop owns. The renderer is declared first so the
/// surface drops before the window it was created from.
struct WindowState {
    renderer: WindowRenderer,
    window: Arc<Window>,
}

#[derive(Debug, Clone)]
enum WindowCommand {
    SetTitle(String),
    Shutdown,
}

/// Preview window running its winit event loop on a dedicated thread.
///
/// The window's frame timeline owns the compile pipeline; callers only feed it
/// through the shared [`PipelineInput`] and hear back over the bus.
pub struct PreviewWindow {
    proxy: EventLoopProxy<WindowCommand>,
    join_handle: Option<JoinHandle<Result<()>>>,
}

impl PreviewWindow {
    pub fn spawn(config: PreviewConfig, input: PipelineInput, bus: NotificationBus) -> Result<Self> {
        let (ready_tx, ready_rx) = bounded(1);
        let handle = thread::Builder::new()
            .name("shaderbook-window".into())
            .spawn(move || run_window_thread(config, input, bus, ready_tx))
            .map_err(|err| anyhow!("failed to spawn window thread: {err}"))?;

        let proxy = ready_rx
            .recv()
            .map_err(|err| anyhow!("window thread failed to initialise: {err}"))??;

        Ok(Self {
            proxy,
            join_handle: Some(handle),
        })
    }

    pub fn set_title(&self, title: impl Into<String>) -> Result<()> {
        self.proxy
            .send_event(WindowCommand::SetTitle(title.into()))
            .map_err(|err| anyhow!("preview window is gone: {err}"))
    }

    /// False once the user closed the window or the event loop exited.
    pub fn is_running(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn shutdown(mut self) -> Result<()> {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.proxy.send_event(WindowCommand::Shutdown);
            handle
                .join()
                .map_err(|err| anyhow!("window thread panicked: {err:?}"))??;
        }
        Ok(())
    }
}

impl Drop for PreviewWindow {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.proxy.send_event(WindowCommand::Shutdown);
            let _ = handle.join();
        }
    }
}

fn run_window_thread(
    config: PreviewConfig,
    input: PipelineInput,
    bus: NotificationBus,
    ready_tx: Sender<Result<EventLoopProxy<WindowCommand>>>,
) -> Result<()> {
    let mut builder = EventLoopBuilder::<WindowCommand>::with_user_event();
    #[cfg(any(target_os = "linux", target_os = "android"))]
    {
        use winit::platform::wayland::EventLoopBuilderExtWayland;
        EventLoopBuilderExtWayland::with_any_thread(&mut builder, true);
    }

    #[cfg(any(
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonfly"
    ))]
    {
        use winit::platform::x11::EventLoopBuilderExtX11;
        EventLoopBuilderExtX11::with_any_thread(&mut builder, true);
    }

    let event_loop = match builder.build() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            let message = format!("failed to create event loop: {err}");
            let _ = ready_tx.send(Err(anyhow!(message.clone())));
            return Err(anyhow!(message));
        }
    };
    let proxy = event_loop.create_proxy();

    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title(config.title.clone())
        .with_inner_size(window_size)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create preview window: {err}"));
    let window = match window {
        Ok(window) => Arc::new(window),
        Err(err) => {
            let _ = ready_tx.send(Err(anyhow!(err.to_string())));
            return Err(err);
        }
    };

    let mut state = match WindowState::new(window, &config, input, bus) {
        Ok(state) => state,
        Err(err) => {
            let wrapped = anyhow!("failed to initialise preview renderer: {err}");
            let _ = ready_tx.send(Err(anyhow!(wrapped.to_string())));
            return Err(wrapped);
        }
    };

    let profile = state.renderer.sink().context().adapter_profile.clone();
    let mut target_fps = config.target_fps;
    if profile.is_software() && target_fps.is_none() {
        warn!(
            adapter = %profile.name,
            backend = ?profile.backend,
            cap = SOFTWARE_FPS_CAP,
            "software rasterizer detected; capping preview frame rate (override with --fps)"
        );
        target_fps = Some(SOFTWARE_FPS_CAP);
    }

    let mut scheduler = FrameScheduler::new(target_fps);
    let mut clock = SystemTimeSource::new();
    let mut mouse = MouseState::default();
    state.window.request_redraw();

    let _ = ready_tx.send(Ok(proxy));
    info!(strategy = ?config.build_strategy, fps = ?target_fps, "preview window ready");

    let run_result = event_loop.run(move |event, elwt| match event {
        Event::UserEvent(WindowCommand::SetTitle(title)) => state.window.set_title(&title),
        Event::UserEvent(WindowCommand::Shutdown) => elwt.exit(),
        Event::WindowEvent { window_id, event } if window_id == state.window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                info!("preview window closed");
                elwt.exit();
            }
            WindowEvent::CursorMoved { position, .. } => mouse.handle_cursor_moved(position),
            WindowEvent::MouseInput {
                state: button_state,
                button: MouseButton::Left,
                ..
            } => mouse.handle_button(button_state),
            WindowEvent::Resized(new_size) => state.renderer.sink_mut().resize(new_size),
            WindowEvent::RedrawRequested => {
                let height = state.window.inner_size().height.max(1) as f32;
                match state.renderer.tick(clock.sample(), mouse.as_uniform(height)) {
                    Ok(report) => {
                        scheduler.mark_rendered(Instant::now());
                        if let Some(outcome) = report.outcome {
                            debug!(?outcome, delivered = report.delivered, "published compile outcome");
                        }
                    }
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        state.renderer.sink_mut().reconfigure();
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        error!("surface out of memory; closing preview");
                        elwt.exit();
                    }
                    Err(other) => {
                        warn!(error = ?other, "surface error; retrying next frame");
                    }
                }
            }
            _ => {}
        },
        Event::AboutToWait => {
            let now = Instant::now();
            if scheduler.ready_for_frame(now) {
                state.window.request_redraw();
                elwt.set_control_flow(ControlFlow::Wait);
            } else if let Some(deadline) = scheduler.next_deadline() {
                elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
            } else {
                elwt.set_control_flow(ControlFlow::Wait);
            }
        }
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}

impl WindowState {
    fn new(
        window: Arc<Window>,
        config: &PreviewConfig,
        input: PipelineInput,
        bus: NotificationBus,
    ) -> Result<Self> {
        let context = GpuContext::new(window.as_ref(), window.inner_size(), config.gpu_power)?;
        let layouts = ProgramLayouts::new(&context.device);
        let builder =
            GpuProgramBuilder::new(context.device.clone(), layouts.clone(), context.surface_format);
        let sink = SurfaceSink::new(context, &layouts);
        let pipeline = CompilePipeline::with_strategy(builder, input, config.build_strategy);

        Ok(Self {
            renderer: PreviewRenderer::new(pipeline, sink, bus),
            window,
        })
    }
}

/// Tracks the cursor while the left button is held, matching the
/// click-and-drag convention of web shader playgrounds.
#[derive(Default)]
struct MouseState {
    position: Option<PhysicalPosition<f64>>,
    is_pressed: bool,
    last_drag: Option<PhysicalPosition<f64>>,
}

impl MouseState {
    fn handle_cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        self.position = Some(position);
        if self.is_pressed {
            self.last_drag = Some(position);
        }
    }

    fn handle_button(&mut self, state: ElementState) {
        self.is_pressed = state == ElementState::Pressed;
        if self.is_pressed {
            self.last_drag = self.position;
        }
    }

    /// Pixel coordinates with a bottom-left origin.
    fn as_uniform(&self, height: f32) -> [f32; 2] {
        match self.last_drag.or(self.position) {
            Some(pos) => [pos.x as f32, height - pos.y as f32],
            None => [0.0, 0.0],
        }
    }
}
