//! Application event loop.
//!
//! Start-up is asynchronous because the settings and the optional screen
//! model load through the asset loader. Natively a tokio runtime blocks on
//! the start-up future inside `resumed`. On the web the future is spawned and
//! the finished [`AppState`] comes back as a [`FlowEvent::Initialized`] user
//! event.
//!
//! # Lifecycle
//!
//! 1. `resumed` creates the window and starts loading
//! 2. window events go to the demo's controls
//! 3. every `RedrawRequested` updates the controls, renders the three passes,
//!    presents and requests the next redraw

use std::{fmt::Debug, sync::Arc};

use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use crate::{
    context::Context,
    controls::transform::GizmoMode,
    demo::Demo,
    settings::{Settings, SETTINGS_FILE},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{prelude::*, JsCast};

/// GPU context and the demo running on it.
pub struct AppState {
    pub(crate) ctx: Context,
    demo: Demo,
    is_surface_configured: bool,
}

impl AppState {
    async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let settings = Settings::load(SETTINGS_FILE).await?;
        window.set_title(&settings.title);
        let ctx = Context::new(window).await?;
        let demo = Demo::new(
            &ctx.device,
            &ctx.queue,
            ctx.config.format,
            [ctx.config.width, ctx.config.height],
            settings,
        )
        .await;
        Ok(Self {
            ctx,
            demo,
            is_surface_configured: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.ctx.resize(width, height);
            self.demo.resize(width, height);
            self.is_surface_configured = true;
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.ctx.window.request_redraw();

        if !self.is_surface_configured {
            return Ok(());
        }
        self.demo.update(&self.ctx.queue);
        self.demo.render(&self.ctx)
    }
}

pub(crate) enum FlowEvent {
    /// Start-up finished on the web.
    #[allow(dead_code)]
    Initialized(Box<anyhow::Result<AppState>>),
    /// A mode button was clicked.
    #[allow(dead_code)]
    Mode(GizmoMode),
}

impl Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(result) => f
                .debug_tuple("Initialized")
                .field(&result.as_ref().as_ref().map(|_| "AppState"))
                .finish(),
            Self::Mode(mode) => f.debug_tuple("Mode").field(mode).finish(),
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[allow(dead_code)]
    proxy: EventLoopProxy<FlowEvent>,
    state: Option<AppState>,
    started: bool,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(event_loop: &EventLoop<FlowEvent>) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            state: None,
            started: false,
            error: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("Start-up failed: {:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    fn initialized(&mut self, event_loop: &ActiveEventLoop, result: anyhow::Result<AppState>) {
        match result {
            Ok(mut state) => {
                let size = state.ctx.window.inner_size();
                state.resize(size.width, size.height);
                state.ctx.window.request_redraw();
                #[cfg(target_arch = "wasm32")]
                bind_mode_buttons(&self.proxy);
                self.state = Some(state);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.started {
            return;
        }
        self.started = true;

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes();

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;

            match canvas() {
                Ok(canvas) => window_attributes = window_attributes.with_canvas(Some(canvas)),
                Err(e) => return self.fail(event_loop, e),
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            let result = self.async_runtime.block_on(AppState::new(window));
            self.initialized(event_loop, result);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let result = AppState::new(window).await;
                if proxy
                    .send_event(FlowEvent::Initialized(Box::new(result)))
                    .is_err()
                {
                    log::error!("Event loop closed before start-up finished");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            FlowEvent::Initialized(result) => self.initialized(event_loop, *result),
            FlowEvent::Mode(mode) => {
                if let Some(state) = &mut self.state {
                    state.demo.set_gizmo_mode(&state.ctx.queue, mode);
                }
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        state.demo.window_event(&state.ctx.queue, &event);

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => match state.render() {
                Ok(()) => {}
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    let size = state.ctx.window.inner_size();
                    state.resize(size.width, size.height);
                }
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    log::error!("Out of memory, exiting");
                    event_loop.exit();
                }
                Err(e) => {
                    log::error!("Unable to render {}", e);
                }
            },
            _ => {}
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn canvas() -> anyhow::Result<web_sys::HtmlCanvasElement> {
    use anyhow::Context as _;

    const CANVAS_ID: &str = "canvas";

    let document = web_sys::window()
        .and_then(|window| window.document())
        .context("No document")?;
    let canvas = document
        .get_element_by_id(CANVAS_ID)
        .with_context(|| format!("No element with id {CANVAS_ID}"))?;
    canvas
        .dyn_into()
        .map_err(|_| anyhow::anyhow!("#{CANVAS_ID} is not a canvas"))
}

/// Hooks the `#rotatebtn` and `#translatebtn` buttons up to the gizmo mode.
#[cfg(target_arch = "wasm32")]
fn bind_mode_buttons(proxy: &EventLoopProxy<FlowEvent>) {
    let Some(document) = web_sys::window().and_then(|window| window.document()) else {
        return;
    };
    for (id, mode) in [("rotatebtn", GizmoMode::Rotate), ("translatebtn", GizmoMode::Translate)] {
        let Some(button) = document.get_element_by_id(id) else {
            log::warn!("No #{} button, use the R and T keys", id);
            continue;
        };
        let proxy = proxy.clone();
        let on_click = Closure::<dyn FnMut()>::new(move || {
            if proxy.send_event(FlowEvent::Mode(mode)).is_err() {
                log::warn!("Event loop closed, ignoring {:?}", mode);
            }
        });
        if let Err(e) = button.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref()) {
            log::error!("Could not listen to #{}: {:?}", id, e);
        }
        // The page owns the listener from here on
        on_click.forget();
    }
}

/// Runs the demo until the window closes. Returns the start-up error, if any.
pub fn run() -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info)?;
    }

    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop)?;
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
