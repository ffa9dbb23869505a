use cgmath::Deg;
use telecam::{
    camera::{Camera, Projection},
    context::headless_device,
    render::Renderer,
    render_target::RenderTarget,
    scene::Scene,
    settings::Settings,
};

/// Linear colour format, so clear colours come back unchanged.
pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const SIZE: u32 = 64;

pub struct Harness {
    pub runtime: tokio::runtime::Runtime,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub renderer: Renderer,
    pub scene: Scene,
    pub camera: Camera,
    /// Stands in for the window surface.
    pub window: RenderTarget,
}

impl Harness {
    pub fn new(clear_colour: wgpu::Color) -> Self {
        Self::with_settings(clear_colour, Settings::default())
    }

    pub fn with_settings(clear_colour: wgpu::Color, settings: Settings) -> Self {
        let runtime = tokio::runtime::Runtime::new().expect("Failed to start a runtime");
        let (device, queue) = runtime
            .block_on(headless_device())
            .expect("No GPU available for integration tests");
        let renderer = Renderer::new(&device, &queue, FORMAT, SIZE, clear_colour);
        let scene = runtime.block_on(Scene::new(
            &device,
            &queue,
            &renderer.pipelines.material_layout,
            &renderer.pipelines.light_layout,
            &renderer.fallback,
            &settings,
            [SIZE, SIZE],
        ));
        let camera = Camera::new(
            (0.0, 0.0, 5.0),
            Projection::perspective(Deg(75.0), 1.0, 0.1, 1000.0),
        );
        let window = RenderTarget::new(&device, [SIZE, SIZE], FORMAT, "test window");
        Self {
            runtime,
            device,
            queue,
            renderer,
            scene,
            camera,
            window,
        }
    }

    /// Removes every object and helper line.
    pub fn empty_scene(&mut self) {
        self.scene.objects.clear();
        self.scene.helper.write(&self.queue, &[]);
    }

    pub fn render_frame(&mut self, crt: bool) {
        self.renderer.render_frame(
            &self.device,
            &self.queue,
            (&self.window).into(),
            &mut self.scene,
            &self.camera,
            crt,
            0.0,
        );
    }

    pub fn read(&self, target: &RenderTarget) -> image::RgbaImage {
        self.runtime
            .block_on(target.read_pixels(&self.device, &self.queue))
            .expect("Failed to read back a render target")
    }
}

pub fn to_rgba(colour: wgpu::Color) -> image::Rgba<u8> {
    let f_to_u8 = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    image::Rgba([
        f_to_u8(colour.r),
        f_to_u8(colour.g),
        f_to_u8(colour.b),
        f_to_u8(colour.a),
    ])
}
