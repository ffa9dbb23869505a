//! Render composition, pipeline batching and the per-frame pass order.
//!
//! Scene objects describe themselves as a [`Render`]. The renderer sorts
//! renders into batches per pipeline and draws them into a [`Target`]. A
//! frame is three passes recorded into one encoder:
//!
//! 1. the scene seen by the texture camera into the `source` target,
//!    without helpers
//! 2. the screen quad showing `source` into the `display` target, plain or
//!    through the CRT effect
//! 3. the scene seen by the main camera into the window, helpers included
//!
//! Between 2 and 3 the virtual screen's material is pointed at `display`.

use cgmath::Deg;
use wgpu::util::DeviceExt;

use crate::{
    camera::{Camera, CameraResources, Projection},
    data_structures::{
        geometry,
        instance::Instance,
        model::{DrawModel, Material, Model, Shading},
        texture::Texture,
    },
    pipelines::{
        crt::{CrtResources, CrtUniform},
        Pipelines,
    },
    render_target::RenderTarget,
    scene::{Layers, Scene},
};

/// A model drawn once with the transform in `instance`.
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub model: &'a Model,
}

/// A line list in world space.
pub struct Lines<'a> {
    pub vertices: &'a wgpu::Buffer,
    pub count: u32,
}

/// Specifies how a scene object should be rendered.
///
/// # Variants
///
/// - `None` renders nothing
/// - `Default(Instanced)` renders a single model with its materials' pipelines
/// - `Lines(Lines)` renders depth tested lines
/// - `Overlay(Lines)` renders lines on top of everything
/// - `Composed(Vec<Render>)` recursively renders a composition of renders
pub enum Render<'a> {
    None,
    Default(Instanced<'a>),
    Lines(Lines<'a>),
    Overlay(Lines<'a>),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    pub(crate) fn set_pipelines(
        self,
        models: &mut Vec<Instanced<'a>>,
        lines: &mut Vec<Lines<'a>>,
        overlays: &mut Vec<Lines<'a>>,
    ) {
        match self {
            Render::Default(instanced) => models.push(instanced),
            Render::Lines(l) => lines.push(l),
            Render::Overlay(l) => overlays.push(l),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.set_pipelines(models, lines, overlays)),
            Render::None => (),
        }
    }
}

/// Colour and depth attachments of one pass.
#[derive(Clone, Copy)]
pub struct Target<'a> {
    pub colour: &'a wgpu::TextureView,
    pub depth: &'a wgpu::TextureView,
}

impl<'a> From<&'a RenderTarget> for Target<'a> {
    fn from(target: &'a RenderTarget) -> Self {
        Self {
            colour: &target.colour.view,
            depth: &target.depth.view,
        }
    }
}

/// The quad that copies `source` into `display`, seen by an orthographic
/// camera.
struct ScreenPass {
    camera_resources: CameraResources,
    quad: Model,
    instance_buffer: wgpu::Buffer,
}

pub struct Renderer {
    pub pipelines: Pipelines,
    /// Bound by materials without a map.
    pub fallback: Texture,
    pub source: RenderTarget,
    pub display: RenderTarget,
    pub main_camera: CameraResources,
    pub texture_camera: CameraResources,
    pub crt: CrtResources,
    pub clear_colour: wgpu::Color,
    screen: ScreenPass,
}

impl Renderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        target_size: u32,
        clear_colour: wgpu::Color,
    ) -> Self {
        let pipelines = Pipelines::new(device, format);
        let fallback = Texture::create_solid(device, queue, [255; 4], "fallback texture");
        let target_size = fit_target_size(target_size, device.limits().max_texture_dimension_2d);
        let size = [target_size, target_size];
        let source = RenderTarget::new(device, size, format, "source target");
        let display = RenderTarget::new(device, size, format, "display target");

        let placeholder = Camera::new((0.0, 0.0, 5.0), Projection::perspective(Deg(75.0), 1.0, 0.1, 1000.0));
        let main_camera = CameraResources::new(device, &pipelines.camera_layout, &placeholder, "main_camera");
        let texture_camera =
            CameraResources::new(device, &pipelines.camera_layout, &placeholder, "texture_camera");

        let screen_camera = Camera::new(
            (0.0, 0.0, 1.0),
            Projection::orthographic(-1.0, 1.0, 1.0, -1.0, 0.1, 10.0),
        );
        let screen_camera_resources =
            CameraResources::new(device, &pipelines.camera_layout, &screen_camera, "screen_camera");
        let quad_material = Material::new(
            device,
            &pipelines.material_layout,
            "screen quad",
            Shading::Basic,
            [1.0; 4],
            Some(&source.colour),
            &fallback,
        );
        let quad = Model::single(device, "screen quad", &geometry::plane(2.0, 2.0), quad_material);
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Screen Quad Instance Buffer"),
            contents: bytemuck::cast_slice(&[Instance::new().to_raw()]),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let crt = CrtResources::new(device, &pipelines.crt_layout, CrtUniform::new(size));

        Self {
            pipelines,
            fallback,
            source,
            display,
            main_camera,
            texture_camera,
            crt,
            clear_colour,
            screen: ScreenPass {
                camera_resources: screen_camera_resources,
                quad,
                instance_buffer,
            },
        }
    }

    /// Draws everything in `scene` on the given layers as seen through
    /// `camera`.
    pub fn render_scene(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: Target<'_>,
        camera: &CameraResources,
        scene: &Scene,
        layers: Layers,
    ) {
        let mut models = Vec::new();
        let mut lines = Vec::new();
        let mut overlays = Vec::new();
        scene
            .collect(layers)
            .set_pipelines(&mut models, &mut lines, &mut overlays);

        let mut render_pass = self.begin_pass(encoder, target, "Scene Render Pass");

        let mut current = None;
        for instanced in &models {
            for mesh in &instanced.model.meshes {
                let Some(material) = instanced.model.materials.get(mesh.material) else {
                    log::warn!("Mesh {} references a missing material", mesh.name);
                    continue;
                };
                if current != Some(material.shading) {
                    render_pass.set_pipeline(self.pipelines.for_shading(material.shading));
                    current = Some(material.shading);
                }
                render_pass.draw_mesh(
                    mesh,
                    material,
                    instanced.instance,
                    &camera.bind_group,
                    &scene.light.bind_group,
                );
            }
        }

        for (pipeline, batch) in [(&self.pipelines.lines, &lines), (&self.pipelines.overlay_lines, &overlays)] {
            if batch.is_empty() {
                continue;
            }
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, &camera.bind_group, &[]);
            for l in batch {
                render_pass.set_vertex_buffer(0, l.vertices.slice(..));
                render_pass.draw(0..l.count, 0..1);
            }
        }
    }

    /// Copies `source` into `display`, through the CRT effect if `crt` is set.
    pub fn render_screen(&self, encoder: &mut wgpu::CommandEncoder, crt: bool) {
        let mut render_pass = self.begin_pass(encoder, (&self.display).into(), "Screen Render Pass");
        // The basic pipeline has no group 2, so the CRT group is ignored
        let pipeline = if crt {
            &self.pipelines.crt
        } else {
            &self.pipelines.basic
        };
        render_pass.set_pipeline(pipeline);
        let screen = &self.screen;
        for mesh in &screen.quad.meshes {
            render_pass.draw_mesh(
                mesh,
                &screen.quad.materials[mesh.material],
                &screen.instance_buffer,
                &screen.camera_resources.bind_group,
                &self.crt.bind_group,
            );
        }
    }

    /// Records and submits one frame into `surface`.
    #[allow(clippy::too_many_arguments)]
    pub fn render_frame(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface: Target<'_>,
        scene: &mut Scene,
        main_camera: &Camera,
        crt: bool,
        time: f32,
    ) {
        self.main_camera.write(queue, main_camera);
        self.texture_camera.write(queue, &scene.texture_camera);
        if crt {
            self.crt.update(queue, time);
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });

        self.render_scene(
            &mut encoder,
            (&self.source).into(),
            &self.texture_camera,
            scene,
            Layers::WORLD,
        );
        self.render_screen(&mut encoder, crt);
        scene.show_display(device, queue, &self.pipelines.material_layout, &self.display.colour);
        self.render_scene(&mut encoder, surface, &self.main_camera, scene, Layers::all());

        queue.submit(std::iter::once(encoder.finish()));
    }

    fn begin_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        target: Target<'_>,
        label: &str,
    ) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.colour,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_colour),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: target.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        })
    }
}

/// Clamps the requested offscreen target size to what the device can create.
pub(crate) fn fit_target_size(requested: u32, max_dimension: u32) -> u32 {
    if requested > max_dimension {
        log::warn!(
            "render_target_size {} exceeds the device limit, using {}",
            requested,
            max_dimension
        );
    }
    requested.clamp(1, max_dimension.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_size_is_clamped_to_the_device_limit() {
        let webgl2 = wgpu::Limits::downlevel_webgl2_defaults().max_texture_dimension_2d;
        assert_eq!(fit_target_size(65536, webgl2), webgl2);
        assert_eq!(fit_target_size(65536, wgpu::Limits::default().max_texture_dimension_2d), 8192);
        assert_eq!(fit_target_size(512, webgl2), 512);
        assert_eq!(fit_target_size(0, webgl2), 1);
    }
}
