//! The demo scene: a cube on a floor, a point light, the texture camera with
//! its frustum helper, and the virtual screen that shows what the texture
//! camera sees.

use std::f32::consts::FRAC_PI_2;

use bitflags::bitflags;

use cgmath::{Deg, Point3, Quaternion, Rad, Rotation3, Vector3};
use wgpu::util::DeviceExt;

use crate::{
    camera::{Camera, Projection},
    controls::transform::TransformGizmo,
    data_structures::{
        geometry,
        instance::Instance,
        model::{hex_colour, Material, Model, Shading},
        texture::Texture,
    },
    pipelines::{
        light::{LightResources, LightUniform},
        line::LineVertex,
    },
    render::{Instanced, Lines, Render},
    resources::gltf_model::{load_model_gltf, ScreenMap},
    settings::{ScreenSettings, Settings},
};

/// Visibility class of a scene object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    /// Rendered by every camera.
    World,
    /// Editing aids, only rendered by the main camera.
    Helper,
}

bitflags! {
    /// The layers a camera renders.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Layers: u8 {
        const WORLD = 1 << 0;
        const HELPER = 1 << 1;
    }
}

impl From<Layer> for Layers {
    fn from(layer: Layer) -> Self {
        match layer {
            Layer::World => Layers::WORLD,
            Layer::Helper => Layers::HELPER,
        }
    }
}

pub struct SceneObject {
    pub name: String,
    pub model: Model,
    pub instance: Instance,
    pub instance_buffer: wgpu::Buffer,
    pub layer: Layer,
}

impl SceneObject {
    pub fn new(device: &wgpu::Device, name: &str, model: Model, instance: Instance, layer: Layer) -> Self {
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Instance Buffer")),
            contents: bytemuck::cast_slice(&[instance.to_raw()]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            name: name.to_string(),
            model,
            instance,
            instance_buffer,
            layer,
        }
    }

    fn render(&self) -> Render<'_> {
        Render::Default(Instanced {
            instance: &self.instance_buffer,
            model: &self.model,
        })
    }
}

/// A fixed capacity vertex buffer of line list vertices.
pub struct LineBatch {
    pub buffer: wgpu::Buffer,
    capacity: usize,
    count: u32,
    pub layer: Layer,
    /// Drawn without depth test.
    pub overlay: bool,
}

impl LineBatch {
    pub fn new(device: &wgpu::Device, label: &str, capacity: usize, layer: Layer, overlay: bool) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (capacity * std::mem::size_of::<LineVertex>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            buffer,
            capacity,
            count: 0,
            layer,
            overlay,
        }
    }

    /// Replaces the batch contents. Vertices beyond the capacity are dropped.
    pub fn write(&mut self, queue: &wgpu::Queue, vertices: &[LineVertex]) {
        if vertices.len() > self.capacity {
            log::warn!("Dropping {} line vertices over capacity", vertices.len() - self.capacity);
        }
        // Whole lines only
        let count = vertices.len().min(self.capacity) & !1;
        if count > 0 {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&vertices[..count]));
        }
        self.count = count as u32;
    }

    fn render(&self) -> Render<'_> {
        if self.count == 0 {
            return Render::None;
        }
        let lines = Lines {
            vertices: &self.buffer,
            count: self.count,
        };
        if self.overlay {
            Render::Overlay(lines)
        } else {
            Render::Lines(lines)
        }
    }
}

const FRUSTUM: [f32; 3] = [1.0, 0.67, 0.0];
const CONE: [f32; 3] = [1.0, 0.0, 0.0];
const UP: [f32; 3] = [0.0, 0.67, 1.0];

/// Wireframe of a camera's frustum: near and far rectangles, the edges
/// between them, the cone from the eye and a triangle marking up.
pub fn camera_helper_lines(camera: &Camera) -> Vec<LineVertex> {
    let [n_tl, n_tr, n_bl, n_br] = camera.frustum_corners(0.0);
    let [f_tl, f_tr, f_bl, f_br] = camera.frustum_corners(1.0);
    let eye = camera.position;
    let up = [
        camera.unproject(Vector3::new(-0.7, 1.1, 0.0)),
        camera.unproject(Vector3::new(0.7, 1.1, 0.0)),
        camera.unproject(Vector3::new(0.0, 2.0, 0.0)),
    ];

    let segments: [(Point3<f32>, Point3<f32>, [f32; 3]); 19] = [
        (n_tl, n_tr, FRUSTUM),
        (n_tr, n_br, FRUSTUM),
        (n_br, n_bl, FRUSTUM),
        (n_bl, n_tl, FRUSTUM),
        (f_tl, f_tr, FRUSTUM),
        (f_tr, f_br, FRUSTUM),
        (f_br, f_bl, FRUSTUM),
        (f_bl, f_tl, FRUSTUM),
        (n_tl, f_tl, FRUSTUM),
        (n_tr, f_tr, FRUSTUM),
        (n_bl, f_bl, FRUSTUM),
        (n_br, f_br, FRUSTUM),
        (eye, n_tl, CONE),
        (eye, n_tr, CONE),
        (eye, n_bl, CONE),
        (eye, n_br, CONE),
        (up[0], up[1], UP),
        (up[1], up[2], UP),
        (up[2], up[0], UP),
    ];
    segments
        .iter()
        .flat_map(|&(a, b, colour)| [LineVertex::new(a, colour), LineVertex::new(b, colour)])
        .collect()
}

const HELPER_VERTICES: usize = 38;
// Three rings of 48 segments
const GIZMO_VERTICES: usize = 3 * 48 * 2;

pub struct Scene {
    pub objects: Vec<SceneObject>,
    pub texture_camera: Camera,
    pub light: LightResources,
    pub helper: LineBatch,
    pub gizmo: LineBatch,
    /// (object, material) pairs that show the display target.
    display_materials: Vec<(usize, usize)>,
    display_bound: bool,
}

impl Scene {
    /// Builds the scene. The virtual screen shows `fallback` until
    /// [`Scene::show_display`] points it at the display target. `viewport`
    /// is the window size the texture camera's default aspect comes from.
    pub async fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        material_layout: &wgpu::BindGroupLayout,
        light_layout: &wgpu::BindGroupLayout,
        fallback: &Texture,
        settings: &Settings,
        viewport: [u32; 2],
    ) -> Self {
        let mut objects = Vec::new();

        let cube_material = Material::new(
            device,
            material_layout,
            "cube",
            Shading::Standard,
            hex_colour(0x00ff00),
            None,
            fallback,
        );
        objects.push(SceneObject::new(
            device,
            "cube",
            Model::single(device, "cube", &geometry::cuboid(1.0, 3.0, 1.0), cube_material),
            Instance::new(),
            Layer::World,
        ));

        let floor_material = Material::new(
            device,
            material_layout,
            "floor",
            Shading::Standard,
            hex_colour(0xadadad),
            None,
            fallback,
        );
        let floor = Instance::from(Vector3::new(0.0, -1.0, 0.0))
            .with_rotation(Quaternion::from_angle_x(Rad(-FRAC_PI_2)));
        objects.push(SceneObject::new(
            device,
            "floor",
            Model::single(device, "floor", &geometry::plane(10.0, 10.0), floor_material),
            floor,
            Layer::World,
        ));

        let mut display_materials = Vec::new();
        let screen = match &settings.screen {
            ScreenSettings::Plane => None,
            ScreenSettings::Model {
                path,
                screen_mesh,
                position,
                scale,
                rotation_y,
            } => {
                let map = ScreenMap {
                    name: screen_mesh,
                    texture: fallback,
                };
                match load_model_gltf(path, device, queue, material_layout, fallback, Some(map)).await {
                    Ok(loaded) => {
                        let instance = Instance::from(Vector3::from(*position))
                            .with_rotation(Quaternion::from_angle_y(Deg(*rotation_y)))
                            .with_uniform_scale(*scale);
                        Some((loaded, instance))
                    }
                    Err(e) => {
                        log::error!("Could not load the screen model {}: {:#}. Using a plane", path, e);
                        None
                    }
                }
            }
        };
        match screen {
            Some((loaded, instance)) => {
                if let Some(material) = loaded.screen_material {
                    display_materials.push((objects.len(), material));
                }
                objects.push(SceneObject::new(device, "tv", loaded.model, instance, Layer::World));
            }
            None => objects.push(display_plane(device, material_layout, fallback, &mut display_materials, objects.len())),
        }

        let texture_camera = Camera::new(
            (0.0, 0.0, 5.0),
            Projection::perspective(Deg(75.0), settings.texture_camera_aspect(viewport), 0.1, 1000.0),
        );

        let light = LightResources::new(
            device,
            light_layout,
            LightUniform::point(Point3::new(0.0, 2.0, 2.0), [1.0; 3], 10.0, 100.0)
                .with_ambient([1.0; 3], 0.5),
        );

        let mut helper = LineBatch::new(device, "Camera Helper", HELPER_VERTICES, Layer::Helper, false);
        helper.write(queue, &camera_helper_lines(&texture_camera));
        let gizmo = LineBatch::new(device, "Gizmo", GIZMO_VERTICES, Layer::Helper, true);

        Self {
            objects,
            texture_camera,
            light,
            helper,
            gizmo,
            display_materials,
            display_bound: false,
        }
    }

    /// Everything on `layers`, ready for batching.
    pub fn collect(&self, layers: Layers) -> Render<'_> {
        let mut renders: Vec<Render> = self
            .objects
            .iter()
            .filter(|o| layers.contains(o.layer.into()))
            .map(SceneObject::render)
            .collect();
        for batch in [&self.helper, &self.gizmo] {
            if layers.contains(batch.layer.into()) {
                renders.push(batch.render());
            }
        }
        Render::Composed(renders)
    }

    /// Rebuilds the frustum helper after the texture camera moved.
    pub fn update_helper(&mut self, queue: &wgpu::Queue) {
        let lines = camera_helper_lines(&self.texture_camera);
        self.helper.write(queue, &lines);
    }

    /// Redraws the gizmo handles around the texture camera as seen from `eye`.
    pub fn update_gizmo(&mut self, queue: &wgpu::Queue, gizmo: &TransformGizmo, eye: Point3<f32>) {
        let lines = gizmo.lines(eye, self.texture_camera.position);
        self.gizmo.write(queue, &lines);
    }

    /// Points the virtual screen at `display`. Later calls are no-ops because
    /// the display target lives as long as the scene.
    pub fn show_display(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        material_layout: &wgpu::BindGroupLayout,
        display: &Texture,
    ) {
        if self.display_bound {
            return;
        }
        for &(object, material) in &self.display_materials {
            if let Some(material) = self
                .objects
                .get_mut(object)
                .and_then(|o| o.model.materials.get_mut(material))
            {
                material.set_map(device, queue, material_layout, display);
            }
        }
        self.display_bound = true;
    }
}

fn display_plane(
    device: &wgpu::Device,
    material_layout: &wgpu::BindGroupLayout,
    fallback: &Texture,
    display_materials: &mut Vec<(usize, usize)>,
    index: usize,
) -> SceneObject {
    let material = Material::new(
        device,
        material_layout,
        "display",
        Shading::Basic,
        [1.0; 4],
        Some(fallback),
        fallback,
    );
    display_materials.push((index, 0));
    SceneObject::new(
        device,
        "display",
        Model::single(device, "display", &geometry::plane(1.0, 1.0), material),
        Instance::from(Vector3::new(2.0, 0.0, 0.0)),
        Layer::World,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layers_filter_helpers() {
        assert!(Layers::WORLD.contains(Layer::World.into()));
        assert!(!Layers::WORLD.contains(Layer::Helper.into()));
        assert!(Layers::all().contains(Layer::Helper.into()));
        assert_eq!(Layers::WORLD | Layers::HELPER, Layers::all());
        assert!(!Layers::empty().contains(Layer::World.into()));
    }

    #[test]
    fn camera_helper_outlines_the_frustum() {
        let camera = Camera::new(
            (0.0, 0.0, 5.0),
            Projection::perspective(Deg(75.0), 1.0, 0.1, 1000.0),
        );
        let lines = camera_helper_lines(&camera);
        assert_eq!(lines.len(), HELPER_VERTICES);

        // The cone starts at the eye
        assert!(lines.iter().any(|v| v.position == [0.0, 0.0, 5.0]));
        // The far rectangle sits at the far plane
        let far = lines.iter().map(|v| v.position[2]).fold(f32::MAX, f32::min);
        assert!((far - (5.0 - 1000.0)).abs() < 10.0, "far plane at {far}");
    }

    #[test]
    fn gizmo_capacity_fits_the_largest_gizmo() {
        let gizmo = TransformGizmo::new(crate::controls::transform::GizmoMode::Rotate);
        let lines = gizmo.lines(Point3::new(0.0, 0.0, 10.0), Point3::new(0.0, 0.0, 0.0));
        assert!(lines.len() <= GIZMO_VERTICES);
    }
}
