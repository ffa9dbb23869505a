#[cfg(feature = "integration-tests")]
use crate::common::test_utils::{Harness, SIZE};

#[cfg(feature = "integration-tests")]
mod common;

#[cfg(feature = "integration-tests")]
fn tv_settings(path: &str) -> telecam::settings::Settings {
    telecam::settings::Settings {
        screen: telecam::settings::ScreenSettings::Model {
            path: path.to_string(),
            screen_mesh: "screen".to_string(),
            position: [2.0, 0.0, 0.0],
            scale: 1.0,
            rotation_y: 0.0,
        },
        ..Default::default()
    }
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_give_the_screen_mesh_its_own_unlit_material() {
    use telecam::{data_structures::model::Shading, resources::gltf_model::{load_model_gltf, ScreenMap}};

    let harness = Harness::new(wgpu::Color::BLACK);
    let pipelines = &harness.renderer.pipelines;
    let screen = ScreenMap {
        name: "screen",
        texture: &harness.renderer.display.colour,
    };
    let loaded = harness
        .runtime
        .block_on(load_model_gltf(
            "models/tv.gltf",
            &harness.device,
            &harness.queue,
            &pipelines.material_layout,
            &harness.renderer.fallback,
            Some(screen),
        ))
        .expect("failed to load the tv");

    let screen_material = loaded.screen_material.expect("no screen material");
    assert_eq!(loaded.model.materials[screen_material].shading, Shading::Basic);
    // One mesh shows the screen, the casing keeps its own material
    let on_screen = loaded
        .model
        .meshes
        .iter()
        .filter(|m| m.material == screen_material)
        .count();
    assert_eq!(on_screen, 1);
    assert_eq!(loaded.model.meshes.len(), 2);
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_leave_the_screen_material_out_without_a_matching_mesh() {
    use telecam::resources::gltf_model::{load_model_gltf, ScreenMap};

    let harness = Harness::new(wgpu::Color::BLACK);
    let screen = ScreenMap {
        name: "hologram",
        texture: &harness.renderer.display.colour,
    };
    let loaded = harness
        .runtime
        .block_on(load_model_gltf(
            "models/tv.gltf",
            &harness.device,
            &harness.queue,
            &harness.renderer.pipelines.material_layout,
            &harness.renderer.fallback,
            Some(screen),
        ))
        .expect("failed to load the tv");

    assert_eq!(loaded.screen_material, None);
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_fall_back_to_the_plane_when_the_model_is_missing() {
    let harness = Harness::with_settings(wgpu::Color::BLACK, tv_settings("models/missing.gltf"));
    let names: Vec<&str> = harness.scene.objects.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, ["cube", "floor", "display"]);
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_show_the_display_on_the_tv_screen() {
    use telecam::camera::{Camera, Projection};

    let mut harness = Harness::with_settings(wgpu::Color::BLACK, tv_settings("models/tv.gltf"));
    assert!(harness.scene.objects.iter().any(|o| o.name == "tv"));
    // Straight in front of the screen at x = 2
    harness.camera = Camera::new(
        (2.0, 0.0, 1.0),
        Projection::perspective(cgmath::Deg(75.0), 1.0, 0.1, 1000.0),
    );
    harness.render_frame(false);
    harness.render_frame(false);

    let display = harness.read(&harness.renderer.display);
    let window = harness.read(&harness.window);
    let centre = SIZE / 2;
    let expected = display.get_pixel(centre, centre);
    let actual = window.get_pixel(centre, centre);
    assert!(expected[1] > 0, "the texture camera sees no cube");
    for channel in 0..4 {
        let diff = (actual[channel] as i16 - expected[channel] as i16).abs();
        assert!(diff <= 2, "{actual:?} != {expected:?}");
    }
}
