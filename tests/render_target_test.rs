#[cfg(feature = "integration-tests")]
use crate::common::test_utils::{to_rgba, Harness, SIZE};

#[cfg(feature = "integration-tests")]
mod common;

#[test]
#[cfg(feature = "integration-tests")]
fn should_clear_every_target_for_an_empty_scene() {
    let clear = wgpu::Color {
        r: 1.0,
        g: 0.0,
        b: 1.0,
        a: 1.0,
    };
    let mut harness = Harness::new(clear);
    harness.empty_scene();
    harness.render_frame(false);

    let desired_pixel = to_rgba(clear);
    for (name, target) in [
        ("source", &harness.renderer.source),
        ("display", &harness.renderer.display),
        ("window", &harness.window),
    ] {
        let image = harness.read(target);
        assert_eq!(image.dimensions(), (SIZE, SIZE));
        for (x, y, pixel) in image.enumerate_pixels() {
            assert_eq!(*pixel, desired_pixel, "{name} differs at ({x}, {y})");
        }
    }
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_copy_the_source_target_into_the_display_target() {
    let mut harness = Harness::new(wgpu::Color::BLACK);
    harness.render_frame(false);

    let source = harness.read(&harness.renderer.source);
    let display = harness.read(&harness.renderer.display);

    // The cube is in front of the texture camera
    assert!(source.pixels().any(|p| p[1] > 0), "source is empty");
    for (x, y, expected) in source.enumerate_pixels() {
        let actual = display.get_pixel(x, y);
        for channel in 0..4 {
            let diff = (actual[channel] as i16 - expected[channel] as i16).abs();
            assert!(diff <= 1, "pixel mismatch at ({x}, {y}): {actual:?} != {expected:?}");
        }
    }
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_curve_the_picture_through_the_crt_effect() {
    let mut harness = Harness::new(wgpu::Color::WHITE);
    harness.empty_scene();
    harness.render_frame(true);

    let display = harness.read(&harness.renderer.display);
    // Barrel distortion pushes the corners off the picture
    assert_eq!(*display.get_pixel(0, 0), image::Rgba([0, 0, 0, 255]));
    let centre = display.get_pixel(SIZE / 2, SIZE / 2);
    assert!(centre[0] > 100, "centre is dark: {centre:?}");
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_show_the_display_on_the_virtual_screen() {
    use telecam::camera::{Camera, Projection};

    let mut harness = Harness::new(wgpu::Color::BLACK);
    // Straight in front of the display plane at x = 2
    harness.camera = Camera::new(
        (2.0, 0.0, 1.0),
        Projection::perspective(cgmath::Deg(75.0), 1.0, 0.1, 1000.0),
    );
    // The second frame finds the display already bound
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
