//! Offscreen colour + depth targets that can be sampled afterwards.

use anyhow::Context;

use crate::data_structures::texture::Texture;

#[derive(Debug)]
pub struct RenderTarget {
    pub colour: Texture,
    pub depth: Texture,
    pub size: [u32; 2],
    pub format: wgpu::TextureFormat,
}

impl RenderTarget {
    pub fn new(device: &wgpu::Device, size: [u32; 2], format: wgpu::TextureFormat, label: &str) -> Self {
        let size = [size[0].max(1), size[1].max(1)];
        Self {
            colour: Texture::create_render_texture(device, size, format, label),
            depth: Texture::create_depth_texture(device, size, &format!("{label} depth")),
            size,
            format,
        }
    }

    /// Copies the colour attachment back to the CPU as RGBA8.
    ///
    /// Blocks until the GPU finished all submitted work. BGRA targets are
    /// swizzled so the image is always RGBA.
    pub async fn read_pixels(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> anyhow::Result<image::RgbaImage> {
        let [width, height] = self.size;
        let unpadded_bytes_per_row = 4 * width;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

        let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            size: (padded_bytes_per_row * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            label: Some("Readback Buffer"),
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &self.colour.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(std::iter::once(encoder.finish()));

        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        let buffer_slice = output_buffer.slice(..);
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            // The receiver only goes away when this future is dropped
            let _ = tx.send(result);
        });
        device
            .poll(wgpu::PollType::Wait)
            .context("Device lost while reading back a render target")?;
        rx.receive()
            .await
            .context("Readback callback never ran")?
            .context("Failed to map the readback buffer")?;

        let swizzle = matches!(
            self.format,
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
        );
        let mut pixels = Vec::with_capacity((unpadded_bytes_per_row * height) as usize);
        {
            let data = buffer_slice.get_mapped_range();
            for row in data.chunks(padded_bytes_per_row as usize) {
                for texel in row[..unpadded_bytes_per_row as usize].chunks_exact(4) {
                    if swizzle {
                        pixels.extend_from_slice(&[texel[2], texel[1], texel[0], texel[3]]);
                    } else {
                        pixels.extend_from_slice(texel);
                    }
                }
            }
        }
        output_buffer.unmap();

        image::RgbaImage::from_raw(width, height, pixels).context("Readback size mismatch")
    }
}
