use std::{collections::HashMap, fs, path::Path};

use ab_glyph::{Font, FontArc, Glyph, ScaleFont};
use anyhow::{anyhow, Context, Result};
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;
use wgpu::{
    vertex_attr_array, AddressMode, BindGroup, BindGroupDescriptor, BindGroupEntry,
    BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingResource,
    BindingType, Buffer, BufferBindingType, BufferUsages, ColorTargetState, ColorWrites,
    CommandEncoderDescriptor, CompositeAlphaMode, DeviceDescriptor, Extent3d, FilterMode,
    FragmentState, Instance, LoadOp, MultisampleState, Operations, Origin3d,
    PipelineLayoutDescriptor, PresentMode, PrimitiveState, RenderPassColorAttachment,
    RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor, RequestAdapterOptions,
    Sampler, SamplerBindingType, SamplerDescriptor, ShaderModuleDescriptor, ShaderSource,
    SurfaceConfiguration, TexelCopyBufferLayout, TexelCopyTextureInfo, Texture, TextureAspect,
    TextureDescriptor, TextureDimension, TextureFormat, TextureSampleType, TextureUsages,
    TextureViewDescriptor, TextureViewDimension, VertexState,
};
use winit::window::Window;

use crate::math::{screen_projection, Color, Rect, Vec2};
use crate::render::{AtlasHandle, RasterBackend, TextFormat};

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct QuadVertex {
    position: [f32; 2],
    uv: [f32; 2],
    color: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct Globals {
    projection: [[f32; 4]; 4],
}

struct TextureEntry {
    /// The underlying GPU texture. Must be kept alive for the bind groups to be valid.
    _texture: Texture,
    nearest: BindGroup,
    linear: BindGroup,
    size: (u32, u32),
}

/// Consecutive quads sharing one texture binding.
struct Batch {
    texture: AtlasHandle,
    nearest: bool,
    first_vertex: u32,
    vertex_count: u32,
}

struct FrameState {
    clear: Color,
    vertices: Vec<QuadVertex>,
    batches: Vec<Batch>,
}

struct QuadPipeline {
    pipeline: RenderPipeline,
    texture_layout: BindGroupLayout,
    globals_buffer: Buffer,
    globals_group: BindGroup,
    nearest_sampler: Sampler,
    linear_sampler: Sampler,
}

struct GlyphEntry {
    texture: AtlasHandle,
    size: Vec2,
    bearing: Vec2,
    advance: f32,
}

/// Rasterized glyph textures, keyed by character and pixel size.
#[derive(Default)]
struct GlyphCache {
    font: Option<FontArc>,
    glyphs: HashMap<(char, u32), Option<GlyphEntry>>,
}

/// Raster backend drawing textured quads through wgpu.
///
/// Draw calls are queued as vertices during the frame and flushed in one
/// render pass by `end_frame`, preserving submission order.
pub struct WgpuBackend<'window> {
    surface: wgpu::Surface<'window>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: SurfaceConfiguration,
    present_mode: PresentMode,
    pipeline: QuadPipeline,
    textures: HashMap<AtlasHandle, TextureEntry>,
    next_texture_id: u32,
    white: AtlasHandle,
    frame: Option<FrameState>,
    glyphs: GlyphCache,
}

impl<'window> WgpuBackend<'window> {
    /// Create the surface, device and quad pipeline for `window`.
    ///
    /// `font_path` points at a TTF/OTF used by `draw_text`; when it cannot be
    /// read, text draws are skipped.
    pub fn new(window: &'window Window, vsync: bool, font_path: Option<&Path>) -> Result<Self> {
        let instance = Instance::default();
        let surface = instance.create_surface(window)?;

        let adapter = pollster::block_on(instance.request_adapter(&RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))?;

        let (device, queue) = pollster::block_on(adapter.request_device(&DeviceDescriptor {
            label: Some("tilesmith-device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: Default::default(),
            memory_hints: Default::default(),
            trace: wgpu::Trace::Off,
        }))?;

        let size = window.inner_size();
        let capabilities = surface.get_capabilities(&adapter);
        let format = capabilities
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .or_else(|| capabilities.formats.first().copied())
            .ok_or_else(|| anyhow!("surface reports no supported formats"))?;

        let present_mode = choose_present_mode(&capabilities.present_modes, vsync);
        let alpha_mode = choose_alpha_mode(&capabilities.alpha_modes);

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let pipeline = create_quad_pipeline(&device, format);

        let mut backend = Self {
            surface,
            device,
            queue,
            surface_config,
            present_mode,
            pipeline,
            textures: HashMap::new(),
            next_texture_id: 1,
            white: AtlasHandle(0),
            frame: None,
            glyphs: GlyphCache::default(),
        };
        backend.white = backend.load_rgba(&[255, 255, 255, 255], 1, 1)?;

        if let Some(path) = font_path {
            match fs::read(path)
                .map_err(anyhow::Error::from)
                .and_then(|bytes| FontArc::try_from_vec(bytes).map_err(|e| anyhow!("{e}")))
            {
                Ok(font) => backend.glyphs.font = Some(font),
                Err(err) => log::warn!("text font {} unavailable: {err}", path.display()),
            }
        }

        Ok(backend)
    }

    fn load_rgba(&mut self, data: &[u8], width: u32, height: u32) -> Result<AtlasHandle> {
        if data.len() != (width * height * 4) as usize {
            return Err(anyhow!("rgba data does not match {width}x{height}"));
        }

        let size = Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = self.device.create_texture(&TextureDescriptor {
            label: Some("atlas"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::Rgba8UnormSrgb,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.queue.write_texture(
            TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            data,
            TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&TextureViewDescriptor::default());
        let bind = |sampler: &Sampler, label: &str| {
            self.device.create_bind_group(&BindGroupDescriptor {
                label: Some(label),
                layout: &self.pipeline.texture_layout,
                entries: &[
                    BindGroupEntry {
                        binding: 0,
                        resource: BindingResource::TextureView(&view),
                    },
                    BindGroupEntry {
                        binding: 1,
                        resource: BindingResource::Sampler(sampler),
                    },
                ],
            })
        };
        let nearest = bind(&self.pipeline.nearest_sampler, "atlas-nearest");
        let linear = bind(&self.pipeline.linear_sampler, "atlas-linear");

        let handle = AtlasHandle(self.next_texture_id);
        self.next_texture_id += 1;
        self.textures.insert(
            handle,
            TextureEntry {
                _texture: texture,
                nearest,
                linear,
                size: (width, height),
            },
        );
        Ok(handle)
    }

    fn push_quad(
        &mut self,
        texture: AtlasHandle,
        nearest: bool,
        dst: Rect,
        uv: Rect,
        color: [f32; 4],
    ) {
        let Some(frame) = self.frame.as_mut() else {
            return;
        };

        let (l, t, r, b) = (dst.left(), dst.top(), dst.right(), dst.bottom());
        let (u0, v0, u1, v1) = (uv.left(), uv.top(), uv.right(), uv.bottom());
        let first_vertex = frame.vertices.len() as u32;
        frame.vertices.extend_from_slice(&[
            QuadVertex { position: [l, t], uv: [u0, v0], color },
            QuadVertex { position: [r, t], uv: [u1, v0], color },
            QuadVertex { position: [r, b], uv: [u1, v1], color },
            QuadVertex { position: [l, t], uv: [u0, v0], color },
            QuadVertex { position: [r, b], uv: [u1, v1], color },
            QuadVertex { position: [l, b], uv: [u0, v1], color },
        ]);

        match frame.batches.last_mut() {
            Some(batch) if batch.texture == texture && batch.nearest == nearest => {
                batch.vertex_count += 6;
            }
            _ => frame.batches.push(Batch {
                texture,
                nearest,
                first_vertex,
                vertex_count: 6,
            }),
        }
    }

    fn glyph(&mut self, ch: char, px: f32) -> Option<&GlyphEntry> {
        let key = (ch, px as u32);
        if !self.glyphs.glyphs.contains_key(&key) {
            let rasterized = self.rasterize_glyph(ch, px);
            self.glyphs.glyphs.insert(key, rasterized);
        }
        self.glyphs.glyphs.get(&key).and_then(Option::as_ref)
    }

    fn rasterize_glyph(&mut self, ch: char, px: f32) -> Option<GlyphEntry> {
        let font = self.glyphs.font.clone()?;
        let scale = ab_glyph::PxScale::from(px);
        let scaled = font.as_scaled(scale);
        let glyph_id = font.glyph_id(ch);
        let advance = scaled.h_advance(glyph_id);

        let glyph = Glyph {
            id: glyph_id,
            scale,
            position: ab_glyph::point(0.0, 0.0),
        };
        let Some(outlined) = scaled.outline_glyph(glyph) else {
            // Whitespace has no outline but still advances the pen.
            return Some(GlyphEntry {
                texture: self.white,
                size: Vec2::ZERO,
                bearing: Vec2::ZERO,
                advance,
            });
        };

        let bounds = outlined.px_bounds();
        let width = bounds.width().ceil().max(1.0) as u32;
        let height = bounds.height().ceil().max(1.0) as u32;
        let mut pixels = vec![0u8; (width * height * 4) as usize];
        outlined.draw(|x, y, coverage| {
            if x < width && y < height {
                let idx = ((y * width + x) * 4) as usize;
                pixels[idx..idx + 3].fill(255);
                pixels[idx + 3] = (coverage * 255.0) as u8;
            }
        });

        match self.load_rgba(&pixels, width, height) {
            Ok(texture) => Some(GlyphEntry {
                texture,
                size: Vec2::new(width as f32, height as f32),
                bearing: Vec2::new(bounds.min.x, bounds.min.y),
                advance,
            }),
            Err(err) => {
                log::warn!("failed to upload glyph {ch:?}: {err}");
                None
            }
        }
    }
}

impl RasterBackend for WgpuBackend<'_> {
    fn load_atlas(&mut self, path: &Path) -> Result<AtlasHandle> {
        let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let image = image::load_from_memory(&bytes)?.to_rgba8();
        let (width, height) = image.dimensions();
        self.load_rgba(&image, width, height)
    }

    fn release(&mut self, atlas: AtlasHandle) {
        if atlas != self.white {
            self.textures.remove(&atlas);
        }
    }

    fn atlas_size(&self, atlas: AtlasHandle) -> Option<(u32, u32)> {
        self.textures.get(&atlas).map(|t| t.size)
    }

    fn begin_frame(&mut self, clear: Color) -> Result<()> {
        self.frame = Some(FrameState {
            clear,
            vertices: Vec::new(),
            batches: Vec::new(),
        });
        Ok(())
    }

    fn draw_bitmap(
        &mut self,
        atlas: AtlasHandle,
        dst: Rect,
        src: Rect,
        opacity: f32,
        nearest: bool,
    ) {
        let Some((w, h)) = self.atlas_size(atlas) else {
            return;
        };
        let uv = Rect::new(
            Vec2::new(src.location.x / w as f32, src.location.y / h as f32),
            Vec2::new(src.size.x / w as f32, src.size.y / h as f32),
        );
        self.push_quad(atlas, nearest, dst, uv, Color::WHITE.with_opacity(opacity));
    }

    fn draw_rect(&mut self, rect: Rect, color: Color, opacity: f32, filled: bool) {
        let full = Rect::from_xywh(0.0, 0.0, 1.0, 1.0);
        let rgba = color.with_opacity(opacity);
        if filled {
            self.push_quad(self.white, true, rect, full, rgba);
            return;
        }

        let (x, y, w, h) = (rect.left(), rect.top(), rect.size.x, rect.size.y);
        for edge in [
            Rect::from_xywh(x, y, w, 1.0),
            Rect::from_xywh(x, y + h - 1.0, w, 1.0),
            Rect::from_xywh(x, y, 1.0, h),
            Rect::from_xywh(x + w - 1.0, y, 1.0, h),
        ] {
            self.push_quad(self.white, true, edge, full, rgba);
        }
    }

    fn draw_text(&mut self, text: &str, format: &TextFormat, rect: Rect, color: Color) {
        let Some(font) = self.glyphs.font.clone() else {
            return;
        };
        let ascent = font.as_scaled(ab_glyph::PxScale::from(format.size)).ascent();
        let rgba = color.with_opacity(1.0);
        let full = Rect::from_xywh(0.0, 0.0, 1.0, 1.0);

        let mut pen = Vec2::new(rect.left(), rect.top() + ascent);
        for ch in text.chars() {
            if ch == '\n' {
                pen = Vec2::new(rect.left(), pen.y + format.size);
                continue;
            }
            let Some(glyph) = self.glyph(ch, format.size) else {
                continue;
            };
            let (texture, size, bearing, advance) =
                (glyph.texture, glyph.size, glyph.bearing, glyph.advance);

            if pen.x + advance > rect.right() {
                pen = Vec2::new(rect.left(), pen.y + format.size);
            }
            if pen.y - ascent >= rect.bottom() {
                break;
            }
            if size.x > 0.0 {
                let dst = Rect::new(pen + bearing, size);
                self.push_quad(texture, false, dst, full, rgba);
            }
            pen.x += advance;
        }
    }

    fn end_frame(&mut self) -> Result<()> {
        let Some(frame) = self.frame.take() else {
            return Err(anyhow!("end_frame called without begin_frame"));
        };

        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.surface_config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => return Ok(()),
            Err(err) => return Err(anyhow!("surface error: {err}")),
        };
        let view = surface_texture
            .texture
            .create_view(&TextureViewDescriptor::default());

        let globals = Globals {
            projection: screen_projection(self.surface_config.width, self.surface_config.height)
                .to_cols_array_2d(),
        };
        self.queue
            .write_buffer(&self.pipeline.globals_buffer, 0, bytemuck::bytes_of(&globals));

        let vertex_buffer = (!frame.vertices.is_empty()).then(|| {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("quad-vertices"),
                contents: bytemuck::cast_slice(&frame.vertices),
                usage: BufferUsages::VERTEX,
            })
        });

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("quad-pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(wgpu::Color {
                            r: frame.clear.r as f64,
                            g: frame.clear.g as f64,
                            b: frame.clear.b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                multiview_mask: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let Some(vertex_buffer) = vertex_buffer.as_ref() {
                pass.set_pipeline(&self.pipeline.pipeline);
                pass.set_bind_group(0, &self.pipeline.globals_group, &[]);
                pass.set_vertex_buffer(0, vertex_buffer.slice(..));

                for batch in &frame.batches {
                    let Some(entry) = self.textures.get(&batch.texture) else {
                        continue;
                    };
                    let group = if batch.nearest { &entry.nearest } else { &entry.linear };
                    pass.set_bind_group(1, group, &[]);
                    pass.draw(batch.first_vertex..batch.first_vertex + batch.vertex_count, 0..1);
                }
            }
        }

        self.queue.submit(Some(encoder.finish()));
        surface_texture.present();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface_config.present_mode = self.present_mode;
        self.surface.configure(&self.device, &self.surface_config);
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }
}

fn choose_present_mode(modes: &[PresentMode], vsync: bool) -> PresentMode {
    if vsync {
        modes
            .iter()
            .copied()
            .find(|mode| matches!(mode, PresentMode::Fifo | PresentMode::FifoRelaxed))
            .unwrap_or(PresentMode::Fifo)
    } else {
        modes
            .iter()
            .copied()
            .find(|mode| matches!(mode, PresentMode::Immediate | PresentMode::Mailbox))
            .unwrap_or(PresentMode::Fifo)
    }
}

fn choose_alpha_mode(modes: &[CompositeAlphaMode]) -> CompositeAlphaMode {
    modes
        .iter()
        .copied()
        .find(|mode| matches!(mode, CompositeAlphaMode::Auto))
        .unwrap_or_else(|| modes.first().copied().unwrap_or(CompositeAlphaMode::Opaque))
}

fn create_sampler(device: &wgpu::Device, filter: FilterMode, label: &str) -> Sampler {
    device.create_sampler(&SamplerDescriptor {
        label: Some(label),
        address_mode_u: AddressMode::ClampToEdge,
        address_mode_v: AddressMode::ClampToEdge,
        address_mode_w: AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        ..Default::default()
    })
}

fn create_quad_pipeline(device: &wgpu::Device, surface_format: TextureFormat) -> QuadPipeline {
    let shader = device.create_shader_module(ShaderModuleDescriptor {
        label: Some("sprite-shader"),
        source: ShaderSource::Wgsl(include_str!("sprite.wgsl").into()),
    });

    let globals_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("globals-layout"),
        entries: &[BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: std::num::NonZeroU64::new(std::mem::size_of::<Globals>() as u64),
            },
            count: None,
        }],
    });

    let texture_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("atlas-layout"),
        entries: &[
            BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: BindingType::Texture {
                    sample_type: TextureSampleType::Float { filterable: true },
                    view_dimension: TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: BindingType::Sampler(SamplerBindingType::Filtering),
                count: None,
            },
        ],
    });

    let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some("sprite-pipeline-layout"),
        bind_group_layouts: &[&globals_layout, &texture_layout],
        immediate_size: 0,
    });

    let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("globals-buffer"),
        size: std::mem::size_of::<Globals>() as u64,
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let globals_group = device.create_bind_group(&BindGroupDescriptor {
        label: Some("globals-group"),
        layout: &globals_layout,
        entries: &[BindGroupEntry {
            binding: 0,
            resource: globals_buffer.as_entire_binding(),
        }],
    });

    let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("sprite-pipeline"),
        layout: Some(&pipeline_layout),
        vertex: VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Float32x4],
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: PrimitiveState::default(),
        depth_stencil: None,
        multisample: MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    });

    QuadPipeline {
        pipeline,
        texture_layout,
        globals_buffer,
        globals_group,
        nearest_sampler: create_sampler(device, FilterMode::Nearest, "nearest-sampler"),
        linear_sampler: create_sampler(device, FilterMode::Linear, "linear-sampler"),
    }
}
