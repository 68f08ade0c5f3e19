//! Headless triangle: renders one interpolated triangle into an offscreen
//! target on the Vulkan backend, copies it into a readback buffer and checks
//! a pixel. No window required.

use bytemuck::{Pod, Zeroable};
use prism_rhi::*;

const WIDTH: u32 = 960;
const HEIGHT: u32 = 480;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct Vertex {
    position: [f32; 2],
    color: [f32; 3],
}

const VERTICES: [Vertex; 3] = [
    Vertex { position: [-1.0, -1.0], color: [1.0, 0.0, 0.0] },
    Vertex { position: [3.0, -1.0], color: [0.0, 1.0, 0.0] },
    Vertex { position: [-1.0, 3.0], color: [0.0, 0.0, 1.0] },
];

const VERTEX_WGSL: &str = r#"
    struct VertexOut {
        @builtin(position) position: vec4<f32>,
        @location(0) color: vec3<f32>,
    }

    @vertex
    fn main(@location(0) position: vec2<f32>, @location(1) color: vec3<f32>) -> VertexOut {
        var out: VertexOut;
        out.position = vec4<f32>(position, 0.0, 1.0);
        out.color = color;
        return out;
    }
"#;

const FRAGMENT_WGSL: &str = r#"
    @fragment
    fn main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
        return vec4<f32>(color, 1.0);
    }
"#;

fn compile_wgsl_to_spirv(source: &str, stage: naga::ShaderStage) -> Vec<u8> {
    let module = naga::front::wgsl::parse_str(source).expect("parse wgsl");
    let info = naga::valid::Validator::new(
        naga::valid::ValidationFlags::default(),
        naga::valid::Capabilities::default(),
    )
    .validate(&module)
    .expect("validate");
    let options = naga::back::spv::Options::default();
    let pipeline_options = naga::back::spv::PipelineOptions {
        shader_stage: stage,
        entry_point: "main".to_string(),
    };
    let spv = naga::back::spv::write_vec(&module, &info, &options, Some(&pipeline_options))
        .expect("compile to spirv");
    spv.iter().flat_map(|w| w.to_le_bytes()).collect()
}

fn main() -> RhiResult<()> {
    env_logger::init();

    let rhi = Rhi::init(&RhiDescriptor {
        backend: Some(Backend::Vulkan),
        flags: RhiFlags::empty(),
        window: WindowHandle::default(),
    })?;
    let adapter = rhi.request_adapter(&AdapterDescriptor::default())?;
    log::info!("running on {}", adapter.info.device);
    let device = adapter.request_device(&DeviceDescriptor::default())?;

    // render target + readback buffer
    let target = device.create_texture(&TextureDescriptor {
        label: Some("triangle target".to_string()),
        size: Extent3d { width: WIDTH, height: HEIGHT, depth: 1 },
        format: TextureFormat::Rgba8Unorm,
        usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::COPY_SRC,
        ..Default::default()
    })?;
    let target_view = target.create_view()?;

    let readback = device.create_buffer(&BufferDescriptor {
        label: Some("readback".to_string()),
        size: (WIDTH * HEIGHT * 4) as u64,
        usage: BufferUsage::MAP_READ | BufferUsage::COPY_DST,
        mapped_at_creation: false,
    })?;

    let vertex_buffer = device.create_buffer(&BufferDescriptor {
        label: Some("triangle vertices".to_string()),
        size: std::mem::size_of_val(&VERTICES) as u64,
        usage: BufferUsage::MAP_WRITE | BufferUsage::VERTEX,
        mapped_at_creation: true,
    })?;
    let mut staging = vertex_buffer.mapped_range()?;
    staging.as_mut_slice().copy_from_slice(bytemuck::cast_slice(&VERTICES));
    vertex_buffer.unmap()?;

    // pipeline
    let vs = device.create_shader_module(&ShaderModuleDescriptor {
        label: Some("triangle vs".to_string()),
        kind: ShaderBlobKind::SpirV,
        code: compile_wgsl_to_spirv(VERTEX_WGSL, naga::ShaderStage::Vertex),
    })?;
    let fs = device.create_shader_module(&ShaderModuleDescriptor {
        label: Some("triangle fs".to_string()),
        kind: ShaderBlobKind::SpirV,
        code: compile_wgsl_to_spirv(FRAGMENT_WGSL, naga::ShaderStage::Fragment),
    })?;
    let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor::default())?;
    let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("triangle".to_string()),
        layout: layout.handle(),
        vertex: VertexState {
            stage: ProgrammableStage { module: vs.handle(), entry_point: "main".to_string() },
            buffers: vec![VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as u64,
                step_mode: VertexStepMode::Vertex,
                attributes: vec![
                    VertexAttribute {
                        format: VertexFormat::Float32x2,
                        offset: 0,
                        shader_location: 0,
                    },
                    VertexAttribute {
                        format: VertexFormat::Float32x3,
                        offset: 8,
                        shader_location: 1,
                    },
                ],
            }],
        },
        fragment: Some(FragmentState {
            stage: ProgrammableStage { module: fs.handle(), entry_point: "main".to_string() },
            targets: vec![ColorTargetState {
                format: TextureFormat::Rgba8Unorm,
                blend: None,
                write_mask: ColorWrites::ALL,
            }],
        }),
        primitive: PrimitiveState::default(),
        depth_stencil: None,
        multisample: MultisampleState::default(),
    })?;

    // one frame: clear, draw, copy out
    Rhi::new_frame()?;
    let encoder = device.create_command_buffer(&CommandBufferDescriptor::default())?;

    encoder.texture_barrier(&[TextureBarrier {
        src_sync: BarrierSync::NONE,
        dst_sync: BarrierSync::RENDER_TARGET,
        src_access: BarrierAccess::NONE,
        dst_access: BarrierAccess::RENDER_TARGET_WRITE,
        src_layout: BarrierLayout::Undefined,
        dst_layout: BarrierLayout::ColorAttachment,
        texture: target.handle(),
        subresources: TextureSubresourceRange::default(),
    }])?;

    encoder.begin_render_pass(&RenderPassDescriptor {
        label: Some("triangle pass".to_string()),
        color_attachments: vec![RenderPassColorAttachment {
            view: target_view.handle(),
            load_op: LoadOp::Clear,
            store_op: StoreOp::Store,
            clear_value: Color { r: 0.0, g: 0.0, b: 0.0, a: 1.0 },
        }],
        depth_stencil_attachment: None,
    })?;
    encoder.set_render_pipeline(&pipeline)?;
    encoder.set_viewport(0.0, 0.0, WIDTH as f32, HEIGHT as f32, 0.0, 1.0)?;
    encoder.set_scissor_rect(0, 0, WIDTH, HEIGHT)?;
    encoder.set_vertex_buffer(0, &vertex_buffer, 0, 0)?;
    encoder.draw(3, 1, 0, 0)?;
    encoder.end_render_pass()?;

    encoder.texture_barrier(&[TextureBarrier {
        src_sync: BarrierSync::RENDER_TARGET,
        dst_sync: BarrierSync::COPY,
        src_access: BarrierAccess::RENDER_TARGET_WRITE,
        dst_access: BarrierAccess::COPY_SRC,
        src_layout: BarrierLayout::ColorAttachment,
        dst_layout: BarrierLayout::CopySrc,
        texture: target.handle(),
        subresources: TextureSubresourceRange::default(),
    }])?;
    encoder.copy_texture_to_buffer(
        &TexelCopyTextureInfo { texture: target.handle(), ..Default::default() },
        &TexelCopyBufferInfo {
            buffer: readback.handle(),
            offset: 0,
            bytes_per_row: WIDTH * 4,
            rows_per_image: HEIGHT,
        },
        Extent3d { width: WIDTH, height: HEIGHT, depth: 1 },
    )?;

    let done = device.create_fence()?;
    done.reset()?;
    encoder.signal(&done, BarrierSync::ALL)?;
    encoder.submit()?;
    Rhi::end_frame()?;

    done.wait(u64::MAX)?;
    device.wait()?;

    readback.map(MapMode::Read, 0, 0)?;
    let pixels = readback.mapped_range()?;
    let center = ((HEIGHT / 2 * WIDTH + WIDTH / 2) * 4) as usize;
    let pixel = &pixels.as_slice()[center..center + 4];
    log::info!("center pixel: {pixel:?}");
    assert_ne!(&pixel[..3], &[0, 0, 0], "triangle did not cover the center");
    readback.unmap()?;

    device.wait()?;
    rhi.destroy();
    println!("headless triangle rendered, center pixel sampled OK");
    Ok(())
}
