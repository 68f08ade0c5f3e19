//! Frontend contract tests, driven through the null backend. The RHI is a
//! process singleton, so every test takes the session lock and owns a full
//! init/destroy cycle.

use std::sync::{Mutex, MutexGuard};

use prism_rhi::*;

static SESSION: Mutex<()> = Mutex::new(());

struct TestSession<'a> {
    rhi: Option<Rhi>,
    _guard: MutexGuard<'a, ()>,
}

fn session() -> TestSession<'static> {
    let guard = SESSION.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _ = env_logger::builder().is_test(true).try_init();
    let rhi = Rhi::init(&RhiDescriptor {
        backend: Some(Backend::Null),
        flags: RhiFlags::DEBUG,
        window: WindowHandle::default(),
    })
    .expect("init");
    TestSession { rhi: Some(rhi), _guard: guard }
}

impl TestSession<'_> {
    fn device(&self) -> Device {
        let adapter = self
            .rhi
            .as_ref()
            .unwrap()
            .request_adapter(&AdapterDescriptor::default())
            .expect("adapter");
        adapter.request_device(&DeviceDescriptor::default()).expect("device")
    }

    fn surface(&self, width: u32, height: u32, frames: u32) -> Surface {
        self.rhi
            .as_ref()
            .unwrap()
            .request_surface(&SurfaceDescriptor {
                size: Extent2d { width, height },
                frames,
                format: TextureFormat::Rgba8Unorm,
                ..Default::default()
            })
            .expect("surface")
    }
}

impl Drop for TestSession<'_> {
    fn drop(&mut self) {
        if let Some(rhi) = self.rhi.take() {
            rhi.destroy();
        }
    }
}

#[test]
fn init_is_single_entry_until_destroyed() {
    let guard = SESSION.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let descriptor = RhiDescriptor {
        backend: Some(Backend::Null),
        flags: RhiFlags::DEBUG,
        ..Default::default()
    };

    let rhi = Rhi::init(&descriptor).expect("first init");
    assert!(matches!(Rhi::init(&descriptor), Err(RhiError::AlreadyInitialized)));

    rhi.destroy();
    let rhi = Rhi::init(&descriptor).expect("init after destroy");
    rhi.destroy();
    drop(guard);
}

#[test]
fn unlinked_backend_is_unavailable() {
    let guard = SESSION.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let result = Rhi::init(&RhiDescriptor {
        backend: Some(Backend::Metal),
        ..Default::default()
    });
    assert!(matches!(result, Err(RhiError::BackendUnavailable(Backend::Metal))));
    drop(guard);
}

#[test]
fn required_features_are_checked_before_device_creation() {
    let session = session();
    let adapter = session
        .rhi
        .as_ref()
        .unwrap()
        .request_adapter(&AdapterDescriptor::default())
        .unwrap();

    let result = adapter.request_device(&DeviceDescriptor {
        label: None,
        required_features: vec![FeatureName::Raytracing],
    });
    assert_eq!(result.err(), Some(RhiError::FeatureUnsupported("RAYTRACING")));

    // a supported set still works afterwards
    adapter
        .request_device(&DeviceDescriptor {
            label: None,
            required_features: vec![FeatureName::Bindless, FeatureName::TimestampQuery],
        })
        .expect("device with supported features");
}

#[test]
fn buffer_handles_are_invalidated_by_destroy() {
    let session = session();
    let device = session.device();

    let mut buffer = device
        .create_buffer(&BufferDescriptor {
            size: 256,
            usage: BufferUsage::MAP_WRITE | BufferUsage::COPY_SRC,
            ..Default::default()
        })
        .expect("buffer");
    assert!(buffer.valid());

    buffer.destroy().expect("first destroy");
    assert!(!buffer.valid());

    // deleting again through a stale copy reports an invalid handle and
    // does not abort
    let stale = device
        .create_buffer(&BufferDescriptor {
            size: 16,
            usage: BufferUsage::MAP_READ,
            ..Default::default()
        })
        .unwrap();
    let mut copy = stale.clone();
    let mut copy2 = stale;
    copy.destroy().expect("destroy via first copy");
    assert_eq!(copy2.destroy().err(), Some(RhiError::HandleInvalid(ObjectKind::Buffer)));
}

#[test]
fn zero_sized_buffers_are_rejected() {
    let session = session();
    let device = session.device();
    let result = device.create_buffer(&BufferDescriptor {
        size: 0,
        usage: BufferUsage::UNIFORM,
        ..Default::default()
    });
    assert!(matches!(result, Err(RhiError::DescriptorInvalid { field: "size", .. })));
}

#[test]
fn fence_signal_ready_wait_cycle() {
    let session = session();
    let device = session.device();

    let fence = device.create_fence().expect("fence");
    assert!(fence.ready().unwrap(), "fresh fence has no outstanding target");

    fence.reset().expect("reset");
    assert!(!fence.ready().unwrap());
    assert_eq!(fence.target().unwrap(), 1);
    assert_eq!(fence.wait(0).err(), Some(RhiError::Timeout));

    fence.signal(1).expect("signal");
    assert!(fence.ready().unwrap());
    fence.wait(0).expect("wait returns immediately once signaled");

    // targets only move forward
    fence.reset().expect("reset again");
    assert_eq!(fence.target().unwrap(), 2);
}

#[test]
fn mapped_write_copy_readback_round_trip() {
    let session = session();
    let device = session.device();

    let payload: Vec<u8> = (0..=255).collect();
    let upload = device
        .create_buffer(&BufferDescriptor {
            label: Some("upload".to_string()),
            size: payload.len() as u64,
            usage: BufferUsage::MAP_WRITE | BufferUsage::COPY_SRC,
            mapped_at_creation: true,
        })
        .unwrap();
    let mut range = upload.mapped_range().unwrap();
    range.as_mut_slice().copy_from_slice(&payload);
    upload.unmap().unwrap();

    let readback = device
        .create_buffer(&BufferDescriptor {
            label: Some("readback".to_string()),
            size: payload.len() as u64,
            usage: BufferUsage::MAP_READ | BufferUsage::COPY_DST,
            mapped_at_creation: false,
        })
        .unwrap();

    Rhi::new_frame().unwrap();
    let encoder = device.create_command_buffer(&CommandBufferDescriptor::default()).unwrap();
    encoder
        .copy_buffer_to_buffer(&upload, 0, &readback, 0, payload.len() as u64)
        .unwrap();
    encoder.submit().unwrap();
    Rhi::end_frame().unwrap();
    device.wait().unwrap();

    readback.map(MapMode::Read, 0, 0).unwrap();
    let range = readback.mapped_range().unwrap();
    assert_eq!(range.as_slice(), payload.as_slice());
    readback.unmap().unwrap();
}

#[test]
fn mapping_requires_the_matching_usage() {
    let session = session();
    let device = session.device();
    let buffer = device
        .create_buffer(&BufferDescriptor {
            size: 64,
            usage: BufferUsage::VERTEX | BufferUsage::COPY_DST,
            ..Default::default()
        })
        .unwrap();
    assert!(matches!(
        buffer.map(MapMode::Write, 0, 0),
        Err(RhiError::DescriptorInvalid { field: "usage", .. })
    ));
}

#[test]
fn texture_views_default_from_the_texture() {
    let session = session();
    let device = session.device();

    let texture = device
        .create_texture(&TextureDescriptor {
            size: Extent3d { width: 256, height: 64, depth: 1 },
            mip_level_count: 9,
            array_layers: 4,
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsage::TEXTURE_BINDING,
            ..Default::default()
        })
        .unwrap();

    // the defaulted view clamps the mip chain to the smaller axis and spans
    // every array layer; reaching the backend without error means the
    // resolved counts were concrete
    let mut view = texture.create_view().expect("defaulted view");
    assert!(view.valid());
    view.destroy().unwrap();

    let mut partial = texture
        .create_view_with(&TextureViewDescriptor {
            base_mip_level: 2,
            mip_level_count: 1,
            base_array_layer: 1,
            array_layer_count: 1,
            ..Default::default()
        })
        .expect("partial view");
    partial.destroy().unwrap();
}

#[test]
fn bind_groups_are_frame_scoped() {
    let session = session();
    let device = session.device();

    let layout = device
        .create_bind_group_layout(&BindGroupLayoutDescriptor {
            entries: vec![BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
                count: 1,
                layout: BindingLayout::Buffer(BufferBindingLayout::default()),
            }],
            ..Default::default()
        })
        .unwrap();
    let uniform = device
        .create_buffer(&BufferDescriptor {
            size: 64,
            usage: BufferUsage::UNIFORM,
            ..Default::default()
        })
        .unwrap();
    let descriptor = BindGroupDescriptor {
        label: None,
        layout: layout.handle(),
        entries: vec![BindGroupEntry {
            binding: 0,
            index: 0,
            resource: BindingResource::Buffer(BufferBinding {
                buffer: uniform.handle(),
                offset: 0,
                size: 0,
            }),
        }],
    };

    Rhi::new_frame().unwrap();
    let first = device.create_bind_group(&descriptor).unwrap();
    let second = device.create_bind_group(&descriptor).unwrap();
    assert_ne!(first.handle(), second.handle());
    Rhi::end_frame().unwrap();

    // run a full rotation so the original frame slot is reentered; the pool
    // restarts and the first allocation of the new lifetime aliases slot 0,
    // never the original group
    Rhi::new_frame().unwrap();
    Rhi::end_frame().unwrap();
    Rhi::new_frame().unwrap();
    let recycled = device.create_bind_group(&descriptor).unwrap();
    assert_eq!(recycled.handle(), first.handle());
    Rhi::end_frame().unwrap();
}

#[test]
fn descriptor_pool_grows_past_its_capacity() {
    let session = session();
    let device = session.device();

    let layout = device
        .create_bind_group_layout(&BindGroupLayoutDescriptor {
            entries: vec![BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::COMPUTE,
                count: 1,
                layout: BindingLayout::Buffer(BufferBindingLayout {
                    ty: BufferBindingType::Storage,
                    ..Default::default()
                }),
            }],
            ..Default::default()
        })
        .unwrap();
    let buffer = device
        .create_buffer(&BufferDescriptor {
            size: 1024,
            usage: BufferUsage::STORAGE,
            ..Default::default()
        })
        .unwrap();
    let descriptor = BindGroupDescriptor {
        label: None,
        layout: layout.handle(),
        entries: vec![BindGroupEntry {
            binding: 0,
            index: 0,
            resource: BindingResource::Buffer(BufferBinding {
                buffer: buffer.handle(),
                offset: 0,
                size: 0,
            }),
        }],
    };

    // one pool holds 512 sets; the 513th allocation must grow the bag, not
    // fail
    Rhi::new_frame().unwrap();
    for _ in 0..513 {
        device.create_bind_group(&descriptor).unwrap();
    }
    Rhi::end_frame().unwrap();

    // after the slot is reentered the same sequence succeeds again from a
    // rewound pool
    Rhi::new_frame().unwrap();
    Rhi::end_frame().unwrap();
    Rhi::new_frame().unwrap();
    let group = device.create_bind_group(&descriptor).unwrap();
    assert_eq!(group.handle().raw().value, 0);
    Rhi::end_frame().unwrap();
}

#[test]
fn headless_surface_paces_frames() {
    let session = session();
    let _device = session.device();
    let surface = session.surface(960, 480, 2);

    assert_eq!(surface.image_count().unwrap(), 2);
    assert_eq!(surface.extent().unwrap(), Extent2d { width: 960, height: 480 });

    for i in 0..16u64 {
        Rhi::new_frame().unwrap();
        let frame = surface.acquire_next_frame().unwrap();
        assert!(!frame.suboptimal);
        assert!(frame.texture.valid());
        assert!(frame.view.valid());

        // the image-available fence for logical frame i advances once per
        // acquisition
        let available = Fence::from(frame.available);
        assert_eq!(available.target().unwrap(), i / 2 + 1);

        surface.present().unwrap();
        Rhi::end_frame().unwrap();
    }

    surface.destroy().unwrap();
}

#[test]
fn surface_resize_rebuilds_views_and_preserves_fences_iff_count_matches() {
    let session = session();
    let _device = session.device();
    let surface = session.surface(960, 480, 2);

    // frame 0, logical slot 0: the slot's fence reaches target 1
    Rhi::new_frame().unwrap();
    let before = surface.acquire_next_frame().unwrap();
    assert_eq!(Fence::from(before.available).target().unwrap(), 1);
    surface.present().unwrap();
    Rhi::end_frame().unwrap();

    // same image count: the fence ring survives the resize, views do not
    let resized = session.surface(1280, 720, 2);
    assert_eq!(resized.extent().unwrap(), Extent2d { width: 1280, height: 720 });

    // frame 1 burns logical slot 1; frame 2 lands back on slot 0
    run_empty_frame(&resized);
    Rhi::new_frame().unwrap();
    let after = resized.acquire_next_frame().unwrap();
    assert_ne!(before.view, after.view, "views must be rebuilt on resize");
    // a preserved fence keeps counting from where it was
    assert_eq!(Fence::from(after.available).target().unwrap(), 2);
    resized.present().unwrap();
    Rhi::end_frame().unwrap();

    // changed image count: the fence ring is rebuilt and starts over
    let regrown = session.surface(1280, 720, 3);
    assert_eq!(regrown.image_count().unwrap(), 3);
    Rhi::new_frame().unwrap();
    let fresh = regrown.acquire_next_frame().unwrap();
    assert_eq!(Fence::from(fresh.available).target().unwrap(), 1);
    regrown.present().unwrap();
    Rhi::end_frame().unwrap();

    regrown.destroy().unwrap();
}

fn run_empty_frame(surface: &Surface) {
    Rhi::new_frame().unwrap();
    surface.acquire_next_frame().unwrap();
    surface.present().unwrap();
    Rhi::end_frame().unwrap();
}

#[test]
fn encoders_do_not_survive_their_frame_slot() {
    let session = session();
    let device = session.device();

    Rhi::new_frame().unwrap();
    let stale = device.create_command_buffer(&CommandBufferDescriptor::default()).unwrap();
    let _ = stale; // recorded nothing, never submitted
    Rhi::end_frame().unwrap();

    // rotate back to the same slot; its encoder list was recycled
    Rhi::new_frame().unwrap();
    Rhi::end_frame().unwrap();
    Rhi::new_frame().unwrap();
    let result = stale.submit();
    assert_eq!(result.err(), Some(RhiError::HandleInvalid(ObjectKind::CommandEncoder)));
    Rhi::end_frame().unwrap();
}

#[test]
fn submitting_twice_is_rejected() {
    let session = session();
    let device = session.device();

    Rhi::new_frame().unwrap();
    let encoder = device.create_command_buffer(&CommandBufferDescriptor::default()).unwrap();
    let copy = encoder;
    encoder.submit().unwrap();
    assert_eq!(
        copy.submit().err(),
        Some(RhiError::ObjectInInvalidState(ObjectKind::CommandEncoder))
    );
    Rhi::end_frame().unwrap();
}

#[test]
fn queries_and_raytracing_report_not_implemented_when_absent() {
    let session = session();
    let device = session.device();

    // the null backend carries query sets but not acceleration structures
    let mut queries = device
        .create_query_set(&QuerySetDescriptor {
            kind: QueryType::Timestamp,
            count: 8,
            ..Default::default()
        })
        .expect("query set");
    queries.destroy().unwrap();

    let result = device.create_blas(&BlasDescriptor::default());
    assert!(matches!(
        result,
        Err(RhiError::NotImplemented { op: "create_blas", backend: Backend::Null })
    ));
}

#[test]
fn barrier_recording_validates_its_resources() {
    let session = session();
    let device = session.device();

    let texture = device
        .create_texture(&TextureDescriptor {
            size: Extent3d { width: 64, height: 64, depth: 1 },
            format: TextureFormat::Depth24PlusStencil8,
            usage: TextureUsage::RENDER_ATTACHMENT,
            ..Default::default()
        })
        .unwrap();

    Rhi::new_frame().unwrap();
    let encoder = device.create_command_buffer(&CommandBufferDescriptor::default()).unwrap();
    encoder
        .texture_barrier(&[TextureBarrier {
            src_sync: BarrierSync::NONE,
            dst_sync: BarrierSync::EARLY_DEPTH_STENCIL,
            src_access: BarrierAccess::NONE,
            dst_access: BarrierAccess::DEPTH_STENCIL_WRITE,
            src_layout: BarrierLayout::Undefined,
            dst_layout: BarrierLayout::DepthStencilAttachment,
            texture: texture.handle(),
            subresources: TextureSubresourceRange::default(),
        }])
        .expect("valid texture barrier");

    let bogus = TextureBarrier { texture: TextureHandle::default(), ..Default::default() };
    assert!(encoder.texture_barrier(&[bogus]).is_err());
    encoder.submit().unwrap();
    Rhi::end_frame().unwrap();
}
