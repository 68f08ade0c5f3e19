//! Instance creation and adapter discovery.

use std::ffi::{c_void, CStr, CString};

use ash::vk;

use crate::api::AdapterReport;
use crate::descriptors::*;
use crate::error::{RhiError, RhiResult};
use crate::flags::RhiFlags;
use crate::handle::ObjectKind;
use crate::slotmap::Slotmap;

use super::{vk_err, with_rhi, QueueFamilies, VulkanRhi};

const KHRONOS_VALIDATION: &CStr =
    unsafe { CStr::from_bytes_with_nul_unchecked(b"VK_LAYER_KHRONOS_validation\0") };

/// Layers to enable when validation is requested. Probes what the loader
/// actually has instead of assuming.
fn validation_layer_names(entry: &ash::Entry) -> Vec<CString> {
    let layers = match unsafe { entry.enumerate_instance_layer_properties() } {
        Ok(layers) => layers,
        Err(_) => return vec![],
    };
    for prop in &layers {
        let name = unsafe { CStr::from_ptr(prop.layer_name.as_ptr()) };
        if name == KHRONOS_VALIDATION {
            return vec![KHRONOS_VALIDATION.to_owned()];
        }
    }
    log::warn!("validation requested but no validation layer is installed");
    vec![]
}

fn instance_extensions(flags: RhiFlags, window: &WindowHandle) -> Vec<*const i8> {
    let mut extensions: Vec<*const i8> = Vec::new();
    if !window.is_headless() {
        extensions.push(ash::khr::surface::NAME.as_ptr());
        #[cfg(target_os = "windows")]
        extensions.push(ash::khr::win32_surface::NAME.as_ptr());
        #[cfg(target_os = "linux")]
        extensions.push(ash::khr::xcb_surface::NAME.as_ptr());
        #[cfg(target_os = "macos")]
        extensions.push(ash::ext::metal_surface::NAME.as_ptr());
    }
    if flags.contains(RhiFlags::DEBUG) {
        extensions.push(ash::ext::debug_utils::NAME.as_ptr());
    }
    extensions
}

unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _types: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    let message = unsafe {
        let ptr = (*data).p_message;
        if ptr.is_null() {
            String::new()
        } else {
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    };
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::error!("vulkan: {message}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::warn!("vulkan: {message}");
    } else {
        log::debug!("vulkan: {message}");
    }
    vk::FALSE
}

pub(super) fn create_instance(descriptor: &RhiDescriptor) -> RhiResult<()> {
    let entry = unsafe { ash::Entry::load() }.map_err(|err| {
        log::error!("failed to load the Vulkan loader: {err}");
        RhiError::BackendUnavailable(crate::Backend::Vulkan)
    })?;

    let app_name = CString::new("prism").unwrap();
    let app_info = vk::ApplicationInfo::default()
        .api_version(vk::API_VERSION_1_2)
        .application_name(&app_name)
        .engine_name(&app_name);

    let layer_names = if descriptor.flags.contains(RhiFlags::VALIDATION) {
        validation_layer_names(&entry)
    } else {
        vec![]
    };
    let layer_ptrs: Vec<*const i8> = layer_names.iter().map(|c| c.as_ptr()).collect();
    let extensions = instance_extensions(descriptor.flags, &descriptor.window);

    let create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_layer_names(&layer_ptrs)
        .enabled_extension_names(&extensions);
    let instance =
        unsafe { entry.create_instance(&create_info, None) }.map_err(vk_err)?;

    let (debug_utils, debug_messenger) = if descriptor.flags.contains(RhiFlags::DEBUG) {
        let loader = ash::ext::debug_utils::Instance::new(&entry, &instance);
        let messenger_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));
        let messenger = unsafe { loader.create_debug_utils_messenger(&messenger_info, None) }
            .unwrap_or(vk::DebugUtilsMessengerEXT::null());
        (Some(loader), messenger)
    } else {
        (None, vk::DebugUtilsMessengerEXT::null())
    };

    let surface_loader = if descriptor.window.is_headless() {
        None
    } else {
        Some(ash::khr::surface::Instance::new(&entry, &instance))
    };

    super::install(VulkanRhi {
        flags: descriptor.flags,
        entry,
        instance,
        debug_utils,
        debug_messenger,
        surface_loader,
        adapter: vk::PhysicalDevice::null(),
        adapter_props: vk::PhysicalDeviceProperties::default(),
        memory_props: vk::PhysicalDeviceMemoryProperties::default(),
        device: None,
        swapchain_loader: None,
        dynamic_rendering: None,
        synchronization2: None,
        debug_utils_device: None,
        queues: QueueFamilies::default(),
        graphics_queue: vk::Queue::null(),
        compute_queue: vk::Queue::null(),
        transfer_queue: vk::Queue::null(),
        present_queue: vk::Queue::null(),
        frames: Vec::new(),
        current_frame_index: 0,
        in_frame: false,
        fences: Slotmap::new(ObjectKind::Fence, super::fence::destroy),
        buffers: Slotmap::new(ObjectKind::Buffer, super::buffer::destroy),
        textures: Slotmap::new(ObjectKind::Texture, super::texture::destroy),
        views: Slotmap::new(ObjectKind::TextureView, super::texture::destroy_view),
        samplers: Slotmap::new(ObjectKind::Sampler, super::sampler::destroy),
        shaders: Slotmap::new(ObjectKind::ShaderModule, super::shader::destroy),
        bind_group_layouts: Slotmap::new(ObjectKind::BindGroupLayout, super::layout::destroy_bind_group_layout),
        pipeline_layouts: Slotmap::new(ObjectKind::PipelineLayout, super::layout::destroy_pipeline_layout),
        render_pipelines: Slotmap::new(ObjectKind::RenderPipeline, super::pipeline::destroy),
        compute_pipelines: Slotmap::new(ObjectKind::ComputePipeline, super::pipeline::destroy),
        surfaces: Slotmap::new(ObjectKind::Surface, |_| {}),
    });
    log::info!("vulkan instance created (api 1.2)");
    Ok(())
}

pub(super) fn delete_instance() {
    if let Some(rhi) = super::take() {
        unsafe {
            if let Some(debug_utils) = &rhi.debug_utils {
                if rhi.debug_messenger != vk::DebugUtilsMessengerEXT::null() {
                    debug_utils.destroy_debug_utils_messenger(rhi.debug_messenger, None);
                }
            }
            rhi.instance.destroy_instance(None);
        }
        log::info!("vulkan instance destroyed");
    }
}

/// Adapter preference: first discrete GPU with a graphics queue, else the
/// first device with a graphics queue.
fn pick_adapter(instance: &ash::Instance) -> RhiResult<vk::PhysicalDevice> {
    let devices = unsafe { instance.enumerate_physical_devices() }.map_err(vk_err)?;
    let mut fallback = None;
    for device in devices {
        let families = unsafe { instance.get_physical_device_queue_family_properties(device) };
        let has_graphics = families
            .iter()
            .any(|f| f.queue_flags.contains(vk::QueueFlags::GRAPHICS));
        if !has_graphics {
            continue;
        }
        let props = unsafe { instance.get_physical_device_properties(device) };
        if props.device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
            return Ok(device);
        }
        fallback.get_or_insert(device);
    }
    fallback.ok_or(RhiError::BackendUnavailable(crate::Backend::Vulkan))
}

fn supported_extension_names(
    instance: &ash::Instance,
    adapter: vk::PhysicalDevice,
) -> Vec<String> {
    unsafe { instance.enumerate_device_extension_properties(adapter) }
        .unwrap_or_default()
        .iter()
        .map(|prop| {
            unsafe { CStr::from_ptr(prop.extension_name.as_ptr()) }
                .to_string_lossy()
                .into_owned()
        })
        .collect()
}

pub(super) fn create_adapter(_descriptor: &AdapterDescriptor) -> RhiResult<AdapterReport> {
    with_rhi(|rhi| {
        let adapter = pick_adapter(&rhi.instance)?;
        let props = unsafe { rhi.instance.get_physical_device_properties(adapter) };
        let memory_props =
            unsafe { rhi.instance.get_physical_device_memory_properties(adapter) };
        let features = unsafe { rhi.instance.get_physical_device_features(adapter) };
        let extensions = supported_extension_names(&rhi.instance, adapter);

        let device_name = unsafe { CStr::from_ptr(props.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned();
        log::info!(
            "adapter: {device_name} ({:?}, driver {})",
            props.device_type,
            props.driver_version
        );

        rhi.adapter = adapter;
        rhi.adapter_props = props;
        rhi.memory_props = memory_props;

        let has = |name: &str| extensions.iter().any(|e| e == name);
        let limits = &props.limits;

        let mut report = AdapterReport::default();
        report.info.device = device_name;
        report.info.vendor = format!("0x{:04x}", props.vendor_id);
        report.info.architecture = format!("{:?}", props.device_type);

        report.features = SupportedFeatures {
            bindless: has("VK_EXT_descriptor_indexing"),
            raytracing: has("VK_KHR_ray_tracing_pipeline")
                && has("VK_KHR_acceleration_structure"),
            shader_f16: features.shader_int16 == vk::TRUE,
            float32_blendable: true,
            float32_filterable: true,
            timestamp_query: limits.timestamp_compute_and_graphics == vk::TRUE,
            depth_clip_control: has("VK_EXT_depth_clip_enable"),
            depth32float_stencil8: true,
            indirect_first_instance: features.draw_indirect_first_instance == vk::TRUE,
            dual_source_blending: features.dual_src_blend == vk::TRUE,
            rg11b10ufloat_renderable: true,
            bgra8unorm_storage: true,
            clip_distances: features.shader_clip_distance == vk::TRUE,
            subgroups: true,
            texture_compression_bc: features.texture_compression_bc == vk::TRUE,
            texture_compression_etc2: features.texture_compression_etc2 == vk::TRUE,
            texture_compression_astc: features.texture_compression_astc_ldr == vk::TRUE,
        };

        report.limits = SupportedLimits {
            max_texture_dimension_1d: limits.max_image_dimension1_d,
            max_texture_dimension_2d: limits.max_image_dimension2_d,
            max_texture_dimension_3d: limits.max_image_dimension3_d,
            max_texture_array_layers: limits.max_image_array_layers,
            max_bind_groups: limits.max_bound_descriptor_sets.min(8),
            max_uniform_buffer_binding_size: limits.max_uniform_buffer_range,
            max_storage_buffer_binding_size: limits.max_storage_buffer_range,
            min_uniform_buffer_offset_alignment: limits.min_uniform_buffer_offset_alignment as u32,
            min_storage_buffer_offset_alignment: limits.min_storage_buffer_offset_alignment as u32,
            max_vertex_buffers: limits.max_vertex_input_bindings.min(16),
            max_vertex_attributes: limits.max_vertex_input_attributes.min(32),
            max_vertex_buffer_array_stride: limits.max_vertex_input_binding_stride,
            max_color_attachments: limits.max_color_attachments.min(8),
            max_compute_invocations_per_workgroup: limits.max_compute_work_group_invocations,
            max_compute_workgroup_size_x: limits.max_compute_work_group_size[0],
            max_compute_workgroup_size_y: limits.max_compute_work_group_size[1],
            max_compute_workgroup_size_z: limits.max_compute_work_group_size[2],
            max_compute_workgroups_per_dimension: limits.max_compute_work_group_count[0],
            max_push_constant_size: limits.max_push_constants_size,
            ..SupportedLimits::default()
        };

        report.properties = Properties {
            subgroup_min_size: 0,
            subgroup_max_size: 0,
            texture_row_pitch_alignment: limits.optimal_buffer_copy_row_pitch_alignment.max(1)
                as u32,
        };

        Ok(report)
    })
}

pub(super) fn delete_adapter() {
    // the adapter is owned by the instance; nothing to release
}
