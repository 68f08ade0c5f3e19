//! Logical device creation: queue-family discovery, extension negotiation
//! and the feature chain.

use std::collections::HashSet;
use std::ffi::CStr;

use ash::vk;

use crate::descriptors::DeviceDescriptor;
use crate::enums::FeatureName;
use crate::error::{RhiError, RhiResult};
use crate::flags::RhiFlags;

use super::{vk_err, with_rhi, QueueFamilies, FRAME_COUNT};

/// Graphics wants a graphics+compute family; compute and transfer prefer
/// dedicated families when the adapter has them.
pub(super) fn find_queue_families(
    instance: &ash::Instance,
    adapter: vk::PhysicalDevice,
) -> QueueFamilies {
    let properties = unsafe { instance.get_physical_device_queue_family_properties(adapter) };

    let mut families = QueueFamilies::default();
    for (index, family) in properties.iter().enumerate() {
        let index = index as u32;
        if families.graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
            families.graphics = Some(index);
        }
        if family.queue_flags.contains(vk::QueueFlags::COMPUTE)
            && !family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
        {
            families.compute.get_or_insert(index);
        }
        if family.queue_flags.contains(vk::QueueFlags::TRANSFER)
            && !family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
            && !family.queue_flags.contains(vk::QueueFlags::COMPUTE)
        {
            families.transfer.get_or_insert(index);
        }
    }
    families.compute = families.compute.or(families.graphics);
    families.transfer = families.transfer.or(families.graphics);
    families
}

fn is_required(features: &[FeatureName], feature: FeatureName) -> bool {
    features.contains(&feature)
}

pub(super) fn create_device(descriptor: &DeviceDescriptor) -> RhiResult<()> {
    with_rhi(|rhi| {
        let bindless = is_required(&descriptor.required_features, FeatureName::Bindless);
        let raytracing = is_required(&descriptor.required_features, FeatureName::Raytracing);

        let mut extensions: Vec<&CStr> = vec![
            // essential: render-pass-free encoding and the barrier2 family
            ash::khr::dynamic_rendering::NAME,
            ash::khr::synchronization2::NAME,
            ash::khr::maintenance1::NAME,
        ];
        if rhi.surface_loader.is_some() {
            extensions.push(ash::khr::swapchain::NAME);
        }
        if bindless {
            extensions.push(ash::ext::descriptor_indexing::NAME);
        }
        if raytracing {
            extensions.push(ash::khr::buffer_device_address::NAME);
            extensions.push(ash::khr::acceleration_structure::NAME);
            extensions.push(ash::khr::ray_tracing_pipeline::NAME);
            extensions.push(ash::khr::deferred_host_operations::NAME);
        }

        let supported: HashSet<String> =
            unsafe { rhi.instance.enumerate_device_extension_properties(rhi.adapter) }
                .map_err(vk_err)?
                .iter()
                .map(|prop| {
                    unsafe { CStr::from_ptr(prop.extension_name.as_ptr()) }
                        .to_string_lossy()
                        .into_owned()
                })
                .collect();

        log::info!("creating VkDevice with extensions:");
        for extension in &extensions {
            let name = extension.to_string_lossy();
            log::info!("- {name}");
            if !supported.contains(name.as_ref()) {
                log::error!("device extension {name} is not supported");
                let feature = if raytracing { "RAYTRACING" } else { "BINDLESS" };
                return Err(RhiError::FeatureUnsupported(feature));
            }
        }

        // feature chain: timeline semaphores are essential, the rest follows
        // the requested feature set
        let mut vulkan12 = vk::PhysicalDeviceVulkan12Features::default()
            .timeline_semaphore(true)
            .imageless_framebuffer(true);
        if bindless {
            vulkan12 = vulkan12
                .runtime_descriptor_array(true)
                .shader_sampled_image_array_non_uniform_indexing(true)
                .descriptor_binding_variable_descriptor_count(true)
                .descriptor_binding_partially_bound(true);
        }
        if raytracing {
            vulkan12 = vulkan12.buffer_device_address(true);
        }
        let mut dynamic_rendering =
            vk::PhysicalDeviceDynamicRenderingFeatures::default().dynamic_rendering(true);
        let mut synchronization2 =
            vk::PhysicalDeviceSynchronization2Features::default().synchronization2(true);

        let features = vk::PhysicalDeviceFeatures::default()
            .multi_draw_indirect(true)
            .sampler_anisotropy(true);

        // queue discovery: graphics, dedicated compute/transfer when present.
        // Presentation rides the graphics family; surface creation verifies
        // support and warns on the exotic adapters where it differs.
        let mut queues = find_queue_families(&rhi.instance, rhi.adapter);
        queues.present = queues.graphics;

        let mut unique_families = HashSet::new();
        for family in [queues.graphics, queues.compute, queues.transfer, queues.present]
            .into_iter()
            .flatten()
        {
            unique_families.insert(family);
        }

        let priorities = [1.0f32];
        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
            })
            .collect();

        let extension_ptrs: Vec<*const i8> = extensions.iter().map(|e| e.as_ptr()).collect();
        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_ptrs)
            .enabled_features(&features)
            .push_next(&mut vulkan12)
            .push_next(&mut dynamic_rendering)
            .push_next(&mut synchronization2);

        let device = unsafe { rhi.instance.create_device(rhi.adapter, &create_info, None) }
            .map_err(vk_err)?;

        let graphics = queues.graphics.ok_or(RhiError::BackendUnavailable(crate::Backend::Vulkan))?;
        rhi.graphics_queue = unsafe { device.get_device_queue(graphics, 0) };
        rhi.compute_queue =
            unsafe { device.get_device_queue(queues.compute.unwrap_or(graphics), 0) };
        rhi.transfer_queue =
            unsafe { device.get_device_queue(queues.transfer.unwrap_or(graphics), 0) };
        rhi.present_queue =
            unsafe { device.get_device_queue(queues.present.unwrap_or(graphics), 0) };
        rhi.queues = queues;

        rhi.swapchain_loader = if rhi.surface_loader.is_some() {
            Some(ash::khr::swapchain::Device::new(&rhi.instance, &device))
        } else {
            None
        };
        rhi.dynamic_rendering = Some(ash::khr::dynamic_rendering::Device::new(&rhi.instance, &device));
        rhi.synchronization2 = Some(ash::khr::synchronization2::Device::new(&rhi.instance, &device));
        if rhi.flags.contains(RhiFlags::DEBUG) {
            rhi.debug_utils_device =
                Some(ash::ext::debug_utils::Device::new(&rhi.instance, &device));
        }

        let mut frames = Vec::with_capacity(FRAME_COUNT as usize);
        for _ in 0..FRAME_COUNT {
            frames.push(super::frame::VulkanFrame::init(&device, &queues)?);
        }
        rhi.frames = frames;
        rhi.device = Some(device);
        log::info!("vulkan device created ({} queue families)", unique_families.len());
        Ok(())
    })
}

/// Teardown walks the pools in dependency order; the device must be idle.
pub(super) fn delete_device() {
    let _ = with_rhi(|rhi| {
        let Some(device) = rhi.device.clone() else {
            return Ok(());
        };
        unsafe { device.device_wait_idle() }.ok();

        // swapchains reference images and fences; they go first
        let surface_slots: Vec<u32> = rhi.surfaces.iter().map(|(slot, _)| slot).collect();
        for slot in surface_slots {
            super::swapchain::destroy_surface_slot(rhi, slot)?;
        }

        rhi.render_pipelines.clear();
        rhi.compute_pipelines.clear();
        rhi.pipeline_layouts.clear();
        rhi.bind_group_layouts.clear();
        rhi.shaders.clear();
        rhi.samplers.clear();
        rhi.views.clear();
        rhi.textures.clear();
        rhi.buffers.clear();
        rhi.fences.clear();

        for frame in &mut rhi.frames {
            frame.destroy(&device);
        }
        rhi.frames.clear();

        unsafe { device.destroy_device(None) };
        rhi.device = None;
        rhi.swapchain_loader = None;
        rhi.dynamic_rendering = None;
        rhi.synchronization2 = None;
        rhi.debug_utils_device = None;
        log::info!("vulkan device destroyed");
        Ok(())
    });
}

pub(super) fn wait_idle() -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?;
        unsafe { device.device_wait_idle() }.map_err(vk_err)
    })
}
