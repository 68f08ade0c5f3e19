//! Buffer creation, memory policy and mapping.

use ash::vk;

use crate::descriptors::{BufferDescriptor, MappedBufferRange};
use crate::enums::MapMode;
use crate::error::{RhiError, RhiResult};
use crate::flags::BufferUsage;
use crate::handle::{BufferHandle, ObjectKind};
use crate::slotmap::PoolObject;

use super::mappings::buffer_usage_to_vk;
use super::{find_memory_type, vk_err, with_rhi};

const UNIFORM_ALIGNMENT: u64 = 256;

#[derive(Default)]
pub(super) struct VulkanBuffer {
    pub device: Option<ash::Device>,
    pub buffer: vk::Buffer,
    pub memory: vk::DeviceMemory,
    pub size: u64,
    pub usage: BufferUsage,
    pub host_visible: bool,
    pub mapped_ptr: *mut u8,
    pub mapped_size: u64,
}

impl PoolObject for VulkanBuffer {
    fn live(&self) -> bool {
        self.buffer != vk::Buffer::null()
    }
}

pub(super) fn destroy(buffer: &mut VulkanBuffer) {
    if let Some(device) = &buffer.device {
        unsafe {
            if buffer.mapped_ptr != std::ptr::null_mut() {
                device.unmap_memory(buffer.memory);
            }
            device.destroy_buffer(buffer.buffer, None);
            device.free_memory(buffer.memory, None);
        }
    }
    buffer.buffer = vk::Buffer::null();
    buffer.mapped_ptr = std::ptr::null_mut();
}

/// Memory policy by usage: map-read wants cached host memory, map-write wants
/// write-combined host memory, everything else is device-local.
fn memory_flags(usage: BufferUsage) -> (vk::MemoryPropertyFlags, bool) {
    if usage.contains(BufferUsage::MAP_READ) {
        (
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_CACHED,
            true,
        )
    } else if usage.contains(BufferUsage::MAP_WRITE) {
        (
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            true,
        )
    } else {
        (vk::MemoryPropertyFlags::DEVICE_LOCAL, false)
    }
}

pub(super) fn create_buffer(descriptor: &BufferDescriptor) -> RhiResult<BufferHandle> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();

        let mut size = descriptor.size;
        if descriptor.usage.contains(BufferUsage::UNIFORM) {
            size = size.div_ceil(UNIFORM_ALIGNMENT) * UNIFORM_ALIGNMENT;
        }

        let create_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(buffer_usage_to_vk(descriptor.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let buffer = unsafe { device.create_buffer(&create_info, None) }.map_err(vk_err)?;

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let (wanted, host_visible) = memory_flags(descriptor.usage);
        let memory_type = find_memory_type(&rhi.memory_props, requirements.memory_type_bits, wanted)
            .or_else(|_| {
                // cached host memory is optional on some adapters
                find_memory_type(
                    &rhi.memory_props,
                    requirements.memory_type_bits,
                    vk::MemoryPropertyFlags::HOST_VISIBLE,
                )
            })?;

        let mut flags_info = vk::MemoryAllocateFlagsInfo::default()
            .flags(vk::MemoryAllocateFlags::DEVICE_ADDRESS);
        let wants_device_address = descriptor.usage.intersects(
            BufferUsage::BVH_INPUT | BufferUsage::BVH_STORAGE | BufferUsage::SHADER_DEVICE_ADDRESS,
        );
        let mut allocate_info = vk::MemoryAllocateInfo::default()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type);
        if wants_device_address {
            allocate_info = allocate_info.push_next(&mut flags_info);
        }

        let memory = match unsafe { device.allocate_memory(&allocate_info, None) } {
            Ok(memory) => memory,
            Err(err) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(vk_err(err));
            }
        };
        if let Err(err) = unsafe { device.bind_buffer_memory(buffer, memory, 0) } {
            unsafe {
                device.destroy_buffer(buffer, None);
                device.free_memory(memory, None);
            }
            return Err(vk_err(err));
        }

        let mut object = VulkanBuffer {
            device: Some(device.clone()),
            buffer,
            memory,
            size,
            usage: descriptor.usage,
            host_visible,
            mapped_ptr: std::ptr::null_mut(),
            mapped_size: 0,
        };
        if descriptor.mapped_at_creation {
            map_into(&device, &mut object, 0, size)?;
        }
        rhi.set_debug_label(buffer, descriptor.label.as_deref());

        Ok(BufferHandle::new(rhi.buffers.add(object)))
    })
}

pub(super) fn delete_buffer(handle: BufferHandle) -> RhiResult<()> {
    with_rhi(|rhi| rhi.buffers.remove(handle.raw().value))
}

fn map_into(
    device: &ash::Device,
    buffer: &mut VulkanBuffer,
    offset: u64,
    size: u64,
) -> RhiResult<()> {
    if !buffer.host_visible {
        return Err(RhiError::DescriptorInvalid {
            field: "usage",
            reason: "buffer is not host visible",
        });
    }
    let size = if size == 0 { buffer.size - offset } else { size };
    let ptr = unsafe {
        device.map_memory(buffer.memory, offset, size, vk::MemoryMapFlags::empty())
    }
    .map_err(vk_err)?;
    buffer.mapped_ptr = ptr as *mut u8;
    buffer.mapped_size = size;
    Ok(())
}

pub(super) fn map_buffer(
    handle: BufferHandle,
    _mode: MapMode,
    offset: u64,
    size: u64,
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let buffer = rhi.buffers.get_mut(handle.raw().value)?;
        if buffer.mapped_ptr != std::ptr::null_mut() {
            return Err(RhiError::ObjectInInvalidState(ObjectKind::Buffer));
        }
        map_into(&device, buffer, offset, size)
    })
}

pub(super) fn unmap_buffer(handle: BufferHandle) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let buffer = rhi.buffers.get_mut(handle.raw().value)?;
        if buffer.mapped_ptr == std::ptr::null_mut() {
            return Err(RhiError::ObjectInInvalidState(ObjectKind::Buffer));
        }
        unsafe { device.unmap_memory(buffer.memory) };
        buffer.mapped_ptr = std::ptr::null_mut();
        buffer.mapped_size = 0;
        Ok(())
    })
}

pub(super) fn get_mapped_range(handle: BufferHandle) -> RhiResult<MappedBufferRange> {
    with_rhi(|rhi| {
        let buffer = rhi.buffers.get(handle.raw().value)?;
        if buffer.mapped_ptr == std::ptr::null_mut() {
            return Err(RhiError::ObjectInInvalidState(ObjectKind::Buffer));
        }
        Ok(MappedBufferRange { ptr: buffer.mapped_ptr, len: buffer.mapped_size as usize })
    })
}
