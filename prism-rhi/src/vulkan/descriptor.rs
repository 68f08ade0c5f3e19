//! Per-frame descriptor allocation.
//!
//! Each frame owns a bag of descriptor pools and a cursor. Allocation walks
//! forward to the first pool with free sets and grows the bag when every pool
//! is full; reset rewinds the cursor and clears the tracked set list without
//! destroying any pool. Bind groups allocated here live exactly one frame.

use ash::vk;

use crate::descriptors::{BindGroupDescriptor, BindingResource};
use crate::error::{fatal, RhiError, RhiResult};
use crate::handle::BindGroupHandle;

use super::layout::binding_type_for;
use super::{vk_err, with_rhi};

const MAX_SETS: u32 = 512;

#[derive(Default)]
pub(super) struct VulkanDescriptorPool {
    pools: Vec<vk::DescriptorPool>,
    counts: Vec<u32>,
    cursor: usize,
    pub allocated: Vec<vk::DescriptorSet>,
}

fn create_pool(device: &ash::Device) -> RhiResult<vk::DescriptorPool> {
    let sizes = [
        (vk::DescriptorType::SAMPLER, MAX_SETS),
        (vk::DescriptorType::SAMPLED_IMAGE, MAX_SETS),
        (vk::DescriptorType::COMBINED_IMAGE_SAMPLER, MAX_SETS),
        (vk::DescriptorType::STORAGE_IMAGE, MAX_SETS),
        (vk::DescriptorType::UNIFORM_BUFFER, MAX_SETS),
        (vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC, MAX_SETS),
        (vk::DescriptorType::STORAGE_BUFFER, MAX_SETS * 2),
        (vk::DescriptorType::STORAGE_BUFFER_DYNAMIC, MAX_SETS * 2),
    ];
    let pool_sizes: Vec<vk::DescriptorPoolSize> = sizes
        .iter()
        .map(|(ty, count)| vk::DescriptorPoolSize::default().ty(*ty).descriptor_count(*count))
        .collect();
    let create_info = vk::DescriptorPoolCreateInfo::default()
        .max_sets(MAX_SETS)
        .pool_sizes(&pool_sizes)
        .flags(vk::DescriptorPoolCreateFlags::UPDATE_AFTER_BIND);
    unsafe { device.create_descriptor_pool(&create_info, None) }.map_err(vk_err)
}

impl VulkanDescriptorPool {
    pub fn reset(&mut self, device: &ash::Device) -> RhiResult<()> {
        self.cursor = 0;
        self.allocated.clear();
        for count in &mut self.counts {
            *count = 0;
        }
        for pool in &self.pools {
            unsafe { device.reset_descriptor_pool(*pool, vk::DescriptorPoolResetFlags::empty()) }
                .map_err(vk_err)?;
        }
        Ok(())
    }

    fn find_pool_index(&mut self, device: &ash::Device) -> RhiResult<usize> {
        while self.cursor < self.counts.len() && self.counts[self.cursor] >= MAX_SETS {
            self.cursor += 1;
        }
        if self.cursor >= self.pools.len() {
            self.pools.push(create_pool(device)?);
            self.counts.push(0);
            log::debug!("descriptor pool bag grown to {} pools", self.pools.len());
        }
        Ok(self.cursor)
    }

    pub fn allocate(
        &mut self,
        device: &ash::Device,
        layout: vk::DescriptorSetLayout,
        bindless_count: u32,
    ) -> RhiResult<BindGroupHandle> {
        let index = self.find_pool_index(device)?;

        let layouts = [layout];
        let counts = [bindless_count];
        let mut variable_info = vk::DescriptorSetVariableDescriptorCountAllocateInfo::default()
            .descriptor_counts(&counts);
        let mut alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pools[index])
            .set_layouts(&layouts);
        if bindless_count > 0 {
            alloc_info = alloc_info.push_next(&mut variable_info);
        }

        let sets = match unsafe { device.allocate_descriptor_sets(&alloc_info) } {
            Ok(sets) => sets,
            // the type quotas can run out before max_sets does
            Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY | vk::Result::ERROR_FRAGMENTED_POOL) => {
                self.counts[index] = MAX_SETS;
                return self.allocate(device, layout, bindless_count);
            }
            Err(err) => return Err(vk_err(err)),
        };
        self.counts[index] += 1;

        let handle = BindGroupHandle::new(self.allocated.len() as u32);
        self.allocated.push(sets[0]);
        Ok(handle)
    }

    pub fn set(&self, handle: BindGroupHandle) -> RhiResult<vk::DescriptorSet> {
        self.allocated
            .get(handle.raw().value as usize)
            .copied()
            .ok_or(RhiError::HandleInvalid(crate::ObjectKind::BindGroup))
    }

    pub fn destroy(&mut self, device: &ash::Device) {
        for pool in self.pools.drain(..) {
            unsafe { device.destroy_descriptor_pool(pool, None) };
        }
        self.counts.clear();
        self.allocated.clear();
    }
}

pub(super) fn create_bind_group(descriptor: &BindGroupDescriptor) -> RhiResult<BindGroupHandle> {
    with_rhi(|rhi| {
        if !rhi.in_frame {
            fatal!("bind group created outside a frame");
        }
        let device = rhi.device()?.clone();

        let (layout_raw, bindless) = {
            let layout = rhi.bind_group_layouts.get(descriptor.layout.raw().value)?;
            (layout.layout, layout.bindless)
        };
        let bindless_count = if bindless {
            descriptor.entries.iter().map(|e| e.index + 1).max().unwrap_or(0)
        } else {
            0
        };

        let handle = rhi
            .current_frame()
            .descriptor_pool
            .allocate(&device, layout_raw, bindless_count)?;
        let set = rhi.current_frame().descriptor_pool.set(handle)?;

        // gather the write payloads first; the info structs must outlive the
        // update call
        let mut buffer_infos = Vec::new();
        let mut image_infos = Vec::new();
        enum Payload {
            Buffer(usize),
            Image(usize),
        }
        let mut writes_meta = Vec::with_capacity(descriptor.entries.len());
        for entry in &descriptor.entries {
            let layout = rhi.bind_group_layouts.get(descriptor.layout.raw().value)?;
            let descriptor_type = binding_type_for(layout, entry.binding)?;
            let payload = match &entry.resource {
                BindingResource::Buffer(binding) => {
                    let buffer = rhi.buffers.get(binding.buffer.raw().value)?;
                    let range = if binding.size == 0 {
                        vk::WHOLE_SIZE
                    } else {
                        binding.size
                    };
                    buffer_infos.push(
                        vk::DescriptorBufferInfo::default()
                            .buffer(buffer.buffer)
                            .offset(binding.offset)
                            .range(range),
                    );
                    Payload::Buffer(buffer_infos.len() - 1)
                }
                BindingResource::Sampler(sampler) => {
                    let sampler = rhi.samplers.get(sampler.raw().value)?;
                    image_infos.push(
                        vk::DescriptorImageInfo::default()
                            .sampler(sampler.sampler)
                            .image_layout(vk::ImageLayout::UNDEFINED),
                    );
                    Payload::Image(image_infos.len() - 1)
                }
                BindingResource::Texture(view) => {
                    let view = rhi.views.get(view.raw().value)?;
                    image_infos.push(
                        vk::DescriptorImageInfo::default()
                            .image_view(view.view)
                            .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
                    );
                    Payload::Image(image_infos.len() - 1)
                }
                BindingResource::StorageTexture(view) => {
                    let view = rhi.views.get(view.raw().value)?;
                    image_infos.push(
                        vk::DescriptorImageInfo::default()
                            .image_view(view.view)
                            .image_layout(vk::ImageLayout::GENERAL),
                    );
                    Payload::Image(image_infos.len() - 1)
                }
                BindingResource::AccelerationStructure(_) => {
                    return Err(RhiError::NotImplemented {
                        op: "acceleration structure bindings",
                        backend: crate::Backend::Vulkan,
                    });
                }
            };
            writes_meta.push((entry.binding, entry.index, descriptor_type, payload));
        }

        let mut writes = Vec::with_capacity(writes_meta.len());
        for (binding, index, descriptor_type, payload) in &writes_meta {
            let mut write = vk::WriteDescriptorSet::default()
                .dst_set(set)
                .dst_binding(*binding)
                .dst_array_element(*index)
                .descriptor_type(*descriptor_type);
            match payload {
                Payload::Buffer(i) => {
                    write = write.buffer_info(std::slice::from_ref(&buffer_infos[*i]));
                }
                Payload::Image(i) => {
                    write = write.image_info(std::slice::from_ref(&image_infos[*i]));
                }
            }
            writes.push(write);
        }
        unsafe { device.update_descriptor_sets(&writes, &[]) };

        Ok(handle)
    })
}

pub(super) fn delete_bind_group(_handle: BindGroupHandle) -> RhiResult<()> {
    // frame-scoped: the whole pool is recycled when the slot is reentered
    Ok(())
}
