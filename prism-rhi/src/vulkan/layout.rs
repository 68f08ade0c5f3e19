//! Bind-group layouts and pipeline layouts.

use ash::vk;

use crate::descriptors::*;
use crate::error::{RhiError, RhiResult};
use crate::handle::{BindGroupLayoutHandle, PipelineLayoutHandle};
use crate::slotmap::PoolObject;

use super::mappings::shader_stages_to_vk;
use super::{vk_err, with_rhi};

#[derive(Default)]
pub(super) struct VulkanBindGroupLayout {
    pub device: Option<ash::Device>,
    pub layout: vk::DescriptorSetLayout,
    pub bindless: bool,
    /// Descriptor type per binding index; bind-group writes consult this so
    /// entries do not have to restate their type.
    pub binding_types: Vec<(u32, vk::DescriptorType)>,
}

impl PoolObject for VulkanBindGroupLayout {
    fn live(&self) -> bool {
        self.layout != vk::DescriptorSetLayout::null()
    }
}

pub(super) fn destroy_bind_group_layout(layout: &mut VulkanBindGroupLayout) {
    if let Some(device) = &layout.device {
        unsafe { device.destroy_descriptor_set_layout(layout.layout, None) };
    }
    layout.layout = vk::DescriptorSetLayout::null();
}

#[derive(Default)]
pub(super) struct VulkanPipelineLayout {
    pub device: Option<ash::Device>,
    pub layout: vk::PipelineLayout,
}

impl PoolObject for VulkanPipelineLayout {
    fn live(&self) -> bool {
        self.layout != vk::PipelineLayout::null()
    }
}

pub(super) fn destroy_pipeline_layout(layout: &mut VulkanPipelineLayout) {
    if let Some(device) = &layout.device {
        unsafe { device.destroy_pipeline_layout(layout.layout, None) };
    }
    layout.layout = vk::PipelineLayout::null();
}

/// Descriptor type inferred from the entry's tagged payload.
pub(super) fn infer_descriptor_type(entry: &BindGroupLayoutEntry) -> vk::DescriptorType {
    match &entry.layout {
        BindingLayout::Buffer(buffer) => match buffer.ty {
            crate::BufferBindingType::Uniform => {
                if buffer.has_dynamic_offset {
                    vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC
                } else {
                    vk::DescriptorType::UNIFORM_BUFFER
                }
            }
            crate::BufferBindingType::Storage | crate::BufferBindingType::ReadOnlyStorage => {
                if buffer.has_dynamic_offset {
                    vk::DescriptorType::STORAGE_BUFFER_DYNAMIC
                } else {
                    vk::DescriptorType::STORAGE_BUFFER
                }
            }
        },
        BindingLayout::Sampler(_) => vk::DescriptorType::SAMPLER,
        BindingLayout::Texture(_) => vk::DescriptorType::SAMPLED_IMAGE,
        BindingLayout::StorageTexture(_) => vk::DescriptorType::STORAGE_IMAGE,
        BindingLayout::AccelerationStructure(_) => {
            vk::DescriptorType::ACCELERATION_STRUCTURE_KHR
        }
    }
}

pub(super) fn create_bind_group_layout(
    descriptor: &BindGroupLayoutDescriptor,
) -> RhiResult<BindGroupLayoutHandle> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();

        let mut binding_types = Vec::with_capacity(descriptor.entries.len());
        let mut bindings = Vec::with_capacity(descriptor.entries.len());
        for entry in &descriptor.entries {
            let descriptor_type = infer_descriptor_type(entry);
            bindings.push(
                vk::DescriptorSetLayoutBinding::default()
                    .binding(entry.binding)
                    .descriptor_type(descriptor_type)
                    .descriptor_count(entry.count.max(1))
                    .stage_flags(shader_stages_to_vk(entry.visibility)),
            );
            binding_types.push((entry.binding, descriptor_type));
        }

        // bindless: the last binding is variable-count, partially bound,
        // updatable after bind
        let mut binding_flags = vec![vk::DescriptorBindingFlags::empty(); bindings.len()];
        if descriptor.bindless {
            if let Some(last) = binding_flags.last_mut() {
                *last = vk::DescriptorBindingFlags::PARTIALLY_BOUND
                    | vk::DescriptorBindingFlags::VARIABLE_DESCRIPTOR_COUNT
                    | vk::DescriptorBindingFlags::UPDATE_AFTER_BIND;
            }
        }
        let mut flags_info = vk::DescriptorSetLayoutBindingFlagsCreateInfo::default()
            .binding_flags(&binding_flags);

        let mut create_info =
            vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
        if descriptor.bindless {
            create_info = create_info
                .flags(vk::DescriptorSetLayoutCreateFlags::UPDATE_AFTER_BIND_POOL)
                .push_next(&mut flags_info);
        }

        let layout = unsafe { device.create_descriptor_set_layout(&create_info, None) }
            .map_err(vk_err)?;
        rhi.set_debug_label(layout, descriptor.label.as_deref());

        Ok(BindGroupLayoutHandle::new(rhi.bind_group_layouts.add(VulkanBindGroupLayout {
            device: Some(device),
            layout,
            bindless: descriptor.bindless,
            binding_types,
        })))
    })
}

pub(super) fn delete_bind_group_layout(handle: BindGroupLayoutHandle) -> RhiResult<()> {
    with_rhi(|rhi| rhi.bind_group_layouts.remove(handle.raw().value))
}

pub(super) fn create_pipeline_layout(
    descriptor: &PipelineLayoutDescriptor,
) -> RhiResult<PipelineLayoutHandle> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();

        let mut set_layouts = Vec::with_capacity(descriptor.bind_group_layouts.len());
        for handle in &descriptor.bind_group_layouts {
            set_layouts.push(rhi.bind_group_layouts.get(handle.raw().value)?.layout);
        }

        let push_constant_ranges = [vk::PushConstantRange::default()
            .stage_flags(vk::ShaderStageFlags::ALL)
            .offset(0)
            .size(descriptor.push_constant_size)];
        let mut create_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&set_layouts);
        if descriptor.push_constant_size > 0 {
            create_info = create_info.push_constant_ranges(&push_constant_ranges);
        }

        let layout =
            unsafe { device.create_pipeline_layout(&create_info, None) }.map_err(vk_err)?;
        rhi.set_debug_label(layout, descriptor.label.as_deref());

        Ok(PipelineLayoutHandle::new(rhi.pipeline_layouts.add(VulkanPipelineLayout {
            device: Some(device),
            layout,
        })))
    })
}

pub(super) fn delete_pipeline_layout(handle: PipelineLayoutHandle) -> RhiResult<()> {
    with_rhi(|rhi| rhi.pipeline_layouts.remove(handle.raw().value))
}

/// Descriptor type a bind-group entry resolves to, looked up in its layout.
pub(super) fn binding_type_for(
    layout: &VulkanBindGroupLayout,
    binding: u32,
) -> RhiResult<vk::DescriptorType> {
    layout
        .binding_types
        .iter()
        .find(|(index, _)| *index == binding)
        .map(|(_, ty)| *ty)
        .ok_or(RhiError::DescriptorInvalid {
            field: "binding",
            reason: "binding index is not part of the layout",
        })
}
