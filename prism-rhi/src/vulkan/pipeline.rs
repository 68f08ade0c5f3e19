//! Graphics and compute pipelines. Graphics pipelines are created against
//! dynamic rendering: attachment formats are supplied at creation time and no
//! render-pass object exists.

use std::ffi::CString;

use ash::vk;

use crate::descriptors::*;
use crate::error::{RhiError, RhiResult};
use crate::handle::{ComputePipelineHandle, RenderPipelineHandle};
use crate::slotmap::PoolObject;

use super::mappings::*;
use super::{vk_err, with_rhi};

#[derive(Default)]
pub(super) struct VulkanPipeline {
    pub device: Option<ash::Device>,
    pub pipeline: vk::Pipeline,
    /// Not owned; the pipeline layout object outlives the pipeline.
    pub layout: vk::PipelineLayout,
}

impl PoolObject for VulkanPipeline {
    fn live(&self) -> bool {
        self.pipeline != vk::Pipeline::null()
    }
}

pub(super) fn destroy(pipeline: &mut VulkanPipeline) {
    if let Some(device) = &pipeline.device {
        unsafe { device.destroy_pipeline(pipeline.pipeline, None) };
    }
    pipeline.pipeline = vk::Pipeline::null();
}

fn stencil_face(state: &StencilFaceState, read_mask: u32, write_mask: u32) -> vk::StencilOpState {
    vk::StencilOpState {
        fail_op: stencil_operation_to_vk(state.fail_op),
        pass_op: stencil_operation_to_vk(state.pass_op),
        depth_fail_op: stencil_operation_to_vk(state.depth_fail_op),
        compare_op: compare_function_to_vk(state.compare),
        compare_mask: read_mask,
        write_mask,
        reference: 0,
    }
}

pub(super) fn create_render_pipeline(
    descriptor: &RenderPipelineDescriptor,
) -> RhiResult<RenderPipelineHandle> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let layout = rhi.pipeline_layouts.get(descriptor.layout.raw().value)?.layout;

        // stages
        let vertex_module = rhi.shaders.get(descriptor.vertex.stage.module.raw().value)?.module;
        let vertex_entry = CString::new(descriptor.vertex.stage.entry_point.as_str())
            .map_err(|_| RhiError::DescriptorInvalid {
                field: "entry_point",
                reason: "entry point contains a NUL byte",
            })?;
        let mut stages = vec![vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(vertex_module)
            .name(&vertex_entry)];

        let fragment_entry;
        if let Some(fragment) = &descriptor.fragment {
            let module = rhi.shaders.get(fragment.stage.module.raw().value)?.module;
            fragment_entry = CString::new(fragment.stage.entry_point.as_str())
                .map_err(|_| RhiError::DescriptorInvalid {
                    field: "entry_point",
                    reason: "entry point contains a NUL byte",
                })?;
            stages.push(
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(vk::ShaderStageFlags::FRAGMENT)
                    .module(module)
                    .name(&fragment_entry),
            );
        }

        // vertex input
        let mut bindings = Vec::new();
        let mut attributes = Vec::new();
        for (slot, buffer) in descriptor.vertex.buffers.iter().enumerate() {
            bindings.push(
                vk::VertexInputBindingDescription::default()
                    .binding(slot as u32)
                    .stride(buffer.array_stride as u32)
                    .input_rate(vertex_step_mode_to_vk(buffer.step_mode)),
            );
            for attribute in &buffer.attributes {
                attributes.push(
                    vk::VertexInputAttributeDescription::default()
                        .location(attribute.shader_location)
                        .binding(slot as u32)
                        .format(vertex_format_to_vk(attribute.format))
                        .offset(attribute.offset as u32),
                );
            }
        }
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(topology_to_vk(descriptor.primitive.topology))
            .primitive_restart_enable(false);

        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        // rasterization is always fill-solid; wireframe is not offered
        let depth_bias = descriptor.depth_stencil.as_ref();
        let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(cull_mode_to_vk(descriptor.primitive.cull_mode))
            .front_face(front_face_to_vk(descriptor.primitive.front_face))
            .depth_clamp_enable(descriptor.primitive.unclipped_depth)
            .depth_bias_enable(depth_bias.is_some_and(|ds| ds.depth_bias != 0))
            .depth_bias_constant_factor(depth_bias.map_or(0.0, |ds| ds.depth_bias as f32))
            .depth_bias_slope_factor(depth_bias.map_or(0.0, |ds| ds.depth_bias_slope_scale))
            .depth_bias_clamp(depth_bias.map_or(0.0, |ds| ds.depth_bias_clamp));

        let multisample = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::from_raw(
                descriptor.multisample.count.max(1),
            ))
            .alpha_to_coverage_enable(descriptor.multisample.alpha_to_coverage_enabled);

        // depth/stencil enable rules: depth test iff compare != ALWAYS or
        // writes are on; stencil test iff any face does non-trivial work
        let depth_stencil_state = descriptor.depth_stencil.as_ref().map_or(
            vk::PipelineDepthStencilStateCreateInfo::default(),
            |ds| {
                vk::PipelineDepthStencilStateCreateInfo::default()
                    .depth_test_enable(ds.needs_depth_test())
                    .depth_write_enable(ds.depth_write_enabled)
                    .depth_compare_op(compare_function_to_vk(ds.depth_compare))
                    .stencil_test_enable(ds.needs_stencil_test())
                    .front(stencil_face(&ds.stencil_front, ds.stencil_read_mask, ds.stencil_write_mask))
                    .back(stencil_face(&ds.stencil_back, ds.stencil_read_mask, ds.stencil_write_mask))
            },
        );

        // color blending per target
        let empty_targets = Vec::new();
        let targets = descriptor.fragment.as_ref().map_or(&empty_targets, |f| &f.targets);
        let blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> = targets
            .iter()
            .map(|target| {
                let mut state = vk::PipelineColorBlendAttachmentState::default()
                    .color_write_mask(color_writes_to_vk(target.write_mask));
                if let Some(blend) = &target.blend {
                    state = state
                        .blend_enable(true)
                        .src_color_blend_factor(blend_factor_to_vk(blend.color.src_factor))
                        .dst_color_blend_factor(blend_factor_to_vk(blend.color.dst_factor))
                        .color_blend_op(blend_operation_to_vk(blend.color.operation))
                        .src_alpha_blend_factor(blend_factor_to_vk(blend.alpha.src_factor))
                        .dst_alpha_blend_factor(blend_factor_to_vk(blend.alpha.dst_factor))
                        .alpha_blend_op(blend_operation_to_vk(blend.alpha.operation));
                }
                state
            })
            .collect();
        let color_blend =
            vk::PipelineColorBlendStateCreateInfo::default().attachments(&blend_attachments);

        let dynamic_states = [
            vk::DynamicState::VIEWPORT,
            vk::DynamicState::SCISSOR,
            vk::DynamicState::BLEND_CONSTANTS,
            vk::DynamicState::STENCIL_REFERENCE,
        ];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        // dynamic rendering: attachment formats at PSO creation time
        let mut color_formats = Vec::with_capacity(targets.len());
        for target in targets {
            color_formats.push(texture_format_to_vk(target.format)?);
        }
        let mut rendering_info =
            vk::PipelineRenderingCreateInfo::default().color_attachment_formats(&color_formats);
        if let Some(ds) = &descriptor.depth_stencil {
            if ds.format.is_depth() {
                rendering_info =
                    rendering_info.depth_attachment_format(texture_format_to_vk(ds.format)?);
            }
            if ds.format.is_stencil() {
                rendering_info =
                    rendering_info.stencil_attachment_format(texture_format_to_vk(ds.format)?);
            }
        }

        let create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil_state)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .push_next(&mut rendering_info);

        let pipelines = unsafe {
            device.create_graphics_pipelines(vk::PipelineCache::null(), &[create_info], None)
        }
        .map_err(|(_, err)| vk_err(err))?;
        rhi.set_debug_label(pipelines[0], descriptor.label.as_deref());

        Ok(RenderPipelineHandle::new(rhi.render_pipelines.add(VulkanPipeline {
            device: Some(device),
            pipeline: pipelines[0],
            layout,
        })))
    })
}

pub(super) fn delete_render_pipeline(handle: RenderPipelineHandle) -> RhiResult<()> {
    with_rhi(|rhi| rhi.render_pipelines.remove(handle.raw().value))
}

pub(super) fn create_compute_pipeline(
    descriptor: &ComputePipelineDescriptor,
) -> RhiResult<ComputePipelineHandle> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let layout = rhi.pipeline_layouts.get(descriptor.layout.raw().value)?.layout;
        let module = rhi.shaders.get(descriptor.stage.module.raw().value)?.module;
        let entry = CString::new(descriptor.stage.entry_point.as_str()).map_err(|_| {
            RhiError::DescriptorInvalid {
                field: "entry_point",
                reason: "entry point contains a NUL byte",
            }
        })?;

        let stage = vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::COMPUTE)
            .module(module)
            .name(&entry);
        let create_info = vk::ComputePipelineCreateInfo::default().stage(stage).layout(layout);

        let pipelines = unsafe {
            device.create_compute_pipelines(vk::PipelineCache::null(), &[create_info], None)
        }
        .map_err(|(_, err)| vk_err(err))?;
        rhi.set_debug_label(pipelines[0], descriptor.label.as_deref());

        Ok(ComputePipelineHandle::new(rhi.compute_pipelines.add(VulkanPipeline {
            device: Some(device),
            pipeline: pipelines[0],
            layout,
        })))
    })
}

pub(super) fn delete_compute_pipeline(handle: ComputePipelineHandle) -> RhiResult<()> {
    with_rhi(|rhi| rhi.compute_pipelines.remove(handle.raw().value))
}
