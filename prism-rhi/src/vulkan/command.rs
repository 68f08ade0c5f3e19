//! Command recording and submission.
//!
//! Encoders are frame-scoped records: a command buffer from the frame's pool,
//! the queue it targets, a last-bound-pipeline cache so bind-group and
//! push-constant calls pick the right bind point, and the wait/signal fence
//! lists that accumulate until submit. The submit that signals the frame's
//! render-complete fence also gets the frame's inflight fence attached.

use ash::vk;

use crate::descriptors::*;
use crate::enums::IndexFormat;
use crate::error::{fatal, RhiError, RhiResult};
use crate::flags::{BarrierSync, ShaderStages, TextureAspect};
use crate::handle::*;

use super::mappings::*;
use super::{vk_err, with_rhi, VulkanRhi};

pub(super) struct VulkanCommandBuffer {
    /// Must match the current frame's id; anything else is a use of a stale
    /// encoder across a frame boundary.
    pub frame_id: u64,
    pub queue: vk::Queue,
    pub command_buffer: vk::CommandBuffer,
    pub primary: bool,
    pub ended: bool,
    pub submitted: bool,
    /// Attach the frame's inflight fence at submit.
    pub attach_inflight: bool,

    pub last_pipeline: vk::Pipeline,
    pub last_layout: vk::PipelineLayout,
    pub last_bind_point: vk::PipelineBindPoint,

    pub waits: Vec<(vk::Semaphore, u64, vk::PipelineStageFlags2)>,
    pub signals: Vec<(vk::Semaphore, u64, vk::PipelineStageFlags2)>,
}

impl VulkanCommandBuffer {
    pub fn new(frame_id: u64, queue: vk::Queue, command_buffer: vk::CommandBuffer, primary: bool) -> Self {
        Self {
            frame_id,
            queue,
            command_buffer,
            primary,
            ended: false,
            submitted: false,
            attach_inflight: false,
            last_pipeline: vk::Pipeline::null(),
            last_layout: vk::PipelineLayout::null(),
            last_bind_point: vk::PipelineBindPoint::GRAPHICS,
            waits: Vec::new(),
            signals: Vec::new(),
        }
    }
}

/// Look up a live encoder of the current frame.
fn encoder(rhi: &mut VulkanRhi, handle: CommandEncoderHandle) -> RhiResult<&mut VulkanCommandBuffer> {
    let frame_id = rhi.current_frame_index;
    let frame = rhi.current_frame();
    debug_assert_eq!(frame.frame_id, frame_id);
    let encoder = frame
        .encoders
        .get_mut(handle.raw().value as usize)
        .ok_or(RhiError::HandleInvalid(ObjectKind::CommandEncoder))?;
    if encoder.submitted {
        return Err(RhiError::ObjectInInvalidState(ObjectKind::CommandEncoder));
    }
    if encoder.frame_id != frame_id {
        fatal!(
            "command encoder recorded in frame {} used in frame {frame_id}",
            encoder.frame_id
        );
    }
    Ok(encoder)
}

fn encoder_cb(rhi: &mut VulkanRhi, handle: CommandEncoderHandle) -> RhiResult<vk::CommandBuffer> {
    Ok(encoder(rhi, handle)?.command_buffer)
}

pub(super) fn create_command_buffer(
    descriptor: &CommandBufferDescriptor,
) -> RhiResult<CommandEncoderHandle> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let handle = super::frame::allocate_encoder(rhi, descriptor.queue, true)?;
        let cb = encoder_cb(rhi, handle)?;
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { device.begin_command_buffer(cb, &begin_info) }.map_err(vk_err)?;
        Ok(handle)
    })
}

pub(super) fn create_command_bundle(
    descriptor: &CommandBundleDescriptor,
) -> RhiResult<CommandEncoderHandle> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let handle = super::frame::allocate_encoder(rhi, descriptor.queue, false)?;
        let cb = encoder_cb(rhi, handle)?;
        let inheritance = vk::CommandBufferInheritanceInfo::default();
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)
            .inheritance_info(&inheritance);
        unsafe { device.begin_command_buffer(cb, &begin_info) }.map_err(vk_err)?;
        Ok(handle)
    })
}

pub(super) fn submit_command_buffer(handle: CommandEncoderHandle) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let sync2 = rhi.synchronization2.clone().ok_or(RhiError::NotInitialized)?;
        let inflight = rhi.current_frame().inflight;

        let (cb, queue, waits, signals, attach_inflight) = {
            let encoder = encoder(rhi, handle)?;
            if !encoder.primary {
                return Err(RhiError::ObjectInInvalidState(ObjectKind::CommandEncoder));
            }
            if !encoder.ended {
                unsafe { device.end_command_buffer(encoder.command_buffer) }.map_err(vk_err)?;
                encoder.ended = true;
            }
            encoder.submitted = true;
            (
                encoder.command_buffer,
                encoder.queue,
                std::mem::take(&mut encoder.waits),
                std::mem::take(&mut encoder.signals),
                encoder.attach_inflight,
            )
        };

        let wait_infos: Vec<vk::SemaphoreSubmitInfo> = waits
            .iter()
            .map(|(semaphore, value, stage)| {
                vk::SemaphoreSubmitInfo::default()
                    .semaphore(*semaphore)
                    .value(*value)
                    .stage_mask(*stage)
            })
            .collect();
        let signal_infos: Vec<vk::SemaphoreSubmitInfo> = signals
            .iter()
            .map(|(semaphore, value, stage)| {
                vk::SemaphoreSubmitInfo::default()
                    .semaphore(*semaphore)
                    .value(*value)
                    .stage_mask(*stage)
            })
            .collect();
        let buffers = [vk::CommandBufferSubmitInfo::default().command_buffer(cb)];
        let submit = vk::SubmitInfo2::default()
            .wait_semaphore_infos(&wait_infos)
            .signal_semaphore_infos(&signal_infos)
            .command_buffer_infos(&buffers);

        let fence = if attach_inflight {
            let fences = [inflight];
            unsafe { device.reset_fences(&fences) }.map_err(vk_err)?;
            inflight
        } else {
            vk::Fence::null()
        };

        unsafe { sync2.queue_submit2(queue, &[submit], fence) }.map_err(vk_err)?;
        rhi.current_frame().submitted_any = true;
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// synchronization
// ---------------------------------------------------------------------------

pub(super) fn cmd_wait_fence(
    handle: CommandEncoderHandle,
    fence: FenceHandle,
    sync: BarrierSync,
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let (semaphore, value) = {
            let fence = rhi.fences.get(fence.raw().value)?;
            let value = match fence.kind {
                crate::FenceKind::Binary => 0,
                crate::FenceKind::Timeline => fence.target,
            };
            (fence.semaphore, value)
        };
        let stage = barrier_sync_to_vk(sync);
        encoder(rhi, handle)?.waits.push((semaphore, value, stage));
        Ok(())
    })
}

pub(super) fn cmd_signal_fence(
    handle: CommandEncoderHandle,
    fence: FenceHandle,
    sync: BarrierSync,
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let (semaphore, value) = {
            let object = rhi.fences.get(fence.raw().value)?;
            let value = match object.kind {
                crate::FenceKind::Binary => 0,
                crate::FenceKind::Timeline => object.target,
            };
            (object.semaphore, value)
        };
        let render_complete = rhi.current_frame().render_complete;
        let stage = barrier_sync_to_vk(sync);
        let encoder = encoder(rhi, handle)?;
        encoder.signals.push((semaphore, value, stage));
        // the command buffer completing the frame also retires the frame
        if fence == render_complete {
            encoder.attach_inflight = true;
        }
        Ok(())
    })
}

pub(super) fn cmd_memory_barrier(
    handle: CommandEncoderHandle,
    barriers: &[MemoryBarrier],
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let sync2 = rhi.synchronization2.clone().ok_or(RhiError::NotInitialized)?;
        let cb = encoder_cb(rhi, handle)?;
        let vk_barriers: Vec<vk::MemoryBarrier2> = barriers
            .iter()
            .map(|barrier| {
                vk::MemoryBarrier2::default()
                    .src_stage_mask(barrier_sync_to_vk(barrier.src_sync))
                    .dst_stage_mask(barrier_sync_to_vk(barrier.dst_sync))
                    .src_access_mask(barrier_access_to_vk(barrier.src_access))
                    .dst_access_mask(barrier_access_to_vk(barrier.dst_access))
            })
            .collect();
        let dependency = vk::DependencyInfo::default().memory_barriers(&vk_barriers);
        unsafe { sync2.cmd_pipeline_barrier2(cb, &dependency) };
        Ok(())
    })
}

pub(super) fn cmd_buffer_barrier(
    handle: CommandEncoderHandle,
    barriers: &[BufferBarrier],
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let sync2 = rhi.synchronization2.clone().ok_or(RhiError::NotInitialized)?;
        let mut vk_barriers = Vec::with_capacity(barriers.len());
        for barrier in barriers {
            let buffer = rhi.buffers.get(barrier.buffer.raw().value)?;
            let size = if barrier.size == 0 { vk::WHOLE_SIZE } else { barrier.size };
            vk_barriers.push(
                vk::BufferMemoryBarrier2::default()
                    .src_stage_mask(barrier_sync_to_vk(barrier.src_sync))
                    .dst_stage_mask(barrier_sync_to_vk(barrier.dst_sync))
                    .src_access_mask(barrier_access_to_vk(barrier.src_access))
                    .dst_access_mask(barrier_access_to_vk(barrier.dst_access))
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .buffer(buffer.buffer)
                    .offset(barrier.offset)
                    .size(size),
            );
        }
        let cb = encoder_cb(rhi, handle)?;
        let dependency = vk::DependencyInfo::default().buffer_memory_barriers(&vk_barriers);
        unsafe { sync2.cmd_pipeline_barrier2(cb, &dependency) };
        Ok(())
    })
}

pub(super) fn cmd_texture_barrier(
    handle: CommandEncoderHandle,
    barriers: &[TextureBarrier],
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let sync2 = rhi.synchronization2.clone().ok_or(RhiError::NotInitialized)?;
        let mut vk_barriers = Vec::with_capacity(barriers.len());
        for barrier in barriers {
            let texture = rhi.textures.get(barrier.texture.raw().value)?;
            let level_count = barrier.subresources.mip_level_count.max(1);
            let layer_count = barrier.subresources.array_layer_count.max(1);
            vk_barriers.push(
                vk::ImageMemoryBarrier2::default()
                    .src_stage_mask(barrier_sync_to_vk(barrier.src_sync))
                    .dst_stage_mask(barrier_sync_to_vk(barrier.dst_sync))
                    .src_access_mask(barrier_access_to_vk(barrier.src_access))
                    .dst_access_mask(barrier_access_to_vk(barrier.dst_access))
                    .old_layout(barrier_layout_to_vk(barrier.src_layout))
                    .new_layout(barrier_layout_to_vk(barrier.dst_layout))
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .image(texture.image)
                    .subresource_range(
                        vk::ImageSubresourceRange::default()
                            // aspect comes from the texture's format, not
                            // from the caller
                            .aspect_mask(texture.aspects)
                            .base_mip_level(barrier.subresources.base_mip_level)
                            .level_count(level_count)
                            .base_array_layer(barrier.subresources.base_array_layer)
                            .layer_count(layer_count),
                    ),
            );
        }
        let cb = encoder_cb(rhi, handle)?;
        let dependency = vk::DependencyInfo::default().image_memory_barriers(&vk_barriers);
        unsafe { sync2.cmd_pipeline_barrier2(cb, &dependency) };
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// render passes and state
// ---------------------------------------------------------------------------

pub(super) fn cmd_begin_render_pass(
    handle: CommandEncoderHandle,
    descriptor: &RenderPassDescriptor,
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let loader = rhi.dynamic_rendering.clone().ok_or(RhiError::NotInitialized)?;

        let mut color_attachments = Vec::with_capacity(descriptor.color_attachments.len());
        let mut render_area = vk::Extent2D::default();
        for (index, attachment) in descriptor.color_attachments.iter().enumerate() {
            let view = rhi.views.get(attachment.view.raw().value)?;
            if index == 0 {
                render_area = view.area;
            }
            color_attachments.push(
                vk::RenderingAttachmentInfo::default()
                    .image_view(view.view)
                    .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                    .load_op(load_op_to_vk(attachment.load_op))
                    .store_op(store_op_to_vk(attachment.store_op))
                    .clear_value(vk::ClearValue {
                        color: vk::ClearColorValue {
                            float32: [
                                attachment.clear_value.r,
                                attachment.clear_value.g,
                                attachment.clear_value.b,
                                attachment.clear_value.a,
                            ],
                        },
                    }),
            );
        }

        let mut depth_attachment = vk::RenderingAttachmentInfo::default();
        let mut stencil_attachment = vk::RenderingAttachmentInfo::default();
        let mut has_depth = false;
        let mut has_stencil = false;
        if let Some(ds) = &descriptor.depth_stencil_attachment {
            let view = rhi.views.get(ds.view.raw().value)?;
            if descriptor.color_attachments.is_empty() {
                render_area = view.area;
            }
            if view.aspects.contains(vk::ImageAspectFlags::DEPTH) {
                has_depth = true;
                depth_attachment = vk::RenderingAttachmentInfo::default()
                    .image_view(view.view)
                    .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                    .load_op(load_op_to_vk(ds.depth_load_op))
                    .store_op(store_op_to_vk(ds.depth_store_op))
                    .clear_value(vk::ClearValue {
                        depth_stencil: vk::ClearDepthStencilValue {
                            depth: ds.depth_clear_value,
                            stencil: ds.stencil_clear_value,
                        },
                    });
            }
            if view.aspects.contains(vk::ImageAspectFlags::STENCIL) {
                has_stencil = true;
                stencil_attachment = vk::RenderingAttachmentInfo::default()
                    .image_view(view.view)
                    .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                    .load_op(load_op_to_vk(ds.stencil_load_op))
                    .store_op(store_op_to_vk(ds.stencil_store_op))
                    .clear_value(vk::ClearValue {
                        depth_stencil: vk::ClearDepthStencilValue {
                            depth: ds.depth_clear_value,
                            stencil: ds.stencil_clear_value,
                        },
                    });
            }
        }

        let mut rendering = vk::RenderingInfo::default()
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: render_area,
            })
            .layer_count(1)
            .color_attachments(&color_attachments);
        if has_depth {
            rendering = rendering.depth_attachment(&depth_attachment);
        }
        if has_stencil {
            rendering = rendering.stencil_attachment(&stencil_attachment);
        }

        let cb = encoder_cb(rhi, handle)?;
        unsafe { loader.cmd_begin_rendering(cb, &rendering) };
        Ok(())
    })
}

pub(super) fn cmd_end_render_pass(handle: CommandEncoderHandle) -> RhiResult<()> {
    with_rhi(|rhi| {
        let loader = rhi.dynamic_rendering.clone().ok_or(RhiError::NotInitialized)?;
        let cb = encoder_cb(rhi, handle)?;
        unsafe { loader.cmd_end_rendering(cb) };
        Ok(())
    })
}

pub(super) fn cmd_set_render_pipeline(
    handle: CommandEncoderHandle,
    pipeline: RenderPipelineHandle,
    layout: PipelineLayoutHandle,
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let raw_pipeline = rhi.render_pipelines.get(pipeline.raw().value)?.pipeline;
        let raw_layout = rhi.pipeline_layouts.get(layout.raw().value)?.layout;
        let encoder = encoder(rhi, handle)?;
        encoder.last_bind_point = vk::PipelineBindPoint::GRAPHICS;
        encoder.last_pipeline = raw_pipeline;
        encoder.last_layout = raw_layout;
        unsafe {
            device.cmd_bind_pipeline(encoder.command_buffer, vk::PipelineBindPoint::GRAPHICS, raw_pipeline)
        };
        Ok(())
    })
}

pub(super) fn cmd_set_compute_pipeline(
    handle: CommandEncoderHandle,
    pipeline: ComputePipelineHandle,
    layout: PipelineLayoutHandle,
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let raw_pipeline = rhi.compute_pipelines.get(pipeline.raw().value)?.pipeline;
        let raw_layout = rhi.pipeline_layouts.get(layout.raw().value)?.layout;
        let encoder = encoder(rhi, handle)?;
        encoder.last_bind_point = vk::PipelineBindPoint::COMPUTE;
        encoder.last_pipeline = raw_pipeline;
        encoder.last_layout = raw_layout;
        unsafe {
            device.cmd_bind_pipeline(encoder.command_buffer, vk::PipelineBindPoint::COMPUTE, raw_pipeline)
        };
        Ok(())
    })
}

pub(super) fn cmd_set_bind_group(
    handle: CommandEncoderHandle,
    index: u32,
    bind_group: BindGroupHandle,
    dynamic_offsets: &[u32],
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let set = rhi.current_frame().descriptor_pool.set(bind_group)?;
        let encoder = encoder(rhi, handle)?;
        if encoder.last_pipeline == vk::Pipeline::null() {
            log::warn!("bind group set before any pipeline; bind point defaults to graphics");
        }
        let sets = [set];
        unsafe {
            device.cmd_bind_descriptor_sets(
                encoder.command_buffer,
                encoder.last_bind_point,
                encoder.last_layout,
                index,
                &sets,
                dynamic_offsets,
            )
        };
        Ok(())
    })
}

pub(super) fn cmd_set_push_constants(
    handle: CommandEncoderHandle,
    visibility: ShaderStages,
    offset: u32,
    data: &[u8],
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let encoder = encoder(rhi, handle)?;
        unsafe {
            device.cmd_push_constants(
                encoder.command_buffer,
                encoder.last_layout,
                shader_stages_to_vk(visibility),
                offset,
                data,
            )
        };
        Ok(())
    })
}

pub(super) fn cmd_set_index_buffer(
    handle: CommandEncoderHandle,
    buffer: BufferHandle,
    format: IndexFormat,
    offset: u64,
    _size: u64,
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let raw = rhi.buffers.get(buffer.raw().value)?.buffer;
        let cb = encoder_cb(rhi, handle)?;
        unsafe { device.cmd_bind_index_buffer(cb, raw, offset, index_format_to_vk(format)) };
        Ok(())
    })
}

pub(super) fn cmd_set_vertex_buffer(
    handle: CommandEncoderHandle,
    slot: u32,
    buffer: BufferHandle,
    offset: u64,
    _size: u64,
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let raw = rhi.buffers.get(buffer.raw().value)?.buffer;
        let cb = encoder_cb(rhi, handle)?;
        let buffers = [raw];
        let offsets = [offset];
        unsafe { device.cmd_bind_vertex_buffers(cb, slot, &buffers, &offsets) };
        Ok(())
    })
}

/// Recorded Y-flipped so clip space matches the other backends.
pub(super) fn cmd_set_viewport(
    handle: CommandEncoderHandle,
    x: f32,
    y: f32,
    w: f32,
    h: f32,
    min_depth: f32,
    max_depth: f32,
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let cb = encoder_cb(rhi, handle)?;
        let viewport = vk::Viewport {
            x,
            y: y + h,
            width: w,
            height: -h,
            min_depth,
            max_depth,
        };
        unsafe { device.cmd_set_viewport(cb, 0, &[viewport]) };
        Ok(())
    })
}

pub(super) fn cmd_set_scissor_rect(
    handle: CommandEncoderHandle,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let cb = encoder_cb(rhi, handle)?;
        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: x as i32, y: y as i32 },
            extent: vk::Extent2D { width: w, height: h },
        };
        unsafe { device.cmd_set_scissor(cb, 0, &[scissor]) };
        Ok(())
    })
}

pub(super) fn cmd_set_blend_constant(handle: CommandEncoderHandle, color: Color) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let cb = encoder_cb(rhi, handle)?;
        unsafe { device.cmd_set_blend_constants(cb, &[color.r, color.g, color.b, color.a]) };
        Ok(())
    })
}

pub(super) fn cmd_set_stencil_reference(
    handle: CommandEncoderHandle,
    reference: u32,
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let cb = encoder_cb(rhi, handle)?;
        // applied to both faces uniformly, as the frontend model demands
        unsafe { device.cmd_set_stencil_reference(cb, vk::StencilFaceFlags::FRONT_AND_BACK, reference) };
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// draws and dispatches
// ---------------------------------------------------------------------------

pub(super) fn cmd_draw(
    handle: CommandEncoderHandle,
    vertex_count: u32,
    instance_count: u32,
    first_vertex: u32,
    first_instance: u32,
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let cb = encoder_cb(rhi, handle)?;
        unsafe { device.cmd_draw(cb, vertex_count, instance_count, first_vertex, first_instance) };
        Ok(())
    })
}

pub(super) fn cmd_draw_indexed(
    handle: CommandEncoderHandle,
    index_count: u32,
    instance_count: u32,
    first_index: u32,
    base_vertex: i32,
    first_instance: u32,
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let cb = encoder_cb(rhi, handle)?;
        unsafe {
            device.cmd_draw_indexed(cb, index_count, instance_count, first_index, base_vertex, first_instance)
        };
        Ok(())
    })
}

pub(super) fn cmd_draw_indirect(
    handle: CommandEncoderHandle,
    buffer: BufferHandle,
    offset: u64,
    draw_count: u32,
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let raw = rhi.buffers.get(buffer.raw().value)?.buffer;
        let cb = encoder_cb(rhi, handle)?;
        let stride = std::mem::size_of::<vk::DrawIndirectCommand>() as u32;
        unsafe { device.cmd_draw_indirect(cb, raw, offset, draw_count, stride) };
        Ok(())
    })
}

pub(super) fn cmd_draw_indexed_indirect(
    handle: CommandEncoderHandle,
    buffer: BufferHandle,
    offset: u64,
    draw_count: u32,
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let raw = rhi.buffers.get(buffer.raw().value)?.buffer;
        let cb = encoder_cb(rhi, handle)?;
        let stride = std::mem::size_of::<vk::DrawIndexedIndirectCommand>() as u32;
        unsafe { device.cmd_draw_indexed_indirect(cb, raw, offset, draw_count, stride) };
        Ok(())
    })
}

pub(super) fn cmd_dispatch_workgroups(
    handle: CommandEncoderHandle,
    x: u32,
    y: u32,
    z: u32,
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let cb = encoder_cb(rhi, handle)?;
        unsafe { device.cmd_dispatch(cb, x, y, z) };
        Ok(())
    })
}

pub(super) fn cmd_dispatch_workgroups_indirect(
    handle: CommandEncoderHandle,
    buffer: BufferHandle,
    offset: u64,
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let raw = rhi.buffers.get(buffer.raw().value)?.buffer;
        let cb = encoder_cb(rhi, handle)?;
        unsafe { device.cmd_dispatch_indirect(cb, raw, offset) };
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// copies
// ---------------------------------------------------------------------------

pub(super) fn cmd_copy_buffer_to_buffer(
    handle: CommandEncoderHandle,
    src: BufferHandle,
    src_offset: u64,
    dst: BufferHandle,
    dst_offset: u64,
    size: u64,
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let src = rhi.buffers.get(src.raw().value)?.buffer;
        let dst = rhi.buffers.get(dst.raw().value)?.buffer;
        let cb = encoder_cb(rhi, handle)?;
        let region = vk::BufferCopy::default()
            .src_offset(src_offset)
            .dst_offset(dst_offset)
            .size(size);
        unsafe { device.cmd_copy_buffer(cb, src, dst, &[region]) };
        Ok(())
    })
}

/// `bytes_per_row` is in bytes; Vulkan's row length is in texels, so the
/// format's texel size divides it. `rows_per_image` is already texel rows.
fn buffer_image_copy(
    rhi: &VulkanRhi,
    buffer_info: &TexelCopyBufferInfo,
    texture_info: &TexelCopyTextureInfo,
    size: Extent3d,
) -> RhiResult<vk::BufferImageCopy> {
    let texture = rhi.textures.get(texture_info.texture.raw().value)?;
    let row_length = match (buffer_info.bytes_per_row, texture.texel_size) {
        (0, _) => 0,
        (bytes, Some(texel)) if bytes % texel == 0 => bytes / texel,
        _ => {
            return Err(RhiError::DescriptorInvalid {
                field: "bytes_per_row",
                reason: "must be a whole multiple of the texel size",
            })
        }
    };
    let aspect = if texture_info.aspect == TextureAspect::ALL {
        texture.aspects
    } else {
        texture_aspect_to_vk(texture_info.aspect)
    };
    Ok(vk::BufferImageCopy::default()
        .buffer_offset(buffer_info.offset)
        .buffer_row_length(row_length)
        .buffer_image_height(buffer_info.rows_per_image)
        .image_offset(vk::Offset3D {
            x: texture_info.origin.x as i32,
            y: texture_info.origin.y as i32,
            z: texture_info.origin.z as i32,
        })
        .image_extent(vk::Extent3D {
            width: size.width,
            height: size.height,
            depth: size.depth.max(1),
        })
        .image_subresource(
            vk::ImageSubresourceLayers::default()
                .aspect_mask(aspect)
                .mip_level(texture_info.mip_level)
                .base_array_layer(0)
                .layer_count(1),
        ))
}

pub(super) fn cmd_copy_buffer_to_texture(
    handle: CommandEncoderHandle,
    src: &TexelCopyBufferInfo,
    dst: &TexelCopyTextureInfo,
    size: Extent3d,
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let copy = buffer_image_copy(rhi, src, dst, size)?;
        let src = rhi.buffers.get(src.buffer.raw().value)?.buffer;
        let dst = rhi.textures.get(dst.texture.raw().value)?.image;
        let cb = encoder_cb(rhi, handle)?;
        unsafe {
            device.cmd_copy_buffer_to_image(
                cb,
                src,
                dst,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[copy],
            )
        };
        Ok(())
    })
}

pub(super) fn cmd_copy_texture_to_buffer(
    handle: CommandEncoderHandle,
    src: &TexelCopyTextureInfo,
    dst: &TexelCopyBufferInfo,
    size: Extent3d,
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let copy = buffer_image_copy(rhi, dst, src, size)?;
        let image = rhi.textures.get(src.texture.raw().value)?.image;
        let buffer = rhi.buffers.get(dst.buffer.raw().value)?.buffer;
        let cb = encoder_cb(rhi, handle)?;
        unsafe {
            device.cmd_copy_image_to_buffer(
                cb,
                image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                buffer,
                &[copy],
            )
        };
        Ok(())
    })
}

pub(super) fn cmd_copy_texture_to_texture(
    handle: CommandEncoderHandle,
    src: &TexelCopyTextureInfo,
    dst: &TexelCopyTextureInfo,
    size: Extent3d,
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let (src_image, src_aspects) = {
            let texture = rhi.textures.get(src.texture.raw().value)?;
            (texture.image, texture.aspects)
        };
        let (dst_image, dst_aspects) = {
            let texture = rhi.textures.get(dst.texture.raw().value)?;
            (texture.image, texture.aspects)
        };
        let cb = encoder_cb(rhi, handle)?;
        let region = vk::ImageCopy::default()
            .src_subresource(
                vk::ImageSubresourceLayers::default()
                    .aspect_mask(src_aspects)
                    .mip_level(src.mip_level)
                    .layer_count(1),
            )
            .dst_subresource(
                vk::ImageSubresourceLayers::default()
                    .aspect_mask(dst_aspects)
                    .mip_level(dst.mip_level)
                    .layer_count(1),
            )
            .src_offset(vk::Offset3D { x: src.origin.x as i32, y: src.origin.y as i32, z: src.origin.z as i32 })
            .dst_offset(vk::Offset3D { x: dst.origin.x as i32, y: dst.origin.y as i32, z: dst.origin.z as i32 })
            .extent(vk::Extent3D { width: size.width, height: size.height, depth: size.depth.max(1) });
        unsafe {
            device.cmd_copy_image(
                cb,
                src_image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                dst_image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            )
        };
        Ok(())
    })
}

pub(super) fn cmd_clear_buffer(
    handle: CommandEncoderHandle,
    buffer: BufferHandle,
    offset: u64,
    size: u64,
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let raw = rhi.buffers.get(buffer.raw().value)?.buffer;
        let cb = encoder_cb(rhi, handle)?;
        let size = if size == 0 { vk::WHOLE_SIZE } else { size };
        unsafe { device.cmd_fill_buffer(cb, raw, offset, size, 0) };
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// debug
// ---------------------------------------------------------------------------

pub(super) fn cmd_insert_debug_marker(handle: CommandEncoderHandle, label: &str) -> RhiResult<()> {
    with_rhi(|rhi| {
        let loader = rhi.debug_utils_device.clone();
        let cb = encoder_cb(rhi, handle)?;
        if let (Some(loader), Ok(name)) = (loader, std::ffi::CString::new(label)) {
            let info = vk::DebugUtilsLabelEXT::default().label_name(&name);
            unsafe { loader.cmd_insert_debug_utils_label(cb, &info) };
        }
        Ok(())
    })
}

pub(super) fn cmd_push_debug_group(handle: CommandEncoderHandle, label: &str) -> RhiResult<()> {
    with_rhi(|rhi| {
        let loader = rhi.debug_utils_device.clone();
        let cb = encoder_cb(rhi, handle)?;
        if let (Some(loader), Ok(name)) = (loader, std::ffi::CString::new(label)) {
            let info = vk::DebugUtilsLabelEXT::default().label_name(&name);
            unsafe { loader.cmd_begin_debug_utils_label(cb, &info) };
        }
        Ok(())
    })
}

pub(super) fn cmd_pop_debug_group(handle: CommandEncoderHandle) -> RhiResult<()> {
    with_rhi(|rhi| {
        let loader = rhi.debug_utils_device.clone();
        let cb = encoder_cb(rhi, handle)?;
        if let Some(loader) = loader {
            unsafe { loader.cmd_end_debug_utils_label(cb) };
        }
        Ok(())
    })
}

pub(super) fn cmd_execute_bundles(
    handle: CommandEncoderHandle,
    bundles: &[CommandEncoderHandle],
) -> RhiResult<()> {
    with_rhi(|rhi| {
        let device = rhi.device()?.clone();
        let mut secondary = Vec::with_capacity(bundles.len());
        for bundle in bundles {
            let encoder = encoder(rhi, *bundle)?;
            if encoder.primary {
                return Err(RhiError::ObjectInInvalidState(ObjectKind::CommandEncoder));
            }
            if !encoder.ended {
                unsafe { device.end_command_buffer(encoder.command_buffer) }.map_err(vk_err)?;
                encoder.ended = true;
            }
            secondary.push(encoder.command_buffer);
        }
        let cb = encoder_cb(rhi, handle)?;
        unsafe { device.cmd_execute_commands(cb, &secondary) };
        Ok(())
    })
}
