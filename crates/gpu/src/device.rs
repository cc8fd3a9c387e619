use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

use bytemuck::{Pod, Zeroable};
use fdm_sim::device::check_upload;
use fdm_sim::kernels::{Color, MomentumParams, RelaxParams};
use fdm_sim::{CellKind, DeviceError, FieldDevice, FieldState, GridSize, PingPong, Stroke, TILE_SIZE};
use glam::Vec2;

use crate::{await_buffer_map, GpuContext, GpuError};

/// Uniform block shared by every kernel. Matches `Params` in `fdm.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
struct KernelParams {
    width: u32,
    height: u32,
    paint_value: i32,
    /// Corrected colour of a relaxation pass: 0 red, 1 black.
    color: u32,
    dt: f32,
    viscosity: f32,
    cell_size: f32,
    omega: f32,
    damping: f32,
    radius: f32,
    from: [f32; 2],
    to: [f32; 2],
    velocity: [f32; 2],
}

struct Pipelines {
    damp_pressure: wgpu::ComputePipeline,
    advance_momentum: wgpu::ComputePipeline,
    relax_corrections: wgpu::ComputePipeline,
    relax_limit: wgpu::ComputePipeline,
    relax_apply: wgpu::ComputePipeline,
    apply_velocity: wgpu::ComputePipeline,
    paint_mask: wgpu::ComputePipeline,
}

/// Field store on the GPU.
///
/// `bind_groups[b]` reads arena `b` as source and writes arena `1 - b`, so the
/// current ping-pong index selects the bind group directly.
pub struct GpuDevice {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    device_lost: Arc<AtomicBool>,
    grid: GridSize,

    u_buffers: [wgpu::Buffer; 2],
    v_buffers: [wgpu::Buffer; 2],
    pressure_buffer: wgpu::Buffer,
    mask_buffer: wgpu::Buffer,
    // Per-cell (correction, limiter) pairs
    correction_buffer: wgpu::Buffer,
    params_buffer: wgpu::Buffer,
    staging: wgpu::Buffer,

    bind_groups: [wgpu::BindGroup; 2],
    pipelines: Pipelines,
    workgroups: (u32, u32),
    buffers: PingPong,
}

fn storage_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: false },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

impl GpuDevice {
    pub fn new(gpu: &GpuContext, grid: GridSize) -> Result<Self, DeviceError> {
        if grid.width < TILE_SIZE
            || grid.height < TILE_SIZE
            || grid.width % TILE_SIZE != 0
            || grid.height % TILE_SIZE != 0
        {
            return Err(DeviceError::Backend(format!(
                "grid {}x{} is not a multiple of the {}-cell tile",
                grid.width, grid.height, TILE_SIZE
            )));
        }
        let device = gpu.device.clone();
        let cell_bytes = (grid.cell_count() * std::mem::size_of::<f32>()) as u64;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("FDM Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/fdm.wgsl").into()),
        });

        let field = |label: &str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: cell_bytes,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let u_buffers = [field("U Buffer 0"), field("U Buffer 1")];
        let v_buffers = [field("V Buffer 0"), field("V Buffer 1")];
        let pressure_buffer = field("Pressure Buffer");
        let mask_buffer = field("Mask Buffer");
        let correction_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Correction Buffer"),
            size: 2 * cell_bytes,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("FDM Params Buffer"),
            size: std::mem::size_of::<KernelParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("FDM Staging"),
            size: cell_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("FDM Bind Group Layout"),
            entries: &[
                // params (uniform)
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // u_src, v_src, u_dst, v_dst, pressure, mask, correction
                storage_entry(1),
                storage_entry(2),
                storage_entry(3),
                storage_entry(4),
                storage_entry(5),
                storage_entry(6),
                storage_entry(7),
            ],
        });

        let make_bind_group = |src: usize| {
            let dst = 1 - src;
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(if src == 0 { "FDM Bind Group 0->1" } else { "FDM Bind Group 1->0" }),
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: params_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: u_buffers[src].as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: v_buffers[src].as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: u_buffers[dst].as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: v_buffers[dst].as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 5,
                        resource: pressure_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 6,
                        resource: mask_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 7,
                        resource: correction_buffer.as_entire_binding(),
                    },
                ],
            })
        };
        let bind_groups = [make_bind_group(0), make_bind_group(1)];

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("FDM Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = |entry_point: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry_point),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(entry_point),
                compilation_options: Default::default(),
                cache: None,
            })
        };
        let pipelines = Pipelines {
            damp_pressure: pipeline("damp_pressure"),
            advance_momentum: pipeline("advance_momentum"),
            relax_corrections: pipeline("relax_corrections"),
            relax_limit: pipeline("relax_limit"),
            relax_apply: pipeline("relax_apply"),
            apply_velocity: pipeline("apply_velocity"),
            paint_mask: pipeline("paint_mask"),
        };

        log::info!(
            "GPU field store {}x{} ({} KiB per field)",
            grid.width,
            grid.height,
            cell_bytes / 1024
        );

        Ok(Self {
            device,
            queue: gpu.queue.clone(),
            device_lost: gpu.device_lost_flag(),
            grid,
            u_buffers,
            v_buffers,
            pressure_buffer,
            mask_buffer,
            correction_buffer,
            params_buffer,
            staging,
            bind_groups,
            pipelines,
            workgroups: grid.dispatch_size(),
            buffers: PingPong::default(),
        })
    }

    fn byte_size(&self) -> u64 {
        (self.grid.cell_count() * std::mem::size_of::<f32>()) as u64
    }

    fn base_params(&self) -> KernelParams {
        KernelParams {
            width: self.grid.width as u32,
            height: self.grid.height as u32,
            ..Default::default()
        }
    }

    fn check_alive(&self) -> Result<(), GpuError> {
        if self.device_lost.load(Ordering::SeqCst) {
            return Err(GpuError::DeviceLost);
        }
        Ok(())
    }

    fn dispatch(&self, encoder: &mut wgpu::CommandEncoder, pipeline: &wgpu::ComputePipeline) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("FDM Pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.bind_groups[self.buffers.current()], &[]);
        pass.dispatch_workgroups(self.workgroups.0, self.workgroups.1, 1);
    }

    /// Upload `params`, then encode and submit the given passes in order.
    fn run(
        &self,
        label: &str,
        params: &KernelParams,
        copy_to_next: bool,
        pipelines: &[&wgpu::ComputePipeline],
    ) -> Result<(), GpuError> {
        self.check_alive()?;
        self.queue
            .write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(params));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });
        if copy_to_next {
            let (cur, next) = (self.buffers.current(), self.buffers.next());
            let size = self.byte_size();
            encoder.copy_buffer_to_buffer(&self.u_buffers[cur], 0, &self.u_buffers[next], 0, size);
            encoder.copy_buffer_to_buffer(&self.v_buffers[cur], 0, &self.v_buffers[next], 0, size);
        }
        for pipeline in pipelines {
            self.dispatch(&mut encoder, pipeline);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    /// Copy one field through the staging buffer and read it back.
    fn download<T: Pod>(&self, src: &wgpu::Buffer) -> Result<Vec<T>, GpuError> {
        self.check_alive()?;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("FDM Download Encoder"),
            });
        encoder.copy_buffer_to_buffer(src, 0, &self.staging, 0, self.byte_size());
        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = self.staging.slice(..);
        let (tx, rx) = mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        await_buffer_map(rx, &self.device_lost)?;

        let data = {
            let mapped = buffer_slice.get_mapped_range();
            bytemuck::cast_slice::<u8, T>(&mapped).to_vec()
        };
        self.staging.unmap();
        Ok(data)
    }

    fn stroke_params(&self, stroke: &Stroke) -> KernelParams {
        KernelParams {
            radius: stroke.radius,
            from: stroke.from.to_array(),
            to: stroke.to.to_array(),
            ..self.base_params()
        }
    }
}

impl FieldDevice for GpuDevice {
    fn name(&self) -> &str {
        "gpu"
    }

    fn grid(&self) -> GridSize {
        self.grid
    }

    fn current_buffer(&self) -> usize {
        self.buffers.current()
    }

    fn swap(&mut self) {
        self.buffers.swap();
    }

    fn read_all(&self) -> Result<FieldState, DeviceError> {
        let cur = self.buffers.current();
        Ok(FieldState {
            grid: self.grid,
            u: self.download(&self.u_buffers[cur])?,
            v: self.download(&self.v_buffers[cur])?,
            pressure: self.download(&self.pressure_buffer)?,
            mask: self.download(&self.mask_buffer)?,
        })
    }

    fn write_all(&mut self, state: &FieldState) -> Result<(), DeviceError> {
        check_upload(self.grid, state)?;
        self.check_alive()?;
        for buffer in 0..2 {
            self.queue
                .write_buffer(&self.u_buffers[buffer], 0, bytemuck::cast_slice(&state.u));
            self.queue
                .write_buffer(&self.v_buffers[buffer], 0, bytemuck::cast_slice(&state.v));
        }
        self.queue
            .write_buffer(&self.pressure_buffer, 0, bytemuck::cast_slice(&state.pressure));
        self.queue
            .write_buffer(&self.mask_buffer, 0, bytemuck::cast_slice(&state.mask));
        Ok(())
    }

    fn read_velocity(&self, buffer: usize) -> Result<(Vec<f32>, Vec<f32>), DeviceError> {
        if buffer > 1 {
            return Err(DeviceError::Backend(format!("no velocity buffer {}", buffer)));
        }
        Ok((
            self.download(&self.u_buffers[buffer])?,
            self.download(&self.v_buffers[buffer])?,
        ))
    }

    fn read_mask(&self) -> Result<Vec<i32>, DeviceError> {
        Ok(self.download(&self.mask_buffer)?)
    }

    fn damp_pressure(&mut self, factor: f32) -> Result<(), DeviceError> {
        let params = KernelParams {
            damping: factor,
            ..self.base_params()
        };
        self.run("Damp Pressure", &params, false, &[&self.pipelines.damp_pressure])?;
        Ok(())
    }

    fn advance(&mut self, params: &MomentumParams) -> Result<(), DeviceError> {
        let params = KernelParams {
            dt: params.dt,
            viscosity: params.viscosity,
            cell_size: params.cell_size,
            ..self.base_params()
        };
        self.run("Advance Momentum", &params, false, &[&self.pipelines.advance_momentum])?;
        Ok(())
    }

    fn relax(&mut self, params: &RelaxParams) -> Result<(), DeviceError> {
        let p = &self.pipelines;
        for (pass, color) in [Color::Red, Color::Black].into_iter().enumerate() {
            let params = KernelParams {
                color: color as u32,
                dt: params.dt,
                omega: params.omega,
                cell_size: params.cell_size,
                ..self.base_params()
            };
            // The first colour starts from a copy of the current arena
            self.run(
                "Relax",
                &params,
                pass == 0,
                &[&p.relax_corrections, &p.relax_limit, &p.relax_apply],
            )?;
        }
        Ok(())
    }

    fn apply_velocity(&mut self, stroke: &Stroke, velocity: Vec2) -> Result<(), DeviceError> {
        let params = KernelParams {
            velocity: velocity.to_array(),
            ..self.stroke_params(stroke)
        };
        self.run("Apply Velocity", &params, false, &[&self.pipelines.apply_velocity])?;
        Ok(())
    }

    fn paint_mask(&mut self, stroke: &Stroke, kind: CellKind) -> Result<(), DeviceError> {
        let params = KernelParams {
            paint_value: kind.mask_value(),
            ..self.stroke_params(stroke)
        };
        self.run("Paint Mask", &params, false, &[&self.pipelines.paint_mask])?;
        Ok(())
    }
}
