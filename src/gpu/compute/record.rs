//! Command recording for a built transform plan.
//!
//! Axes are recorded in X, Y, Z order. Within an axis every stage binds its
//! own parameter record and ping-pong pair, then dispatches one grid. A
//! kernel is bound only when the radix changes from the previous stage.

use wgpu::CommandEncoder;

use super::decompose::TransformLayout;
use super::plan::TransformPlan;

/// One entry of the recorded command stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedCommand {
    BindKernel { axis: usize, radix: u32 },
    BindStage { axis: usize, stage: usize },
    Dispatch { x: u32, y: u32, z: u32 },
}

/// Command sequence `record` produces for `layout`, without touching a device.
pub fn command_list(layout: &TransformLayout) -> Vec<RecordedCommand> {
    let mut commands = Vec::with_capacity(layout.total_stages() * 3);
    for axis in layout.axes() {
        let mut bound: Option<u32> = None;
        for (j, stage) in axis.stages.iter().enumerate() {
            if bound != Some(stage.radix) {
                commands.push(RecordedCommand::BindKernel {
                    axis: axis.axis,
                    radix: stage.radix,
                });
                bound = Some(stage.radix);
            }
            commands.push(RecordedCommand::BindStage {
                axis: axis.axis,
                stage: j,
            });
            let [x, y, z] = axis.dispatch_size(j);
            commands.push(RecordedCommand::Dispatch { x, y, z });
        }
    }
    commands
}

/// Commands of `layout` restricted to the axes `has_axis` accepts.
///
/// A rejected axis loses its kernel binds, stage binds and dispatches
/// together, so no dispatch runs against another stage's bindings.
pub fn bound_commands(
    layout: &TransformLayout,
    has_axis: impl Fn(usize) -> bool,
) -> Vec<RecordedCommand> {
    let mut keep = true;
    command_list(layout)
        .into_iter()
        .filter(|command| {
            match *command {
                RecordedCommand::BindKernel { axis, .. } | RecordedCommand::BindStage { axis, .. } => {
                    keep = has_axis(axis);
                }
                RecordedCommand::Dispatch { .. } => {}
            }
            keep
        })
        .collect()
}

/// Record every stage of `plan` into a single compute pass on `encoder`.
///
/// Storage writes of one dispatch are visible to the next within the pass,
/// so no explicit barriers are recorded.
pub fn record(plan: &TransformPlan, encoder: &mut CommandEncoder) {
    let layout = plan.layout();
    let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
        label: Some("fft_transform_pass"),
        timestamp_writes: None,
    });

    let mut switch_kernel = false;
    let commands = bound_commands(layout, |axis| {
        let present = plan.axis(axis).is_some();
        if !present {
            log::error!("axis {} has stages but no GPU resources; skipping it", axis);
        }
        present
    });
    for command in commands {
        match command {
            RecordedCommand::BindKernel { .. } => switch_kernel = true,
            RecordedCommand::BindStage { axis, stage } => {
                let Some(axis_plan) = plan.axis(axis) else {
                    continue;
                };
                if switch_kernel {
                    pass.set_pipeline(axis_plan.kernel(stage));
                    switch_kernel = false;
                }
                pass.set_bind_group(0, axis_plan.bind_group(stage), &[]);
            }
            RecordedCommand::Dispatch { x, y, z } => pass.dispatch_workgroups(x, y, z),
        }
    }
}
