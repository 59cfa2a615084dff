//! GPU compute FFT.
//!
//! A transform is planned on the host ([`decompose`]), turned into device
//! resources ([`TransformPlan`]), recorded into a single compute pass
//! ([`record`]) and fenced on the queue submission ([`FftContext`]).

mod buffers;
mod params;
mod pipelines;

pub mod axis;
pub mod context;
pub mod decompose;
pub mod plan;
pub mod record;
pub mod transfer;

pub use axis::AxisPlan;
pub use context::{FftContext, FftError};
pub use decompose::{
    axis_strides, binding_selector, factorize, AxisLayout, AxisSummary, Direction, PlanSummary,
    StageLayout, TransformLayout, AXIS_REMAP, SUPPORTED_RADICES, WORKGROUP_SIZE,
};
pub use params::{aligned_record_size, StageParams, STAGE_PARAMS_SIZE};
pub use plan::TransformPlan;
pub use record::{bound_commands, command_list, record, RecordedCommand};
pub use transfer::Transfer;
