//! GPU compute using wgpu.
//!
//! Device bootstrap lives in [`context`]; the FFT planning, recording and
//! transfer machinery lives in [`compute`].

pub mod compute;
pub mod context;

pub use compute::{
    Direction, FftContext, FftError, PlanSummary, TransformLayout, TransformPlan,
};
pub use context::{GpuContext, GpuError};
