//! Backend-independent transform interface.
//!
//! [`Transform`] is implemented by the RustFFT path and the GPU path so
//! callers can pick a backend at runtime through [`DynamicTransform`].

use std::sync::Arc;

use num_complex::Complex32;

use crate::cpu::CpuTransform;
use crate::gpu::compute::{Direction, FftContext, FftError, TransformLayout, TransformPlan};

/// A multi-axis transform with fixed sizes and direction.
pub trait Transform {
    fn sizes(&self) -> [u32; 3];

    fn direction(&self) -> Direction;

    /// Number of complex samples `process` expects.
    fn sample_count(&self) -> usize {
        self.sizes().iter().map(|&s| s as usize).product()
    }

    /// Transform `samples` into a new vector of the same length.
    fn process(&mut self, samples: &[Complex32]) -> Result<Vec<Complex32>, FftError>;
}

impl Transform for CpuTransform {
    fn sizes(&self) -> [u32; 3] {
        CpuTransform::sizes(self)
    }

    fn direction(&self) -> Direction {
        CpuTransform::direction(self)
    }

    fn process(&mut self, samples: &[Complex32]) -> Result<Vec<Complex32>, FftError> {
        CpuTransform::process(self, samples)
    }
}

/// GPU transform that builds a fresh plan for every call.
///
/// The layout is computed once up front, so an unsupported size is rejected
/// before any device resource exists.
pub struct GpuTransform {
    context: Arc<FftContext>,
    layout: TransformLayout,
}

impl GpuTransform {
    pub fn new(
        context: Arc<FftContext>,
        sizes: [u32; 3],
        direction: Direction,
    ) -> Result<Self, FftError> {
        let layout = TransformLayout::new(sizes, direction)?;
        Ok(Self { context, layout })
    }

    pub fn context(&self) -> &FftContext {
        &self.context
    }

    pub fn layout(&self) -> &TransformLayout {
        &self.layout
    }

    fn run(&self, plan: &TransformPlan, samples: &[Complex32]) -> Result<Vec<Complex32>, FftError> {
        plan.upload(&self.context, samples)?;
        plan.execute(&self.context)?;
        plan.download(&self.context)
    }
}

impl Transform for GpuTransform {
    fn sizes(&self) -> [u32; 3] {
        self.layout.sizes()
    }

    fn direction(&self) -> Direction {
        self.layout.direction()
    }

    fn process(&mut self, samples: &[Complex32]) -> Result<Vec<Complex32>, FftError> {
        let plan = TransformPlan::from_layout(&self.context, self.layout.clone())?;
        let result = self.run(&plan, samples);
        plan.destroy();
        result
    }
}

/// Either backend, chosen at runtime.
pub enum DynamicTransform {
    Cpu(CpuTransform),
    Gpu(Box<GpuTransform>),
}

impl DynamicTransform {
    pub fn cpu(sizes: [u32; 3], direction: Direction) -> Result<Self, FftError> {
        Ok(DynamicTransform::Cpu(CpuTransform::new(sizes, direction)?))
    }

    pub fn gpu(
        context: Arc<FftContext>,
        sizes: [u32; 3],
        direction: Direction,
    ) -> Result<Self, FftError> {
        Ok(DynamicTransform::Gpu(Box::new(GpuTransform::new(
            context, sizes, direction,
        )?)))
    }

    /// Use the GPU when a context is available, otherwise RustFFT.
    pub fn gpu_with_fallback(
        context: Option<Arc<FftContext>>,
        sizes: [u32; 3],
        direction: Direction,
    ) -> Result<Self, FftError> {
        match context {
            Some(context) => Self::gpu(context, sizes, direction),
            None => {
                log::warn!("No GPU context available, using CPU transform");
                Self::cpu(sizes, direction)
            }
        }
    }

    pub fn is_gpu(&self) -> bool {
        matches!(self, DynamicTransform::Gpu(_))
    }
}

impl Transform for DynamicTransform {
    fn sizes(&self) -> [u32; 3] {
        match self {
            DynamicTransform::Cpu(t) => Transform::sizes(t),
            DynamicTransform::Gpu(t) => t.sizes(),
        }
    }

    fn direction(&self) -> Direction {
        match self {
            DynamicTransform::Cpu(t) => Transform::direction(t),
            DynamicTransform::Gpu(t) => t.direction(),
        }
    }

    fn process(&mut self, samples: &[Complex32]) -> Result<Vec<Complex32>, FftError> {
        match self {
            DynamicTransform::Cpu(t) => Transform::process(t, samples),
            DynamicTransform::Gpu(t) => t.process(samples),
        }
    }
}
