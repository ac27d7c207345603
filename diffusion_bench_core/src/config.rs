use std::fmt::Display;

use serde::{Deserialize, Serialize};

pub const DEFAULT_RESOLUTION: u32 = 512;
pub const DEFAULT_NUM_STEPS: usize = 50;
pub const DEFAULT_GUIDANCE_SCALE: f64 = 7.5;

/// Output resolution in pixels. This must be a resolution the model supports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for ImageSize {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLUTION, DEFAULT_RESOLUTION)
    }
}

impl Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Clone, Copy, Default, Debug, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
/// Numeric precision policy for a model.
///
/// - Full: compute and store everything in f32.
/// - Mixed: compute in a narrower float format (bf16, falling back to f16) while keeping
///   the stored weights in the wider format.
///
/// This is part of the model configuration, so two models built in the same process never
/// influence each other.
pub enum Precision {
    #[default]
    #[serde(rename = "full")]
    Full,
    #[serde(rename = "mixed")]
    Mixed,
}

impl Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Mixed => write!(f, "mixed"),
        }
    }
}

/// Everything needed to construct a generation model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub size: ImageSize,
    pub precision: Precision,
    /// Compile the model graph ahead of the first call. The first generation pays a one-time
    /// tracing cost, later ones run faster.
    pub jit_compile: bool,
    /// The number of denoising steps.
    pub num_steps: usize,
    /// Higher guidance scale keeps the image closer to the prompt, usually at the expense of
    /// image quality.
    pub guidance_scale: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            size: ImageSize::default(),
            precision: Precision::default(),
            jit_compile: false,
            num_steps: DEFAULT_NUM_STEPS,
            guidance_scale: DEFAULT_GUIDANCE_SCALE,
        }
    }
}

impl ModelConfig {
    pub fn with_size(mut self, size: ImageSize) -> Self {
        self.size = size;
        self
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_jit_compile(mut self, jit_compile: bool) -> Self {
        self.jit_compile = jit_compile;
        self
    }

    pub fn with_num_steps(mut self, num_steps: usize) -> Self {
        self.num_steps = num_steps;
        self
    }

    pub fn with_guidance_scale(mut self, guidance_scale: f64) -> Self {
        self.guidance_scale = guidance_scale;
        self
    }
}
