use std::{thread, time::Duration};

use image::{DynamicImage, Rgb, RgbImage};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::debug;

use super::{GenerationRequest, TextToImage};
use crate::config::{ModelConfig, Precision};

/// Simulated cost profile of the synthetic model.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticTiming {
    /// Cost of one denoising step for one image at full precision.
    pub step_cost: Duration,
    /// One-time cost of the first call on a compiled model.
    pub trace_cost: Duration,
    /// Step cost divisor under mixed precision.
    pub mixed_speedup: f64,
    /// Step cost divisor once the graph is compiled.
    pub compiled_speedup: f64,
}

impl Default for SyntheticTiming {
    fn default() -> Self {
        Self {
            step_cost: Duration::from_millis(4),
            trace_cost: Duration::from_secs(2),
            mixed_speedup: 2.0,
            compiled_speedup: 1.5,
        }
    }
}

impl SyntheticTiming {
    /// No simulated cost at all.
    pub fn instant() -> Self {
        Self {
            step_cost: Duration::ZERO,
            trace_cost: Duration::ZERO,
            mixed_speedup: 1.0,
            compiled_speedup: 1.0,
        }
    }
}

/// Stand-in for a real diffusion pipeline.
///
/// It keeps the generation contract (exactly `batch_size` images at the configured resolution,
/// identical pixels for identical prompt and seed) and sleeps according to [`SyntheticTiming`]
/// instead of running a network.
pub struct SyntheticPipeline {
    config: ModelConfig,
    timing: SyntheticTiming,
    traced: bool,
}

impl SyntheticPipeline {
    pub fn new(config: ModelConfig, timing: SyntheticTiming) -> Self {
        Self {
            config,
            timing,
            traced: false,
        }
    }

    fn step_cost(&self) -> Duration {
        let mut speedup = 1.0;
        if self.config.precision == Precision::Mixed {
            speedup *= self.timing.mixed_speedup;
        }
        if self.config.jit_compile {
            speedup *= self.timing.compiled_speedup;
        }
        self.timing.step_cost.div_f64(speedup)
    }

    fn render(&self, rng: &mut StdRng) -> DynamicImage {
        let width = self.config.size.width;
        let height = self.config.size.height;
        let base: [u8; 3] = rng.gen();
        let image = RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                base[0].wrapping_add((x * 255 / width.max(1)) as u8),
                base[1].wrapping_add((y * 255 / height.max(1)) as u8),
                base[2],
            ])
        });
        DynamicImage::ImageRgb8(image)
    }
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// FNV-1a over the prompt bytes followed by the little-endian seed, so the same prompt and seed
/// give the same pixels on every platform and toolchain.
fn seed_for(prompt: &str, seed: Option<u64>) -> u64 {
    let seed: u64 = seed.unwrap_or_else(rand::random);
    prompt
        .bytes()
        .chain(seed.to_le_bytes())
        .fold(FNV_OFFSET, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
        })
}

impl TextToImage for SyntheticPipeline {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn generate(&mut self, request: &GenerationRequest) -> anyhow::Result<Vec<DynamicImage>> {
        if self.config.jit_compile && !self.traced {
            debug!("tracing model graph, first call is slower.");
            thread::sleep(self.timing.trace_cost);
            self.traced = true;
        }

        let steps = self.config.num_steps * request.batch_size;
        thread::sleep(self.step_cost().mul_f64(steps as f64));

        let mut rng = StdRng::seed_from_u64(seed_for(&request.prompt, request.seed));
        Ok((0..request.batch_size)
            .map(|_| self.render(&mut rng))
            .collect())
    }
}
