#[cfg(feature = "diffusion-rs")]
mod diffusion_rs;
mod synthetic;

use image::DynamicImage;
use tracing::info;

use crate::config::ModelConfig;

#[cfg(feature = "diffusion-rs")]
pub use diffusion_rs::{DiffusionRsPipeline, HubSource};
pub use synthetic::{SyntheticPipeline, SyntheticTiming};

/// A single generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    /// How many images to produce for the prompt.
    pub batch_size: usize,
    /// Seed for backends which support reproducible sampling.
    pub seed: Option<u64>,
}

impl GenerationRequest {
    pub fn new<S: ToString>(prompt: S, batch_size: usize) -> Self {
        Self {
            prompt: prompt.to_string(),
            batch_size,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
}

/// A constructed text-to-image model.
///
/// `generate` blocks until the whole batch is available. Errors come straight from the
/// underlying model and are not translated.
pub trait TextToImage {
    fn name(&self) -> &'static str;
    fn config(&self) -> &ModelConfig;
    fn generate(&mut self, request: &GenerationRequest) -> anyhow::Result<Vec<DynamicImage>>;
}

/// Where models come from.
#[derive(Debug, Clone)]
pub enum Backend {
    /// In-process model producing deterministic images with a simulated cost profile.
    Synthetic(SyntheticTiming),
    /// A Hugging Face diffusion pipeline run through `diffusion_rs_core`.
    #[cfg(feature = "diffusion-rs")]
    DiffusionRs(HubSource),
}

impl Default for Backend {
    fn default() -> Self {
        Self::Synthetic(SyntheticTiming::default())
    }
}

impl Backend {
    /// Construct a ready-to-use model.
    pub fn load(&self, config: &ModelConfig) -> anyhow::Result<Box<dyn TextToImage>> {
        info!(
            "constructing model: size {}, precision {}, jit compile {}.",
            config.size, config.precision, config.jit_compile
        );
        match self {
            Self::Synthetic(timing) => Ok(Box::new(SyntheticPipeline::new(
                config.clone(),
                timing.clone(),
            ))),
            #[cfg(feature = "diffusion-rs")]
            Self::DiffusionRs(source) => Ok(Box::new(DiffusionRsPipeline::load(
                source,
                config.clone(),
            )?)),
        }
    }
}

/// Holds at most one loaded model so that successive configurations do not pile up in memory.
#[derive(Default)]
pub struct Session {
    model: Option<Box<dyn TextToImage>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a model, releasing the previously loaded one first.
    pub fn load(
        &mut self,
        backend: &Backend,
        config: &ModelConfig,
    ) -> anyhow::Result<&mut dyn TextToImage> {
        self.clear();
        let model = backend.load(config)?;
        Ok(self.model.insert(model).as_mut())
    }

    /// Drop the current model, if any.
    pub fn clear(&mut self) {
        if let Some(model) = self.model.take() {
            info!("clearing session, releasing {} model.", model.name());
        }
    }
}
