use diffusion_rs_core::{
    DiffusionGenerationParams, ModelDType, ModelSource, Pipeline, TokenSource,
};
use image::DynamicImage;
use tracing::{info, warn};

use super::{GenerationRequest, TextToImage};
use crate::config::{ModelConfig, Precision};

/// Location of a diffusers-format model on the Hugging Face hub (or a local path).
#[derive(Debug, Clone)]
pub struct HubSource {
    pub model_id: String,
    /// Hugging Face token. When `None`, the token at ~/.cache/huggingface/token is used.
    pub token: Option<String>,
    pub revision: Option<String>,
}

impl HubSource {
    pub fn from_model_id<S: ToString>(model_id: S) -> Self {
        Self {
            model_id: model_id.to_string(),
            token: None,
            revision: None,
        }
    }
}

/// A `diffusion_rs_core` pipeline driven through the [`TextToImage`] seam.
pub struct DiffusionRsPipeline {
    pipeline: Pipeline,
    config: ModelConfig,
}

impl DiffusionRsPipeline {
    pub fn load(source: &HubSource, config: ModelConfig) -> anyhow::Result<Self> {
        let dtype = match config.precision {
            Precision::Full => ModelDType::F32,
            // BF16 -> F16 -> F32 depending on what the device supports.
            Precision::Mixed => ModelDType::Auto,
        };
        if config.jit_compile {
            warn!("diffusion_rs pipelines have no graph compiler, ignoring jit compile.");
        }
        let token = source
            .token
            .clone()
            .map(TokenSource::Literal)
            .unwrap_or(TokenSource::CacheToken);

        info!("loading `{}` with dtype {dtype}.", source.model_id);
        let pipeline = Pipeline::load(
            ModelSource::from_model_id(&source.model_id),
            false,
            token,
            source.revision.clone(),
            None,
            &dtype,
        )?;

        Ok(Self { pipeline, config })
    }
}

impl TextToImage for DiffusionRsPipeline {
    fn name(&self) -> &'static str {
        "diffusion_rs"
    }

    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn generate(&mut self, request: &GenerationRequest) -> anyhow::Result<Vec<DynamicImage>> {
        if request.seed.is_some() {
            warn!("diffusion_rs pipelines do not take a seed, ignoring it.");
        }
        self.pipeline.forward(
            vec![request.prompt.clone(); request.batch_size],
            DiffusionGenerationParams {
                height: self.config.size.height as usize,
                width: self.config.size.width as usize,
                num_steps: self.config.num_steps,
                guidance_scale: self.config.guidance_scale,
            },
        )
    }
}
