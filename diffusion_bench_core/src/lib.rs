//! Core crate for benchmarking text-to-image diffusion pipelines.
//!
//! A model is constructed from an explicit [`ModelConfig`] (resolution, precision policy and
//! ahead-of-time compilation), asked for a batch of images, and timed with a [`Benchmark`].
//!
//! ```rust,no_run
//! use diffusion_bench_core::{
//!     save_grid, Backend, Benchmark, GenerationRequest, ModelConfig, Precision,
//! };
//!
//! let backend = Backend::default();
//! let request = GenerationRequest::new("An avocado armchair", 3);
//! let mut bench = Benchmark::new();
//!
//! let mut model = backend.load(&ModelConfig::default())?;
//! bench.time_generation("Standard", model.as_mut(), &request, false)?;
//! drop(model);
//!
//! let mut model = backend.load(
//!     &ModelConfig::default()
//!         .with_precision(Precision::Mixed)
//!         .with_jit_compile(true),
//! )?;
//! let images = bench.time_generation("Mixed Precision + JIT", model.as_mut(), &request, true)?;
//!
//! print!("{bench}");
//! save_grid(&images, "avocado.png")?;
//!
//! # Ok::<(), anyhow::Error>(())
//! ```

mod bench;
mod config;
mod display;
mod error;
mod pipelines;

pub use bench::{run_plan, run_plan_into, BenchCase, BenchPlan, Benchmark, BenchmarkRecord};
pub use config::{ImageSize, ModelConfig, Precision};
pub use display::{image_grid, save_grid};
pub use error::{BenchError, Result};
#[cfg(feature = "diffusion-rs")]
pub use pipelines::{DiffusionRsPipeline, HubSource};
pub use pipelines::{
    Backend, GenerationRequest, Session, SyntheticPipeline, SyntheticTiming, TextToImage,
};
