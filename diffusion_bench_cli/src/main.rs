use cliclack::input;
use std::{path::PathBuf, time::Instant};

use clap::{Args, Parser, Subcommand, ValueEnum};
use diffusion_bench_core::{
    run_plan_into, save_grid, Backend, BenchPlan, Benchmark, GenerationRequest, ModelConfig,
    Precision, Session, SyntheticTiming,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const DEFAULT_MODEL_ID: &str = "stabilityai/stable-diffusion-2-1-base";

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    /// Deterministic in-process model with a simulated cost profile. Needs no weights.
    #[value(name = "synthetic")]
    Synthetic,
    /// Real diffusion pipeline through diffusion_rs.
    #[cfg(feature = "diffusion-rs")]
    #[value(name = "diffusion-rs")]
    DiffusionRs,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Time generation under a series of model configurations and print a report.
    Bench {
        /// JSON benchmark plan. Defaults to standard, mixed precision, JIT and mixed precision + JIT.
        #[arg(long)]
        plan: Option<PathBuf>,

        /// Override the plan's prompt.
        #[arg(short, long)]
        prompt: Option<String>,

        /// Override the plan's batch size.
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Override the plan's seed.
        #[arg(long)]
        seed: Option<u64>,

        /// Save the last generated batch side by side to this file.
        #[arg(long)]
        grid: Option<PathBuf>,
    },

    /// Generate a single batch and save it side by side.
    Generate {
        #[arg(short, long)]
        prompt: String,

        #[arg(short, long, default_value_t = 3)]
        batch_size: usize,

        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        model: ModelFlags,

        /// Output image path (.png or .jpg).
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Load a model once and generate from prompts entered interactively.
    Interactive {
        #[command(flatten)]
        model: ModelFlags,
    },
}

#[derive(Debug, Args)]
struct ModelFlags {
    /// Numeric precision policy.
    #[arg(long, default_value = "full")]
    precision: Precision,

    /// Compile the model graph ahead of the first call.
    #[arg(long)]
    jit: bool,
}

#[derive(Parser)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Which model backend to use.
    #[arg(long, default_value = "synthetic")]
    backend: BackendKind,

    /// Model ID (local path or Hugging Face model ID). Only used by the diffusion-rs backend.
    #[arg(long, default_value = DEFAULT_MODEL_ID)]
    #[cfg_attr(not(feature = "diffusion-rs"), allow(dead_code))]
    model_id: String,

    /// Hugging Face token. Useful for accessing gated repositories.
    /// By default, the Hugging Face token at ~/.cache/huggingface/token is used.
    #[arg(long)]
    #[cfg_attr(not(feature = "diffusion-rs"), allow(dead_code))]
    token: Option<String>,

    /// Image width in pixels. Must be supported by the model. Defaults to 512, or the plan's value.
    #[arg(long)]
    width: Option<u32>,

    /// Image height in pixels. Must be supported by the model. Defaults to 512, or the plan's value.
    #[arg(long)]
    height: Option<u32>,

    /// Number of denoising steps. Defaults to 50, or the plan's value.
    #[arg(short, long)]
    num_steps: Option<usize>,

    /// Guidance scale to use. Defaults to 7.5, or the plan's value.
    #[arg(short, long)]
    scale: Option<f64>,
}

impl Cli {
    fn backend(&self) -> Backend {
        match self.backend {
            BackendKind::Synthetic => Backend::Synthetic(SyntheticTiming::default()),
            #[cfg(feature = "diffusion-rs")]
            BackendKind::DiffusionRs => {
                Backend::DiffusionRs(diffusion_bench_core::HubSource {
                    model_id: self.model_id.clone(),
                    token: self.token.clone(),
                    revision: None,
                })
            }
        }
    }

    fn model_config(&self, flags: &ModelFlags) -> ModelConfig {
        let mut config = ModelConfig::default()
            .with_precision(flags.precision)
            .with_jit_compile(flags.jit);
        if let Some(width) = self.width {
            config.size.width = width;
        }
        if let Some(height) = self.height {
            config.size.height = height;
        }
        if let Some(num_steps) = self.num_steps {
            config.num_steps = num_steps;
        }
        if let Some(scale) = self.scale {
            config.guidance_scale = scale;
        }
        config
    }

    /// Apply the global model options on top of a plan.
    fn override_plan(&self, plan: &mut BenchPlan) {
        if let Some(width) = self.width {
            plan.size.width = width;
        }
        if let Some(height) = self.height {
            plan.size.height = height;
        }
        if let Some(num_steps) = self.num_steps {
            plan.num_steps = num_steps;
        }
        if let Some(scale) = self.scale {
            plan.guidance_scale = scale;
        }
    }
}

fn bench(
    cli: &Cli,
    plan: Option<PathBuf>,
    prompt: Option<String>,
    batch_size: Option<usize>,
    seed: Option<u64>,
    grid: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut plan = match plan {
        Some(path) => BenchPlan::from_file(path)?,
        None => BenchPlan::default(),
    };
    cli.override_plan(&mut plan);
    if let Some(prompt) = prompt {
        plan.prompt = prompt;
    }
    if let Some(batch_size) = batch_size {
        plan.batch_size = batch_size;
    }
    if seed.is_some() {
        plan.seed = seed;
    }

    let mut last_batch = Vec::new();
    let mut bench = Benchmark::new();
    let run = run_plan_into(&cli.backend(), &plan, &mut bench, |_, images| {
        last_batch = images.to_vec();
        Ok(())
    });

    // Report whatever finished, even if a later case failed.
    bench.write_report(std::io::stdout().lock())?;
    run?;

    if let Some(path) = grid {
        save_grid(&last_batch, path)?;
    }
    Ok(())
}

fn generate(
    cli: &Cli,
    request: GenerationRequest,
    flags: &ModelFlags,
    out: PathBuf,
) -> anyhow::Result<()> {
    let mut model = cli.backend().load(&cli.model_config(flags))?;

    let start = Instant::now();
    let images = model.generate(&request)?;
    let end = Instant::now();
    println!(
        "Image generation took: {:.2}s",
        end.duration_since(start).as_secs_f32()
    );

    save_grid(&images, out)?;
    Ok(())
}

fn interactive(cli: &Cli, flags: &ModelFlags) -> anyhow::Result<()> {
    let mut session = Session::new();
    let model = session.load(&cli.backend(), &cli.model_config(flags))?;

    let batch_size: usize = input("Batch size:")
        .default_input("1")
        .validate(|input: &String| {
            if input.parse::<usize>().map_err(|e| e.to_string())? == 0 {
                Err("Nonzero value is required!".to_string())
            } else {
                Ok(())
            }
        })
        .interact()?;

    loop {
        let prompt: String = input("Prompt:")
            .validate(|input: &String| {
                if input.is_empty() {
                    Err("Prompt is required!")
                } else {
                    Ok(())
                }
            })
            .interact()?;

        let start = Instant::now();
        let images = model.generate(&GenerationRequest::new(prompt, batch_size))?;
        let end = Instant::now();
        println!(
            "Image generation took: {:.2}s",
            end.duration_since(start).as_secs_f32()
        );

        let out_file: String = input("Save images to:")
            .validate(|input: &String| {
                if input.is_empty() {
                    Err("Image path is required!")
                } else {
                    let path = PathBuf::from(input);
                    let ext = path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .ok_or("Extension is required!")?;
                    if !["png", "jpg"].contains(&ext) {
                        Err(".png or .jpg extension is required!")
                    } else {
                        Ok(())
                    }
                }
            })
            .interact()?;

        save_grid(&images, out_file)?;
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Command::Bench {
            plan,
            prompt,
            batch_size,
            seed,
            grid,
        } => bench(
            &cli,
            plan.clone(),
            prompt.clone(),
            *batch_size,
            *seed,
            grid.clone(),
        ),
        Command::Generate {
            prompt,
            batch_size,
            seed,
            model,
            out,
        } => generate(
            &cli,
            GenerationRequest::new(prompt, *batch_size).with_seed(*seed),
            model,
            out.clone(),
        ),
        Command::Interactive { model } => interactive(&cli, model),
    }
}
