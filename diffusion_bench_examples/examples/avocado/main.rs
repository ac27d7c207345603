use diffusion_bench_core::{run_plan, save_grid, Backend, BenchPlan, SyntheticTiming};

use clap::Parser;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
struct Args {
    /// Prompt to use
    #[arg(short, long, default_value = "An avocado armchair")]
    prompt: String,

    /// Number of images per generation
    #[arg(short, long, default_value_t = 3)]
    batch_size: usize,

    /// Save each configuration's batch as `<prefix>_<n>.png`
    #[arg(long)]
    prefix: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let plan = BenchPlan {
        prompt: args.prompt,
        batch_size: args.batch_size,
        ..BenchPlan::default()
    };

    let mut n = 0;
    let bench = run_plan(
        &Backend::Synthetic(SyntheticTiming::default()),
        &plan,
        |case, images| {
            info!("`{}` returned {} images.", case.label, images.len());
            if let Some(prefix) = &args.prefix {
                save_grid(images, format!("{prefix}_{n}.png"))?;
            }
            n += 1;
            Ok(())
        },
    )?;

    print!("{bench}");

    Ok(())
}
