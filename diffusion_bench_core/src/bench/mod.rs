mod plan;

use std::{
    fmt::Display,
    io::Write,
    time::{Duration, Instant},
};

use image::DynamicImage;
use tracing::info;

use crate::pipelines::{GenerationRequest, TextToImage};

pub use plan::{run_plan, run_plan_into, BenchCase, BenchPlan};

const LABEL_WIDTH: usize = 32;
const TIME_WIDTH: usize = 16;

/// One timed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkRecord {
    pub label: String,
    pub elapsed: Duration,
}

/// Ordered list of timed runs.
#[derive(Debug, Clone, Default)]
pub struct Benchmark {
    records: Vec<BenchmarkRecord>,
}

impl Benchmark {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records in the order they were timed.
    pub fn records(&self) -> &[BenchmarkRecord] {
        &self.records
    }

    pub fn record<S: ToString>(&mut self, label: S, elapsed: Duration) {
        let label = label.to_string();
        info!("{label} took {:.2}s.", elapsed.as_secs_f32());
        self.records.push(BenchmarkRecord { label, elapsed });
    }

    /// Time `f` and record the elapsed wall-clock time under `label`.
    ///
    /// Nothing is recorded if `f` fails.
    pub fn time<S, T, F>(&mut self, label: S, f: F) -> anyhow::Result<T>
    where
        S: ToString,
        F: FnOnce() -> anyhow::Result<T>,
    {
        let start = Instant::now();
        let out = f()?;
        let elapsed = start.elapsed();
        self.record(label, elapsed);
        Ok(out)
    }

    /// Time a single generation call.
    ///
    /// With `warmup`, the request is first run once untimed so one-time costs such as graph
    /// tracing stay out of the measurement.
    pub fn time_generation<S: ToString>(
        &mut self,
        label: S,
        model: &mut dyn TextToImage,
        request: &GenerationRequest,
        warmup: bool,
    ) -> anyhow::Result<Vec<DynamicImage>> {
        if warmup {
            info!("warming up {} model.", model.name());
            model.generate(request)?;
        }
        self.time(label, || model.generate(request))
    }

    /// Print the two-column report, one line per record.
    pub fn write_report<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        write!(writer, "{self}")
    }
}

impl Display for Benchmark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{:<LABEL_WIDTH$}{:>TIME_WIDTH$}",
            "Model", "Running time"
        )?;
        for BenchmarkRecord { label, elapsed } in &self.records {
            let secs = format!("{:.2}s", elapsed.as_secs_f64());
            writeln!(f, "{label:<LABEL_WIDTH$}{secs:>TIME_WIDTH$}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{ImageSize, ModelConfig},
        pipelines::{SyntheticPipeline, SyntheticTiming},
    };

    fn small_config() -> ModelConfig {
        ModelConfig::default().with_size(ImageSize::new(8, 8))
    }

    #[test]
    fn records_keep_call_order() -> anyhow::Result<()> {
        let mut bench = Benchmark::new();
        let mut model = SyntheticPipeline::new(small_config(), SyntheticTiming::instant());
        let request = GenerationRequest::new("An avocado armchair", 1);
        for label in ["first", "second", "third", "fourth"] {
            bench.time_generation(label, &mut model, &request, false)?;
        }
        let labels = bench
            .records()
            .iter()
            .map(|r| r.label.as_str())
            .collect::<Vec<_>>();
        assert_eq!(labels, ["first", "second", "third", "fourth"]);
        Ok(())
    }

    #[test]
    fn warmup_is_not_timed() -> anyhow::Result<()> {
        const TRACE: Duration = Duration::from_millis(300);
        let timing = SyntheticTiming {
            trace_cost: TRACE,
            ..SyntheticTiming::instant()
        };
        let request = GenerationRequest::new("An avocado armchair", 1);
        let mut bench = Benchmark::new();

        let mut cold = SyntheticPipeline::new(small_config().with_jit_compile(true), timing.clone());
        bench.time_generation("cold", &mut cold, &request, false)?;
        let mut warm = SyntheticPipeline::new(small_config().with_jit_compile(true), timing);
        bench.time_generation("warm", &mut warm, &request, true)?;

        assert!(bench.records()[0].elapsed >= TRACE);
        assert!(bench.records()[1].elapsed < TRACE);
        Ok(())
    }

    #[test]
    fn failed_runs_are_not_recorded() {
        let mut bench = Benchmark::new();
        let out: anyhow::Result<()> = bench.time("broken", || anyhow::bail!("out of memory"));
        assert_eq!(out.unwrap_err().to_string(), "out of memory");
        assert!(bench.records().is_empty());
    }

    #[test]
    fn report_has_one_line_per_record() -> anyhow::Result<()> {
        let mut bench = Benchmark::new();
        bench.record("Standard", Duration::from_millis(12_340));
        bench.record("Mixed Precision", Duration::from_millis(6_500));
        bench.record("JIT Compiled", Duration::ZERO);

        let mut out = Vec::new();
        bench.write_report(&mut out)?;
        let out = String::from_utf8(out)?;
        let lines = out.lines().collect::<Vec<_>>();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Model"));
        assert!(lines[0].ends_with("Running time"));
        assert!(lines[1].starts_with("Standard") && lines[1].ends_with("12.34s"));
        assert!(lines[2].starts_with("Mixed Precision") && lines[2].ends_with("6.50s"));
        assert!(lines[3].starts_with("JIT Compiled") && lines[3].ends_with("0.00s"));
        assert!(lines
            .iter()
            .all(|line| line.len() == LABEL_WIDTH + TIME_WIDTH));
        Ok(())
    }
}
