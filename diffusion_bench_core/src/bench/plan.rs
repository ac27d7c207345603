use std::{fs, path::Path};

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::Benchmark;
use crate::{
    config::{ImageSize, ModelConfig, Precision, DEFAULT_GUIDANCE_SCALE, DEFAULT_NUM_STEPS},
    error::{BenchError, Result},
    pipelines::{Backend, GenerationRequest, Session},
};

pub const DEFAULT_PROMPT: &str = "An avocado armchair";
pub const DEFAULT_BATCH_SIZE: usize = 3;

/// A named model configuration to benchmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BenchCaseFile")]
pub struct BenchCase {
    pub label: String,
    pub precision: Precision,
    pub jit_compile: bool,
    /// Run the request once, untimed, before measuring.
    pub warmup: bool,
}

/// On-disk form of a case. A missing `warmup` follows `jit_compile`.
#[derive(Deserialize)]
struct BenchCaseFile {
    label: String,
    #[serde(default)]
    precision: Precision,
    #[serde(default)]
    jit_compile: bool,
    warmup: Option<bool>,
}

impl From<BenchCaseFile> for BenchCase {
    fn from(file: BenchCaseFile) -> Self {
        let mut case = Self::new(file.label, file.precision, file.jit_compile);
        if let Some(warmup) = file.warmup {
            case.warmup = warmup;
        }
        case
    }
}

impl BenchCase {
    pub fn new<S: ToString>(label: S, precision: Precision, jit_compile: bool) -> Self {
        Self {
            label: label.to_string(),
            precision,
            jit_compile,
            // Compiled models pay their tracing cost on the first call.
            warmup: jit_compile,
        }
    }
}

/// What to generate and which configurations to time it under.
///
/// Plans can be read from JSON; any field left out takes its default.
///
/// ```json
/// {
///     "prompt": "A watercolor lighthouse",
///     "batch_size": 2,
///     "cases": [{ "label": "Mixed", "precision": "mixed" }]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchPlan {
    pub prompt: String,
    pub batch_size: usize,
    pub seed: Option<u64>,
    pub size: ImageSize,
    pub num_steps: usize,
    pub guidance_scale: f64,
    pub cases: Vec<BenchCase>,
}

impl Default for BenchPlan {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            seed: None,
            size: ImageSize::default(),
            num_steps: DEFAULT_NUM_STEPS,
            guidance_scale: DEFAULT_GUIDANCE_SCALE,
            cases: vec![
                BenchCase::new("Standard", Precision::Full, false),
                BenchCase::new("Mixed Precision", Precision::Mixed, false),
                BenchCase::new("JIT Compiled", Precision::Full, true),
                BenchCase::new("Mixed Precision + JIT", Precision::Mixed, true),
            ],
        }
    }
}

impl BenchPlan {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| BenchError::PlanIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn request(&self) -> GenerationRequest {
        GenerationRequest::new(&self.prompt, self.batch_size).with_seed(self.seed)
    }

    pub fn model_config(&self, case: &BenchCase) -> ModelConfig {
        ModelConfig::default()
            .with_size(self.size)
            .with_precision(case.precision)
            .with_jit_compile(case.jit_compile)
            .with_num_steps(self.num_steps)
            .with_guidance_scale(self.guidance_scale)
    }
}

/// Time one generation per case, in plan order.
///
/// Each case gets a freshly constructed model which is released before the next case is
/// loaded. `on_batch` sees every timed batch.
pub fn run_plan<F>(backend: &Backend, plan: &BenchPlan, on_batch: F) -> anyhow::Result<Benchmark>
where
    F: FnMut(&BenchCase, &[DynamicImage]) -> anyhow::Result<()>,
{
    let mut bench = Benchmark::new();
    run_plan_into(backend, plan, &mut bench, on_batch)?;
    Ok(bench)
}

/// Like [`run_plan`], but records into `bench` so the cases which finished before an error
/// are still available to the caller.
pub fn run_plan_into<F>(
    backend: &Backend,
    plan: &BenchPlan,
    bench: &mut Benchmark,
    mut on_batch: F,
) -> anyhow::Result<()>
where
    F: FnMut(&BenchCase, &[DynamicImage]) -> anyhow::Result<()>,
{
    let request = plan.request();
    let mut session = Session::new();

    for (i, case) in plan.cases.iter().enumerate() {
        info!(
            "running case {}/{}: {}.",
            i + 1,
            plan.cases.len(),
            case.label
        );
        let model = session.load(backend, &plan.model_config(case))?;
        info!(
            "loaded {} model at {}, precision {}.",
            model.name(),
            model.config().size,
            model.config().precision
        );
        let images = bench.time_generation(&case.label, model, &request, case.warmup)?;
        on_batch(case, &images)?;
        session.clear();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipelines::SyntheticTiming;

    #[test]
    fn default_plan_has_four_cases() {
        let plan = BenchPlan::default();
        let labels = plan
            .cases
            .iter()
            .map(|c| c.label.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            labels,
            [
                "Standard",
                "Mixed Precision",
                "JIT Compiled",
                "Mixed Precision + JIT"
            ]
        );
        assert!(plan.cases.iter().all(|c| c.warmup == c.jit_compile));
        assert_eq!(plan.request(), GenerationRequest::new(DEFAULT_PROMPT, 3));
    }

    #[test]
    fn partial_json_takes_defaults() -> anyhow::Result<()> {
        let plan = BenchPlan::from_json(
            r#"{
                "prompt": "A watercolor lighthouse",
                "seed": 11,
                "cases": [
                    { "label": "Mixed", "precision": "mixed" },
                    { "label": "JIT Compiled", "jit_compile": true },
                    { "label": "Cold JIT", "jit_compile": true, "warmup": false }
                ]
            }"#,
        )?;
        assert_eq!(plan.prompt, "A watercolor lighthouse");
        assert_eq!(plan.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(plan.seed, Some(11));
        assert_eq!(plan.size, ImageSize::new(512, 512));
        assert_eq!(
            plan.cases,
            [
                BenchCase {
                    label: "Mixed".to_string(),
                    precision: Precision::Mixed,
                    jit_compile: false,
                    warmup: false,
                },
                BenchCase::new("JIT Compiled", Precision::Full, true),
                BenchCase {
                    label: "Cold JIT".to_string(),
                    precision: Precision::Full,
                    jit_compile: true,
                    warmup: false,
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn jit_case_from_json_skips_trace_cost() -> anyhow::Result<()> {
        const TRACE: std::time::Duration = std::time::Duration::from_millis(300);
        let mut plan =
            BenchPlan::from_json(r#"{ "cases": [{ "label": "JIT Compiled", "jit_compile": true }] }"#)?;
        plan.size = ImageSize::new(8, 8);
        let backend = Backend::Synthetic(SyntheticTiming {
            trace_cost: TRACE,
            ..SyntheticTiming::instant()
        });
        let bench = run_plan(&backend, &plan, |_, _| Ok(()))?;
        assert_eq!(bench.records().len(), 1);
        assert!(bench.records()[0].elapsed < TRACE);
        Ok(())
    }

    #[test]
    fn finished_cases_survive_a_later_failure() {
        let plan = BenchPlan {
            size: ImageSize::new(8, 8),
            ..BenchPlan::default()
        };
        let mut bench = Benchmark::new();
        let mut seen = 0;
        let err = run_plan_into(
            &Backend::Synthetic(SyntheticTiming::instant()),
            &plan,
            &mut bench,
            |case, _| {
                seen += 1;
                if seen == 3 {
                    anyhow::bail!("disk full while saving `{}`", case.label);
                }
                Ok(())
            },
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "disk full while saving `JIT Compiled`");
        let labels = bench
            .records()
            .iter()
            .map(|r| r.label.as_str())
            .collect::<Vec<_>>();
        assert_eq!(labels, ["Standard", "Mixed Precision", "JIT Compiled"]);
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        assert!(matches!(
            BenchPlan::from_json("{ \"batch_size\": \"three\" }"),
            Err(BenchError::PlanParse(_))
        ));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = BenchPlan::from_file("/nonexistent/plan.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/plan.json"));
    }

    #[test]
    fn model_config_follows_case() {
        let plan = BenchPlan {
            num_steps: 4,
            ..BenchPlan::default()
        };
        let config = plan.model_config(&plan.cases[3]);
        assert_eq!(config.precision, Precision::Mixed);
        assert!(config.jit_compile);
        assert_eq!(config.num_steps, 4);
    }

    #[test]
    fn runs_every_case_in_order() -> anyhow::Result<()> {
        let plan = BenchPlan {
            size: ImageSize::new(16, 16),
            ..BenchPlan::default()
        };
        let mut seen = Vec::new();
        let bench = run_plan(
            &Backend::Synthetic(SyntheticTiming::instant()),
            &plan,
            |case, images| {
                seen.push((case.label.clone(), images.len()));
                Ok(())
            },
        )?;

        let recorded = bench
            .records()
            .iter()
            .map(|r| r.label.clone())
            .collect::<Vec<_>>();
        let expected = plan
            .cases
            .iter()
            .map(|c| c.label.clone())
            .collect::<Vec<_>>();
        assert_eq!(recorded, expected);
        assert!(seen.iter().all(|(_, n)| *n == 3));
        assert_eq!(seen.len(), 4);
        Ok(())
    }
}
