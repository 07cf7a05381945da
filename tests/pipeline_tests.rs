// tests/pipeline_tests.rs

use duoq::flavors::grid::{GridDevice, GridToolkit};
use duoq::flavors::register::{Backend, BasicProvider, RegisterToolkit};
use duoq::pipeline::{FALLBACK_MESSAGE, run_comparison, run_grid_pipeline, run_register_pipeline};
use duoq::{
    BackendError, Circuit, ConfigError, ConstructionError, Counts, ExperimentConfig, Gate, GateSet, PipelineError, QuantumError,
    QuantumToolkit,
};

type TestResult = Result<(), Box<dyn std::error::Error>>;

// Runs `f` against an in-memory writer and returns what it printed
fn capture<T, F>(f: F) -> Result<(T, String), PipelineError>
where
    F: FnOnce(&mut Vec<u8>) -> Result<T, PipelineError>,
{
    let mut out = Vec::new();
    let value = f(&mut out)?;
    Ok((value, String::from_utf8_lossy(&out).into_owned()))
}

fn seeded(repetitions: usize, num_qubits: usize, gates: Vec<Gate>) -> Result<ExperimentConfig, ConfigError> {
    ExperimentConfig::new(repetitions, num_qubits, gates, Some(11))
}

/// A toolkit whose construction always fails with a fixed error.
struct BrokenToolkit {
    error: ConstructionError,
}

impl QuantumToolkit for BrokenToolkit {
    type Outcome = Counts;

    fn name(&self) -> &str {
        "broken"
    }

    fn build_circuit(&self, _gates: &[Gate], _targets: &[usize]) -> Result<Circuit, ConstructionError> {
        Err(self.error.clone())
    }

    fn render(&self, _circuit: &Circuit) -> String {
        String::new()
    }

    fn execute(&self, _circuit: &Circuit, _repetitions: usize) -> Result<Counts, BackendError> {
        Ok(Counts::new())
    }

    fn counts(&self, outcome: &Counts) -> Counts {
        outcome.clone()
    }
}

/// Builds and renders like `inner`, but every run fails.
struct FailingRunToolkit {
    inner: GridToolkit,
}

impl QuantumToolkit for FailingRunToolkit {
    type Outcome = Counts;

    fn name(&self) -> &str {
        "failing"
    }

    fn build_circuit(&self, gates: &[Gate], targets: &[usize]) -> Result<Circuit, ConstructionError> {
        self.inner.build_circuit(gates, targets)
    }

    fn render(&self, circuit: &Circuit) -> String {
        self.inner.render(circuit)
    }

    fn execute(&self, _circuit: &Circuit, _repetitions: usize) -> Result<Counts, BackendError> {
        Err(BackendError::Execution(QuantumError::SimulationError {
            message: "device lost".to_string(),
        }))
    }

    fn counts(&self, outcome: &Counts) -> Counts {
        outcome.clone()
    }
}

#[test]
fn test_grid_pipeline_prints_circuit_then_results() -> TestResult {
    let config = ExperimentConfig::default();
    let (counts, text) = capture(|out| run_grid_pipeline(&GridToolkit::new(), &config, out))?;

    assert_eq!(counts.map(|c| c.to_string()), Some(r#"{"1": 10}"#.to_string()));
    let expected = "Circuit:\n(0, 0): ───X─────M('m')──\nResults:\nm=1111111111\n";
    assert_eq!(text, expected);
    Ok(())
}

#[test]
fn test_register_pipeline_prints_diagram_then_counts() -> TestResult {
    let config = ExperimentConfig::default();
    let (counts, text) = capture(|out| run_register_pipeline(&RegisterToolkit::new(), &config, out))?;

    assert_eq!(counts.to_string(), r#"{"1": 10}"#);
    let expected = "qreg_0: ─[X]──[M]─\ncreg: 1/═══════╩══\n               0\n{\"1\": 10}\n";
    assert_eq!(text, expected);
    Ok(())
}

#[test]
fn test_both_pipelines_agree_on_flip() -> TestResult {
    let config = ExperimentConfig::default();
    let (comparison, text) =
        capture(|out| run_comparison(&GridToolkit::new(), &RegisterToolkit::new(), &config, out))?;

    assert!(comparison.agree());
    assert_eq!(comparison.register.total_shots(), 10);
    // Grid output is complete before the register diagram starts
    let results_at = text.find("m=1111111111").ok_or("grid results missing")?;
    let register_at = text.find("qreg_0").ok_or("register diagram missing")?;
    assert!(results_at < register_at);
    Ok(())
}

#[test]
fn test_identity_circuit_reads_zero() -> TestResult {
    let config = seeded(10, 1, vec![Gate::I])?;
    let (comparison, _) = capture(|out| run_comparison(&GridToolkit::new(), &RegisterToolkit::new(), &config, out))?;

    assert_eq!(comparison.register.to_string(), r#"{"0": 10}"#);
    assert!(comparison.agree());
    Ok(())
}

#[test]
fn test_counts_sum_to_repetitions_for_superposition() -> TestResult {
    let config = seeded(64, 2, vec![Gate::H])?;
    let (comparison, _) = capture(|out| run_comparison(&GridToolkit::new(), &RegisterToolkit::new(), &config, out))?;

    let grid = comparison.grid.ok_or("grid pipeline fell back")?;
    assert_eq!(grid.total_shots(), 64);
    assert_eq!(comparison.register.total_shots(), 64);
    assert!(comparison.register.iter().all(|(bits, _)| bits.len() == 2));
    Ok(())
}

#[test]
fn test_same_seed_gives_same_output() -> TestResult {
    let config = seeded(32, 1, vec![Gate::H])?;
    let run = || {
        capture(|out| {
            run_comparison(
                &GridToolkit::new().with_seed(config.seed()),
                &RegisterToolkit::new().with_seed(config.seed()),
                &config,
                out,
            )
        })
    };

    let (first, first_text) = run()?;
    let (second, second_text) = run()?;
    assert_eq!(first, second);
    assert_eq!(first_text, second_text);
    Ok(())
}

#[test]
fn test_register_bits_put_first_qubit_rightmost() -> TestResult {
    let config = seeded(5, 3, vec![Gate::X])?;
    let (counts, _) = capture(|out| run_register_pipeline(&RegisterToolkit::new(), &config, out))?;
    assert_eq!(counts.to_string(), r#"{"111": 5}"#);
    Ok(())
}

#[test]
fn test_grid_falls_back_when_gate_is_unsupported() -> TestResult {
    let device = GridDevice::new("flip-only", GateSet::only(&[Gate::X]));
    let toolkit = GridToolkit::new().with_device(device);
    let config = seeded(10, 1, vec![Gate::H])?;

    let (counts, text) = capture(|out| run_grid_pipeline(&toolkit, &config, out))?;
    assert_eq!(counts, None);
    assert_eq!(text, format!("{}\n", FALLBACK_MESSAGE));
    Ok(())
}

#[test]
fn test_fallback_still_lets_register_pipeline_run() -> TestResult {
    let broken = BrokenToolkit {
        error: ConstructionError::Unsupported {
            toolkit: "broken".to_string(),
            capability: "anything".to_string(),
        },
    };
    let config = ExperimentConfig::default();
    let (comparison, text) = capture(|out| run_comparison(&broken, &RegisterToolkit::new(), &config, out))?;

    assert_eq!(comparison.grid, None);
    assert!(!comparison.agree());
    assert!(text.starts_with(FALLBACK_MESSAGE));
    assert!(text.ends_with("{\"1\": 10}\n"));
    Ok(())
}

#[test]
fn test_grid_propagates_invalid_construction() {
    let error = ConstructionError::Invalid(QuantumError::InvalidOperation {
        message: "bad request".to_string(),
    });
    let broken = BrokenToolkit { error: error.clone() };

    let mut out = Vec::new();
    let err = run_grid_pipeline(&broken, &ExperimentConfig::default(), &mut out).unwrap_err();
    match err {
        PipelineError::Construction(inner) => assert_eq!(inner, error),
        other => panic!("Expected construction error, got {:?}", other),
    }
    assert!(out.is_empty(), "Nothing should be printed before the failure");
}

#[test]
fn test_register_propagates_unsupported_construction() {
    let toolkit = RegisterToolkit::new().with_gate_set(GateSet::only(&[Gate::X]));
    let config = ExperimentConfig::new(10, 1, vec![Gate::H], None).unwrap();

    let mut out = Vec::new();
    let err = run_register_pipeline(&toolkit, &config, &mut out).unwrap_err();
    assert!(matches!(err, PipelineError::Construction(ref e) if e.is_unsupported()));
}

#[test]
fn test_unknown_backend_fails_register_pipeline() {
    let toolkit = RegisterToolkit::new().with_backend("ibmq_hardware");
    let mut out = Vec::new();
    let err = run_register_pipeline(&toolkit, &ExperimentConfig::default(), &mut out).unwrap_err();

    assert!(matches!(err, PipelineError::Backend(BackendError::NotFound { .. })));
    // The diagram is printed before execution is attempted
    assert!(String::from_utf8_lossy(&out).contains("qreg_0"));
}

#[test]
fn test_grid_propagates_execution_failure() -> TestResult {
    // Construction succeeds but every run fails
    let toolkit = FailingRunToolkit { inner: GridToolkit::new() };
    let mut out = Vec::new();
    let err = run_grid_pipeline(&toolkit, &ExperimentConfig::default(), &mut out).unwrap_err();

    assert!(matches!(err, PipelineError::Backend(BackendError::Execution(_))));
    let text = String::from_utf8_lossy(&out);
    assert!(text.starts_with("Circuit:"));
    assert!(!text.contains("Results:"));
    Ok(())
}

#[test]
fn test_register_backend_rejects_unsupported_gate() -> TestResult {
    let provider = BasicProvider::new().with_backend(Backend::new("flip_only", GateSet::only(&[Gate::X]), Some(5)));
    let toolkit = RegisterToolkit::new().with_provider(provider).with_backend("flip_only");
    let config = seeded(10, 1, vec![Gate::H])?;

    let mut out = Vec::new();
    let err = run_register_pipeline(&toolkit, &config, &mut out).unwrap_err();
    assert!(matches!(err, PipelineError::Backend(BackendError::Rejected { ref backend, .. }) if backend == "flip_only"));

    // The same backend runs circuits it does support
    let (counts, _) = capture(|out| run_register_pipeline(&toolkit, &ExperimentConfig::default(), out))?;
    assert_eq!(counts.to_string(), r#"{"1": 10}"#);
    Ok(())
}

#[test]
fn test_oversized_experiment_never_reaches_a_pipeline() {
    let err = ExperimentConfig::new(1, 1usize << 61, vec![Gate::X], None).unwrap_err();
    assert!(matches!(err, ConfigError::TooManyQubits { .. }));
    assert!(ExperimentConfig::new(1, 100_000, vec![Gate::X], None).is_err());
}
