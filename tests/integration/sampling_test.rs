use smtsampler::formula::Sort;
use smtsampler::model::{ArrayInterpretation, FunctionTable, Model, Scalar, Value};
use smtsampler::oracle::{Answer, ConstraintOracle, ScriptedBackend, SoftConstraint};
use smtsampler::sampling::{
    BitVecTargeting, ExtensionContext, NeighborhoodSearch, Sampler, SamplerConfig, StopReason,
};
use smtsampler::store::{results_path, SampleStore};
use smtsampler::SamplerError;
use std::cell::RefCell;
use std::fs;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::rc::Rc;

type FileSampler = Sampler<ScriptedBackend, BufWriter<File>>;

/// `(and x (bvugt y #x5))` over `x: Bool`, `y: (_ BitVec 4)`
fn above_five_formula() -> ScriptedBackend {
    let mut f = ScriptedBackend::new();
    let x = f.constant("x", Sort::Bool);
    let y = f.constant("y", Sort::BitVec(4));
    let five = f.literal("#x5", Sort::BitVec(4));
    let gt = f.apply("bvugt", Sort::Bool, &[y, five]);
    let root = f.apply("and", Sort::Bool, &[x, gt]);
    f.set_root(root);
    f
}

/// Model as close to the soft targets as `y > 5` allows
fn nearest_above_five(soft: &[SoftConstraint]) -> Answer {
    let mut x = false;
    let mut y = 0u32;
    for constraint in soft {
        match constraint {
            SoftConstraint::Bool { value, .. } => x = *value,
            SoftConstraint::Bit {
                index, value: true, ..
            } => y |= 1 << index,
            SoftConstraint::BitVec { value, .. } => {
                y = u32::try_from(value.clone()).unwrap();
            }
            _ => {}
        }
    }
    if y <= 5 {
        y = 6;
    }
    Answer::Sat(
        Model::new()
            .with("x", Scalar::Bool(x))
            .with("y", Scalar::bitvec(4, y)),
    )
}

fn input_in(dir: &Path) -> PathBuf {
    dir.join("formula.smt2")
}

fn file_sampler(backend: ScriptedBackend, input: &Path, config: SamplerConfig) -> FileSampler {
    let store = SampleStore::create(input).unwrap();
    Sampler::new(backend, store, config.with_seed(2024)).unwrap()
}

fn result_lines(input: &Path) -> Vec<String> {
    fs::read_to_string(results_path(input))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_samples_satisfy_formula() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_in(dir.path());
    let mut backend = above_five_formula();
    backend.respond_guided_with(nearest_above_five);

    let mut sampler = file_sampler(backend, &input, SamplerConfig::default().with_max_epochs(60));
    let report = sampler.run().unwrap();

    assert_eq!(report.stop_reason, StopReason::EpochLimit);
    let lines = result_lines(&input);
    assert_eq!(lines.len() as u64, report.statistics.unique_samples);
    assert!(lines.len() > 1);

    for (i, line) in lines.iter().enumerate() {
        let (index, sample) = line.split_once(": ").unwrap();
        assert_eq!(index, (i + 1).to_string());

        let fields: Vec<_> = sample.split_terminator(';').collect();
        assert_eq!(fields.len(), 2, "{}", sample);
        assert!(fields[0] == "x:true" || fields[0] == "x:false");
        let bits = fields[1].strip_prefix("y:").unwrap();
        assert_eq!(bits.len(), 4);
        assert!(u32::from_str_radix(bits, 2).unwrap() > 5, "{}", sample);
    }
}

#[test]
fn test_whole_value_targeting() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_in(dir.path());
    let mut backend = above_five_formula();
    backend.respond_guided_with(nearest_above_five);

    let config = SamplerConfig::default()
        .with_max_epochs(10)
        .with_targeting(BitVecTargeting::WholeValue);
    let mut sampler = file_sampler(backend, &input, config);
    sampler.run().unwrap();

    let history = sampler.oracle().backend().soft_history();
    // one bool and one bit-vector target per epoch
    assert_eq!(history.len(), 20);
    assert!(history
        .iter()
        .all(|c| !matches!(c, SoftConstraint::Bit { .. })));
}

#[test]
fn test_same_model_recorded_once() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_in(dir.path());
    let mut backend = above_five_formula();
    backend.answer_guided(Answer::Sat(
        Model::new()
            .with("x", Scalar::Bool(false))
            .with("y", Scalar::bitvec(4, 6u32)),
    ));

    let mut sampler = file_sampler(backend, &input, SamplerConfig::default().with_max_samples(5));
    let report = sampler.run().unwrap();

    assert_eq!(report.stop_reason, StopReason::SampleLimit);
    assert_eq!(report.statistics.valid_samples, 5);
    assert_eq!(report.statistics.unique_samples, 1);
    assert_eq!(result_lines(&input), vec!["1: x:false;y:0110;"]);
}

#[test]
fn test_unsat_formula_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_in(dir.path());
    let mut backend = above_five_formula();
    backend.answer_guided(Answer::Unsat);

    let mut sampler = file_sampler(backend, &input, SamplerConfig::default());
    let report = sampler.run().unwrap();

    assert_eq!(report.stop_reason, StopReason::Unsatisfiable);
    assert!(!report.stop_reason.sampled());
    assert_eq!(report.statistics.epochs, 0);
    assert!(result_lines(&input).is_empty());
}

#[test]
fn test_scope_depth_balanced_after_run() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_in(dir.path());
    let mut backend = above_five_formula();
    backend.respond_guided_with(nearest_above_five);

    let mut sampler = file_sampler(backend, &input, SamplerConfig::default().with_max_epochs(25));
    let depth = sampler.oracle().scope_depth();
    sampler.run().unwrap();

    assert_eq!(sampler.oracle().scope_depth(), depth);
    assert!(sampler.oracle().backend().active_soft_constraints().is_empty());
}

#[test]
fn test_fallback_to_plain_solving() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_in(dir.path());
    let mut backend = above_five_formula();
    backend.answer_guided(Answer::Unknown);
    backend.answer_plain(Answer::Sat(
        Model::new()
            .with("x", Scalar::Bool(true))
            .with("y", Scalar::bitvec(4, 15u32)),
    ));

    let mut sampler = file_sampler(backend, &input, SamplerConfig::default().with_max_epochs(3));
    let report = sampler.run().unwrap();

    // the initial check plus three epochs
    assert_eq!(report.statistics.oracle.fallbacks, 4);
    assert_eq!(sampler.oracle().backend().plain_checks(), 4);
    assert_eq!(result_lines(&input), vec!["1: x:true;y:1111;"]);
}

#[test]
fn test_undecided_epochs_record_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_in(dir.path());
    let mut backend = above_five_formula();
    backend.answer_guided(Answer::Sat(Model::new()));
    backend.answer_guided(Answer::Unknown);
    backend.answer_plain(Answer::Unknown);

    let mut sampler = file_sampler(backend, &input, SamplerConfig::default().with_max_epochs(4));
    let report = sampler.run().unwrap();

    assert_eq!(report.stop_reason, StopReason::EpochLimit);
    assert_eq!(report.statistics.total_samples, 4);
    assert_eq!(report.statistics.valid_samples, 0);
    assert!(result_lines(&input).is_empty());
}

#[test]
fn test_oracle_fault_flushes_results() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_in(dir.path());
    let mut backend = above_five_formula();
    let model = |y: u32| {
        Answer::Sat(
            Model::new()
                .with("x", Scalar::Bool(true))
                .with("y", Scalar::bitvec(4, y)),
        )
    };
    backend.answer_guided(model(6));
    backend.answer_guided(model(7));
    backend.answer_guided(model(8));
    backend.answer_guided(Answer::Fault("canceled".to_string()));

    let mut sampler = file_sampler(backend, &input, SamplerConfig::default());
    let result = sampler.run();

    assert!(matches!(result, Err(SamplerError::OracleFault(ref msg)) if msg == "canceled"));
    assert_eq!(
        result_lines(&input),
        vec!["1: x:true;y:0111;", "2: x:true;y:1000;"]
    );
    assert_eq!(sampler.statistics().epochs, 2);
}

/// Extension that stops a timer nobody started
struct StopsUnknownTimer;

impl NeighborhoodSearch<ScriptedBackend, BufWriter<File>> for StopsUnknownTimer {
    fn extend(
        &mut self,
        _oracle: &mut ConstraintOracle<ScriptedBackend>,
        _seed: &Model,
        ctx: &mut ExtensionContext<'_, BufWriter<File>>,
    ) -> smtsampler::Result<()> {
        ctx.stats().stop("never_started")?;
        Ok(())
    }
}

#[test]
fn test_timer_misuse_is_fatal_after_flush() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_in(dir.path());
    let mut backend = above_five_formula();
    backend.respond_guided_with(nearest_above_five);

    let mut sampler = file_sampler(backend, &input, SamplerConfig::default())
        .with_neighborhood(StopsUnknownTimer);
    let result = sampler.run();

    assert!(matches!(result, Err(SamplerError::TimerNotStarted(ref c)) if c == "never_started"));
    assert_eq!(result_lines(&input).len(), 1);
}

/// Records every other value of `y` above the seed until the budget is spent
struct WalkUp;

impl NeighborhoodSearch<ScriptedBackend, BufWriter<File>> for WalkUp {
    fn extend(
        &mut self,
        _oracle: &mut ConstraintOracle<ScriptedBackend>,
        seed: &Model,
        ctx: &mut ExtensionContext<'_, BufWriter<File>>,
    ) -> smtsampler::Result<()> {
        let mut y = match seed.get("y") {
            Some(Value::Scalar(Scalar::BitVec { value, .. })) => u32::try_from(value.clone()).unwrap(),
            _ => return Ok(()),
        };
        while !ctx.is_exhausted() && y < 15 {
            y += 1;
            ctx.record(&seed.clone().with("y", Scalar::bitvec(4, y)))?;
        }
        Ok(())
    }
}

#[test]
fn test_neighborhood_samples_share_dedup_path() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_in(dir.path());
    let mut backend = above_five_formula();
    backend.answer_guided(Answer::Sat(
        Model::new()
            .with("x", Scalar::Bool(false))
            .with("y", Scalar::bitvec(4, 6u32)),
    ));

    let config = SamplerConfig::default()
        .with_max_epochs(2)
        .with_max_epoch_samples(4);
    let mut sampler = file_sampler(backend, &input, config).with_neighborhood(WalkUp);
    let report = sampler.run().unwrap();

    assert_eq!(report.stop_reason, StopReason::EpochSampleLimit);
    assert_eq!(report.statistics.epochs, 1);
    assert_eq!(report.statistics.total_samples, 4);
    assert_eq!(
        result_lines(&input),
        vec![
            "1: x:false;y:0110;",
            "2: x:false;y:0111;",
            "3: x:false;y:1000;",
            "4: x:false;y:1001;",
        ]
    );
}

#[test]
fn test_arrays_and_functions_in_samples() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_in(dir.path());

    let mut f = ScriptedBackend::new();
    let a = f.constant("a", Sort::array(Sort::BitVec(2), Sort::BitVec(2)));
    let k = f.constant("k", Sort::BitVec(2));
    let sel = f.apply("select", Sort::BitVec(2), &[a, k]);
    let g = f.apply_uninterpreted("g", Sort::Bool, &[sel]);
    f.set_root(g);
    f.answer_guided(Answer::Sat(
        Model::new()
            .with(
                "a",
                Value::Array(ArrayInterpretation::StoreChain {
                    default: Scalar::bitvec(2, 0u32),
                    writes: vec![
                        (Scalar::bitvec(2, 1u32), Scalar::bitvec(2, 3u32)),
                        (Scalar::bitvec(2, 2u32), Scalar::bitvec(2, 1u32)),
                    ],
                }),
            )
            .with("k", Scalar::bitvec(2, 1u32))
            .with(
                "g",
                Value::Function(FunctionTable {
                    default: Scalar::Bool(false),
                    entries: vec![(vec![Scalar::bitvec(2, 3u32)], Scalar::Bool(true))],
                }),
            ),
    ));

    let mut sampler = file_sampler(f, &input, SamplerConfig::default().with_max_epochs(1));
    sampler.run().unwrap();

    // only k is targeted
    assert!(sampler
        .oracle()
        .backend()
        .soft_history()
        .iter()
        .all(|c| c.var() == "k"));
    assert_eq!(
        result_lines(&input),
        vec!["1: g:(1;false;11;true;)a:[2;00;10;01;01;11;]k:01;"]
    );
}

#[test]
fn test_real_variable_aborts_sampling() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_in(dir.path());

    let mut f = ScriptedBackend::new();
    let r = f.constant("r", Sort::Real);
    let zero = f.literal("0.0", Sort::Real);
    let root = f.apply(">", Sort::Bool, &[r, zero]);
    f.set_root(root);
    f.answer_guided(Answer::Sat(Model::new()));

    let mut sampler = file_sampler(f, &input, SamplerConfig::default());
    assert_eq!(sampler.formula_statistics().reals, 1);

    let result = sampler.run();
    assert!(matches!(result, Err(SamplerError::InvalidSort { .. })));
    assert!(result_lines(&input).is_empty());
}

#[test]
fn test_results_visible_while_sampling() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_in(dir.path());
    let results = results_path(&input);
    let seen = Rc::new(RefCell::new(Vec::new()));

    let mut backend = above_five_formula();
    let observed = Rc::clone(&seen);
    let mut calls = 0u32;
    backend.respond_guided_with(move |_| {
        let persisted = fs::read_to_string(&results).unwrap().lines().count();
        observed.borrow_mut().push(persisted);
        let y = 6 + calls;
        calls += 1;
        Answer::Sat(
            Model::new()
                .with("x", Scalar::Bool(true))
                .with("y", Scalar::bitvec(4, y)),
        )
    });

    let mut sampler = file_sampler(backend, &input, SamplerConfig::default().with_max_epochs(4));
    sampler.run().unwrap();

    // the initial check and the first epoch both see an empty file
    assert_eq!(*seen.borrow(), vec![0, 0, 1, 2, 3]);
    assert_eq!(result_lines(&input).len(), 4);
}

#[test]
fn test_quantified_formula_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_in(dir.path());

    // (forall ((i Int)) (> i c))
    let mut f = ScriptedBackend::new();
    let c = f.constant("c", Sort::Int);
    let body = f.apply(">", Sort::Bool, &[c]);
    let forall = f.opaque(&[body]);
    f.set_root(forall);

    let store = SampleStore::create(&input).unwrap();
    let result = Sampler::new(f, store, SamplerConfig::default());

    assert!(matches!(
        result,
        Err(SamplerError::UnsupportedTerm { depth: 0 })
    ));
    assert!(result_lines(&input).is_empty());
}
