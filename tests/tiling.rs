use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sysnpu::npu::reference;
use sysnpu::npu::{Acc, ArrayConfig, Command, Data, Npu, QuantParams, RunDescriptor};
use sysnpu::simulator::sim::SimClock;
use sysnpu::simulator::Driver;

fn wait_done(npu: &mut Npu) {
  let start = npu.cycle();
  while !npu.status().done {
    npu.tick().unwrap();
    assert!(npu.cycle() - start < 10_000, "run never finished");
  }
}

fn wait_raw(npu: &mut Npu) -> Vec<Acc> {
  for _ in 0..10_000 {
    if npu.pop_output().is_some() {
      return npu.last_raw().unwrap().to_vec();
    }
    npu.tick().unwrap();
  }
  panic!("no output vector");
}

/// 在一次运行中流过 K = rows 的整块
fn unsplit(weights: &[Vec<Data>], acts: &[Vec<Data>]) -> Vec<Acc> {
  let mut npu = Npu::new("full", ArrayConfig::new(weights.len(), weights[0].len())).unwrap();
  npu.push_weight_tile(weights).unwrap();
  for a in acts {
    npu.push_activations(a).unwrap();
  }
  npu.issue(Command::Start(RunDescriptor::new(acts.len() as u32).load_weights()));
  wait_done(&mut npu);
  wait_raw(&mut npu)
}

/// K方向切成两块：第一块清零且不排空，第二块累加后排空
fn split(weights: &[Vec<Data>], acts: &[Vec<Data>], rows: usize) -> Vec<Acc> {
  let cols = weights[0].len();
  let mut npu = Npu::new("tiled", ArrayConfig::new(rows, cols)).unwrap();

  for (t, k0) in [0, rows].into_iter().enumerate() {
    npu.issue(Command::ResetWritePointers {
      weights: true,
      activations: true,
    });
    npu.push_weight_tile(&weights[k0..k0 + rows]).unwrap();
    for a in acts {
      npu.push_activations(&a[k0..k0 + rows]).unwrap();
    }

    let mut run = RunDescriptor::new(acts.len() as u32)
      .load_weights()
      .reset_read_pointers();
    if t == 0 {
      run = run.no_drain();
    } else {
      run = run.accumulate();
    }
    npu.issue(Command::Start(run));
    wait_done(&mut npu);
  }
  wait_raw(&mut npu)
}

#[test]
fn split_k_equals_unsplit_run() {
  let mut rng = StdRng::seed_from_u64(42);
  for rows in 1..=4 {
    let cols: usize = rng.gen_range(1..=4);
    let weights: Vec<Vec<Data>> = (0..2 * rows)
      .map(|_| (0..cols).map(|_| rng.gen::<Data>()).collect())
      .collect();
    let acts: Vec<Vec<Data>> = (0..3)
      .map(|_| (0..2 * rows).map(|_| rng.gen::<Data>()).collect())
      .collect();

    let expected = reference::column_sums(&weights, &acts);
    assert_eq!(unsplit(&weights, &acts), expected);
    assert_eq!(split(&weights, &acts, rows), expected);
  }
}

#[test]
fn no_drain_keeps_sums_resident() {
  let mut npu = Npu::new("npu", ArrayConfig::new(2, 2)).unwrap();
  npu.push_weight_tile(&[vec![1, 2], vec![3, 4]]).unwrap();
  npu.push_activations(&[1, 1]).unwrap();
  npu.issue(Command::Start(RunDescriptor::new(1).load_weights().no_drain()));
  wait_done(&mut npu);

  npu.tick_n(50).unwrap();
  assert!(npu.queue().is_empty());
  assert_eq!(npu.grid().accumulators(), vec![vec![1, 2], vec![3, 4]]);
}

#[test]
fn driver_matvec_matches_reference() {
  let mut rng = StdRng::seed_from_u64(7);
  let mut npu = Npu::new("npu", ArrayConfig::new(4, 3)).unwrap();
  let mut clock = SimClock::continuous();
  let mut driver = Driver::new(&mut npu, &mut clock, 100_000);

  let (k, n) = (11, 7);
  let weights: Vec<Vec<Data>> = (0..k)
    .map(|_| (0..n).map(|_| rng.gen_range(-30..=30)).collect())
    .collect();
  let quant = QuantParams {
    mult: 5,
    shift: 6,
    zero_point: -3,
    relu: false,
    bias: (0..n).map(|_| rng.gen_range(-500..=500)).collect(),
  };

  for _ in 0..3 {
    let x: Vec<Data> = (0..k).map(|_| rng.gen::<Data>()).collect();
    let y = driver.matvec(&x, &weights, &quant).unwrap();
    assert_eq!(y, reference::matvec(&x, &weights, &quant));
  }
}
