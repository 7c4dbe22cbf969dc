use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sysnpu::npu::reference;
use sysnpu::npu::{ArrayConfig, Command, Data, Npu, QuantParams, RunDescriptor, SeqState};

fn wait_done(npu: &mut Npu) -> u64 {
  let start = npu.cycle();
  loop {
    npu.tick().unwrap();
    if npu.status().done {
      return npu.cycle() - start;
    }
    assert!(npu.cycle() - start < 10_000, "run never finished");
  }
}

fn wait_output(npu: &mut Npu) -> Vec<Data> {
  for _ in 0..10_000 {
    if let Some(v) = npu.pop_output() {
      return v;
    }
    npu.tick().unwrap();
  }
  panic!("no output vector");
}

fn random_matrix(rng: &mut StdRng, rows: usize, cols: usize) -> Vec<Vec<Data>> {
  (0..rows).map(|_| (0..cols).map(|_| rng.gen::<Data>()).collect()).collect()
}

#[test]
fn two_by_two_reference_scenario() {
  let mut npu = Npu::new("npu", ArrayConfig::new(2, 2)).unwrap();
  npu.push_weight_tile(&[vec![1, 2], vec![3, 4]]).unwrap();
  npu.push_activations(&[1, 1]).unwrap();
  npu.issue(Command::Start(RunDescriptor::new(1).load_weights()));
  wait_done(&mut npu);

  assert_eq!(wait_output(&mut npu), vec![4, 6]);
  assert_eq!(npu.last_raw(), Some(&[4, 6][..]));
  assert!(npu.pop_output().is_none());
}

#[test]
fn saturation_at_the_output() {
  let mut npu = Npu::new("npu", ArrayConfig::new(1, 2)).unwrap();
  npu.push_weights(&[100, -100]).unwrap();
  npu.push_activations(&[10]).unwrap();
  npu.issue(Command::Start(RunDescriptor::new(1).load_weights()));
  wait_done(&mut npu);

  assert_eq!(wait_output(&mut npu), vec![127, -128]);
  assert_eq!(npu.last_raw(), Some(&[1000, -1000][..]));
}

#[test]
fn column_sums_match_reference_for_random_streams() {
  let mut rng = StdRng::seed_from_u64(0x5eed);
  for _ in 0..12 {
    let rows = rng.gen_range(1..=5);
    let cols = rng.gen_range(1..=5);
    let vectors = rng.gen_range(0..=6);
    let mut npu = Npu::new("npu", ArrayConfig::new(rows, cols)).unwrap();

    let weights = random_matrix(&mut rng, rows, cols);
    let acts = random_matrix(&mut rng, vectors, rows);
    let params = QuantParams {
      mult: rng.gen_range(1..=5),
      shift: rng.gen_range(0..=10),
      zero_point: rng.gen_range(-20..=20),
      relu: rng.gen(),
      bias: (0..cols).map(|_| rng.gen_range(-5000..=5000)).collect(),
    };
    npu.set_quant(params.clone()).unwrap();

    npu.push_weight_tile(&weights).unwrap();
    for a in &acts {
      npu.push_activations(a).unwrap();
    }
    npu.issue(Command::Start(RunDescriptor::new(vectors as u32).load_weights()));
    wait_done(&mut npu);
    let out = wait_output(&mut npu);

    let sums = reference::column_sums(&weights, &acts);
    assert_eq!(npu.last_raw(), Some(&sums[..]), "{}x{} with {} vectors", rows, cols, vectors);
    assert_eq!(out, reference::quantize_vector(&sums, &params));
  }
}

#[test]
fn run_length_follows_pipeline_latency() {
  let config = ArrayConfig::new(2, 3);
  let mut npu = Npu::new("npu", config).unwrap();
  for _ in 0..3 {
    npu.push_activations(&[1, 1]).unwrap();
  }

  npu.issue(Command::Start(RunDescriptor::new(3)));
  let cycles = wait_done(&mut npu);
  let expected = 1 + 3 + config.pipeline_latency() + config.drain_beats() + config.drain_tail();
  assert_eq!(cycles, u64::from(expected));

  npu.issue(Command::Start(RunDescriptor::new(0).load_weights().no_drain()));
  let cycles = wait_done(&mut npu);
  assert_eq!(cycles, u64::from(1 + 2 + config.pipeline_latency()));
}

#[test]
fn activation_wavefront_reaches_column_c_after_c_cycles() {
  let cols = 4;
  let mut npu = Npu::new("npu", ArrayConfig::new(2, cols)).unwrap();
  npu.push_weight_tile(&[vec![1; cols], vec![1; cols]]).unwrap();
  npu.push_activations(&[3, 0]).unwrap();
  npu.issue(Command::Start(RunDescriptor::new(1).load_weights()));

  let mut first_seen = vec![None; cols];
  while npu.status().state != SeqState::Drain {
    npu.tick().unwrap();
    for (c, seen) in first_seen.iter_mut().enumerate() {
      if seen.is_none() && npu.grid().cell(0, c).acc_out() != 0 {
        *seen = Some(npu.cycle());
      }
    }
  }

  let t0 = first_seen[0].unwrap();
  for (c, seen) in first_seen.iter().enumerate() {
    assert_eq!(seen.unwrap() - t0, c as u64);
  }
  assert_eq!(npu.grid().accumulators(), vec![vec![3; cols], vec![0; cols]]);
}

#[test]
fn weights_stay_resident_across_runs() {
  let mut npu = Npu::new("npu", ArrayConfig::new(2, 2)).unwrap();
  npu.push_weight_tile(&[vec![1, 2], vec![3, 4]]).unwrap();
  npu.push_activations(&[1, 1]).unwrap();
  npu.push_activations(&[2, -1]).unwrap();

  npu.issue(Command::Start(RunDescriptor::new(1).load_weights()));
  wait_done(&mut npu);
  assert_eq!(wait_output(&mut npu), vec![4, 6]);

  // 第二次不装载，激活读指针继续向后
  npu.issue(Command::Start(RunDescriptor::new(1)));
  wait_done(&mut npu);
  assert_eq!(wait_output(&mut npu), vec![-1, 0]);
  assert_eq!(npu.grid().weights(), vec![vec![1, 2], vec![3, 4]]);
}

#[test]
fn clear_command_discards_resident_sums() {
  let mut npu = Npu::new("npu", ArrayConfig::new(1, 1)).unwrap();
  npu.push_weights(&[5]).unwrap();
  npu.push_activations(&[7]).unwrap();
  npu.push_activations(&[1]).unwrap();

  npu.issue(Command::Start(RunDescriptor::new(1).load_weights().no_drain()));
  wait_done(&mut npu);
  assert_eq!(npu.grid().cell(0, 0).acc_out(), 35);

  npu.issue(Command::ClearAccumulators);
  npu.tick_n(3).unwrap();
  assert_eq!(npu.grid().cell(0, 0).acc_out(), 0);

  npu.issue(Command::Start(RunDescriptor::new(1).accumulate()));
  wait_done(&mut npu);
  assert_eq!(wait_output(&mut npu), vec![5]);
}

#[test]
fn clear_on_load_resets_partial_sums() {
  let mut config = ArrayConfig::new(1, 1);
  config.clear_on_load = true;
  let mut npu = Npu::new("npu", config).unwrap();
  npu.push_weights(&[2]).unwrap();
  npu.push_weights(&[3]).unwrap();
  npu.push_activations(&[10]).unwrap();
  npu.push_activations(&[10]).unwrap();

  npu.issue(Command::Start(RunDescriptor::new(1).load_weights().no_drain()));
  wait_done(&mut npu);
  npu.issue(Command::Start(RunDescriptor::new(1).load_weights().accumulate()));
  wait_done(&mut npu);

  // 第一块的部分和在装载时被清掉
  assert_eq!(npu.last_raw(), None);
  wait_output(&mut npu);
  assert_eq!(npu.last_raw(), Some(&[30][..]));
}

#[test]
fn start_while_busy_is_ignored() {
  let mut npu = Npu::new("npu", ArrayConfig::new(2, 2)).unwrap();
  npu.set_recording(true);
  npu.push_weight_tile(&[vec![1, 0], vec![0, 1]]).unwrap();
  npu.push_activations(&[3, 4]).unwrap();
  npu.issue(Command::Start(RunDescriptor::new(1).load_weights()));
  npu.tick_n(4).unwrap();
  assert!(npu.status().busy);

  npu.issue(Command::Start(RunDescriptor::new(9).no_drain()));
  wait_done(&mut npu);
  assert_eq!(wait_output(&mut npu), vec![3, 4]);
  assert_eq!(npu.status().runs_done, 1);
  assert!(npu.take_records().iter().any(|r| r.action == "ignore"));
}

#[test]
fn done_is_a_single_cycle_pulse() {
  let mut npu = Npu::new("npu", ArrayConfig::new(2, 2)).unwrap();
  npu.issue(Command::Start(RunDescriptor::new(1)));
  let mut pulses = 0;
  for _ in 0..100 {
    npu.tick().unwrap();
    pulses += npu.status().done as u32;
  }
  assert_eq!(pulses, 1);
  assert_eq!(npu.status().runs_done, 1);
}
