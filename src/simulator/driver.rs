/// Driver - host-side sequencing of tiled runs on the NPU
///
/// K方向按ROWS切块：第一块清零，最后一块之前都不排空；N方向按COLS切块。
use super::sim::SimClock;
use crate::error::{Error, Result};
use crate::npu::ppu::QuantParams;
use crate::npu::types::{Acc, Command, Data, RunDescriptor};
use crate::npu::Npu;

pub struct Driver<'a> {
  npu: &'a mut Npu,
  clock: &'a mut SimClock,
  max_cycles: u64,
}

impl<'a> Driver<'a> {
  pub fn new(npu: &'a mut Npu, clock: &'a mut SimClock, max_cycles: u64) -> Self {
    Self { npu, clock, max_cycles }
  }

  pub fn npu(&mut self) -> &mut Npu {
    &mut *self.npu
  }

  fn tick_until(&mut self, what: &'static str, mut cond: impl FnMut(&mut Npu) -> bool) -> Result<()> {
    let start = self.npu.cycle();
    while !cond(&mut *self.npu) {
      if self.npu.cycle() - start >= self.max_cycles {
        return Err(Error::Stalled {
          what,
          cycles: self.max_cycles,
        });
      }
      self.clock.tick(&mut *self.npu)?;
    }
    Ok(())
  }

  /// 下发START并等到这次运行结束，返回所用周期数
  pub fn run(&mut self, run: RunDescriptor) -> Result<u64> {
    self.tick_until("idle sequencer", |npu| !npu.status().busy)?;
    let before = self.npu.status().runs_done;
    let start = self.npu.cycle();
    self.npu.issue(Command::Start(run));
    self.tick_until("run completion", |npu| npu.status().runs_done > before)?;
    Ok(self.npu.cycle() - start)
  }

  pub fn wait_output(&mut self) -> Result<Vec<Data>> {
    let mut out = None;
    self.tick_until("output vector", |npu| {
      out = npu.pop_output();
      out.is_some()
    })?;
    out.ok_or(Error::Stalled {
      what: "output vector",
      cycles: self.max_cycles,
    })
  }

  pub fn wait_quiescent(&mut self) -> Result<()> {
    self.tick_until("quiescent pipeline", |npu| npu.is_quiescent())
  }

  /// y = quantize(x . W + b)，W为 K x N
  pub fn matvec(&mut self, x: &[Data], weights: &[Vec<Data>], quant: &QuantParams) -> Result<Vec<Data>> {
    let (rows, cols) = (self.npu.config().rows, self.npu.config().cols);
    let k = weights.len();
    let n = weights.first().map_or(0, Vec::len);
    if x.len() != k {
      return Err(Error::LaneMismatch {
        what: "input",
        expected: k,
        got: x.len(),
      });
    }

    let tiles = k.div_ceil(rows).max(1);
    let mut y = Vec::with_capacity(n);
    for n0 in (0..n).step_by(cols) {
      let width = cols.min(n - n0);
      let bias: Vec<Acc> = (0..cols).map(|c| if c < width { quant.bias_for(n0 + c) } else { 0 }).collect();
      self.wait_quiescent()?;
      self.npu.set_quant(quant.clone().with_bias(bias))?;

      for t in 0..tiles {
        let k0 = t * rows;
        let tile: Vec<Vec<Data>> = (0..rows)
          .map(|r| {
            (0..width)
              .map(|c| weights.get(k0 + r).and_then(|row| row.get(n0 + c)).copied().unwrap_or(0))
              .chain(std::iter::repeat(0).take(cols - width))
              .collect()
          })
          .collect();
        let act: Vec<Data> = (0..rows).map(|r| x.get(k0 + r).copied().unwrap_or(0)).collect();

        self.npu.issue(Command::ResetWritePointers {
          weights: true,
          activations: true,
        });
        self.npu.push_weight_tile(&tile)?;
        self.npu.push_activations(&act)?;

        let mut run = RunDescriptor::new(1).load_weights().reset_read_pointers();
        if t > 0 {
          run = run.accumulate();
        }
        if t + 1 < tiles {
          run = run.no_drain();
        }
        self.run(run)?;
      }

      let out = self.wait_output()?;
      y.extend_from_slice(&out[..width]);
    }

    log::debug!("matvec k={} n={} -> {:?}", k, n, y);
    Ok(y)
  }
}
