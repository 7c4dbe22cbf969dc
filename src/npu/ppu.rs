/// Post-processing unit - requantizes 32-bit accumulators to int8
///
/// 每列一条4级流水：
///   1. sum     = acc + bias                      (32位)
///   2. prod    = sum * mult                      (64位)
///   3. shifted = (prod + 2^(shift-1)) >> shift   (截回32位)
///   4. out     = clamp(relu(shifted + zp))       (8位)
use super::types::{Acc, Data};
use crate::builtin::{Module, Wire};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// 量化参数，只能在运行之间修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantParams {
  #[serde(default = "default_mult")]
  pub mult: i32,
  #[serde(default)]
  pub shift: u8,
  #[serde(default)]
  pub zero_point: i16,
  #[serde(default)]
  pub relu: bool,
  /// 每列偏置；为空时全部为0
  #[serde(default)]
  pub bias: Vec<Acc>,
}

fn default_mult() -> i32 {
  1
}

impl Default for QuantParams {
  fn default() -> Self {
    Self {
      mult: default_mult(),
      shift: 0,
      zero_point: 0,
      relu: false,
      bias: Vec::new(),
    }
  }
}

impl QuantParams {
  pub const MAX_SHIFT: u8 = 31;
  pub const ZERO_POINT_RANGE: std::ops::RangeInclusive<i16> = -256..=255;

  pub fn with_bias(mut self, bias: Vec<Acc>) -> Self {
    self.bias = bias;
    self
  }

  pub fn bias_for(&self, col: usize) -> Acc {
    self.bias.get(col).copied().unwrap_or(0)
  }

  pub fn validate(&self, cols: usize) -> Result<()> {
    if self.shift > Self::MAX_SHIFT {
      return Err(Error::invalid_config(format!("shift {} exceeds {}", self.shift, Self::MAX_SHIFT)));
    }
    if !Self::ZERO_POINT_RANGE.contains(&self.zero_point) {
      return Err(Error::invalid_config(format!(
        "zero_point {} outside [-256, 255]",
        self.zero_point
      )));
    }
    if !self.bias.is_empty() && self.bias.len() != cols {
      return Err(Error::LaneMismatch {
        what: "bias",
        expected: cols,
        got: self.bias.len(),
      });
    }
    Ok(())
  }
}

pub fn bias_add(acc: Acc, bias: Acc) -> Acc {
  acc.wrapping_add(bias)
}

pub fn scale(sum: Acc, mult: i32) -> i64 {
  i64::from(sum) * i64::from(mult)
}

/// 四舍五入（0.5向上）后算术右移
pub fn round_shift(prod: i64, shift: u8) -> Acc {
  let shifted = if shift > 0 {
    (prod + (1i64 << (shift - 1))) >> shift
  } else {
    prod
  };
  shifted as Acc
}

pub fn finalize(shifted: Acc, zero_point: i16, relu: bool) -> Data {
  let mut v = i64::from(shifted) + i64::from(zero_point);
  if relu && v < 0 {
    v = 0;
  }
  v.clamp(i64::from(Data::MIN), i64::from(Data::MAX)) as Data
}

/// 组合形式的量化公式，与流水线逐位一致
pub fn quantize(acc: Acc, bias: Acc, params: &QuantParams) -> Data {
  let prod = scale(bias_add(acc, bias), params.mult);
  finalize(round_shift(prod, params.shift), params.zero_point, params.relu)
}

fn map_stage<T: Clone + Default, U: Clone + Default>(
  stage: &Wire<Vec<T>>,
  f: impl Fn(usize, &T) -> U,
) -> Wire<Vec<U>> {
  stage
    .get()
    .map(|values| values.iter().enumerate().map(|(c, v)| f(c, v)).collect())
    .into()
}

pub struct Ppu {
  name: String,
  params: QuantParams,

  // 输入：一次排空的列和
  pub input: Wire<Vec<Acc>>,

  // 输出：量化结果
  pub output: Wire<Vec<Data>>,

  s1: Wire<Vec<Acc>>,
  s2: Wire<Vec<i64>>,
  s3: Wire<Vec<Acc>>,
}

impl Ppu {
  pub const LATENCY: usize = 4;

  pub fn new(name: impl Into<String>, params: QuantParams) -> Self {
    Self {
      name: name.into(),
      params,
      input: Wire::default(),
      output: Wire::default(),
      s1: Wire::default(),
      s2: Wire::default(),
      s3: Wire::default(),
    }
  }

  pub fn params(&self) -> &QuantParams {
    &self.params
  }

  pub fn set_params(&mut self, params: QuantParams) {
    self.params = params;
  }

  pub fn is_busy(&self) -> bool {
    self.input.valid || self.s1.valid || self.s2.valid || self.s3.valid
  }
}

impl Module for Ppu {
  fn run(&mut self) {
    // 从后级到前级推进
    let p = &self.params;
    self.output = map_stage(&self.s3, |_, v| finalize(*v, p.zero_point, p.relu));
    self.s3 = map_stage(&self.s2, |_, v| round_shift(*v, p.shift));
    self.s2 = map_stage(&self.s1, |_, v| scale(*v, p.mult));
    self.s1 = map_stage(&self.input, |c, v| bias_add(*v, p.bias_for(c)));
  }

  fn reset(&mut self) {
    self.input = Wire::default();
    self.output = Wire::default();
    self.s1 = Wire::default();
    self.s2 = Wire::default();
    self.s3 = Wire::default();
  }

  fn name(&self) -> &str {
    &self.name
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn params(mult: i32, shift: u8, zero_point: i16, relu: bool) -> QuantParams {
    QuantParams {
      mult,
      shift,
      zero_point,
      relu,
      bias: Vec::new(),
    }
  }

  #[test]
  fn test_identity_and_saturation() {
    let p = QuantParams::default();
    assert_eq!(quantize(4, 0, &p), 4);
    assert_eq!(quantize(1000, 0, &p), 127);
    assert_eq!(quantize(-1000, 0, &p), -128);
    assert_eq!(quantize(-5, 0, &p), -5);
  }

  #[test]
  fn test_rounding_is_half_up() {
    let p = params(1, 1, 0, false);
    assert_eq!(quantize(5, 0, &p), 3);
    assert_eq!(quantize(4, 0, &p), 2);
    assert_eq!(quantize(-5, 0, &p), -2);
    assert_eq!(quantize(-6, 0, &p), -3);

    let p = params(3, 2, 0, false);
    assert_eq!(quantize(100, 0, &p), 75);
  }

  #[test]
  fn test_bias_zero_point_relu() {
    let p = params(1, 0, 10, false);
    assert_eq!(quantize(5, -20, &p), -5);

    let p = params(1, 0, 10, true);
    assert_eq!(quantize(5, -20, &p), 0);
    assert_eq!(quantize(5, 0, &p), 15);

    let p = params(1, 0, -256, false);
    assert_eq!(quantize(0, 0, &p), -128);
  }

  #[test]
  fn test_wide_product_does_not_overflow() {
    let p = params(i32::MAX, 31, 0, false);
    // (2^31-1)^2 需要64位中间值
    assert_eq!(quantize(i32::MAX, 0, &p), 127);
    assert_eq!(quantize(i32::MIN, 0, &p), -128);
  }

  #[test]
  fn test_validate() {
    assert!(params(1, 31, 255, false).validate(2).is_ok());
    assert!(params(1, 32, 0, false).validate(2).is_err());
    assert!(params(1, 0, 256, false).validate(2).is_err());
    assert!(params(1, 0, -257, false).validate(2).is_err());
    let p = QuantParams::default().with_bias(vec![1, 2, 3]);
    assert!(p.validate(2).is_err());
    assert!(p.validate(3).is_ok());
  }

  #[test]
  fn test_pipeline_latency_is_four() {
    let p = params(2, 1, 1, false).with_bias(vec![1, -3]);
    let mut ppu = Ppu::new("ppu", p.clone());

    ppu.input.set(vec![10, -10]);
    for tick in 1..=Ppu::LATENCY {
      ppu.run();
      ppu.input.clear();
      if tick < Ppu::LATENCY {
        assert!(!ppu.output.valid, "tick {}", tick);
      }
    }
    let expected = vec![quantize(10, 1, &p), quantize(-10, -3, &p)];
    assert_eq!(ppu.output.get(), Some(&expected));
    assert_eq!(expected, vec![12, -12]);

    ppu.run();
    assert!(!ppu.output.valid);
    assert!(!ppu.is_busy());
  }
}
