/// Workload files: one dense layer y = quantize(x . W + b) over a batch of x
use crate::error::{Error, Result};
use crate::npu::ppu::QuantParams;
use crate::npu::types::{Acc, Data};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Workload {
  #[serde(default)]
  pub name: String,
  /// K x N
  pub weights: Vec<Vec<Data>>,
  /// N个偏置，可省略
  #[serde(default)]
  pub bias: Vec<Acc>,
  /// batch x K
  pub inputs: Vec<Vec<Data>>,
  /// 覆盖全局量化参数（不含bias）
  #[serde(default)]
  pub quant: Option<QuantParams>,
  /// batch x N 的期望输出，可省略
  #[serde(default)]
  pub expected: Vec<Vec<Data>>,
  /// 分类任务的真实类别（输出分数最高者为预测），可省略
  #[serde(default)]
  pub labels: Vec<usize>,
}

impl Workload {
  pub fn load(path: &Path) -> Result<Self> {
    let content = fs::read_to_string(path)?;
    let mut workload = Self::parse(&content)?;
    if workload.name.is_empty() {
      workload.name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    }
    Ok(workload)
  }

  pub fn parse(content: &str) -> Result<Self> {
    let workload: Workload = toml::from_str(content)?;
    workload.validate()?;
    Ok(workload)
  }

  /// 输入维度
  pub fn k(&self) -> usize {
    self.weights.len()
  }

  /// 输出维度
  pub fn n(&self) -> usize {
    self.weights.first().map_or(0, Vec::len)
  }

  pub fn validate(&self) -> Result<()> {
    let (k, n) = (self.k(), self.n());
    if k == 0 || n == 0 {
      return Err(Error::invalid_workload("weights must be a non-empty K x N matrix"));
    }
    if let Some(row) = self.weights.iter().position(|r| r.len() != n) {
      return Err(Error::invalid_workload(format!(
        "weight row {} has {} columns, expected {}",
        row,
        self.weights[row].len(),
        n
      )));
    }
    if !self.bias.is_empty() && self.bias.len() != n {
      return Err(Error::invalid_workload(format!("bias has {} entries, expected {}", self.bias.len(), n)));
    }
    if let Some(i) = self.inputs.iter().position(|x| x.len() != k) {
      return Err(Error::invalid_workload(format!(
        "input {} has {} elements, expected {}",
        i,
        self.inputs[i].len(),
        k
      )));
    }
    if let Some(q) = &self.quant {
      if !q.bias.is_empty() {
        return Err(Error::invalid_workload("put the bias at the top level, not under [quant]"));
      }
    }
    if !self.expected.is_empty()
      && (self.expected.len() != self.inputs.len() || self.expected.iter().any(|y| y.len() != n))
    {
      return Err(Error::invalid_workload("expected must be batch x N"));
    }
    if !self.labels.is_empty() && self.labels.len() != self.inputs.len() {
      return Err(Error::invalid_workload(format!(
        "{} labels for {} inputs",
        self.labels.len(),
        self.inputs.len()
      )));
    }
    if let Some(label) = self.labels.iter().find(|l| **l >= n) {
      return Err(Error::invalid_workload(format!("label {} is not one of the {} classes", label, n)));
    }
    Ok(())
  }

  /// 工作负载自己的量化参数，或者全局参数；bias取工作负载的
  pub fn quant_params(&self, global: &QuantParams) -> QuantParams {
    self
      .quant
      .clone()
      .unwrap_or_else(|| global.clone())
      .with_bias(self.bias.clone())
  }
}
