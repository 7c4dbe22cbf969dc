/// Column bank - sums the aligned drain rows of one dump into one vector
use super::skew::AlignedRow;
use super::types::Acc;
use crate::builtin::{Module, Wire};

pub struct ColumnBank {
  name: String,

  // 输入：de-skew后的一行
  pub input: Wire<AlignedRow>,

  // 输出：一次排空的列和，遇到last拍时有效一拍
  pub output: Wire<Vec<Acc>>,

  sums: Vec<Acc>,
  // 本次排空已收到至少一拍
  open: bool,
}

impl ColumnBank {
  pub fn new(name: impl Into<String>, cols: usize) -> Self {
    Self {
      name: name.into(),
      input: Wire::default(),
      output: Wire::default(),
      sums: vec![0; cols],
      open: false,
    }
  }

  pub fn is_busy(&self) -> bool {
    self.open || self.input.valid || self.output.valid
  }
}

impl Module for ColumnBank {
  fn run(&mut self) {
    self.output.clear();
    let Some(row) = self.input.get() else {
      return;
    };

    for (sum, v) in self.sums.iter_mut().zip(&row.values) {
      *sum = sum.wrapping_add(*v);
    }

    if row.beat.last {
      self.output.set(self.sums.clone());
      self.sums.fill(0);
      self.open = false;
    } else {
      self.open = true;
    }
  }

  fn reset(&mut self) {
    self.input = Wire::default();
    self.output = Wire::default();
    self.sums.fill(0);
    self.open = false;
  }

  fn name(&self) -> &str {
    &self.name
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::npu::types::DumpBeat;

  fn row(values: Vec<Acc>, last: bool) -> Wire<AlignedRow> {
    Some(AlignedRow {
      values,
      beat: DumpBeat { last },
    })
    .into()
  }

  #[test]
  fn test_bank_sums_until_last() {
    let mut bank = ColumnBank::new("bank", 2);

    bank.input = row(vec![3, 4], false);
    bank.run();
    assert!(!bank.output.valid);
    assert!(bank.is_busy());

    bank.input = Wire::default();
    bank.run();
    assert!(!bank.output.valid);

    bank.input = row(vec![1, 2], true);
    bank.run();
    assert_eq!(bank.output.get(), Some(&vec![4, 6]));

    bank.input = Wire::default();
    bank.run();
    assert!(!bank.output.valid);
    assert!(!bank.is_busy());
  }
}
