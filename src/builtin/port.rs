/// Port and signal types for module interconnection

/// A wire/signal that carries data between modules
/// 所有信号线自动包含valid标志
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wire<T: Clone> {
  pub value: T,
  pub valid: bool,
}

impl<T: Clone> Wire<T> {
  pub fn new(value: T) -> Self {
    Self { value, valid: false }
  }

  pub fn set(&mut self, value: T) {
    self.value = value;
    self.valid = true;
  }

  pub fn clear(&mut self) {
    self.valid = false;
  }

  /// valid时返回数据
  pub fn get(&self) -> Option<&T> {
    if self.valid {
      Some(&self.value)
    } else {
      None
    }
  }
}

impl<T: Clone + Default> Wire<T> {
  /// 有效数据，或无效时的默认值（气泡）
  pub fn value_or_default(&self) -> T {
    if self.valid {
      self.value.clone()
    } else {
      T::default()
    }
  }
}

impl<T: Clone + Default> Default for Wire<T> {
  fn default() -> Self {
    Self {
      value: T::default(),
      valid: false,
    }
  }
}

impl<T: Clone + Default> From<Option<T>> for Wire<T> {
  fn from(value: Option<T>) -> Self {
    match value {
      Some(v) => {
        let mut w = Wire::default();
        w.set(v);
        w
      },
      None => Wire::default(),
    }
  }
}
