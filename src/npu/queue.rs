/// Output queue - bounded FIFO of quantized output vectors
use super::types::Data;
use crate::error::{Error, Result};
use std::collections::VecDeque;

/// 每项是一个完整的COLS宽输出向量，深度固定
#[derive(Debug, Clone)]
pub struct OutputQueue {
  vectors: VecDeque<Vec<Data>>,
  depth: usize,
}

impl OutputQueue {
  pub fn new(depth: usize) -> Self {
    Self {
      vectors: VecDeque::with_capacity(depth),
      depth,
    }
  }

  /// 入队；满时写入是不变量错误，队列内容不变
  pub fn push(&mut self, vector: Vec<Data>) -> Result<()> {
    if self.is_full() {
      return Err(Error::QueueOverflow { depth: self.depth });
    }
    self.vectors.push_back(vector);
    Ok(())
  }

  pub fn pop(&mut self) -> Option<Vec<Data>> {
    self.vectors.pop_front()
  }

  pub fn peek(&self) -> Option<&Vec<Data>> {
    self.vectors.front()
  }

  pub fn is_empty(&self) -> bool {
    self.vectors.is_empty()
  }

  pub fn is_full(&self) -> bool {
    self.vectors.len() >= self.depth
  }

  pub fn len(&self) -> usize {
    self.vectors.len()
  }

  pub fn capacity(&self) -> usize {
    self.depth
  }

  pub fn clear(&mut self) {
    self.vectors.clear();
  }
}
