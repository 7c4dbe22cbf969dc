/// Vector stores - on-chip weight and activation buffers
///
/// 主机侧按向量push写入（写指针递增），Sequencer通过读端口按地址读取，读延迟1拍。
use super::types::{Data, ReadReq};
use crate::builtin::{Module, Wire};
use crate::error::{Error, Result};

pub struct VectorStore {
  name: String,
  what: &'static str,
  lanes: usize,

  // 输入：读请求
  pub read_req: Wire<ReadReq>,

  // 输出：读响应
  pub read_resp: Wire<Vec<Data>>,

  data: Vec<Vec<Data>>,
  write_ptr: usize,
}

impl VectorStore {
  pub fn new(name: impl Into<String>, what: &'static str, lanes: usize, depth: usize) -> Self {
    Self {
      name: name.into(),
      what,
      lanes,
      read_req: Wire::default(),
      read_resp: Wire::default(),
      data: vec![vec![0; lanes]; depth],
      write_ptr: 0,
    }
  }

  /// 在写指针处写入一个向量
  pub fn push(&mut self, vector: &[Data]) -> Result<()> {
    if vector.len() != self.lanes {
      return Err(Error::LaneMismatch {
        what: self.what,
        expected: self.lanes,
        got: vector.len(),
      });
    }
    let depth = self.data.len();
    let slot = self.data.get_mut(self.write_ptr).ok_or(Error::StoreFull {
      store: self.what,
      depth,
    })?;
    slot.copy_from_slice(vector);
    self.write_ptr += 1;
    Ok(())
  }

  pub fn reset_write_ptr(&mut self) {
    self.write_ptr = 0;
  }

  pub fn write_ptr(&self) -> usize {
    self.write_ptr
  }

  pub fn depth(&self) -> usize {
    self.data.len()
  }

  pub fn lanes(&self) -> usize {
    self.lanes
  }

  /// 直接读取（不经过信号线）
  pub fn read_data(&self, addr: usize) -> &[Data] {
    &self.data[addr % self.data.len()]
  }
}

impl Module for VectorStore {
  fn run(&mut self) {
    match self.read_req.get() {
      Some(req) => {
        let data = self.read_data(req.addr).to_vec();
        self.read_resp.set(data);
      },
      None => self.read_resp.clear(),
    }
  }

  fn reset(&mut self) {
    self.read_req = Wire::default();
    self.read_resp = Wire::default();
    self.data.iter_mut().for_each(|v| v.fill(0));
    self.write_ptr = 0;
  }

  fn name(&self) -> &str {
    &self.name
  }
}
