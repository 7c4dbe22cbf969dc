use super::records::NpuRecord;
use crate::error::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// JSON-lines trace：每条记录一行
pub struct TraceWriter<W: Write> {
  writer: W,
}

impl TraceWriter<BufWriter<File>> {
  pub fn create(path: &Path) -> Result<Self> {
    let file = File::create(path)?;
    Ok(Self::new(BufWriter::new(file)))
  }
}

impl<W: Write> TraceWriter<W> {
  pub fn new(writer: W) -> Self {
    Self { writer }
  }

  pub fn write_records(&mut self, records: &[NpuRecord]) -> Result<()> {
    if records.is_empty() {
      return Ok(());
    }
    for record in records {
      let trace_entry = serde_json::json!({
        "cycle": record.cycle,
        "action": record.action,
        "subject": record.subject,
      });
      writeln!(self.writer, "{}", trace_entry)?;
    }
    self.writer.flush()?;
    Ok(())
  }

  pub fn into_inner(self) -> W {
    self.writer
  }
}
