use crate::error::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellCommand {
  Step(u32), // Step N cycles
  Quit,
  Continue,
  Print,
}

/// 解析一行输入；错误信息直接给用户看
pub fn parse_command(line: &str) -> std::result::Result<ShellCommand, String> {
  let trimmed = line.trim();

  // Empty input: step once
  if trimmed.is_empty() {
    return Ok(ShellCommand::Step(1));
  }

  // si command: step N cycles
  if let Some(num_str) = trimmed.strip_prefix("si") {
    let num_str = num_str.trim();
    if num_str.is_empty() {
      return Err("'si' requires a number, e.g., 'si 100'".to_string());
    }
    return match num_str.parse::<u32>() {
      Ok(n) if n > 0 => Ok(ShellCommand::Step(n)),
      Ok(_) => Err("step count must be greater than 0".to_string()),
      Err(e) => Err(format!("invalid number '{}': {}", num_str, e)),
    };
  }

  match trimmed {
    "q" => Ok(ShellCommand::Quit),
    "c" => Ok(ShellCommand::Continue),
    "p" => Ok(ShellCommand::Print),
    other => Err(format!(
      "Unknown command: '{}'. Use Enter to step, 'si 100' to step N cycles, 'p' to print status, 'c' to continue, 'q' to quit",
      other
    )),
  }
}

/// 交互式单步控制台
pub struct Shell {
  editor: DefaultEditor,
}

impl Shell {
  pub fn new() -> Result<Self> {
    Ok(Self {
      editor: DefaultEditor::new()?,
    })
  }

  pub fn read_command(&mut self) -> Result<ShellCommand> {
    loop {
      match self.editor.readline("(sysnpu) ") {
        Ok(line) => {
          let trimmed = line.trim();
          if !trimmed.is_empty() {
            let _ = self.editor.add_history_entry(trimmed);
          }
          match parse_command(trimmed) {
            Ok(cmd) => return Ok(cmd),
            Err(msg) => eprintln!("Error: {}", msg),
          }
        },
        // Ctrl-C / Ctrl-D: quit
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(ShellCommand::Quit),
        Err(err) => return Err(err.into()),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_command() {
    assert_eq!(parse_command(""), Ok(ShellCommand::Step(1)));
    assert_eq!(parse_command("  si 100 "), Ok(ShellCommand::Step(100)));
    assert_eq!(parse_command("q"), Ok(ShellCommand::Quit));
    assert_eq!(parse_command("c"), Ok(ShellCommand::Continue));
    assert_eq!(parse_command("p"), Ok(ShellCommand::Print));
    assert!(parse_command("si").is_err());
    assert!(parse_command("si 0").is_err());
    assert!(parse_command("si x").is_err());
    assert!(parse_command("run").is_err());
  }
}
