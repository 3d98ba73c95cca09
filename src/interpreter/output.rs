use std::io::{self, Write};

/// Where `print` writes.
#[derive(Debug, Default)]
pub enum Output {
    #[default]
    Stdout,
    /// Collects printed lines, each terminated by `\n`.
    Buffer(String),
}

impl Output {
    pub fn buffer() -> Self {
        Output::Buffer(String::new())
    }

    pub fn print_line(&mut self, text: &str) -> io::Result<()> {
        match self {
            Output::Stdout => {
                let mut stdout = io::stdout().lock();
                writeln!(stdout, "{text}")
            }
            Output::Buffer(buffer) => {
                buffer.push_str(text);
                buffer.push('\n');
                Ok(())
            }
        }
    }

    /// Drains the captured text. Always empty for stdout.
    pub fn take(&mut self) -> String {
        match self {
            Output::Stdout => String::new(),
            Output::Buffer(buffer) => std::mem::take(buffer),
        }
    }
}
