use parking_lot::Mutex;
use std::{collections::VecDeque, io::BufRead};

/// Output and input sink a program is run against. Shared between every
/// evaluation unit of a program, so implementations synchronize themselves.
pub trait SystemContext: Send + Sync {
    fn println(&self, text: &str);
    /// Blocks for one line of input; `None` once input is exhausted.
    fn read_line(&self) -> Option<String>;
}

pub struct StdioContext;

impl SystemContext for StdioContext {
    fn println(&self, text: &str) {
        println!("{text}");
    }

    fn read_line(&self) -> Option<String> {
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

/// In-memory sink with scripted input.
#[derive(Default)]
pub struct BufferedContext {
    buffer: Mutex<String>,
    input: Mutex<VecDeque<String>>,
}

impl BufferedContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            buffer: Mutex::new(String::new()),
            input: Mutex::new(lines.into_iter().map(Into::into).collect()),
        }
    }

    pub fn contents(&self) -> String {
        self.buffer.lock().clone()
    }
}

impl SystemContext for BufferedContext {
    fn println(&self, text: &str) {
        let mut buffer = self.buffer.lock();
        buffer.push_str(text);
        buffer.push('\n');
    }

    fn read_line(&self) -> Option<String> {
        self.input.lock().pop_front()
    }
}
