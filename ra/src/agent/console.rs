//! Console implementation of `AskUser`

use std::io::{self, Write};

use async_trait::async_trait;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::debug;

use routeplan::{AskError, AskUser};

/// Asks on stdout and reads one line from the input
///
/// One reader lives for the whole session. `next_line` is cancel safe, so a
/// reply typed after a timed-out ask is kept for the next ask.
pub struct ConsoleAsk<R = Stdin> {
    lines: Mutex<Lines<BufReader<R>>>,
}

impl ConsoleAsk {
    pub fn new() -> Self {
        Self::from_reader(tokio::io::stdin())
    }
}

impl Default for ConsoleAsk {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: AsyncRead + Unpin> ConsoleAsk<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            lines: Mutex::new(BufReader::new(reader).lines()),
        }
    }

    /// Read one reply line; end of input means the user is gone
    async fn read_reply(&self) -> Result<String, AskError> {
        let mut lines = self.lines.lock().await;
        match lines.next_line().await? {
            Some(line) => Ok(line.trim_end_matches('\r').to_string()),
            None => Err(AskError::Closed),
        }
    }
}

fn show_message(message: &str) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout)?;
    writeln!(stdout, "{}", message)?;
    write!(stdout, "{} ", "?".bright_cyan().bold())?;
    stdout.flush()
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send + 'static> AskUser for ConsoleAsk<R> {
    async fn ask(&self, message: &str) -> Result<String, AskError> {
        debug!(len = message.len(), "ConsoleAsk::ask: called");
        show_message(message)?;
        self.read_reply().await
    }
}
