//! Terminal shared by every approval prompt of the process.
//!
//! Only one prompt is open at a time: the question is written and its answer
//! read while holding the terminal lock, so concurrent purchases queue
//! instead of interleaving on one stdin. The line reader outlives each
//! prompt. A read left pending by a cancelled prompt completes into the same
//! reader and is discarded with any other type-ahead before the next
//! question is shown.

use crate::WalletError;
use std::io::Write;
use std::sync::{Arc, OnceLock};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::sync::Mutex;

type LineSource = Lines<Box<dyn AsyncBufRead + Send + Unpin>>;

struct TerminalIo {
	lines: LineSource,
	output: Box<dyn Write + Send>,
}

pub struct PromptTerminal {
	io: Mutex<TerminalIo>,
}

static STDIO: OnceLock<Arc<PromptTerminal>> = OnceLock::new();

impl PromptTerminal {
	pub fn new(
		input: impl AsyncRead + Send + Unpin + 'static,
		output: impl Write + Send + 'static,
	) -> Self {
		let reader: Box<dyn AsyncBufRead + Send + Unpin> = Box::new(BufReader::new(input));
		Self {
			io: Mutex::new(TerminalIo {
				lines: reader.lines(),
				output: Box::new(output),
			}),
		}
	}

	/// The process-wide terminal over stdin and stderr.
	pub fn stdio() -> Arc<Self> {
		STDIO
			.get_or_init(|| Arc::new(Self::new(tokio::io::stdin(), std::io::stderr())))
			.clone()
	}

	/// Writes `question` and waits for a single line of answer.
	///
	/// # Returns
	///
	/// `Ok(true)` for `y`/`yes`, `Ok(false)` for any other answer.
	///
	/// # Errors
	///
	/// [`WalletError::Rejected`] when the input is closed, and
	/// [`WalletError::Implementation`] when reading or writing fails.
	pub async fn confirm(&self, question: &str) -> Result<bool, WalletError> {
		let mut io = self.io.lock().await;

		let discarded = discard_pending(&mut io.lines).await?;
		if discarded > 0 {
			tracing::debug!(discarded, "Discarded input typed before the prompt");
		}

		write!(io.output, "{}", question)
			.and_then(|_| io.output.flush())
			.map_err(|e| WalletError::Implementation(format!("Failed to write prompt: {}", e)))?;

		let answer = io
			.lines
			.next_line()
			.await
			.map_err(|e| WalletError::Implementation(format!("Failed to read prompt: {}", e)))?
			.ok_or_else(|| WalletError::Rejected("prompt closed".to_string()))?;

		Ok(is_affirmative(&answer))
	}
}

/// Consumes lines that are already buffered without waiting for more.
async fn discard_pending(lines: &mut LineSource) -> Result<usize, WalletError> {
	let mut discarded = 0;
	loop {
		tokio::select! {
			biased;
			line = lines.next_line() => match line {
				Ok(Some(_)) => discarded += 1,
				Ok(None) => return Err(WalletError::Rejected("prompt closed".to_string())),
				Err(e) => {
					return Err(WalletError::Implementation(format!(
						"Failed to read prompt: {}",
						e
					)))
				},
			},
			_ = std::future::ready(()) => return Ok(discarded),
		}
	}
}

fn is_affirmative(answer: &str) -> bool {
	matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
