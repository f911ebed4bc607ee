//! Console channel: reads lines from stdin, dispatches them, renders replies.
//!
//! Stands in for speech-to-text. Input keeps being read while a turn runs:
//! an interrupt phrase ("stop", "wacht") cancels the running turn, anything
//! else is queued and dispatched afterwards, in order. Runs until the
//! `shutdown` token is cancelled (Ctrl-C), a shutdown phrase, or EOF.

use std::collections::VecDeque;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::modules::{phrases, ModeController};
use crate::output::Output;

/// Read lines from `input` until EOF or `shutdown`, one turn at a time.
pub async fn run<R, O>(
    input: R,
    controller: &mut ModeController,
    output: &mut O,
    shutdown: CancellationToken,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    O: Output,
{
    let (tx, mut rx) = mpsc::channel::<String>(32);
    let reader = tokio::spawn(async move {
        let mut lines = input.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    info!("console input closed");
                    break;
                }
                Err(e) => {
                    warn!("console read error: {e}");
                    break;
                }
            }
        }
    });

    let mut queue: VecDeque<String> = VecDeque::new();
    let mut input_open = true;

    loop {
        let line = match queue.pop_front() {
            Some(line) => line,
            None => {
                if !input_open {
                    break;
                }
                output.prompt()?;
                tokio::select! {
                    biased;

                    _ = shutdown.cancelled() => {
                        info!("console shutting down");
                        break;
                    }
                    line = rx.recv() => match line {
                        Some(line) => line,
                        None => break,
                    },
                }
            }
        };

        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        debug!(input = %line, "console received line");

        let interrupt = shutdown.child_token();
        let response = {
            let dispatch = controller.dispatch(&line, &interrupt);
            tokio::pin!(dispatch);
            loop {
                tokio::select! {
                    biased;

                    response = &mut dispatch => break response,
                    line = rx.recv(), if input_open => match line {
                        Some(next) if phrases::is_interrupt(&phrases::normalize(&next)) => {
                            info!(input = %next, "interrupting running turn");
                            interrupt.cancel();
                        }
                        Some(next) => queue.push_back(next),
                        None => input_open = false,
                    },
                }
            }
        };

        if let Some(mode) = response.input_mode {
            output.set_input_mode(mode);
        }
        output.render(&response.text)?;

        if response.shutdown {
            shutdown.cancel();
            break;
        }
        if shutdown.is_cancelled() {
            break;
        }
    }

    reader.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::llm::providers::dummy::DummyProvider;
    use crate::llm::LlmProvider;
    use crate::modules::{InputMode, Services};
    use crate::output::Transcript;
    use std::sync::Arc;

    fn controller(dir: &std::path::Path) -> ModeController {
        let config = Arc::new(Config::test_default(dir));
        ModeController::new(Services::new(LlmProvider::Dummy(DummyProvider), config)).unwrap()
    }

    #[tokio::test]
    async fn lines_are_dispatched_in_order_until_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = controller(dir.path());
        let mut out = Transcript::new(Vec::new(), InputMode::Typed);
        let shutdown = CancellationToken::new();

        let input: &'static [u8] = b"hello there\n\ncalendar\ndone\nshut down\nnever read\n";
        run(input, &mut c, &mut out, shutdown.clone()).await.unwrap();

        let text = String::from_utf8(out.get_ref().clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["[echo] hello there", "What is the event?", "Event discarded.", "Goodbye."]);
        assert!(shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn eof_ends_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = controller(dir.path());
        let mut out = Transcript::new(Vec::new(), InputMode::Typed);
        let shutdown = CancellationToken::new();

        let input: &'static [u8] = b"what time is it\n";
        run(input, &mut c, &mut out, shutdown.clone()).await.unwrap();
        assert!(!shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_shutdown_stops_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = controller(dir.path());
        let mut out = Transcript::new(Vec::new(), InputMode::Typed);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let input: &'static [u8] = b"hello\n";
        run(input, &mut c, &mut out, shutdown).await.unwrap();
        assert!(out.get_ref().is_empty());
    }
}
