//! Output collaborator: where replies go.
//!
//! The core hands finished text to an [`Output`] and never cares whether it
//! ends up on screen or in a speech engine. [`Transcript`] writes to any
//! `Write`; in voice mode it also emits the shortened, speakable form a TTS
//! engine would read.

use std::io::{self, Write};
use std::sync::LazyLock;

use regex::Regex;

use crate::modules::InputMode;

/// Longest text handed to speech.
const SPOKEN_MAX_CHARS: usize = 300;
const SPOKEN_CUT_AT: usize = 280;
const SPOKEN_SUFFIX: &str = "... See full response above.";

static CODE_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid regex"));
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]*)`").expect("valid regex"));
static HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s*").expect("valid regex"));
static PARAGRAPH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid regex"));

pub trait Output {
    fn render(&mut self, text: &str) -> io::Result<()>;

    /// Shown before reading the next input.
    fn prompt(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn set_input_mode(&mut self, _mode: InputMode) {}
}

/// Rewrite `text` into something worth reading aloud: code blocks become a
/// placeholder, markdown markers go, line breaks become pauses, and long
/// answers are cut.
pub fn speakable(text: &str) -> String {
    let text = CODE_BLOCK.replace_all(text, "[code block]");
    let text = INLINE_CODE.replace_all(&text, "$1");
    let text = HEADER.replace_all(&text, "");
    let text = PARAGRAPH.replace_all(&text, ". ");
    let text = text.replace('\n', " ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if text.chars().count() <= SPOKEN_MAX_CHARS {
        return text;
    }
    let cut: String = text.chars().take(SPOKEN_CUT_AT).collect();
    format!("{}{SPOKEN_SUFFIX}", cut.trim_end())
}

/// Line-oriented transcript on a writer (stdout in the binary).
pub struct Transcript<W: Write> {
    out: W,
    mode: InputMode,
    show_prompt: bool,
}

impl<W: Write> Transcript<W> {
    pub fn new(out: W, mode: InputMode) -> Self {
        Self { out, mode, show_prompt: false }
    }

    /// Print `> ` before each read, for interactive terminals.
    pub fn with_prompt(mut self) -> Self {
        self.show_prompt = true;
        self
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

impl<W: Write> Output for Transcript<W> {
    fn render(&mut self, text: &str) -> io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        writeln!(self.out, "{text}")?;
        if self.mode == InputMode::Voice {
            let spoken = speakable(text);
            if spoken != text {
                writeln!(self.out, "» {spoken}")?;
            }
        }
        self.out.flush()
    }

    fn prompt(&mut self) -> io::Result<()> {
        if self.show_prompt {
            write!(self.out, "> ")?;
            self.out.flush()?;
        }
        Ok(())
    }

    fn set_input_mode(&mut self, mode: InputMode) {
        self.mode = mode;
    }
}
