//! Calendar: collects an event's "what" and "when" over several turns.
//!
//! Events live for the process lifetime only.

use chrono::{DateTime, Local};
use tracing::info;

use super::{phrases, ModeKind, ModuleDescriptor, Reply, Turn};

pub const NAME: &str = "calendar";

const TRIGGERS: &[&str] = &[
    "add to calendar",
    "calendar",
    "agenda",
    "schedule",
    "check calendar",
    "check my calendar",
    "what's on my calendar",
    "zet in mijn agenda",
    "afspraak",
    "wat staat er in mijn agenda",
];

/// First words that turn a calendar request into a listing.
const CHECK_WORDS: &[&str] = &["what", "what's", "check", "show", "list", "wat", "bekijk", "toon"];

/// Words that start the "when" part of "dentist tomorrow at 10".
const WHEN_MARKERS: &[&str] = &["today", "tomorrow", "tonight", "at", "on", "next", "vandaag", "morgen", "om", "op"];

pub fn descriptor() -> ModuleDescriptor {
    ModuleDescriptor::new(NAME, TRIGGERS, 70, ModeKind::MultiTurn)
}

#[derive(Debug, Clone)]
pub struct Event {
    pub what: String,
    pub when: String,
    pub added: DateTime<Local>,
}

#[derive(Debug, Default)]
struct Draft {
    what: Option<String>,
    when: Option<String>,
}

#[derive(Debug, Default)]
pub struct CalendarModule {
    events: Vec<Event>,
    draft: Option<Draft>,
}

impl CalendarModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn enter(&mut self, turn: Turn<'_>) -> Reply {
        let first = turn.normalized.split_whitespace().next().unwrap_or("");
        if CHECK_WORDS.contains(&first) {
            return Reply::done(self.listing());
        }

        let rest = phrases::strip_prefix(turn.utterance, turn.normalized, TRIGGERS).unwrap_or("");
        let rest = rest.strip_prefix("for ").unwrap_or(rest);
        let mut draft = Draft::default();
        if !rest.is_empty() {
            let (what, when) = split_when(rest);
            draft.what = (!what.is_empty()).then(|| what.to_string());
            draft.when = when.map(str::to_string);
        }
        self.draft = Some(draft);
        self.advance()
    }

    pub fn handle(&mut self, turn: Turn<'_>) -> Reply {
        let draft = self.draft.get_or_insert_with(Draft::default);
        let text = turn.utterance.trim().trim_end_matches(['.', '!', '?']).to_string();
        if draft.what.is_none() {
            let (what, when) = split_when(&text);
            draft.what = Some(what.to_string());
            if draft.when.is_none() {
                draft.when = when.map(str::to_string);
            }
        } else {
            draft.when = Some(text);
        }
        self.advance()
    }

    /// Ask for the next missing field, or file the event.
    fn advance(&mut self) -> Reply {
        let Some(draft) = &self.draft else {
            return Reply::done(self.listing());
        };
        match (&draft.what, &draft.when) {
            (None, _) => Reply::stay("What is the event?"),
            (Some(what), None) => Reply::stay(format!("When is \"{what}\"?")),
            (Some(what), Some(when)) => {
                let event = Event { what: what.clone(), when: when.clone(), added: Local::now() };
                info!(what = %event.what, when = %event.when, "calendar event added");
                let text = format!("Added \"{}\" for {}.", event.what, event.when);
                self.events.push(event);
                self.draft = None;
                Reply::done(text)
            }
        }
    }

    fn listing(&self) -> String {
        if self.events.is_empty() {
            return "Your calendar is empty.".to_string();
        }
        let mut lines = vec![format!("{} event(s):", self.events.len())];
        lines.extend(self.events.iter().map(|e| format!("  {}: {}", e.when, e.what)));
        lines.join("\n")
    }

    pub fn exit(&mut self) -> String {
        match self.draft.take() {
            Some(_) => "Event discarded.".to_string(),
            None => "Closing the calendar.".to_string(),
        }
    }
}

/// `"dentist tomorrow at 10"` → `("dentist", Some("tomorrow at 10"))`.
fn split_when(text: &str) -> (&str, Option<&str>) {
    let mut offset = 0;
    for (i, word) in text.split(' ').enumerate() {
        if i > 0 && WHEN_MARKERS.contains(&word.to_lowercase().as_str()) {
            let what = text[..offset].trim();
            let when = text[offset..].trim();
            return (what, (!when.is_empty()).then_some(when));
        }
        offset += word.len() + 1;
    }
    (text.trim(), None)
}
