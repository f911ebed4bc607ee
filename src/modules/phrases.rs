//! Utterance normalization and the fixed phrase sets (English and Dutch).

use super::InputMode;

/// Leave the current module.
pub const EXIT: &[&str] = &[
    "done", "stop", "exit", "quit", "klaar", "stop project", "end project", "stoppen", "einde",
    "that's all", "dat is alles",
];

/// End the program. Only honoured outside a module.
pub const SHUTDOWN: &[&str] =
    &["shut down", "shutdown", "goodbye", "good bye", "quit", "tot ziens", "afsluiten"];

/// Execute a pending action.
pub const CONFIRM: &[&str] = &[
    "yes", "ja", "yep", "yeah", "do it", "go ahead", "run it", "okay", "ok", "apply", "doe maar",
    "doe het", "uitvoeren", "prima",
];

/// Discard a pending action.
pub const CANCEL: &[&str] =
    &["cancel", "no", "nee", "nope", "nevermind", "never mind", "annuleer", "laat maar"];

/// Interrupt a turn that is still running.
pub const INTERRUPT: &[&str] = &["stop", "cancel", "wait", "hold on", "stop scanning", "annuleer", "wacht"];

const TYPED: &[&str] = &["type", "type mode", "keyboard", "typ", "typen", "toetsenbord"];
const VOICE: &[&str] = &["voice", "voice mode", "speak", "spraak", "praten"];

const ORDINALS: &[(&[&str], usize)] = &[
    (&["1", "one", "first", "een", "eerste"], 1),
    (&["2", "two", "second", "twee", "tweede"], 2),
    (&["3", "three", "third", "drie", "derde"], 3),
    (&["4", "four", "fourth", "vier", "vierde"], 4),
    (&["5", "five", "fifth", "vijf", "vijfde"], 5),
    (&["6", "six", "sixth", "zes", "zesde"], 6),
    (&["7", "seven", "seventh", "zeven", "zevende"], 7),
    (&["8", "eight", "eighth", "acht", "achtste"], 8),
    (&["9", "nine", "ninth", "negen", "negende"], 9),
    (&["10", "ten", "tenth", "tien", "tiende"], 10),
];

/// Lowercase, unify apostrophes, collapse whitespace and drop trailing
/// punctuation left by speech-to-text.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase().replace(['\u{2019}', '\u{2018}', '`'], "'");
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim_end_matches(['.', ',', '!', '?', ';', ':']).trim().to_string()
}

fn is_one_of(normalized: &str, set: &[&str]) -> bool {
    set.contains(&normalized)
}

pub fn is_exit(normalized: &str) -> bool {
    is_one_of(normalized, EXIT)
}

pub fn is_shutdown(normalized: &str) -> bool {
    is_one_of(normalized, SHUTDOWN)
}

pub fn is_confirm(normalized: &str) -> bool {
    is_one_of(normalized, CONFIRM)
}

pub fn is_cancel(normalized: &str) -> bool {
    is_one_of(normalized, CANCEL)
}

pub fn is_interrupt(normalized: &str) -> bool {
    is_one_of(normalized, INTERRUPT)
}

pub fn input_mode(normalized: &str) -> Option<InputMode> {
    if is_one_of(normalized, TYPED) {
        Some(InputMode::Typed)
    } else if is_one_of(normalized, VOICE) {
        Some(InputMode::Voice)
    } else {
        None
    }
}

/// `"2"`, `"second"`, `"the second one"`, `"number two"`, `"de tweede"` → 2.
pub fn ordinal(normalized: &str) -> Option<usize> {
    let words: Vec<&str> = normalized
        .split_whitespace()
        .filter(|w| !matches!(*w, "the" | "one" | "number" | "nummer" | "de" | "het" | "open"))
        .collect();
    let word = match words.as_slice() {
        [w] => *w,
        // "one" on its own is a number, not filler.
        [] if normalized == "one" || normalized == "the one" => "one",
        _ => return None,
    };
    ORDINALS.iter().find(|(names, _)| names.contains(&word)).map(|(_, n)| *n)
}

fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '-')).filter(|w| !w.is_empty()).collect()
}

/// Trigger match: `phrase` is a prefix of `normalized`, or appears in it as
/// a run of whole words. Both arguments are expected normalized.
pub fn matches_trigger(normalized: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    if let Some(rest) = normalized.strip_prefix(phrase) {
        if rest.chars().next().is_none_or(|c| !c.is_alphanumeric()) {
            return true;
        }
    }
    let hay = words(normalized);
    let needle = words(phrase);
    !needle.is_empty() && hay.windows(needle.len()).any(|w| w == needle.as_slice())
}

/// Text after the first matching `prefixes` entry, original casing kept.
pub fn strip_prefix<'a>(original: &'a str, normalized: &str, prefixes: &[&str]) -> Option<&'a str> {
    let trimmed = original.trim_start();
    prefixes.iter().find_map(|p| {
        let with_space = format!("{p} ");
        if normalized.starts_with(&with_space) {
            // Lowercasing can change byte lengths; fall back to char counts.
            let skip = with_space.chars().count();
            let rest: &str = trimmed.char_indices().nth(skip).map(|(i, _)| &trimmed[i..]).unwrap_or("");
            Some(rest.trim().trim_end_matches(['.', '!', '?']))
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization() {
        assert_eq!(normalize("  What’s   LOADED? "), "what's loaded");
        assert_eq!(normalize("Klaar."), "klaar");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn phrase_sets_are_bilingual() {
        assert!(is_exit("klaar"));
        assert!(is_exit("done"));
        assert!(is_confirm("doe maar"));
        assert!(is_confirm("do it"));
        assert!(is_cancel("annuleer"));
        assert!(is_shutdown("tot ziens"));
        assert!(!is_exit("done deal"));
    }

    #[test]
    fn input_modes() {
        assert_eq!(input_mode("type"), Some(InputMode::Typed));
        assert_eq!(input_mode("typ"), Some(InputMode::Typed));
        assert_eq!(input_mode("spraak"), Some(InputMode::Voice));
        assert_eq!(input_mode("typed notes"), None);
    }

    #[test]
    fn ordinals() {
        assert_eq!(ordinal("2"), Some(2));
        assert_eq!(ordinal("the second one"), Some(2));
        assert_eq!(ordinal("number three"), Some(3));
        assert_eq!(ordinal("de tweede"), Some(2));
        assert_eq!(ordinal("one"), Some(1));
        assert_eq!(ordinal("open the file"), None);
    }

    #[test]
    fn trigger_matching() {
        assert!(matches_trigger("project mode please", "project mode"));
        assert!(matches_trigger("let's start project mode", "project mode"));
        assert!(!matches_trigger("projects moded", "project mode"));
        assert!(matches_trigger("terminal", "terminal"));
        assert!(!matches_trigger("anything", ""));
    }

    #[test]
    fn prefix_stripping_keeps_case() {
        let original = "Open ProjectModule.";
        let norm = normalize(original);
        assert_eq!(strip_prefix(original, &norm, &["open"]), Some("ProjectModule"));
        assert_eq!(strip_prefix(original, &norm, &["close"]), None);
    }
}
