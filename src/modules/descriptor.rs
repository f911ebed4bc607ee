//! Module descriptors: name, triggers, priority and mode kind.

use std::fmt;
use std::str::FromStr;

use crate::config::ModuleRecord;
use crate::error::AppError;

/// Conversational life-cycle a module runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    /// One exchange, then back to global routing.
    SingleTurn,
    /// Stays until the module reports completion or an exit phrase.
    MultiTurn,
    /// Produces a pending action that is confirmed or cancelled.
    Confirmation,
    /// Open-ended command loop until an exit phrase.
    Continuous,
}

impl FromStr for ModeKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "single-turn" | "single" => Ok(ModeKind::SingleTurn),
            "multi-turn" | "multi" => Ok(ModeKind::MultiTurn),
            "confirmation" | "confirm" => Ok(ModeKind::Confirmation),
            "continuous" => Ok(ModeKind::Continuous),
            other => Err(AppError::Registry(format!("unknown mode kind '{other}'"))),
        }
    }
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModeKind::SingleTurn => "single-turn",
            ModeKind::MultiTurn => "multi-turn",
            ModeKind::Confirmation => "confirmation",
            ModeKind::Continuous => "continuous",
        })
    }
}

#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    pub name: String,
    /// Normalized trigger phrases, in declaration order.
    pub triggers: Vec<String>,
    /// Higher wins.
    pub priority: i32,
    pub mode: ModeKind,
    /// Selected when nothing else matches.
    pub fallback: bool,
}

impl ModuleDescriptor {
    pub fn new(name: &str, triggers: &[&str], priority: i32, mode: ModeKind) -> Self {
        Self {
            name: name.to_string(),
            triggers: triggers.iter().map(|t| super::phrases::normalize(t)).collect(),
            priority,
            mode,
            fallback: false,
        }
    }

    pub fn fallback(mut self) -> Self {
        self.fallback = true;
        self
    }

    /// Apply a `[modules.<name>]` record. A declared mode must agree with the
    /// module's own mode kind.
    pub fn apply(&mut self, record: &ModuleRecord) -> Result<(), AppError> {
        if let Some(triggers) = &record.triggers {
            self.triggers = triggers.iter().map(|t| super::phrases::normalize(t)).filter(|t| !t.is_empty()).collect();
        }
        if let Some(priority) = record.priority {
            self.priority = priority;
        }
        if let Some(mode) = &record.mode {
            let declared: ModeKind = mode.parse()?;
            if declared != self.mode {
                return Err(AppError::Registry(format!(
                    "module '{}' runs in {} mode, config declares {declared}",
                    self.name, self.mode
                )));
            }
        }
        Ok(())
    }
}
