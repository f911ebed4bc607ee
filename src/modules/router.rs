//! Priority-ordered module selection.

use tracing::debug;

use crate::error::AppError;

use super::descriptor::ModuleDescriptor;
use super::phrases;

/// Routing decision. Indices refer to registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Stay in the active module and hand it the utterance.
    Continue(usize),
    /// Leave the active module.
    Exit(usize),
    /// Enter a module from global routing.
    Enter(usize),
}

#[derive(Debug)]
pub struct TriggerRouter {
    /// `(registration index, descriptor)`, highest priority first; equal
    /// priorities keep registration order.
    ordered: Vec<(usize, ModuleDescriptor)>,
    fallback: usize,
}

impl TriggerRouter {
    /// Validate and order the registry. An empty registry, or anything other
    /// than exactly one fallback holding the lowest priority, is a
    /// configuration error.
    pub fn new(descriptors: Vec<ModuleDescriptor>) -> Result<Self, AppError> {
        if descriptors.is_empty() {
            return Err(AppError::Registry("no modules registered".into()));
        }

        let fallbacks: Vec<usize> =
            descriptors.iter().enumerate().filter(|(_, d)| d.fallback).map(|(i, _)| i).collect();
        let fallback = match fallbacks.as_slice() {
            [one] => *one,
            [] => return Err(AppError::Registry("no fallback module registered".into())),
            _ => return Err(AppError::Registry(format!("{} fallback modules registered, need exactly one", fallbacks.len()))),
        };

        let floor = descriptors[fallback].priority;
        if let Some(low) = descriptors.iter().find(|d| !d.fallback && d.priority <= floor) {
            return Err(AppError::Registry(format!(
                "module '{}' (priority {}) must rank above fallback '{}' (priority {floor})",
                low.name, low.priority, descriptors[fallback].name
            )));
        }

        let mut ordered: Vec<(usize, ModuleDescriptor)> = descriptors.into_iter().enumerate().collect();
        // `sort_by` is stable, so ties keep registration order.
        ordered.sort_by(|a, b| b.1.priority.cmp(&a.1.priority));

        Ok(Self { ordered, fallback })
    }

    pub fn descriptor(&self, index: usize) -> Option<&ModuleDescriptor> {
        self.ordered.iter().find(|(i, _)| *i == index).map(|(_, d)| d)
    }

    /// Descriptors in routing order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.ordered.iter().map(|(_, d)| d)
    }

    /// Pick the owner of `normalized`. Inside an active module only an exit
    /// phrase hands control back; otherwise the first trigger match in
    /// priority order wins, and the fallback takes the rest.
    pub fn select(&self, normalized: &str, current: Option<usize>) -> Selection {
        if let Some(active) = current.filter(|i| *i != self.fallback) {
            return if phrases::is_exit(normalized) { Selection::Exit(active) } else { Selection::Continue(active) };
        }

        for (index, descriptor) in &self.ordered {
            if descriptor.fallback {
                continue;
            }
            if let Some(trigger) = descriptor.triggers.iter().find(|t| phrases::matches_trigger(normalized, t)) {
                debug!(module = %descriptor.name, %trigger, "trigger matched");
                return Selection::Enter(*index);
            }
        }
        Selection::Enter(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::descriptor::ModeKind;

    fn registry() -> Vec<ModuleDescriptor> {
        vec![
            ModuleDescriptor::new("chat", &[], 10, ModeKind::SingleTurn).fallback(),
            ModuleDescriptor::new("calendar", &["calendar", "agenda"], 70, ModeKind::MultiTurn),
            ModuleDescriptor::new("project", &["project mode", "show project"], 86, ModeKind::Continuous),
            ModuleDescriptor::new("coding", &["code with me"], 85, ModeKind::MultiTurn),
        ]
    }

    #[test]
    fn priority_order() {
        let router = TriggerRouter::new(registry()).unwrap();
        let names: Vec<&str> = router.descriptors().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["project", "coding", "calendar", "chat"]);
    }

    #[test]
    fn higher_priority_trigger_wins() {
        let router = TriggerRouter::new(registry()).unwrap();
        // Both calendar and project triggers are present.
        assert_eq!(router.select("project mode for my calendar app", None), Selection::Enter(2));
    }

    #[test]
    fn unmatched_goes_to_fallback() {
        let router = TriggerRouter::new(registry()).unwrap();
        assert_eq!(router.select("tell me a joke", None), Selection::Enter(0));
    }

    #[test]
    fn ties_break_by_registration_order() {
        let mut reg = registry();
        reg.push(ModuleDescriptor::new("notes", &["agenda"], 70, ModeKind::MultiTurn));
        let router = TriggerRouter::new(reg).unwrap();
        assert_eq!(router.select("agenda", None), Selection::Enter(1));
    }

    #[test]
    fn active_module_keeps_input_until_exit() {
        let router = TriggerRouter::new(registry()).unwrap();
        assert_eq!(router.select("calendar", Some(2)), Selection::Continue(2));
        assert_eq!(router.select("done", Some(2)), Selection::Exit(2));
        assert_eq!(router.select("klaar", Some(2)), Selection::Exit(2));
    }

    #[test]
    fn registry_validation() {
        assert!(TriggerRouter::new(vec![]).is_err());

        let no_fallback = vec![ModuleDescriptor::new("calendar", &["calendar"], 70, ModeKind::MultiTurn)];
        assert!(TriggerRouter::new(no_fallback).unwrap_err().to_string().contains("no fallback"));

        let mut two = registry();
        two.push(ModuleDescriptor::new("echo", &[], 5, ModeKind::SingleTurn).fallback());
        assert!(TriggerRouter::new(two).is_err());

        let mut low = registry();
        low.push(ModuleDescriptor::new("dictation", &["dictate"], 10, ModeKind::MultiTurn));
        assert!(TriggerRouter::new(low).unwrap_err().to_string().contains("dictation"));
    }
}
