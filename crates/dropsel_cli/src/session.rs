//! A screen of dropdowns sharing one registry and one task queue

use anyhow::{Context, Result};
use dropsel_core::{ExclusivityRegistry, InstanceKey, TaskQueue};
use dropsel_select::{Dropdown, NavCommand, ValueAccessor};
use std::time::Instant;
use tracing::info;

use crate::config::ReplayFile;
use crate::script::{Command, Step};

/// Composition root for one replay
pub struct Session {
    registry: ExclusivityRegistry,
    tasks: TaskQueue,
    dropdowns: Vec<(String, Dropdown)>,
}

impl Session {
    pub fn new(file: &ReplayFile) -> Self {
        let registry = ExclusivityRegistry::new();
        let tasks = TaskQueue::new();

        let dropdowns = file
            .dropdowns
            .iter()
            .map(|entry| {
                let mut dropdown = Dropdown::new(
                    InstanceKey::explicit(entry.name.clone()),
                    entry.config.clone(),
                    registry.clone(),
                    tasks.clone(),
                );
                attach_callbacks(&entry.name, &mut dropdown);
                (entry.name.clone(), dropdown)
            })
            .collect();

        Self {
            registry,
            tasks,
            dropdowns,
        }
    }

    pub fn dropdowns(&self) -> impl Iterator<Item = (&str, &Dropdown)> {
        self.dropdowns
            .iter()
            .map(|(name, dropdown)| (name.as_str(), dropdown))
    }

    pub fn get(&self, name: &str) -> Option<&Dropdown> {
        self.dropdowns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, dropdown)| dropdown)
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut Dropdown> {
        self.dropdowns
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, dropdown)| dropdown)
            .with_context(|| format!("No dropdown named '{}'", name))
    }

    /// Instance that most recently opened and has not closed since
    pub fn last_opened(&self) -> Option<String> {
        self.registry.last_opened()
    }

    /// Apply one step, then run deferred tasks and settle dismissals
    ///
    /// Returns whether the engine reported the command as effective.
    pub fn apply(&mut self, step: &Step) -> Result<bool> {
        let dropdown = self.get_mut(&step.target)?;

        let effective = match &step.command {
            Command::Open => dropdown.open(),
            Command::Close => dropdown.close(),
            Command::Navigate(command) => dropdown.navigate(*command),
            Command::Select => dropdown.select_active(),
            Command::Type(text) => {
                let now = Instant::now();
                text.chars().fold(false, |moved, ch| {
                    dropdown.navigate_at(NavCommand::Typeahead(ch), now) || moved
                })
            }
            Command::Key(key) => dropdown.handle_key(*key),
            Command::Search(text) => dropdown.set_search_term(text),
            Command::Toggle(id) => dropdown.toggle(id),
            Command::Clear => dropdown.clear(),
            Command::Write(value) => {
                dropdown.write_value(value.clone());
                true
            }
            Command::Disable => {
                dropdown.set_disabled_state(true);
                true
            }
            Command::Enable => {
                dropdown.set_disabled_state(false);
                true
            }
        };

        self.tasks.run_pending();
        for (_, dropdown) in &mut self.dropdowns {
            dropdown.reconcile();
        }
        Ok(effective)
    }
}

fn attach_callbacks(name: &str, dropdown: &mut Dropdown) {
    let label = name.to_string();
    dropdown.on_value_change(Box::new(move |value| {
        info!("{}: value changed to {}", label, value.to_json());
    }));

    let label = name.to_string();
    dropdown.on_touched(Box::new(move || {
        info!("{}: touched", label);
    }));

    let label = name.to_string();
    dropdown.on_focus_search(move || {
        info!("{}: focus search field", label);
    });
}
