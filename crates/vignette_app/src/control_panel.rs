// SPDX-License-Identifier: MIT OR Apache-2.0
//! Debug control panel: a titled window with one button per command.

use crate::drawing::DrawingError;
use indexmap::IndexMap;

/// Zero-argument command action
pub type CommandAction = Box<dyn FnMut() + Send>;

/// Named commands shown as buttons
pub struct ControlPanel {
    title: String,
    commands: IndexMap<String, CommandAction>,
}

impl ControlPanel {
    /// Create an empty panel
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            commands: IndexMap::new(),
        }
    }

    /// Register a command. An existing command with the same name is replaced in place.
    pub fn add(&mut self, name: impl Into<String>, action: impl FnMut() + Send + 'static) {
        let name = name.into();
        tracing::debug!("Control panel '{}': registered '{}'", self.title, name);
        self.commands.insert(name, Box::new(action));
    }

    /// Run a command by name
    pub fn invoke(&mut self, name: &str) -> Result<(), DrawingError> {
        let action = self
            .commands
            .get_mut(name)
            .ok_or_else(|| DrawingError::UnknownCommand(name.to_string()))?;
        tracing::debug!("Command '{}'", name);
        action();
        Ok(())
    }

    /// Command names in registration order
    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Draw the panel and run any clicked command
    pub fn show(&mut self, ctx: &egui::Context) {
        let commands = &mut self.commands;
        egui::Window::new(self.title.as_str())
            .resizable(false)
            .collapsible(true)
            .anchor(egui::Align2::RIGHT_TOP, [-12.0, 12.0])
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    for (name, action) in commands.iter_mut() {
                        if ui.button(name.as_str()).clicked() {
                            tracing::debug!("Command '{}'", name);
                            action();
                        }
                    }
                });
            });
    }
}

impl std::fmt::Debug for ControlPanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlPanel")
            .field("title", &self.title)
            .field("commands", &self.command_names().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_invoke_runs_action() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut panel = ControlPanel::new("Controls");
        let counter = count.clone();
        panel.add("play", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        panel.invoke("play").unwrap();
        panel.invoke("play").unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unknown_command() {
        let mut panel = ControlPanel::new("Controls");
        assert_eq!(panel.commands.len(), 0);
        match panel.invoke("jump") {
            Err(DrawingError::UnknownCommand(name)) => assert_eq!(name, "jump"),
            other => panic!("expected unknown command, got {other:?}"),
        }
    }

    #[test]
    fn test_commands_keep_registration_order() {
        let mut panel = ControlPanel::new("Controls");
        for name in ["play", "stop", "reset", "reverse"] {
            panel.add(name, || {});
        }
        panel.add("stop", || {});
        assert_eq!(panel.commands.len(), 4);
        assert_eq!(
            panel.command_names().collect::<Vec<_>>(),
            vec!["play", "stop", "reset", "reverse"]
        );
    }

    #[test]
    fn test_show_without_clicks() {
        let mut panel = ControlPanel::new("Controls");
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        panel.add("play", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let ctx = egui::Context::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| panel.show(ctx));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
