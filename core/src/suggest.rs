//! "Did you mean this?" suggestions for mistyped subcommands.

use crate::tree::{CommandId, CommandTree};

/// Edit distance used when a command sets no minimum of its own.
pub const DEFAULT_SUGGESTION_DISTANCE: usize = 2;

impl CommandTree {
    /// Names of available children of `id` that `typed` could have meant.
    ///
    /// A child qualifies when its name is within the suggestion distance of
    /// `typed` (case-insensitive restricted Damerau-Levenshtein), when its
    /// name starts with `typed` case-insensitively, or when `typed` is one
    /// of its `suggest_for` entries. Results follow child order and may
    /// repeat a name that qualifies twice.
    pub fn suggestions_for(&self, id: CommandId, typed: &str) -> Vec<String> {
        let node = &self.nodes[id.0];
        let distance = match node.suggestions_minimum_distance {
            0 => DEFAULT_SUGGESTION_DISTANCE,
            n => n,
        };
        let typed_lower = typed.to_lowercase();

        let mut suggestions = Vec::new();
        for &child in &node.children {
            if !self.is_available_command(child) {
                continue;
            }
            let cmd = &self.nodes[child.0];
            let name = cmd.name();
            let close = strsim::osa_distance(&typed_lower, &name.to_lowercase()) <= distance;
            let prefix = name.to_lowercase().starts_with(&typed_lower);
            if close || prefix {
                suggestions.push(name.to_string());
            }
            if cmd.suggest_for.iter().any(|s| s.to_lowercase() == typed_lower) {
                suggestions.push(name.to_string());
            }
        }
        suggestions
    }

    /// The suggestion block appended to unknown-command errors, or an
    /// empty string when suggestions are disabled or none qualify.
    pub fn find_suggestions(&self, id: CommandId, typed: &str) -> String {
        if self.nodes[id.0].disable_suggestions {
            return String::new();
        }
        let suggestions = self.suggestions_for(id, typed);
        if suggestions.is_empty() {
            return String::new();
        }
        let mut block = String::from("\n\nDid you mean this?\n");
        for name in suggestions {
            block.push('\t');
            block.push_str(&name);
            block.push('\n');
        }
        block
    }
}
