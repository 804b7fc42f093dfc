//! Flag scoping across the command tree.
//!
//! Each command declares local flags and persistent flags. Persistent flags
//! are visible to every descendant; a descendant's own flag of the same
//! name shadows them. Before a command parses its arguments the inherited
//! flags are merged into its local set by shared handle, so a value parsed
//! at a child is observable through the ancestor that declared the flag.
//!
//! The views computed here ([`local_flags`](CommandTree::local_flags),
//! [`inherited_flags`](CommandTree::inherited_flags)) never mutate the tree.

use std::rc::Rc;

use cmdtree_flags::{Flag, FlagError, FlagSet};
use tracing::debug;

use crate::command::ANNOTATION_REQUIRED;
use crate::error::{Error, Result};
use crate::tree::{CommandId, CommandTree};

impl CommandTree {
    /// The flag set of `id`: its local flags plus, once merged, inherited
    /// ones.
    pub fn flags(&self, id: CommandId) -> &FlagSet {
        &self.nodes[id.0].flags
    }

    pub fn flags_mut(&mut self, id: CommandId) -> &mut FlagSet {
        &mut self.nodes[id.0].flags
    }

    pub fn persistent_flags(&self, id: CommandId) -> &FlagSet {
        &self.nodes[id.0].persistent_flags
    }

    pub fn persistent_flags_mut(&mut self, id: CommandId) -> &mut FlagSet {
        &mut self.nodes[id.0].persistent_flags
    }

    /// The process-wide default flag set, folded into the root's persistent
    /// flags on merge.
    pub fn global_flags(&self) -> &FlagSet {
        &self.global_flags
    }

    pub fn global_flags_mut(&mut self) -> &mut FlagSet {
        &mut self.global_flags
    }

    /// Persistent flags of every ancestor of `id`, nearest ancestor first,
    /// followed by the global defaults. Empty for a root.
    pub fn parent_persistent_flags(&self, id: CommandId) -> FlagSet {
        let mut set = self.view_set(id);
        let Some(parent) = self.parent(id) else {
            return set;
        };
        for ancestor in self.lineage(parent) {
            set.add_flag_set(&self.nodes[ancestor.0].persistent_flags);
        }
        set.add_flag_set(&self.global_flags);
        set
    }

    /// Flags declared on `id` itself: local and persistent ones, excluding
    /// any handle inherited from an ancestor.
    pub fn local_flags(&self, id: CommandId) -> FlagSet {
        let node = &self.nodes[id.0];
        let parents = self.parent_persistent_flags(id);
        let globals = node
            .parent
            .is_none()
            .then_some(&self.global_flags)
            .into_iter()
            .flat_map(|set| set.iter());

        let mut local = self.view_set(id);
        for flag in node
            .flags
            .iter()
            .chain(node.persistent_flags.iter())
            .chain(globals)
        {
            if local.contains(flag.name()) {
                continue;
            }
            let inherited = parents
                .lookup(flag.name())
                .is_some_and(|p| Rc::ptr_eq(p, flag));
            if !inherited {
                local.add_shared(flag);
            }
        }
        local
    }

    /// Flags visible at `id` through its ancestors and not shadowed by a
    /// local flag of the same name.
    pub fn inherited_flags(&self, id: CommandId) -> FlagSet {
        let local = self.local_flags(id);
        let mut inherited = self.view_set(id);
        for flag in self.parent_persistent_flags(id).iter() {
            if !local.contains(flag.name()) {
                inherited.add_shared(flag);
            }
        }
        inherited
    }

    /// An empty set keyed the way `id`'s own flags are, so computed views
    /// compare names after global normalization.
    fn view_set(&self, id: CommandId) -> FlagSet {
        let mut set = FlagSet::new(self.name(id));
        set.set_normalize_fn(self.nodes[id.0].global_normalize.clone());
        set
    }

    /// Folds the global defaults into the root and merges `id`'s own
    /// persistent flags and every ancestor's into its local set.
    /// Idempotent; local flags always win on name collisions.
    pub fn merge_persistent_flags(&mut self, id: CommandId) {
        let root = self.root_of(id);
        let globals = self.global_flags.clone();
        self.nodes[root.0].persistent_flags.add_flag_set(&globals);

        let parents = self.parent_persistent_flags(id);
        let node = &mut self.nodes[id.0];
        let own = node.persistent_flags.clone();
        node.flags.add_flag_set(&own);
        node.flags.add_flag_set(&parents);
        node.parents_pflags = parents;
        debug!(
            command = node.name(),
            flags = node.flags.len(),
            "merged persistent flags"
        );
    }

    /// Looks a flag up the way parsing at `id` would see it, without
    /// merging: own flags, own persistent flags, ancestors' persistent
    /// flags, then the global defaults.
    pub fn effective_flag(&self, id: CommandId, name: &str) -> Option<Rc<Flag>> {
        let node = &self.nodes[id.0];
        node.flags
            .lookup(name)
            .or_else(|| node.persistent_flags.lookup(name))
            .or_else(|| {
                self.lineage(id)
                    .into_iter()
                    .skip(1)
                    .find_map(|a| self.nodes[a.0].persistent_flags.lookup(name))
            })
            .or_else(|| self.global_flags.lookup(name))
            .cloned()
    }

    /// Shorthand counterpart of [`effective_flag`](Self::effective_flag).
    pub fn effective_shorthand(&self, id: CommandId, shorthand: char) -> Option<Rc<Flag>> {
        let node = &self.nodes[id.0];
        node.flags
            .shorthand_lookup(shorthand)
            .or_else(|| node.persistent_flags.shorthand_lookup(shorthand))
            .or_else(|| {
                self.lineage(id)
                    .into_iter()
                    .skip(1)
                    .find_map(|a| self.nodes[a.0].persistent_flags.shorthand_lookup(shorthand))
            })
            .or_else(|| self.global_flags.shorthand_lookup(shorthand))
            .cloned()
    }

    /// True when `id` has any visible flag, local or inherited.
    pub fn has_available_flags(&self, id: CommandId) -> bool {
        self.local_flags(id).has_available_flags() || self.inherited_flags(id).has_available_flags()
    }

    /// Marks the local flag `name` as required.
    ///
    /// # Errors
    ///
    /// Returns a [`Flag`](Error::Flag) error if `id` declares no such flag.
    pub fn mark_flag_required(&self, id: CommandId, name: &str) -> Result<()> {
        self.nodes[id.0]
            .flags
            .set_annotation(name, ANNOTATION_REQUIRED, vec!["true".to_string()])?;
        Ok(())
    }

    /// Marks the persistent flag `name` as required wherever it is visible.
    ///
    /// # Errors
    ///
    /// Returns a [`Flag`](Error::Flag) error if `id` declares no such flag.
    pub fn mark_persistent_flag_required(&self, id: CommandId, name: &str) -> Result<()> {
        self.nodes[id.0].persistent_flags.set_annotation(
            name,
            ANNOTATION_REQUIRED,
            vec!["true".to_string()],
        )?;
        Ok(())
    }

    /// Fails with every required flag of `id` that was not set, in
    /// declaration order. Skipped when flag parsing is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`RequiredFlags`](Error::RequiredFlags).
    pub fn validate_required_flags(&self, id: CommandId) -> Result<()> {
        let node = &self.nodes[id.0];
        if node.disable_flag_parsing {
            return Ok(());
        }
        let missing: Vec<String> = node
            .flags
            .iter()
            .filter(|flag| is_required(flag) && !flag.changed())
            .map(|flag| flag.name().to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::RequiredFlags(missing))
        }
    }

    /// Merges inherited flags and parses `args` against them. A no-op when
    /// flag parsing is disabled. Deprecation notices go to the `out` stream.
    ///
    /// # Errors
    ///
    /// Returns the raw parse failure, before any flag-error transform.
    pub fn parse_flags(&mut self, id: CommandId, args: &[String]) -> std::result::Result<(), FlagError> {
        if self.nodes[id.0].disable_flag_parsing {
            return Ok(());
        }
        self.merge_persistent_flags(id);

        let node = &mut self.nodes[id.0];
        let whitelist = node.parse_errors_whitelist;
        node.flags.set_errors_whitelist(whitelist);
        let parsed = node.flags.parse(args);
        let notices = node.flags.take_notices();
        for notice in notices {
            self.println(id, &notice);
        }
        parsed
    }
}

fn is_required(flag: &Flag) -> bool {
    flag.annotation(ANNOTATION_REQUIRED)
        .is_some_and(|values| values.first().is_some_and(|v| v == "true"))
}
