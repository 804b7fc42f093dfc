//! Flag groups and command groups.
//!
//! Flag groups constrain which flags may be set together. They are stored
//! as annotations on the flags themselves (one space-separated entry per
//! group) and validated after the pre-run hook. Command groups are titled
//! sections subcommands can be listed under.

use std::collections::BTreeMap;

use cmdtree_flags::{Flag, FlagSet};

use crate::command::Group;
use crate::error::{Error, Result};
use crate::tree::{CommandId, CommandTree};

/// Annotation for flags that must be set together.
pub const ANNOTATION_REQUIRED_TOGETHER: &str = "cmdtree_annotation_required_if_others_set";

/// Annotation for groups where at least one flag must be set.
pub const ANNOTATION_ONE_REQUIRED: &str = "cmdtree_annotation_one_required";

/// Annotation for groups where at most one flag may be set.
pub const ANNOTATION_MUTUALLY_EXCLUSIVE: &str = "cmdtree_annotation_mutually_exclusive";

/// group -> flag name -> set?
type GroupStatus = BTreeMap<String, BTreeMap<String, bool>>;

impl CommandTree {
    /// If any flag of `names` is set, all of them must be.
    ///
    /// # Panics
    ///
    /// Panics if a name is not a flag visible at `id`.
    pub fn mark_flags_required_together(&mut self, id: CommandId, names: &[&str]) {
        self.mark_flag_group(id, names, ANNOTATION_REQUIRED_TOGETHER, "required together");
    }

    /// At least one flag of `names` must be set.
    ///
    /// # Panics
    ///
    /// Panics if a name is not a flag visible at `id`.
    pub fn mark_flags_one_required(&mut self, id: CommandId, names: &[&str]) {
        self.mark_flag_group(id, names, ANNOTATION_ONE_REQUIRED, "one required");
    }

    /// At most one flag of `names` may be set.
    ///
    /// # Panics
    ///
    /// Panics if a name is not a flag visible at `id`.
    pub fn mark_flags_mutually_exclusive(&mut self, id: CommandId, names: &[&str]) {
        self.mark_flag_group(id, names, ANNOTATION_MUTUALLY_EXCLUSIVE, "mutually exclusive");
    }

    fn mark_flag_group(&mut self, id: CommandId, names: &[&str], annotation: &str, kind: &str) {
        self.merge_persistent_flags(id);
        let group = names.join(" ");
        for name in names {
            let Some(flag) = self.nodes[id.0].flags.lookup(name) else {
                panic!("failed to find flag {name:?} and mark it as being {kind} in a flag group");
            };
            let mut entries = flag.annotation(annotation).unwrap_or_default();
            entries.push(group.clone());
            flag.set_annotation(annotation, entries);
        }
    }

    /// Checks every flag group touching the flags of `id`. Skipped when
    /// flag parsing is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`FlagGroup`](Error::FlagGroup) for the first violated
    /// constraint, checking required-together groups, then one-required,
    /// then mutually-exclusive.
    pub fn validate_flag_groups(&self, id: CommandId) -> Result<()> {
        let node = &self.nodes[id.0];
        if node.disable_flag_parsing {
            return Ok(());
        }
        let flags = &node.flags;
        let mut together = GroupStatus::new();
        let mut one_required = GroupStatus::new();
        let mut exclusive = GroupStatus::new();
        for flag in flags.iter() {
            record_status(flags, flag, ANNOTATION_REQUIRED_TOGETHER, &mut together);
            record_status(flags, flag, ANNOTATION_ONE_REQUIRED, &mut one_required);
            record_status(flags, flag, ANNOTATION_MUTUALLY_EXCLUSIVE, &mut exclusive);
        }

        for (group, status) in &together {
            let unset: Vec<&str> = unset_flags(status);
            if !unset.is_empty() && unset.len() < status.len() {
                return Err(Error::FlagGroup(format!(
                    "if any flags in the group [{group}] are set they must all be set; missing [{}]",
                    unset.join(" ")
                )));
            }
        }
        for (group, status) in &one_required {
            if status.values().all(|set| !set) {
                return Err(Error::FlagGroup(format!(
                    "at least one of the flags in the group [{group}] is required"
                )));
            }
        }
        for (group, status) in &exclusive {
            let set: Vec<&str> = set_flags(status);
            if set.len() > 1 {
                return Err(Error::FlagGroup(format!(
                    "if any flags in the group [{group}] are set none of the others can be; [{}] were all set",
                    set.join(" ")
                )));
            }
        }
        Ok(())
    }

    /// Declares a command group on `id` for its subcommands to join.
    pub fn add_group(&mut self, id: CommandId, group: Group) {
        self.nodes[id.0].groups.push(group);
    }

    pub fn contains_group(&self, id: CommandId, group_id: &str) -> bool {
        self.nodes[id.0].groups.iter().any(|g| g.id == group_id)
    }

    pub fn all_groups(&self, id: CommandId) -> &[Group] {
        &self.nodes[id.0].groups
    }

    /// Verifies that every subcommand below `id` names a group declared on
    /// its parent.
    ///
    /// # Panics
    ///
    /// Panics on the first undeclared group id.
    pub fn check_command_groups(&self, id: CommandId) {
        for &child in self.children(id) {
            let group_id = &self.nodes[child.0].group_id;
            if !group_id.is_empty() && !self.contains_group(id, group_id) {
                panic!(
                    "group id {group_id:?} is not defined for subcommand {:?}",
                    self.command_path(child)
                );
            }
            self.check_command_groups(child);
        }
    }
}

/// Records whether `flag` is set for every group it belongs to. Groups
/// naming a flag that `flags` lacks are ignored.
fn record_status(flags: &FlagSet, flag: &Flag, annotation: &str, status: &mut GroupStatus) {
    let Some(groups) = flag.annotation(annotation) else {
        return;
    };
    for group in groups {
        if !status.contains_key(&group) {
            let names: Vec<&str> = group.split(' ').collect();
            if !names.iter().all(|name| flags.contains(name)) {
                continue;
            }
            let initial = names.iter().map(|name| (name.to_string(), false)).collect();
            status.insert(group.clone(), initial);
        }
        if let Some(entry) = status.get_mut(&group) {
            entry.insert(flag.name().to_string(), flag.changed());
        }
    }
}

fn unset_flags(status: &BTreeMap<String, bool>) -> Vec<&str> {
    status
        .iter()
        .filter(|(_, set)| !**set)
        .map(|(name, _)| name.as_str())
        .collect()
}

fn set_flags(status: &BTreeMap<String, bool>) -> Vec<&str> {
    status
        .iter()
        .filter(|(_, set)| **set)
        .map(|(name, _)| name.as_str())
        .collect()
}
