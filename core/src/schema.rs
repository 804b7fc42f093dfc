//! Serializable description of a command tree.
//!
//! [`CommandTree::schema`] snapshots a subtree into a [`CommandSchema`]:
//! plain data with no hooks or streams, suitable for JSON or YAML export
//! and for documentation tooling.

use cmdtree_flags::Flag;
use serde::{Deserialize, Serialize};

use crate::command::ANNOTATION_REQUIRED;
use crate::error::Result;
use crate::tree::{CommandId, CommandTree};

/// Version of the exported schema layout (semver).
pub const SCHEMA_VERSION: &str = "1.0.0";

/// One flag as exported.
///
/// # Examples
///
/// ```
/// use cmdtree_core::FlagSchema;
/// use cmdtree_flags::Flag;
///
/// let schema = FlagSchema::from_flag(&Flag::int("port", 8080).with_shorthand('p'), false);
/// assert_eq!(schema.kind, "int");
/// assert_eq!(schema.default, "8080");
/// assert_eq!(schema.shorthand.as_deref(), Some("p"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSchema {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shorthand: Option<String>,
    /// Value kind, e.g. `bool`, `string`, `int`.
    pub kind: String,
    pub default: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub persistent: bool,
    pub required: bool,
    pub hidden: bool,
}

impl FlagSchema {
    pub fn from_flag(flag: &Flag, persistent: bool) -> Self {
        let usage = flag.usage().trim();
        Self {
            name: flag.name().to_string(),
            shorthand: flag.shorthand().map(String::from),
            kind: flag.kind().as_str().to_string(),
            default: flag.default_value().to_string(),
            description: (!usage.is_empty()).then(|| usage.to_string()),
            persistent,
            required: flag
                .annotation(ANNOTATION_REQUIRED)
                .is_some_and(|v| v.first().is_some_and(|v| v == "true")),
            hidden: flag.is_hidden(),
        }
    }
}

/// A command and its subtree as exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSchema {
    pub schema_version: String,
    pub name: String,
    /// Full command path from the root.
    pub path: String,
    pub usage: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
    pub hidden: bool,
    pub runnable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<FlagSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subcommands: Vec<CommandSchema>,
}

impl CommandSchema {
    /// Finds a direct subcommand by name or alias.
    pub fn find_subcommand(&self, name: &str) -> Option<&CommandSchema> {
        self.subcommands
            .iter()
            .find(|s| s.name == name || s.aliases.iter().any(|a| a == name))
    }

    pub fn find_flag(&self, name: &str) -> Option<&FlagSchema> {
        self.flags.iter().find(|f| f.name == name)
    }

    pub fn subcommand_names(&self) -> Vec<&str> {
        self.subcommands.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    Json,
    Yaml,
    Markdown,
}

/// Formats a schema in the requested output format.
///
/// # Errors
///
/// Returns [`Json`](crate::Error::Json) or [`Yaml`](crate::Error::Yaml)
/// if serialization fails.
pub fn format_schema(schema: &CommandSchema, format: SchemaFormat) -> Result<String> {
    Ok(match format {
        SchemaFormat::Json => serde_json::to_string_pretty(schema)?,
        SchemaFormat::Yaml => serde_yaml::to_string(schema)?,
        SchemaFormat::Markdown => schema_to_markdown(schema),
    })
}

fn schema_to_markdown(schema: &CommandSchema) -> String {
    let mut out = String::new();
    write_markdown(schema, 1, &mut out);
    out
}

fn write_markdown(schema: &CommandSchema, depth: usize, out: &mut String) {
    out.push_str(&format!("{} {}\n\n", "#".repeat(depth.min(6)), schema.path));
    if let Some(ref desc) = schema.description {
        out.push_str(&format!("{desc}\n\n"));
    }
    if let Some(ref deprecated) = schema.deprecated {
        out.push_str(&format!("**Deprecated:** {deprecated}\n\n"));
    }
    out.push_str(&format!("```\n{}\n```\n\n", schema.usage));

    let visible: Vec<&FlagSchema> = schema.flags.iter().filter(|f| !f.hidden).collect();
    if !visible.is_empty() {
        out.push_str("| Flag | Type | Default | Description |\n");
        out.push_str("|------|------|---------|-------------|\n");
        for flag in visible {
            let name = match &flag.shorthand {
                Some(short) => format!("-{short}, --{}", flag.name),
                None => format!("--{}", flag.name),
            };
            let required = if flag.required { " (required)" } else { "" };
            out.push_str(&format!(
                "| `{name}` | {} | `{}` | {}{required} |\n",
                flag.kind,
                flag.default,
                flag.description.as_deref().unwrap_or("")
            ));
        }
        out.push('\n');
    }

    for sub in schema.subcommands.iter().filter(|s| !s.hidden) {
        write_markdown(sub, depth + 1, out);
    }
}

impl CommandTree {
    /// Snapshots `id` and its subtree. Flags are the command's own (local
    /// and persistent); inherited flags appear at the ancestor declaring
    /// them.
    pub fn schema(&self, id: CommandId) -> CommandSchema {
        let cmd = self.get(id);
        let description = if cmd.short.is_empty() {
            &cmd.long
        } else {
            &cmd.short
        };
        let flags = self
            .local_flags(id)
            .iter()
            .map(|flag| {
                let persistent = cmd.persistent_flags().lookup(flag.name()).is_some()
                    || (self.parent(id).is_none() && self.global_flags().lookup(flag.name()).is_some());
                FlagSchema::from_flag(flag, persistent)
            })
            .collect();

        CommandSchema {
            schema_version: SCHEMA_VERSION.to_string(),
            name: cmd.name().to_string(),
            path: self.command_path(id),
            usage: self.use_line(id),
            aliases: cmd.aliases.clone(),
            description: (!description.trim().is_empty()).then(|| description.trim().to_string()),
            deprecated: cmd.is_deprecated().then(|| cmd.deprecated.clone()),
            hidden: cmd.hidden,
            runnable: cmd.is_runnable(),
            flags,
            subcommands: self
                .listed_children(id)
                .into_iter()
                .map(|child| self.schema(child))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Command;

    fn sample_tree() -> CommandTree {
        let mut tree = CommandTree::new(
            Command::new("app")
                .with_short("Sample app")
                .with_persistent_flag(Flag::bool("verbose", false).with_shorthand('v').with_usage("Verbose output")),
        );
        let root = tree.root();
        let get = tree.add_command(
            root,
            Command::new("get <key>")
                .with_aliases(["g"])
                .with_flag(Flag::string("format", "json"))
                .with_run(|_, _| Ok(())),
        );
        tree.mark_flag_required(get, "format").unwrap();
        tree.add_command(root, Command::new("old").with_deprecated("use get").with_run(|_, _| Ok(())));
        tree
    }

    #[test]
    fn test_schema_structure() {
        let tree = sample_tree();
        let schema = tree.schema(tree.root());
        assert_eq!(schema.schema_version, SCHEMA_VERSION);
        assert_eq!(schema.description.as_deref(), Some("Sample app"));
        assert!(!schema.runnable);
        assert_eq!(schema.subcommand_names(), vec!["get", "old"]);

        let verbose = schema.find_flag("verbose").unwrap();
        assert!(verbose.persistent);
        assert_eq!(verbose.shorthand.as_deref(), Some("v"));

        let get = schema.find_subcommand("g").unwrap();
        assert_eq!(get.path, "app get");
        assert_eq!(get.usage, "app get <key> [flags]");
        let format = get.find_flag("format").unwrap();
        assert!(format.required);
        assert!(!format.persistent);
        assert!(get.find_flag("verbose").is_none());

        let old = schema.find_subcommand("old").unwrap();
        assert_eq!(old.deprecated.as_deref(), Some("use get"));
    }

    #[test]
    fn test_json_roundtrip() {
        let tree = sample_tree();
        let schema = tree.schema(tree.root());
        let json = format_schema(&schema, SchemaFormat::Json).unwrap();
        let back: CommandSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
    }

    #[test]
    fn test_yaml_output() {
        let tree = sample_tree();
        let yaml = format_schema(&tree.schema(tree.root()), SchemaFormat::Yaml).unwrap();
        assert!(yaml.contains("name: app"));
        assert!(yaml.contains("path: app get"));
    }

    #[test]
    fn test_markdown_output() {
        let tree = sample_tree();
        let md = format_schema(&tree.schema(tree.root()), SchemaFormat::Markdown).unwrap();
        assert!(md.starts_with("# app\n\nSample app\n\n"));
        assert!(md.contains("## app get"));
        assert!(md.contains("| `--format` | string | `json` |  (required) |"));
        assert!(md.contains("**Deprecated:** use get"));
    }
}
