use std::path::PathBuf;

use cmdtree_core::{
    BoxError, Command, CommandRef, CommandTree, Config, PositionalArgs, SchemaFormat,
    format_schema,
};
use cmdtree_flags::Flag;
use tracing::{Level, debug};

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable naming an optional YAML file with framework switches.
const CONFIG_ENV: &str = "CMDTREE_DEMO_CONFIG";

fn main() {
    let config = match load_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };

    let mut tree = build_tree(config);
    // The framework has already reported the failure on stderr.
    if tree.execute().is_err() {
        std::process::exit(1);
    }
}

fn load_config() -> Result<Config, String> {
    let Some(path) = std::env::var_os(CONFIG_ENV).map(PathBuf::from) else {
        return Ok(Config::default());
    };
    Config::load(&path).map_err(|err| format!("failed to load {}: {err}", path.display()))
}

fn build_tree(config: Config) -> CommandTree {
    let mut tree = CommandTree::with_config(
        Command::new("cmdtree-demo")
            .with_short("Demonstrates nested commands, persistent flags and hooks")
            .with_version(PACKAGE_VERSION)
            .with_persistent_flag(
                Flag::string("log-level", "warn")
                    .with_usage("log level for diagnostics on stderr (error, warn, info, debug, trace)"),
            )
            .with_persistent_pre_run(init_logging),
        config,
    );
    let root = tree.root();

    let echo = tree.add_command(
        root,
        Command::new("echo [string to echo]")
            .with_aliases(["say"])
            .with_short("Echo anything to the screen")
            .with_long("Echo prints its arguments separated by spaces.")
            .with_args(PositionalArgs::minimum(1))
            .with_persistent_flag(
                Flag::bool("upper", false)
                    .with_shorthand('u')
                    .with_usage("print in upper case"),
            )
            .with_run(run_echo),
    );
    tree.add_command(
        echo,
        Command::new("times [# times] [string to echo]")
            .with_short("Echo anything to the screen more times")
            .with_example("cmdtree-demo echo times -t 3 hello")
            .with_args(PositionalArgs::minimum(1))
            .with_flag(
                Flag::int("times", 1)
                    .with_shorthand('t')
                    .with_usage("times to echo the input"),
            )
            .with_run(run_times),
    );

    tree.add_command(
        root,
        Command::new("print [string to print]")
            .with_short("Print anything to the screen")
            .with_args(PositionalArgs::minimum(1))
            .with_flag(Flag::string_slice("tag", Vec::new()).with_usage("tags to prefix the output with"))
            .with_run(run_print),
    );

    let greet = tree.add_command(
        root,
        Command::new("greet <name>")
            .with_short("Greet one of the known people")
            .with_valid_args(["alice", "bob", "carol"])
            .with_args(PositionalArgs::match_all(vec![
                PositionalArgs::only_valid(),
                PositionalArgs::exact(1),
            ]))
            .with_flag(Flag::bool("formal", false).with_usage("use a formal greeting"))
            .with_flag(Flag::bool("casual", false).with_usage("use a casual greeting"))
            .with_run(run_greet),
    );
    tree.mark_flags_mutually_exclusive(greet, &["formal", "casual"]);

    tree.add_command(
        root,
        Command::new("schema")
            .with_short("Print the command tree as a schema document")
            .with_args(PositionalArgs::none())
            .with_flag(
                Flag::string("format", "json")
                    .with_shorthand('f')
                    .with_usage("output format (json, yaml, markdown)"),
            )
            .with_run(run_schema),
    );

    tree
}

fn init_logging(cmd: CommandRef<'_>, _args: &[String]) -> Result<(), BoxError> {
    let raw = cmd.flags().get_string("log-level")?;
    let level = raw
        .parse::<Level>()
        .map_err(|_| format!("invalid log level: {raw}"))?;
    // A second execution in the same process keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .try_init();
    debug!(command = %cmd.command_path(), "logging initialized");
    Ok(())
}

fn run_echo(cmd: CommandRef<'_>, args: &[String]) -> Result<(), BoxError> {
    let line = shout(cmd, args.join(" "))?;
    cmd.println(&line);
    Ok(())
}

fn run_times(cmd: CommandRef<'_>, args: &[String]) -> Result<(), BoxError> {
    let times = cmd.flags().get_int("times")?;
    if times < 0 {
        return Err(format!("--times must not be negative, got {times}").into());
    }
    let line = shout(cmd, args.join(" "))?;
    for _ in 0..times {
        cmd.println(&line);
    }
    Ok(())
}

fn shout(cmd: CommandRef<'_>, line: String) -> Result<String, BoxError> {
    if cmd.flags().get_bool("upper")? {
        return Ok(line.to_uppercase());
    }
    Ok(line)
}

fn run_print(cmd: CommandRef<'_>, args: &[String]) -> Result<(), BoxError> {
    let tags = cmd.flags().get_string_slice("tag")?;
    let body = args.join(" ");
    if tags.is_empty() {
        cmd.println(&body);
    } else {
        cmd.println(&format!("[{}] {body}", tags.join(",")));
    }
    Ok(())
}

fn run_greet(cmd: CommandRef<'_>, args: &[String]) -> Result<(), BoxError> {
    let flags = cmd.flags();
    let greeting = if flags.get_bool("formal")? {
        "Good day"
    } else if flags.get_bool("casual")? {
        "Hey"
    } else {
        "Hello"
    };
    cmd.println(&format!("{greeting}, {}!", args[0]));
    Ok(())
}

fn run_schema(cmd: CommandRef<'_>, _args: &[String]) -> Result<(), BoxError> {
    let raw = cmd.flags().get_string("format")?;
    let format = parse_format(&raw)?;
    let tree = cmd.tree();
    let schema = tree.schema(tree.root());
    cmd.println(format_schema(&schema, format)?.trim_end());
    Ok(())
}

fn parse_format(raw: &str) -> Result<SchemaFormat, String> {
    match raw.to_ascii_lowercase().as_str() {
        "json" => Ok(SchemaFormat::Json),
        "yaml" | "yml" => Ok(SchemaFormat::Yaml),
        "markdown" | "md" => Ok(SchemaFormat::Markdown),
        other => Err(format!("unsupported format '{other}' (expected json, yaml or markdown)")),
    }
}
