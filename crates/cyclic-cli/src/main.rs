//! Cyclic dungeon generator CLI.
//!
//! Provides the `cyclic` binary:
//!
//! - `generate` runs one generation and prints the dungeon report (or a
//!   compact summary) as JSON on stdout.
//! - `templates` lists the built-in cycle templates.
//!
//! Logs go to stderr through `tracing-subscriber`, filtered by `RUST_LOG`
//! (default `info`), so stdout stays machine-readable.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use cyclic_core::{CycleType, KeyPolicy, TemplateLibrary};
use cyclic_rewrite::{Budget, GenerationSettings, Generator, RuleRegistry, UniformSelector};

/// Exit code when generation fails.
const EXIT_GENERATION: i32 = 1;
/// Exit code when settings cannot be read or parsed.
const EXIT_SETTINGS: i32 = 2;

/// Cyclic dungeon generator.
#[derive(Parser)]
#[command(name = "cyclic", about = "Cyclic dungeon graph generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Generate a dungeon graph.
    Generate(GenerateArgs),
    /// List the built-in cycle templates.
    Templates,
}

#[derive(clap::Args)]
struct GenerateArgs {
    /// JSON settings file. Flags override its fields.
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// RNG seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Deepest sub-cycle nesting.
    #[arg(short = 'd', long)]
    max_depth: Option<u32>,

    /// Total insertion budget (breadth-first seam splicing).
    #[arg(short = 'i', long)]
    max_insertions: Option<u32>,

    /// Use recursive tree rewriting instead of seam splicing. Implied by any
    /// of the tree-only flags below.
    #[arg(long)]
    tree: bool,

    /// Node budget (tree rewriting).
    #[arg(long)]
    max_nodes: Option<usize>,

    /// Seams rewritten per cycle at most (tree rewriting).
    #[arg(long)]
    max_rewrites: Option<u32>,

    /// Chance of rewriting each seam (tree rewriting).
    #[arg(long)]
    probability: Option<f64>,

    /// Pin the root cycle type, e.g. `two-keys`.
    #[arg(short, long)]
    root: Option<CycleType>,

    /// How template keys map to dungeon keys.
    #[arg(long, value_enum)]
    key_policy: Option<PolicyArg>,

    /// Skip the built-in cycle rules.
    #[arg(long)]
    no_rules: bool,

    /// Print only the summary counts.
    #[arg(long)]
    summary: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    PerInstance,
    SharedPerTemplate,
    AuthorMarked,
}

impl From<PolicyArg> for KeyPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::PerInstance => KeyPolicy::PerInstance,
            PolicyArg::SharedPerTemplate => KeyPolicy::SharedPerTemplate,
            PolicyArg::AuthorMarked => KeyPolicy::AuthorMarked,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = match cli.command {
        Commands::Generate(args) => run_generate(&args),
        Commands::Templates => run_templates(),
    };
    process::exit(exit_code);
}

/// Execute the generate subcommand.
///
/// Returns exit code: 0 = success, 1 = generation error,
/// 2 = settings I/O or parse error.
fn run_generate(args: &GenerateArgs) -> i32 {
    let settings = match build_settings(args) {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("Error: {msg}");
            return EXIT_SETTINGS;
        }
    };

    let library = match TemplateLibrary::standard() {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Error: built-in template library is invalid: {e}");
            return EXIT_GENERATION;
        }
    };

    let rules = if args.no_rules {
        RuleRegistry::new()
    } else {
        RuleRegistry::standard()
    };
    let generator = Generator::new(&library).with_rules(rules);
    let mut selector = UniformSelector::from_library(&library);
    if let Some(root) = args.root {
        selector = selector.with_root(root);
    }

    match generator.generate(&settings, &mut selector) {
        Ok(dungeon) => {
            let output = if args.summary {
                serde_json::to_string_pretty(&dungeon.summary())
            } else {
                dungeon.report().to_json_pretty()
            };
            let json = output.unwrap_or_else(|e| {
                format!("{{\"error\": \"failed to serialize result: {e}\"}}")
            });
            println!("{json}");
            0
        }
        Err(e) => {
            eprintln!("Generation failed: {e}");
            EXIT_GENERATION
        }
    }
}

/// Execute the templates subcommand.
fn run_templates() -> i32 {
    let library = match TemplateLibrary::standard() {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Error: built-in template library is invalid: {e}");
            return EXIT_GENERATION;
        }
    };
    let listing: Vec<_> = library
        .iter()
        .map(|(ty, template)| {
            json!({
                "cycle_type": ty.name(),
                "rooms": template.node_count(),
                "passages": template.edge_count(),
                "seams": template.seams().len(),
                "keys": template.keys().len(),
            })
        })
        .collect();
    match serde_json::to_string_pretty(&listing) {
        Ok(json) => {
            println!("{json}");
            0
        }
        Err(e) => {
            eprintln!("Error: failed to serialize template list: {e}");
            EXIT_GENERATION
        }
    }
}

/// Merges the settings file (if any) with command-line overrides.
fn build_settings(args: &GenerateArgs) -> Result<GenerationSettings, String> {
    let mut settings = match &args.settings {
        Some(path) => load_settings(path)?,
        None => GenerationSettings::default(),
    };

    if let Some(seed) = args.seed {
        settings.seed = seed;
    }
    if let Some(depth) = args.max_depth {
        settings.max_depth = depth;
    }
    if let Some(policy) = args.key_policy {
        settings.key_policy = policy.into();
    }

    let tree = args.tree
        || args.max_nodes.is_some()
        || args.max_rewrites.is_some()
        || args.probability.is_some();
    if tree && args.max_insertions.is_some() {
        return Err("--max-insertions cannot be combined with tree rewriting".to_string());
    }

    if tree {
        let (mut max_nodes, mut max_rewrites_per_cycle, mut rewrite_probability) =
            match settings.budget {
                Budget::TreeRewrite {
                    max_nodes,
                    max_rewrites_per_cycle,
                    rewrite_probability,
                } => (max_nodes, max_rewrites_per_cycle, rewrite_probability),
                Budget::SeamSplice { .. } => (64, 2, 0.7),
            };
        if let Some(n) = args.max_nodes {
            max_nodes = n;
        }
        if let Some(n) = args.max_rewrites {
            max_rewrites_per_cycle = n;
        }
        if let Some(p) = args.probability {
            rewrite_probability = p;
        }
        settings.budget = Budget::TreeRewrite {
            max_nodes,
            max_rewrites_per_cycle,
            rewrite_probability,
        };
    } else if let Some(max_insertions_total) = args.max_insertions {
        settings.budget = Budget::SeamSplice {
            max_insertions_total,
        };
    }

    Ok(settings)
}

fn load_settings(path: &Path) -> Result<GenerationSettings, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("failed to read settings '{}': {e}", path.display()))?;
    serde_json::from_str(&text)
        .map_err(|e| format!("failed to parse settings '{}': {e}", path.display()))
}
