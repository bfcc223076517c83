//! Component Specification CLI
//!
//! Commands: validate, compile, digest, explore
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 on specification/compilation failure, 1 on environment failure

use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use componentspec_core::{
    explorer::{run_explorer_app, ExplorerConfig, ProcessRunner, DEFAULT_CONTAINER, DEFAULT_PORT, DEFAULT_TAG},
    CompilationPipeline, SchemaStore, SpecError,
};

#[derive(Parser)]
#[command(name = "componentspec-cli")]
#[command(about = "Component Specification CLI - validate and compile component specs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Schema directory overriding the bundled schemas
    #[arg(long, global = true, env = "COMPONENTSPEC_SCHEMA_DIR")]
    schema_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a component specification and list every violation
    Validate {
        /// Path to the component spec (YAML)
        spec: PathBuf,
    },

    /// Compile a component specification into a platform step descriptor
    Compile {
        /// Path to the component spec (YAML)
        spec: PathBuf,

        /// Where to write the compiled descriptor (YAML)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the digest of the compiled descriptor
    Digest {
        /// Path to the component spec (YAML)
        spec: PathBuf,
    },

    /// Launch the data explorer container
    Explore {
        #[arg(short, long)]
        data_directory: Option<String>,

        #[arg(long)]
        credentials: Option<String>,

        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        #[arg(long, default_value = DEFAULT_CONTAINER)]
        container: String,

        #[arg(long, default_value = DEFAULT_TAG)]
        tag: String,

        /// Keep the container after it stops
        #[arg(long)]
        keep: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

fn emit(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("failed to render output: {}", e),
    }
}

fn fail(error: &SpecError) -> ExitCode {
    emit(&json!({"success": false, "error": error.to_string()}));
    if error.is_document_error() {
        ExitCode::from(2)
    } else {
        ExitCode::FAILURE
    }
}

fn read_document(path: &Path) -> Result<Value, SpecError> {
    let text = fs::read_to_string(path).map_err(|source| SpecError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_yaml_ng::from_str(&text)?)
}

fn pipeline(schema_dir: Option<&Path>) -> Result<CompilationPipeline, SpecError> {
    match schema_dir {
        Some(dir) => Ok(CompilationPipeline::new(SchemaStore::from_dir(dir)?)),
        None => CompilationPipeline::bundled(),
    }
}

fn explore(config: &ExplorerConfig) -> ExitCode {
    match run_explorer_app(config, &ProcessRunner) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

fn validate(pipeline: &CompilationPipeline, spec: &Path) -> ExitCode {
    let report = match read_document(spec).and_then(|doc| pipeline.validate_document(&doc)) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };
    emit(&json!(report));
    if report.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    }
}

fn compile(pipeline: &CompilationPipeline, spec: &Path, output: Option<&Path>) -> ExitCode {
    let compiled = match read_document(spec).and_then(|doc| pipeline.compile_document(&doc)) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    let written = match output {
        Some(path) => compiled.platform.to_file(path).map(|_| json!(path)),
        None => compiled.platform.document(),
    };
    match written {
        Ok(value) => {
            emit(&json!({
                "success": true,
                "name": compiled.platform.name(),
                "digest": compiled.digest,
                "output": value,
            }));
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn digest(pipeline: &CompilationPipeline, spec: &Path) -> ExitCode {
    match read_document(spec).and_then(|doc| pipeline.compile_document(&doc)) {
        Ok(compiled) => {
            println!("{}", compiled.digest);
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let load = || pipeline(cli.schema_dir.as_deref());

    match &cli.command {
        Commands::Explore {
            data_directory,
            credentials,
            port,
            container,
            tag,
            keep,
        } => explore(&ExplorerConfig {
            rm: !keep,
            port: *port,
            container: container.clone(),
            tag: tag.clone(),
            data_directory: data_directory.clone(),
            credentials: credentials.clone(),
            ..Default::default()
        }),

        Commands::Validate { spec } => match load() {
            Ok(pipeline) => validate(&pipeline, spec),
            Err(e) => fail(&e),
        },

        Commands::Compile { spec, output } => match load() {
            Ok(pipeline) => compile(&pipeline, spec, output.as_deref()),
            Err(e) => fail(&e),
        },

        Commands::Digest { spec } => match load() {
            Ok(pipeline) => digest(&pipeline, spec),
            Err(e) => fail(&e),
        },
    }
}
