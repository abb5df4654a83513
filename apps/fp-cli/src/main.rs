use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use fp_model::Model;
use fp_prism::{EmitOptions, PrismProcess, emit_model, reduce};

#[derive(Parser)]
#[command(name = "fp-cli")]
#[command(about = "FailProp CLI - reliability model validation and analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a model tree and print every diagnostic
    Validate {
        /// Path to the model file (.yaml or .json)
        model_path: PathBuf,
    },
    /// Emit the flat solver model text
    Compile {
        /// Path to the model file (.yaml or .json)
        model_path: PathBuf,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Include the "time" reward structure
        #[arg(long)]
        time_reward: bool,
        /// Skip the error propagation module
        #[arg(long)]
        no_ep: bool,
    },
    /// Reduce compound and repeated elements to a flat model
    Reduce {
        /// Path to the model file (.yaml or .json)
        model_path: PathBuf,
        /// Where to write the reduced model (defaults to overwriting)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// PRISM bin directory
        #[arg(long)]
        prism_dir: PathBuf,
        /// Engine timeout in seconds
        #[arg(long, default_value_t = 180)]
        timeout: u32,
    },
    /// Run an analysis query against the external solver
    #[command(subcommand)]
    Analyze(AnalyzeCommands),
}

#[derive(Subcommand)]
enum AnalyzeCommands {
    /// Expected total execution time
    ExecTime {
        model_path: PathBuf,
        #[arg(long)]
        prism_dir: PathBuf,
    },
    /// Probability of ever reaching a failure
    Probability {
        model_path: PathBuf,
        /// Failure name
        failure: String,
        #[arg(long)]
        prism_dir: PathBuf,
    },
    /// Mean time to failure
    Mttf {
        model_path: PathBuf,
        /// Failure name
        failure: String,
        #[arg(long)]
        prism_dir: PathBuf,
    },
    /// Failure probability over a step range, as CSV
    Series {
        model_path: PathBuf,
        /// Failure name
        failure: String,
        /// Step range as start:step:end
        #[arg(long, default_value = "0:10:100")]
        range: String,
        #[arg(long)]
        prism_dir: PathBuf,
    },
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("Project error: {0}")]
    Project(#[from] fp_project::ProjectError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Reduction failed: {0}")]
    Reduce(#[from] fp_prism::ReduceError),

    #[error("Emit failed: {0}")]
    Emit(#[from] fp_prism::EmitError),

    #[error("Query failed: {0}")]
    Query(#[from] fp_prism::QueryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

type AppResult<T> = Result<T, AppError>;

fn main() -> AppResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { model_path } => cmd_validate(&model_path),
        Commands::Compile {
            model_path,
            output,
            time_reward,
            no_ep,
        } => cmd_compile(&model_path, output.as_deref(), time_reward, no_ep),
        Commands::Reduce {
            model_path,
            output,
            prism_dir,
            timeout,
        } => cmd_reduce(&model_path, output.as_deref(), &prism_dir, timeout),
        Commands::Analyze(analyze) => cmd_analyze(analyze),
    }
}

fn load_model(path: &Path) -> AppResult<Model> {
    let model = if path.extension().is_some_and(|e| e == "json") {
        fp_project::load_json(path)?
    } else {
        fp_project::load_yaml(path)?
    };
    Ok(model)
}

fn save_model(path: &Path, model: &Model) -> AppResult<()> {
    if path.extension().is_some_and(|e| e == "json") {
        fp_project::save_json(path, model)?;
    } else {
        fp_project::save_yaml(path, model)?;
    }
    Ok(())
}

fn cmd_validate(model_path: &Path) -> AppResult<()> {
    println!("Validating model: {}", model_path.display());
    let model = load_model(model_path)?;
    let report = fp_check::check_tree(&model);
    for diagnostic in report.diagnostics() {
        println!("  {diagnostic}");
    }
    if report.is_ok() {
        println!("✓ Model is valid");
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "{} error(s)",
            report.errors().count()
        )))
    }
}

fn cmd_compile(
    model_path: &Path,
    output: Option<&Path>,
    time_reward: bool,
    no_ep: bool,
) -> AppResult<()> {
    let model = load_model(model_path)?;
    let options = EmitOptions {
        time_reward,
        skip_ep_module: no_ep,
        ..EmitOptions::default()
    };
    let mut text = emit_model(&model, &options)?;
    if !model.failures().is_empty() {
        text.push_str(&fp_prism::codegen::emit_failure_formulas(&model));
    }
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
            println!("✓ Wrote solver model to {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn cmd_reduce(
    model_path: &Path,
    output: Option<&Path>,
    prism_dir: &Path,
    timeout: u32,
) -> AppResult<()> {
    println!("Reducing model: {}", model_path.display());
    let mut model = load_model(model_path)?;

    let report = fp_check::check_tree(&model);
    if !report.is_ok() {
        for diagnostic in report.errors() {
            println!("  {diagnostic}");
        }
        return Err(AppError::Validation(
            "model must be valid before reduction".to_string(),
        ));
    }

    let solver = PrismProcess::new(prism_dir).with_timeout(timeout);
    reduce(&mut model, &solver)?;

    let target = output.unwrap_or(model_path);
    save_model(target, &model)?;
    println!("✓ Reduced model written to {}", target.display());
    Ok(())
}

fn cmd_analyze(command: AnalyzeCommands) -> AppResult<()> {
    match command {
        AnalyzeCommands::ExecTime {
            model_path,
            prism_dir,
        } => {
            let model = load_model(&model_path)?;
            let solver = PrismProcess::new(prism_dir);
            let time = fp_prism::execution_time(&model, &solver)?;
            println!("Execution time: {time}");
        }
        AnalyzeCommands::Probability {
            model_path,
            failure,
            prism_dir,
        } => {
            let model = load_model(&model_path)?;
            let solver = PrismProcess::new(prism_dir);
            let p = fp_prism::failure_probability(&model, &solver, &failure)?;
            println!("P({failure}) = {p}");
        }
        AnalyzeCommands::Mttf {
            model_path,
            failure,
            prism_dir,
        } => {
            let model = load_model(&model_path)?;
            let solver = PrismProcess::new(prism_dir);
            let mttf = fp_prism::mttf(&model, &solver, &failure)?;
            println!("MTTF({failure}) = {mttf}");
        }
        AnalyzeCommands::Series {
            model_path,
            failure,
            range,
            prism_dir,
        } => {
            let model = load_model(&model_path)?;
            let solver = PrismProcess::new(prism_dir);
            let series =
                fp_prism::analysis::probability_series(&model, &solver, &failure, &range)?;
            println!("step,time,probability");
            for i in 0..series.steps.len() {
                println!(
                    "{},{},{}",
                    series.steps[i], series.times[i], series.values[i]
                );
            }
        }
    }
    Ok(())
}
