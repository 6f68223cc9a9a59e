use clap::{Parser, Subcommand};
use ex_app::{AppError, AppResult, Driver, DriverConfig, Request, ResponseKind, SavedState};
use ex_components::PropertyValue;
use ex_definition::Definition;
use ex_sim::{Engine, EngineConfig, Sample};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "ex-cli")]
#[command(about = "Lumped-parameter physiology simulation kernel", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a model definition and try building it
    Validate {
        /// Path to the definition (JSON or YAML)
        definition: PathBuf,
    },
    /// Calculate a number of seconds and print the watched values as CSV
    Run {
        /// Path to the definition (JSON or YAML)
        definition: PathBuf,
        /// Model time to calculate in seconds
        #[arg(long, default_value_t = 10.0)]
        seconds: f64,
        /// Properties sampled at the fast rate, e.g. LV.pres
        #[arg(long, num_args = 1..)]
        watch: Vec<String>,
        /// Properties sampled at the slow rate
        #[arg(long, num_args = 1..)]
        slow: Vec<String>,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the model state after calculating a number of seconds
    State {
        /// Path to the definition (JSON or YAML)
        definition: PathBuf,
        /// Model time to calculate first in seconds
        #[arg(long, default_value_t = 0.0)]
        seconds: f64,
        /// Print a definition-shaped save instead of the full state
        #[arg(long)]
        saved: bool,
    },
    /// Run the model in real time and stream the watched values
    Realtime {
        /// Path to the definition (JSON or YAML)
        definition: PathBuf,
        /// Wall-clock duration in seconds
        #[arg(long, default_value_t = 5.0)]
        duration: f64,
        /// Properties sampled at the fast rate
        #[arg(long, num_args = 1..)]
        watch: Vec<String>,
    },
}

fn main() -> AppResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { definition } => cmd_validate(&definition),
        Commands::Run {
            definition,
            seconds,
            watch,
            slow,
            output,
        } => cmd_run(&definition, seconds, &watch, &slow, output.as_deref()),
        Commands::State {
            definition,
            seconds,
            saved,
        } => cmd_state(&definition, seconds, saved),
        Commands::Realtime {
            definition,
            duration,
            watch,
        } => cmd_realtime(&definition, duration, watch),
    }
}

fn build_engine(path: &Path) -> AppResult<Engine> {
    let definition = ex_definition::load(path)?;
    engine_for(&definition)
}

fn engine_for(definition: &Definition) -> AppResult<Engine> {
    let (engine, report) = Engine::from_definition(definition, EngineConfig::default());
    if !report.is_ok() {
        for error in &report.errors {
            eprintln!("  {error}");
        }
        return Err(AppError::BuildFailed {
            count: report.errors.len(),
        });
    }
    Ok(engine)
}

fn cmd_validate(path: &Path) -> AppResult<()> {
    println!("Validating definition: {}", path.display());
    let definition = ex_definition::load(path)?;
    let engine = engine_for(&definition)?;
    println!("✓ Definition is valid");
    println!("  Models: {}", engine.graph().len());
    println!("  Step size: {} s", definition.modeling_stepsize);
    Ok(())
}

fn cmd_run(
    path: &Path,
    seconds: f64,
    watch: &[String],
    slow: &[String],
    output: Option<&Path>,
) -> AppResult<()> {
    let mut engine = build_engine(path)?;
    for p in watch {
        engine.watch(p)?;
    }
    for p in slow {
        engine.watch_slow(p)?;
    }
    let timing = engine.calculate(seconds)?;
    eprintln!(
        "✓ Calculated {} s in {} steps ({:.1} ms, {:.4} ms/step)",
        seconds,
        timing.steps,
        timing.total_s * 1e3,
        timing.per_step_s * 1e3
    );

    let mut csv = to_csv(&labels(engine.collector().watchlist()), &engine.drain());
    if !slow.is_empty() {
        csv.push('\n');
        csv.push_str(&to_csv(
            &labels(engine.collector().watchlist_slow()),
            &engine.drain_slow(),
        ));
    }

    if let Some(path) = output {
        std::fs::write(path, csv)?;
        eprintln!("✓ Wrote {}", path.display());
    } else {
        print!("{csv}");
    }
    Ok(())
}

fn cmd_state(path: &Path, seconds: f64, saved: bool) -> AppResult<()> {
    let mut engine = build_engine(path)?;
    if seconds > 0.0 {
        engine.calculate(seconds)?;
    }
    let value = if saved {
        SavedState::capture(&engine).to_value()?
    } else {
        engine.state()
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn cmd_realtime(path: &Path, duration: f64, watch: Vec<String>) -> AppResult<()> {
    let definition = ex_definition::load(path)?;
    let driver = Driver::spawn(EngineConfig::default(), DriverConfig::default());
    let header = watch.clone();
    driver.send(Request::Build(Box::new(definition)))?;
    driver.send(Request::Watch(watch))?;
    driver.send(Request::Start)?;

    println!("time,{}", header.join(","));
    let deadline = Instant::now() + Duration::from_secs_f64(duration.max(0.0));
    while Instant::now() < deadline {
        let Some(response) = driver.recv_timeout(Duration::from_millis(50)) else {
            continue;
        };
        match response.kind {
            ResponseKind::Rtf => {
                let samples: Vec<Sample> = serde_json::from_value(response.payload)?;
                print!("{}", rows(&header, &samples));
            }
            ResponseKind::Status | ResponseKind::BuildFailed => {
                eprintln!("{}", response.message);
                if response.is_error() || response.kind == ResponseKind::BuildFailed {
                    break;
                }
            }
            _ => {}
        }
    }
    driver.send(Request::Stop)?;
    driver.shutdown();
    Ok(())
}

fn labels(watches: &[ex_sim::Watch]) -> Vec<String> {
    watches.iter().map(|w| w.label.clone()).collect()
}

fn to_csv(labels: &[String], samples: &[Sample]) -> String {
    let mut csv = format!("time,{}\n", labels.join(","));
    csv.push_str(&rows(labels, samples));
    csv
}

fn rows(labels: &[String], samples: &[Sample]) -> String {
    let mut out = String::new();
    for sample in samples {
        out.push_str(&sample.time.to_string());
        for label in labels {
            out.push(',');
            out.push_str(&sample.get(label).map(cell).unwrap_or_default());
        }
        out.push('\n');
    }
    out
}

fn cell(value: &PropertyValue) -> String {
    match value {
        PropertyValue::Number(v) => v.to_string(),
        PropertyValue::Bool(v) => v.to_string(),
        PropertyValue::Text(v) => v.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}
