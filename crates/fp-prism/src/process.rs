//! Subprocess gateway to the PRISM model checker.
//!
//! One blocking engine invocation per query: the model (and properties)
//! are written to temporary files in the work directory, the engine is
//! launched with export flags, and the exported files are parsed back.
//! Timeouts are delegated to the engine's own `-timeout` flag; an expired
//! timeout surfaces as a failed run.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::SolverError;
use crate::solver::{StateDistribution, StochasticSolver};

const MODEL_FILE: &str = "temp.pm";
const PROPS_FILE: &str = "temp.prop";
const RESULTS_FILE: &str = "temp.csv";
const STATES_FILE: &str = "states.txt";
const VECTOR_FILE: &str = "ss_tr.txt";

/// PRISM engine wrapper. Single-threaded use only: queries share one set
/// of temporary files in the work directory.
#[derive(Debug, Clone)]
pub struct PrismProcess {
    prism_dir: PathBuf,
    work_dir: PathBuf,
    timeout_s: u32,
}

impl PrismProcess {
    /// `prism_dir` is the engine's `bin` directory (contains the `prism`
    /// launcher). Temporary files default to the same directory.
    pub fn new(prism_dir: impl Into<PathBuf>) -> Self {
        let prism_dir = prism_dir.into();
        let work_dir = prism_dir.clone();
        Self {
            prism_dir,
            work_dir,
            timeout_s: 180,
        }
    }

    pub fn with_timeout(mut self, timeout_s: u32) -> Self {
        self.timeout_s = timeout_s;
        self
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    fn path(&self, file: &str) -> PathBuf {
        self.work_dir.join(file)
    }

    fn silent_remove(path: &Path) {
        let _ = fs::remove_file(path);
    }

    fn run(&self, args: &[String]) -> Result<(), SolverError> {
        debug!(?args, "invoking prism");
        let output = Command::new(self.prism_dir.join("prism"))
            .current_dir(&self.prism_dir)
            .args(args)
            .output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let mut what = format!("{}", output.status);
            if let Some(line) = stderr.lines().rev().find(|l| !l.trim().is_empty()) {
                what.push_str(": ");
                what.push_str(line.trim());
            }
            return Err(SolverError::Engine { what });
        }
        Ok(())
    }

    fn write_inputs(&self, model: &str, properties: Option<&str>) -> Result<(), SolverError> {
        Self::silent_remove(&self.path(RESULTS_FILE));
        Self::silent_remove(&self.path(STATES_FILE));
        Self::silent_remove(&self.path(VECTOR_FILE));
        fs::write(self.path(MODEL_FILE), model)?;
        if let Some(properties) = properties {
            fs::write(self.path(PROPS_FILE), properties)?;
        }
        Ok(())
    }

    fn read_distribution(&self) -> Result<StateDistribution, SolverError> {
        let vector_text = fs::read_to_string(self.path(VECTOR_FILE))?;
        let states_text = fs::read_to_string(self.path(STATES_FILE))?;
        parse_distribution(&vector_text, &states_text)
    }
}

/// Extract the scalar result: the first line of the export that parses as
/// a number.
fn parse_scalar(text: &str) -> Result<f64, SolverError> {
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Ok(value) = line.parse::<f64>() {
            return Ok(value);
        }
    }
    Err(SolverError::NonNumeric {
        got: text.trim().chars().take(120).collect(),
    })
}

/// Parse a `step,value` CSV export, skipping the header row.
fn parse_series(text: &str) -> Result<Vec<(u32, f64)>, SolverError> {
    let mut rows = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((step_part, value_part)) = line.split_once(',') else {
            continue;
        };
        let Ok(step) = step_part.trim().parse::<u32>() else {
            // header or stray text row
            continue;
        };
        let value = value_part.trim().parse::<f64>().unwrap_or_else(|_| {
            tracing::error!(row = line, "non-numeric series value, treating as 0");
            0.0
        });
        rows.push((step, value));
    }
    if rows.is_empty() {
        return Err(SolverError::Malformed {
            what: "series export contained no data rows".to_string(),
        });
    }
    Ok(rows)
}

/// Parse the exported probability vector plus the state-ordering file.
///
/// The vector file holds one probability per line, optionally prefixed
/// with `index=`. The states file starts with the variable tuple
/// `(a,b,c)` followed by `index:(v1,v2,v3)` rows.
fn parse_distribution(
    vector_text: &str,
    states_text: &str,
) -> Result<StateDistribution, SolverError> {
    let probs: Vec<f64> = vector_text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let field = line.rsplit('=').next().unwrap_or(line).trim();
            field.parse::<f64>().map_err(|_| SolverError::Malformed {
                what: format!("bad probability line \"{line}\""),
            })
        })
        .collect::<Result<_, _>>()?;

    let mut lines = states_text.lines().filter(|l| !l.trim().is_empty());
    let header = lines.next().ok_or_else(|| SolverError::Malformed {
        what: "empty states export".to_string(),
    })?;
    let variables: Vec<String> = header
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(',')
        .map(|v| v.trim().to_string())
        .collect();

    let mut states = Vec::new();
    for (i, line) in lines.enumerate() {
        let vector_part = line
            .split_once(':')
            .map(|(_, v)| v)
            .ok_or_else(|| SolverError::Malformed {
                what: format!("bad state line \"{line}\""),
            })?;
        let values: Vec<i64> = vector_part
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')')
            .split(',')
            .map(|v| {
                v.trim().parse::<i64>().map_err(|_| SolverError::Malformed {
                    what: format!("bad state value in \"{line}\""),
                })
            })
            .collect::<Result<_, _>>()?;
        let prob = probs.get(i).copied().ok_or_else(|| SolverError::Malformed {
            what: "fewer probabilities than states".to_string(),
        })?;
        states.push((values, prob));
    }
    if states.len() < probs.len() {
        return Err(SolverError::Malformed {
            what: "fewer states than probabilities".to_string(),
        });
    }

    Ok(StateDistribution { variables, states })
}

impl StochasticSolver for PrismProcess {
    fn scalar(&self, model: &str, property: &str) -> Result<f64, SolverError> {
        self.write_inputs(model, Some(property))?;
        self.run(&[
            self.path(MODEL_FILE).display().to_string(),
            self.path(PROPS_FILE).display().to_string(),
            "-exportresults".to_string(),
            self.path(RESULTS_FILE).display().to_string(),
            "-timeout".to_string(),
            self.timeout_s.to_string(),
        ])?;
        parse_scalar(&fs::read_to_string(self.path(RESULTS_FILE))?)
    }

    fn step_series(
        &self,
        model: &str,
        property: &str,
        range: &str,
    ) -> Result<Vec<(u32, f64)>, SolverError> {
        self.write_inputs(model, Some(property))?;
        self.run(&[
            self.path(MODEL_FILE).display().to_string(),
            self.path(PROPS_FILE).display().to_string(),
            "-const".to_string(),
            format!("step={range}"),
            "-exportresults".to_string(),
            format!("{}:csv", self.path(RESULTS_FILE).display()),
            "-timeout".to_string(),
            self.timeout_s.to_string(),
        ])?;
        parse_series(&fs::read_to_string(self.path(RESULTS_FILE))?)
    }

    fn steady_state(&self, model: &str) -> Result<StateDistribution, SolverError> {
        self.write_inputs(model, None)?;
        self.run(&[
            self.path(MODEL_FILE).display().to_string(),
            "-ss".to_string(),
            "-exportss".to_string(),
            self.path(VECTOR_FILE).display().to_string(),
            "-exportstates".to_string(),
            self.path(STATES_FILE).display().to_string(),
            "-timeout".to_string(),
            self.timeout_s.to_string(),
        ])?;
        self.read_distribution()
    }

    fn transient(&self, model: &str, steps: u32) -> Result<StateDistribution, SolverError> {
        self.write_inputs(model, None)?;
        self.run(&[
            self.path(MODEL_FILE).display().to_string(),
            "-tr".to_string(),
            steps.to_string(),
            "-exporttr".to_string(),
            self.path(VECTOR_FILE).display().to_string(),
            "-exportstates".to_string(),
            self.path(STATES_FILE).display().to_string(),
            "-timeout".to_string(),
            self.timeout_s.to_string(),
        ])?;
        self.read_distribution()
    }
}
