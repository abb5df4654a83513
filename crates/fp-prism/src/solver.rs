//! The external solver gateway.
//!
//! The compiler depends on this trait, never on a concrete engine: the
//! caller supplies the implementation (a subprocess wrapper in
//! production, a scripted double in tests).

use std::collections::BTreeMap;

use tracing::warn;

use crate::error::SolverError;

/// A probability distribution over variable-assignment vectors, as
/// returned by steady-state or transient solving.
///
/// `variables` is the state-ordering description: `states[i].0[j]` is the
/// value of `variables[j]` in state `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct StateDistribution {
    pub variables: Vec<String>,
    pub states: Vec<(Vec<i64>, f64)>,
}

impl StateDistribution {
    pub fn total_probability(&self) -> f64 {
        self.states.iter().map(|(_, p)| p).sum()
    }

    /// Project onto a subset of variables and merge states whose projected
    /// vectors coincide by summing their probability. Zero-probability
    /// states are dropped. The result is ordered by projected vector, so
    /// downstream text generation is deterministic.
    pub fn project_onto(&self, keep: &[String]) -> StateDistribution {
        let indices: Vec<usize> = self
            .variables
            .iter()
            .enumerate()
            .filter(|(_, v)| keep.contains(v))
            .map(|(i, _)| i)
            .collect();
        let variables: Vec<String> = indices.iter().map(|&i| self.variables[i].clone()).collect();

        let mut merged: BTreeMap<Vec<i64>, f64> = BTreeMap::new();
        for (values, prob) in &self.states {
            if *prob > 0.0 {
                let projected: Vec<i64> = indices.iter().map(|&i| values[i]).collect();
                *merged.entry(projected).or_insert(0.0) += prob;
            }
        }

        StateDistribution {
            variables,
            states: merged.into_iter().collect(),
        }
    }

    /// Compensate for solver rounding: if the total probability mass falls
    /// short of 1.0, the deficit is added to one arbitrary non-zero state.
    /// Returns the deficit that was redistributed, if any.
    pub fn correct_deficit(&mut self) -> Option<f64> {
        let total = self.total_probability();
        if total >= 1.0 || self.states.is_empty() {
            return None;
        }
        let deficit = 1.0 - total;
        if let Some((_, prob)) = self.states.iter_mut().find(|(_, p)| *p > 0.0) {
            warn!(
                total,
                deficit, "probability mass short of 1, correcting one branch"
            );
            *prob += deficit;
            return Some(deficit);
        }
        None
    }
}

/// Blocking gateway to the external probabilistic model checker.
pub trait StochasticSolver {
    /// Check `property` against `model` and return the single numeric result.
    fn scalar(&self, model: &str, property: &str) -> Result<f64, SolverError>;

    /// Check `property` for every value of the `step` constant in
    /// `range` (`start:step:end`), returning `(step, value)` rows.
    fn step_series(
        &self,
        model: &str,
        property: &str,
        range: &str,
    ) -> Result<Vec<(u32, f64)>, SolverError>;

    /// Long-run distribution over the reachable states of `model`.
    fn steady_state(&self, model: &str) -> Result<StateDistribution, SolverError>;

    /// Distribution over the states of `model` after exactly `steps` steps.
    fn transient(&self, model: &str, steps: u32) -> Result<StateDistribution, SolverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dist() -> StateDistribution {
        StateDistribution {
            variables: vec!["a".into(), "b".into(), "c".into()],
            states: vec![
                (vec![0, 0, 0], 0.4),
                (vec![1, 0, 1], 0.3),
                (vec![1, 1, 1], 0.3),
            ],
        }
    }

    #[test]
    fn projection_merges_equal_vectors() {
        let projected = dist().project_onto(&["a".into(), "c".into()]);
        assert_eq!(projected.variables, ["a", "c"]);
        assert_eq!(
            projected.states,
            vec![(vec![0, 0], 0.4), (vec![1, 1], 0.6)]
        );
    }

    #[test]
    fn projection_drops_zero_probability_states() {
        let mut d = dist();
        d.states[1].1 = 0.0;
        let projected = d.project_onto(&["b".into()]);
        assert_eq!(projected.states, vec![(vec![0], 0.4), (vec![1], 0.3)]);
    }

    #[test]
    fn deficit_goes_to_first_non_zero_state() {
        let mut d = StateDistribution {
            variables: vec!["a".into()],
            states: vec![(vec![0], 0.0), (vec![1], 0.697), (vec![2], 0.3)],
        };
        let deficit = d.correct_deficit().unwrap();
        assert!((deficit - 0.003).abs() < 1e-12);
        assert!((d.states[1].1 - 0.7).abs() < 1e-12);
        assert!((d.total_probability() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn no_correction_when_mass_complete() {
        let mut d = dist();
        assert_eq!(d.correct_deficit(), None);
    }
}
