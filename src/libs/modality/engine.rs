use super::config::ModalityConfig;
use super::error::ModalityError;
use super::model::{Modality, ModelFamily};
use super::selector::{Outcome, Selector, Shortfall};
use super::table::{Assignment, EventGroup, ModalityTable};
use crate::libs::psi::{validate, PsiSource};
use indexmap::IndexMap;
use rayon::prelude::*;
use std::fmt;

/// A key whose PSI vector was rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub key: EventGroup,
    pub error: ModalityError,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "event {} in group {}: {}",
            self.key.event, self.key.group, self.error
        )
    }
}

/// Result of one pass over a dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentRun {
    pub table: ModalityTable,
    /// Rejected keys, in input order
    pub failures: Vec<Failure>,
}

/// Runs the selector over every (event, group) pair.
///
/// The model family is built once here and shared read-only by all workers.
#[derive(Debug, Clone)]
pub struct ModalityEngine {
    config: ModalityConfig,
    family: ModelFamily,
}

impl ModalityEngine {
    pub fn new(config: ModalityConfig) -> Result<Self, ModalityError> {
        config.validate()?;
        let family = ModelFamily::new(&config.family)?;
        Ok(Self { config, family })
    }

    pub fn config(&self) -> &ModalityConfig {
        &self.config
    }

    pub fn family(&self) -> &ModelFamily {
        &self.family
    }

    /// Models of the family, in precedence order.
    pub fn modalities(&self) -> Vec<Modality> {
        self.family.models().iter().map(|m| m.modality()).collect()
    }

    pub fn selector(&self) -> Selector<'_> {
        Selector::new(
            &self.family,
            self.config.min_samples,
            self.config.tie_epsilon,
            self.config.ambiguity_log_bf,
        )
    }

    /// Validates one vector, then selects.
    pub fn assign_one(&self, data: &[f64]) -> Result<Outcome, ModalityError> {
        validate(data)?;
        Ok(self.selector().select(data))
    }

    /// Classifies every non-empty vector of `events_by_group`.
    ///
    /// Empty vectors get no entry. Invalid vectors end up in
    /// [`AssignmentRun::failures`] and do not stop the batch.
    pub fn assign_all(&self, events_by_group: &IndexMap<EventGroup, Vec<f64>>) -> AssignmentRun {
        let selector = self.selector();

        let results: Vec<(&EventGroup, usize, Result<Outcome, ModalityError>)> = events_by_group
            .par_iter()
            .filter(|(_, data)| !data.is_empty())
            .map(|(key, data)| {
                let outcome = validate(data).map(|_| selector.select(data));
                (key, data.len(), outcome)
            })
            .collect();

        let mut assignments = Vec::with_capacity(results.len());
        let mut failures = vec![];
        for (key, n_samples, result) in results {
            match result {
                Ok(outcome) => assignments.push(Assignment {
                    event: key.event.clone(),
                    group: key.group.clone(),
                    n_samples,
                    outcome,
                }),
                Err(error) => {
                    let failure = Failure {
                        key: key.clone(),
                        error,
                    };
                    tracing::warn!("{}", failure);
                    failures.push(failure);
                }
            }
        }

        // Keys of the input map are unique, so no assignment is overwritten
        let run = AssignmentRun {
            table: assignments.into_iter().collect(),
            failures,
        };

        let insufficient = run
            .table
            .iter()
            .filter(|(_, a)| a.outcome == Outcome::Insufficient(Shortfall::TooFewSamples))
            .count();
        tracing::debug!(
            keys = events_by_group.len(),
            assigned = run.table.len(),
            insufficient,
            failed = run.failures.len(),
            "modality assignment finished"
        );

        run
    }

    /// Collects every (event, group) vector of `source` and runs [`assign_all`](Self::assign_all).
    pub fn assign_study<S: PsiSource + ?Sized>(&self, source: &S) -> AssignmentRun {
        self.assign_all(&events_by_group(source))
    }
}

/// Event-major map of all PSI vectors of a source.
pub fn events_by_group<S: PsiSource + ?Sized>(source: &S) -> IndexMap<EventGroup, Vec<f64>> {
    let groups = source.groups();
    let mut map = IndexMap::new();
    for event in source.events() {
        for group in &groups {
            map.insert(EventGroup::new(&event, group), source.psi(&event, group));
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(rows: &[(&str, &str, Vec<f64>)]) -> IndexMap<EventGroup, Vec<f64>> {
        rows.iter()
            .map(|(e, g, v)| (EventGroup::new(e, g), v.clone()))
            .collect()
    }

    fn engine() -> ModalityEngine {
        ModalityEngine::new(ModalityConfig::default()).unwrap()
    }

    #[test]
    fn test_construction_errors() {
        let mut config = ModalityConfig::default();
        config.min_samples = 0;
        assert!(ModalityEngine::new(config).is_err());

        let mut config = ModalityConfig::default();
        config.family.models = vec![];
        assert!(matches!(
            ModalityEngine::new(config),
            Err(ModalityError::Config(_))
        ));
    }

    #[test]
    fn test_assign_all_scenario() {
        let data = input(&[
            ("SE1", "A", vec![0.01, 0.02, 0.03, 0.015, 0.02]),
            ("SE1", "B", vec![0.5, 0.48, 0.52, 0.5, 0.49]),
            ("SE2", "A", vec![0.05, 0.95, 0.1, 0.9, 0.08]),
            ("SE2", "B", vec![0.1, 0.2]),
            ("SE3", "A", vec![]),
            ("SE3", "B", vec![0.1, 0.2, 1.3, 0.4]),
        ]);
        let run = engine().assign_all(&data);

        assert_eq!(run.table.len(), 4);
        let a = run.table.get("SE1", "A").unwrap();
        assert_eq!(a.outcome.modality(), Some(Modality::Excluded));
        assert!(a.outcome.confidence().unwrap() > 0.9);
        assert_eq!(a.n_samples, 5);

        let b = run.table.get("SE1", "B").unwrap();
        assert_eq!(b.outcome.modality(), Some(Modality::Middle));

        let c = run.table.get("SE2", "A").unwrap();
        assert_eq!(c.outcome.modality(), Some(Modality::Bimodal));

        let d = run.table.get("SE2", "B").unwrap();
        assert_eq!(d.outcome, Outcome::Insufficient(Shortfall::TooFewSamples));
        assert_eq!(d.n_samples, 2);

        // Empty vectors are not modeled
        assert!(run.table.get("SE3", "A").is_none());

        assert_eq!(run.failures.len(), 1);
        assert_eq!(run.failures[0].key, EventGroup::new("SE3", "B"));
        assert_eq!(
            run.failures[0].error,
            ModalityError::InvalidObservation {
                index: 2,
                value: 1.3
            }
        );
        assert!(run.failures[0].to_string().contains("event SE3 in group B"));
        assert!(run.table.get("SE3", "B").is_none());

        let diff = run.table.compare_groups("A", "B");
        assert!(diff.contains("SE1"));
        assert!(!diff.contains("SE2"));
        assert_eq!(diff, run.table.compare_groups("B", "A"));
    }

    #[test]
    fn test_assign_all_is_idempotent() {
        let mut rows = vec![];
        for i in 0..200 {
            let x = (i as f64) / 200.0;
            rows.push((
                format!("SE{}", i),
                vec![x, (x * 7.0) % 1.0, 1.0 - x, (x * 3.0) % 1.0, 0.5],
            ));
        }
        let data: IndexMap<EventGroup, Vec<f64>> = rows
            .iter()
            .map(|(e, v)| (EventGroup::new(e, "g"), v.clone()))
            .collect();

        let engine = engine();
        let first = engine.assign_all(&data);
        let second = engine.assign_all(&data);
        assert_eq!(first, second);
        assert_eq!(first.table.len(), 200);

        let keys: Vec<&EventGroup> = first.table.iter().map(|(k, _)| k).collect();
        let input_keys: Vec<&EventGroup> = data.keys().collect();
        assert_eq!(keys, input_keys);
    }

    #[test]
    fn test_non_finite_values_fail_per_key() {
        let data = input(&[
            ("SE1", "A", vec![0.1, f64::NAN, 0.2, 0.3]),
            ("SE2", "A", vec![0.1, 0.2, f64::INFINITY, 0.3]),
            ("SE3", "A", vec![0.0, 0.0, 1.0, 1.0]),
        ]);
        let run = engine().assign_all(&data);

        assert_eq!(run.failures.len(), 2);
        assert_eq!(run.table.len(), 1);
        let a = run.table.get("SE3", "A").unwrap();
        assert_eq!(a.outcome.modality(), Some(Modality::Bimodal));
        assert!(a.outcome.confidence().unwrap().is_finite());
    }

    #[test]
    fn test_assign_one() {
        let engine = engine();
        assert!(engine.assign_one(&[0.2, -0.5]).is_err());
        assert_eq!(
            engine.assign_one(&[0.2]).unwrap(),
            Outcome::Insufficient(Shortfall::TooFewSamples)
        );
        assert_eq!(engine.modalities(), Modality::ALL.to_vec());
    }

    struct Fixed;

    impl PsiSource for Fixed {
        fn events(&self) -> Vec<String> {
            vec!["SE1".to_string(), "SE2".to_string()]
        }

        fn groups(&self) -> Vec<String> {
            vec!["A".to_string(), "B".to_string()]
        }

        fn psi(&self, event: &str, group: &str) -> Vec<f64> {
            match (event, group) {
                ("SE1", "A") => vec![0.98, 0.99, 0.97, 0.99],
                ("SE1", "B") => vec![0.02, 0.01, 0.03, 0.02],
                ("SE2", "A") => vec![0.5, 0.5],
                _ => vec![],
            }
        }
    }

    #[test]
    fn test_assign_study() {
        let map = events_by_group(&Fixed);
        assert_eq!(map.len(), 4);
        assert_eq!(map.keys().next().unwrap(), &EventGroup::new("SE1", "A"));

        let run = engine().assign_study(&Fixed);
        assert_eq!(run.table.len(), 3);
        assert_eq!(
            run.table.get("SE1", "A").unwrap().outcome.modality(),
            Some(Modality::Included)
        );
        assert_eq!(
            run.table.get("SE1", "B").unwrap().outcome.modality(),
            Some(Modality::Excluded)
        );
        assert_eq!(
            run.table.compare_groups("A", "B").into_iter().collect::<Vec<_>>(),
            vec!["SE1".to_string()]
        );
    }
}
