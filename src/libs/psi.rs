//! PSI values per sample and the read interface the engine consumes.

use crate::libs::modality::error::ModalityError;
use anyhow::{bail, Context};
use indexmap::IndexMap;
use itertools::Itertools;
use std::io::BufRead;

/// Name of the single group used when no sample groups are given.
pub const DEFAULT_GROUP: &str = "all";

/// What the engine reads from a study.
pub trait PsiSource {
    /// Event ids, in a stable order
    fn events(&self) -> Vec<String>;
    /// Group ids, in a stable order
    fn groups(&self) -> Vec<String>;
    /// PSI values of the samples of `group` for `event`, missing values excluded
    fn psi(&self, event: &str, group: &str) -> Vec<f64>;
}

/// Every value must be finite and within [0, 1].
///
/// ```
/// use psimod::libs::psi::validate;
/// assert!(validate(&[0.0, 0.5, 1.0]).is_ok());
/// assert!(validate(&[0.5, 1.2]).is_err());
/// assert!(validate(&[f64::NAN]).is_err());
/// ```
pub fn validate(values: &[f64]) -> Result<(), ModalityError> {
    match values
        .iter()
        .position(|v| !(v.is_finite() && (0.0..=1.0).contains(v)))
    {
        Some(index) => Err(ModalityError::InvalidObservation {
            index,
            value: values[index],
        }),
        None => Ok(()),
    }
}

fn is_missing(cell: &str) -> bool {
    matches!(cell.trim(), "" | "NA" | "NaN" | "nan" | "N/A")
}

/// A samples x events table of PSI values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PsiMatrix {
    events: Vec<String>,
    /// sample -> one cell per event; `None` is missing
    rows: IndexMap<String, Vec<Option<f64>>>,
}

impl PsiMatrix {
    /// Header `sample<TAB>event...`, then one row per sample.
    ///
    /// Missing cells (`NA`, `NaN`, empty) are dropped later; cells that are
    /// not numbers are kept as NaN so that the affected key fails validation.
    pub fn read(reader: Box<dyn BufRead>) -> anyhow::Result<Self> {
        let mut lines = crate::libs::io::data_lines(reader);
        let header = match lines.next() {
            Some(line) => line?,
            None => bail!("empty PSI matrix"),
        };
        let events: Vec<String> = header
            .split('\t')
            .skip(1)
            .map(|s| s.trim().to_string())
            .collect();
        if events.is_empty() {
            bail!("PSI matrix header has no event columns");
        }
        if let Some(event) = events.iter().duplicates().next() {
            bail!("event {} appears twice in the header", event);
        }

        let mut rows = IndexMap::new();
        for line in lines {
            let line = line?;
            let mut fields = line.split('\t');
            let sample = fields.next().unwrap_or_default().trim().to_string();
            let cells: Vec<Option<f64>> = fields
                .map(|cell| {
                    if is_missing(cell) {
                        None
                    } else {
                        Some(cell.trim().parse::<f64>().unwrap_or(f64::NAN))
                    }
                })
                .collect();
            if cells.len() != events.len() {
                bail!(
                    "sample {} has {} values, header has {} events",
                    sample,
                    cells.len(),
                    events.len()
                );
            }
            if rows.insert(sample.clone(), cells).is_some() {
                bail!("sample {} appears twice", sample);
            }
        }

        Ok(Self { events, rows })
    }

    pub fn from_path(infile: &str) -> anyhow::Result<Self> {
        let reader = crate::libs::io::reader(infile)?;
        Self::read(reader).with_context(|| format!("reading PSI matrix {}", infile))
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    pub fn samples(&self) -> Vec<String> {
        self.rows.keys().cloned().collect()
    }

    pub fn n_samples(&self) -> usize {
        self.rows.len()
    }

    /// Non-missing values of `event` over `samples`, in the order of `samples`.
    pub fn values<'a, I>(&self, event: &str, samples: I) -> Vec<f64>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let Some(col) = self.events.iter().position(|e| e == event) else {
            return vec![];
        };
        samples
            .into_iter()
            .filter_map(|s| self.rows.get(s).and_then(|cells| cells[col]))
            .collect()
    }
}

/// sample -> phenotype group
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleGroups {
    group_of: IndexMap<String, String>,
}

impl SampleGroups {
    /// Lines of `sample<TAB>group`; a header line `sample<TAB>group` is skipped.
    pub fn read(reader: Box<dyn BufRead>) -> anyhow::Result<Self> {
        let mut group_of = IndexMap::new();
        for (i, line) in crate::libs::io::data_lines(reader).enumerate() {
            let line = line?;
            let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
            if fields.len() < 2 {
                bail!("expected sample and group in: {}", line);
            }
            if i == 0 && fields[0] == "sample" && fields[1] == "group" {
                continue;
            }
            if group_of
                .insert(fields[0].to_string(), fields[1].to_string())
                .is_some()
            {
                bail!("sample {} is listed twice", fields[0]);
            }
        }
        Ok(Self { group_of })
    }

    pub fn from_path(infile: &str) -> anyhow::Result<Self> {
        let reader = crate::libs::io::reader(infile)?;
        Self::read(reader).with_context(|| format!("reading sample groups {}", infile))
    }

    /// Every sample in [`DEFAULT_GROUP`].
    pub fn single(samples: &[String]) -> Self {
        Self {
            group_of: samples
                .iter()
                .map(|s| (s.clone(), DEFAULT_GROUP.to_string()))
                .collect(),
        }
    }

    pub fn group_of(&self, sample: &str) -> Option<&str> {
        self.group_of.get(sample).map(String::as_str)
    }

    /// Group ids in first-seen order.
    pub fn groups(&self) -> Vec<String> {
        self.group_of.values().unique().cloned().collect()
    }

    pub fn samples_in<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a String> + 'a {
        self.group_of
            .iter()
            .filter(move |(_, g)| g.as_str() == group)
            .map(|(s, _)| s)
    }
}

/// A PSI matrix joined with sample groups.
#[derive(Debug, Clone)]
pub struct Study {
    matrix: PsiMatrix,
    groups: SampleGroups,
}

impl Study {
    /// Samples without a group are left out of every group.
    pub fn new(matrix: PsiMatrix, groups: SampleGroups) -> Self {
        for sample in matrix.samples() {
            if groups.group_of(&sample).is_none() {
                tracing::warn!(sample = %sample, "sample has no group, skipped");
            }
        }
        Self { matrix, groups }
    }

    /// All samples form one group, [`DEFAULT_GROUP`].
    pub fn ungrouped(matrix: PsiMatrix) -> Self {
        let groups = SampleGroups::single(&matrix.samples());
        Self { matrix, groups }
    }

    pub fn matrix(&self) -> &PsiMatrix {
        &self.matrix
    }

    pub fn sample_groups(&self) -> &SampleGroups {
        &self.groups
    }
}

impl PsiSource for Study {
    fn events(&self) -> Vec<String> {
        self.matrix.events().to_vec()
    }

    fn groups(&self) -> Vec<String> {
        self.groups.groups()
    }

    fn psi(&self, event: &str, group: &str) -> Vec<f64> {
        self.matrix.values(event, self.groups.samples_in(group))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const MATRIX: &str = "\
sample\tSE1\tSE2
s1\t0.01\tNA
s2\t0.02\t0.5
s3\t\tjunk
s4\t0.9\t1.5
";

    const GROUPS: &str = "\
sample\tgroup
# comment
s1\tctrl
s2\tctrl
s3\ttumor
s4\ttumor
";

    fn study() -> Study {
        let matrix = PsiMatrix::read(Box::new(Cursor::new(MATRIX))).unwrap();
        let groups = SampleGroups::read(Box::new(Cursor::new(GROUPS))).unwrap();
        Study::new(matrix, groups)
    }

    #[test]
    fn test_validate() {
        assert!(validate(&[]).is_ok());
        assert!(validate(&[0.0, 1.0]).is_ok());
        assert_eq!(
            validate(&[0.2, -0.1, 2.0]),
            Err(ModalityError::InvalidObservation {
                index: 1,
                value: -0.1
            })
        );
        assert!(validate(&[f64::INFINITY]).is_err());
    }

    #[test]
    fn test_read_matrix() {
        let matrix = PsiMatrix::read(Box::new(Cursor::new(MATRIX))).unwrap();
        assert_eq!(matrix.events(), &["SE1".to_string(), "SE2".to_string()]);
        assert_eq!(matrix.n_samples(), 4);
        assert_eq!(matrix.samples(), vec!["s1", "s2", "s3", "s4"]);
    }

    #[test]
    fn test_read_matrix_errors() {
        let ragged = "sample\tSE1\tSE2\ns1\t0.1\n";
        assert!(PsiMatrix::read(Box::new(Cursor::new(ragged))).is_err());

        let twice = "sample\tSE1\ns1\t0.1\ns1\t0.2\n";
        assert!(PsiMatrix::read(Box::new(Cursor::new(twice))).is_err());

        let repeated_event = "sample\tSE1\tSE2\tSE1\ns1\t0.1\t0.2\t0.9\n";
        let err = PsiMatrix::read(Box::new(Cursor::new(repeated_event)))
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "event SE1 appears twice in the header");

        assert!(PsiMatrix::read(Box::new(Cursor::new(""))).is_err());
        assert!(PsiMatrix::read(Box::new(Cursor::new("sample\n"))).is_err());
    }

    #[test]
    fn test_read_groups_errors() {
        let moved = "s1\tctrl\ns2\tctrl\ns1\ttumor\n";
        let err = SampleGroups::read(Box::new(Cursor::new(moved))).err().unwrap();
        assert_eq!(err.to_string(), "sample s1 is listed twice");

        let repeated = "s1\tctrl\ns1\tctrl\n";
        assert!(SampleGroups::read(Box::new(Cursor::new(repeated))).is_err());

        assert!(SampleGroups::read(Box::new(Cursor::new("s1\n"))).is_err());
    }

    #[test]
    fn test_study_vectors() {
        let study = study();
        assert_eq!(study.groups(), vec!["ctrl", "tumor"]);
        assert_eq!(study.events(), vec!["SE1", "SE2"]);

        assert_eq!(study.psi("SE1", "ctrl"), vec![0.01, 0.02]);
        assert_eq!(study.psi("SE1", "tumor"), vec![0.9]);
        assert_eq!(study.psi("SE2", "ctrl"), vec![0.5]);

        let tumor = study.psi("SE2", "tumor");
        assert_eq!(tumor.len(), 2);
        assert!(tumor[0].is_nan());
        assert_eq!(tumor[1], 1.5);

        assert!(study.psi("SE9", "ctrl").is_empty());
        assert!(study.psi("SE1", "nope").is_empty());
    }

    #[test]
    fn test_ungrouped() {
        let matrix = PsiMatrix::read(Box::new(Cursor::new(MATRIX))).unwrap();
        let study = Study::ungrouped(matrix);
        assert_eq!(study.groups(), vec![DEFAULT_GROUP]);
        assert_eq!(study.psi("SE1", DEFAULT_GROUP), vec![0.01, 0.02, 0.9]);
    }
}
