use super::error::ModalityError;
use super::model::Modality;
use super::selector::{Call, Outcome, Shortfall};
use anyhow::{anyhow, bail, Context};
use indexmap::IndexMap;
use itertools::Itertools;
use std::collections::BTreeSet;
use std::fmt;
use std::io::{BufRead, Write};

/// Key of the modality table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventGroup {
    pub event: String,
    pub group: String,
}

impl EventGroup {
    pub fn new(event: &str, group: &str) -> Self {
        Self {
            event: event.to_string(),
            group: group.to_string(),
        }
    }
}

impl fmt::Display for EventGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.event, self.group)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub event: String,
    pub group: String,
    /// Length of the PSI vector the outcome was computed from
    pub n_samples: usize,
    pub outcome: Outcome,
}

impl Assignment {
    pub fn key(&self) -> EventGroup {
        EventGroup::new(&self.event, &self.group)
    }
}

pub const TSV_HEADER: [&str; 8] = [
    "event",
    "group",
    "n",
    "status",
    "modality",
    "confidence",
    "posterior",
    "log_bf",
];

/// Outcomes of one run, keyed by (event, group).
///
/// Read-only once built; keys keep the order of the input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModalityTable {
    entries: IndexMap<EventGroup, Assignment>,
}

impl ModalityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `assignment`; an existing entry under the same key is an error.
    pub(crate) fn insert(&mut self, assignment: Assignment) -> Result<(), ModalityError> {
        let key = assignment.key();
        if self.entries.contains_key(&key) {
            return Err(ModalityError::DuplicateEntry {
                event: key.event,
                group: key.group,
            });
        }
        self.entries.insert(key, assignment);
        Ok(())
    }

    pub fn get(&self, event: &str, group: &str) -> Option<&Assignment> {
        self.entries.get(&EventGroup::new(event, group))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EventGroup, &Assignment)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct event ids, in first-seen order.
    pub fn events(&self) -> Vec<String> {
        self.entries.keys().map(|k| k.event.clone()).unique().collect()
    }

    /// Distinct group ids, in first-seen order.
    pub fn groups(&self) -> Vec<String> {
        self.entries.keys().map(|k| k.group.clone()).unique().collect()
    }

    /// Events whose label differs between `group_a` and `group_b`.
    ///
    /// Only events resolved in both groups count. This is a label inequality,
    /// not a significance test, and it is symmetric in the two groups.
    pub fn compare_groups(&self, group_a: &str, group_b: &str) -> BTreeSet<String> {
        self.compare_groups_confident(group_a, group_b, 0.0)
    }

    /// As [`compare_groups`](Self::compare_groups), but both calls need at least `min_confidence`.
    pub fn compare_groups_confident(
        &self,
        group_a: &str,
        group_b: &str,
        min_confidence: f64,
    ) -> BTreeSet<String> {
        let mut differing = BTreeSet::new();
        for (key, a) in &self.entries {
            if key.group != group_a {
                continue;
            }
            let Some(b) = self.get(&key.event, group_b) else {
                continue;
            };
            let (Some(label_a), Some(label_b)) = (a.outcome.label(), b.outcome.label()) else {
                continue;
            };
            let confident = [&a.outcome, &b.outcome]
                .iter()
                .all(|o| o.confidence().is_some_and(|c| c >= min_confidence));
            if label_a != label_b && confident {
                differing.insert(key.event.clone());
            }
        }
        differing
    }

    /// Number of entries per label for one group. Unresolved entries count
    /// under their status.
    pub fn counts(&self, group: &str) -> IndexMap<String, usize> {
        let mut counts: IndexMap<String, usize> = IndexMap::new();
        for m in Modality::ALL {
            counts.insert(m.to_string(), 0);
        }
        for a in self.entries.values().filter(|a| a.group == group) {
            let label = a.outcome.label().unwrap_or_else(|| a.outcome.status());
            *counts.entry(label.to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Events of `group` assigned to `modality`, in table order.
    pub fn events_with(&self, group: &str, modality: Modality) -> Vec<String> {
        self.entries
            .values()
            .filter(|a| a.group == group && a.outcome.modality() == Some(modality))
            .map(|a| a.event.clone())
            .collect()
    }

    /// Writes the report: one line per entry after a header.
    ///
    /// With `with_scores`, one `score_<modality>` column per model in `models` follows.
    pub fn write_tsv(
        &self,
        writer: &mut dyn Write,
        models: &[Modality],
        with_scores: bool,
    ) -> anyhow::Result<()> {
        let mut header: Vec<String> = TSV_HEADER.iter().map(|s| s.to_string()).collect();
        if with_scores {
            header.extend(models.iter().map(|m| format!("score_{}", m)));
        }
        writeln!(writer, "{}", header.join("\t"))?;

        for a in self.entries.values() {
            let mut fields = vec![a.event.clone(), a.group.clone(), a.n_samples.to_string()];
            fields.push(a.outcome.status().to_string());
            match a.outcome.call() {
                Some(call) => {
                    fields.push(call.modality.to_string());
                    fields.push(format!("{:.6}", call.confidence));
                    fields.push(format!("{:.6}", call.posterior));
                    fields.push(format!("{:.4}", call.log_bayes_factor));
                }
                None => fields.extend(std::iter::repeat("NA".to_string()).take(4)),
            }
            if with_scores {
                for m in models {
                    let score = a.outcome.call().and_then(|c| c.score_of(*m));
                    fields.push(match score {
                        Some(s) => format!("{:.4}", s),
                        None => "NA".to_string(),
                    });
                }
            }
            writeln!(writer, "{}", fields.join("\t"))?;
        }

        Ok(())
    }

    /// Reads a report written by [`write_tsv`](Self::write_tsv). Score columns are ignored.
    pub fn read_tsv(reader: Box<dyn BufRead>) -> anyhow::Result<Self> {
        let mut table = ModalityTable::new();
        let mut lines = crate::libs::io::data_lines(reader);

        let header = lines.next().ok_or_else(|| anyhow!("empty modality table"))??;
        let columns: Vec<&str> = header.split('\t').collect();
        if columns.len() < TSV_HEADER.len() || columns[..TSV_HEADER.len()] != TSV_HEADER {
            bail!("unexpected modality table header: {}", header);
        }

        for (i, line) in lines.enumerate() {
            let line = line?;
            let assignment =
                parse_row(&line).with_context(|| format!("malformed row {}: {}", i + 2, line))?;
            table.insert(assignment)?;
        }

        Ok(table)
    }
}

/// Keys are expected to be unique; a repeated key keeps the last assignment.
impl FromIterator<Assignment> for ModalityTable {
    fn from_iter<I: IntoIterator<Item = Assignment>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|a| (a.key(), a)).collect(),
        }
    }
}

fn parse_row(line: &str) -> anyhow::Result<Assignment> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < TSV_HEADER.len() {
        bail!("expected {} columns, found {}", TSV_HEADER.len(), fields.len());
    }
    let n_samples: usize = fields[2].parse()?;

    let call = || -> anyhow::Result<Call> {
        Ok(Call {
            modality: fields[4].parse::<Modality>().map_err(|e| anyhow!(e))?,
            confidence: fields[5].parse()?,
            posterior: fields[6].parse()?,
            log_bayes_factor: fields[7].parse()?,
            scores: vec![],
        })
    };

    let outcome = match fields[3] {
        "assigned" => Outcome::Assigned(call()?),
        "ambiguous" => Outcome::Ambiguous(call()?),
        "insufficient_data" => Outcome::Insufficient(Shortfall::TooFewSamples),
        "degenerate" => Outcome::Insufficient(Shortfall::AllModelsDegenerate),
        other => bail!("unknown status {}", other),
    };

    Ok(Assignment {
        event: fields[0].to_string(),
        group: fields[1].to_string(),
        n_samples,
        outcome,
    })
}
