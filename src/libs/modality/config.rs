use super::error::ModalityError;
use super::model::Modality;

/// Shape parameters of the model family.
///
/// Every model integrates over its grid with a uniform prior, so a wider grid
/// spreads the prior mass thinner.
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyParams {
    /// Models taking part in selection. Order is irrelevant, precedence is fixed by [`Modality`].
    pub models: Vec<Modality>,
    /// `b` for the Excluded Beta(1, b) and Included Beta(b, 1) shapes
    pub skew_shapes: Vec<f64>,
    /// `b` for the components of Bimodal and Multimodal. At `b = 2` the Bimodal
    /// mixture is the flat density, so every value must exceed 2.
    pub mixture_shapes: Vec<f64>,
    /// `a` for the symmetric Middle shape Beta(a, a)
    pub middle_shapes: Vec<f64>,
    /// Values are clamped to `[epsilon, 1 - epsilon]` before evaluation
    pub epsilon: f64,
}

impl Default for FamilyParams {
    fn default() -> Self {
        Self {
            models: Modality::ALL.to_vec(),
            skew_shapes: (2..=20).map(f64::from).collect(),
            mixture_shapes: (10..=20).map(f64::from).collect(),
            middle_shapes: (1..=8).map(f64::from).collect(),
            epsilon: 1e-3,
        }
    }
}

impl FamilyParams {
    pub fn validate(&self) -> Result<(), ModalityError> {
        if self.models.is_empty() {
            return Err(ModalityError::Config("the model family is empty".to_string()));
        }
        for (i, m) in self.models.iter().enumerate() {
            if self.models[..i].contains(m) {
                return Err(ModalityError::Config(format!("model {} listed twice", m)));
            }
        }
        if !(self.epsilon > 0.0 && self.epsilon < 0.5) {
            return Err(ModalityError::Config(format!(
                "epsilon must lie in (0, 0.5), got {}",
                self.epsilon
            )));
        }
        check_grid("skew_shapes", &self.skew_shapes)?;
        check_grid("mixture_shapes", &self.mixture_shapes)?;
        check_grid("middle_shapes", &self.middle_shapes)?;
        if let Some(flat) = self.mixture_shapes.iter().find(|&&b| b <= 2.0) {
            return Err(ModalityError::Config(format!(
                "mixture_shapes must exceed 2, got {}",
                flat
            )));
        }

        Ok(())
    }
}

fn check_grid(name: &str, grid: &[f64]) -> Result<(), ModalityError> {
    if grid.is_empty() {
        return Err(ModalityError::Config(format!("{} is empty", name)));
    }
    if let Some(bad) = grid.iter().find(|&&s| !(s.is_finite() && s > 0.0)) {
        return Err(ModalityError::Config(format!(
            "{} must be positive and finite, got {}",
            name, bad
        )));
    }
    Ok(())
}

/// Everything a run depends on. Built by the caller and handed to
/// [`ModalityEngine::new`](super::engine::ModalityEngine::new).
#[derive(Debug, Clone, PartialEq)]
pub struct ModalityConfig {
    /// Vectors shorter than this are reported as insufficient data
    pub min_samples: usize,
    /// Scores within this distance of the maximum count as tied
    pub tie_epsilon: f64,
    /// When set, a best score (log Bayes factor against the flat Beta(1, 1) null)
    /// below this threshold is reported as ambiguous
    pub ambiguity_log_bf: Option<f64>,
    pub family: FamilyParams,
}

impl Default for ModalityConfig {
    fn default() -> Self {
        Self {
            min_samples: 4,
            tie_epsilon: 1e-9,
            ambiguity_log_bf: None,
            family: FamilyParams::default(),
        }
    }
}

impl ModalityConfig {
    pub fn validate(&self) -> Result<(), ModalityError> {
        if self.min_samples == 0 {
            return Err(ModalityError::Config(
                "min_samples must be at least 1".to_string(),
            ));
        }
        if !(self.tie_epsilon.is_finite() && self.tie_epsilon >= 0.0) {
            return Err(ModalityError::Config(format!(
                "tie_epsilon must be finite and non-negative, got {}",
                self.tie_epsilon
            )));
        }
        if let Some(t) = self.ambiguity_log_bf {
            if !t.is_finite() {
                return Err(ModalityError::Config(format!(
                    "ambiguity threshold must be finite, got {}",
                    t
                )));
            }
        }
        self.family.validate()
    }
}
