use super::config::FamilyParams;
use super::error::ModalityError;
use statrs::distribution::{Beta, Continuous};
use std::fmt;
use std::str::FromStr;

/// The closed set of modalities.
///
/// Declaration order is the tie-break precedence: when two models score the
/// same, the one declared first wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modality {
    /// Mass concentrated near 0
    Excluded,
    /// Mass concentrated near 1
    Included,
    /// Mass at both ends
    Bimodal,
    /// Mass around 0.5, up to uniform
    Middle,
    /// Mass at both ends and in the middle
    Multimodal,
}

impl Modality {
    pub const ALL: [Modality; 5] = [
        Modality::Excluded,
        Modality::Included,
        Modality::Bimodal,
        Modality::Middle,
        Modality::Multimodal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Excluded => "excluded",
            Modality::Included => "included",
            Modality::Bimodal => "bimodal",
            Modality::Middle => "middle",
            Modality::Multimodal => "multimodal",
        }
    }

    /// The modality of the reflected data `1 - x`.
    pub fn mirror(&self) -> Modality {
        match self {
            Modality::Excluded => Modality::Included,
            Modality::Included => Modality::Excluded,
            other => *other,
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Modality::ALL
            .iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown modality: {}", s))
    }
}

/// `ln(sum(exp(v)))` without overflow. Empty input gives negative infinity.
pub fn log_sum_exp<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let values: Vec<f64> = values.into_iter().collect();
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

#[derive(Debug, Clone)]
struct Component {
    ln_weight: f64,
    dist: Beta,
}

/// One grid point: a weighted sum of Beta densities.
#[derive(Debug, Clone)]
struct Mixture {
    components: Vec<Component>,
}

impl Mixture {
    fn new(parts: &[(f64, f64, f64)]) -> Result<Self, ModalityError> {
        let mut components = Vec::with_capacity(parts.len());
        for &(weight, a, b) in parts {
            let dist = Beta::new(a, b).map_err(|e| {
                ModalityError::Config(format!("Beta({}, {}) is not a valid shape: {}", a, b, e))
            })?;
            components.push(Component {
                ln_weight: weight.ln(),
                dist,
            });
        }
        Ok(Self { components })
    }

    fn ln_pdf(&self, x: f64) -> f64 {
        match self.components.as_slice() {
            [single] => single.ln_weight + single.dist.ln_pdf(x),
            many => log_sum_exp(many.iter().map(|c| c.ln_weight + c.dist.ln_pdf(x))),
        }
    }
}

/// Weights and shapes `(w, a, b)` of every grid point of a modality.
fn grid_of(modality: Modality, params: &FamilyParams) -> Vec<Vec<(f64, f64, f64)>> {
    let skew = &params.skew_shapes;
    let mixture = &params.mixture_shapes;
    match modality {
        Modality::Excluded => skew.iter().map(|&b| vec![(1.0, 1.0, b)]).collect(),
        Modality::Included => skew.iter().map(|&b| vec![(1.0, b, 1.0)]).collect(),
        Modality::Middle => params
            .middle_shapes
            .iter()
            .map(|&a| vec![(1.0, a, a)])
            .collect(),
        Modality::Bimodal => mixture
            .iter()
            .map(|&b| vec![(0.5, 1.0, b), (0.5, b, 1.0)])
            .collect(),
        Modality::Multimodal => {
            let w = 1.0 / 3.0;
            mixture
                .iter()
                .map(|&b| vec![(w, 1.0, b), (w, b, b), (w, b, 1.0)])
                .collect()
        }
    }
}

/// A modality together with its parameter grid.
#[derive(Debug, Clone)]
pub struct BetaModel {
    modality: Modality,
    grid: Vec<Mixture>,
    epsilon: f64,
}

impl BetaModel {
    pub fn new(modality: Modality, params: &FamilyParams) -> Result<Self, ModalityError> {
        let grid = grid_of(modality, params)
            .iter()
            .map(|parts| Mixture::new(parts))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            modality,
            grid,
            epsilon: params.epsilon,
        })
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }

    pub fn grid_len(&self) -> usize {
        self.grid.len()
    }

    /// Log marginal likelihood of `data`, averaged over the grid with a uniform prior.
    ///
    /// Values are clamped to `[epsilon, 1 - epsilon]` first, so exact 0 and 1
    /// stay finite. Callers validate the range beforehand.
    pub fn log_likelihood(&self, data: &[f64]) -> f64 {
        if data.is_empty() {
            return 0.0;
        }
        let lo = self.epsilon;
        let hi = 1.0 - self.epsilon;
        let clamped: Vec<f64> = data.iter().map(|x| x.clamp(lo, hi)).collect();

        let per_point = self
            .grid
            .iter()
            .map(|mixture| clamped.iter().map(|&x| mixture.ln_pdf(x)).sum::<f64>());

        log_sum_exp(per_point) - (self.grid.len() as f64).ln()
    }
}

/// See [`BetaModel::log_likelihood`].
pub fn log_likelihood(model: &BetaModel, data: &[f64]) -> f64 {
    model.log_likelihood(data)
}

/// The immutable set of models taking part in selection, in precedence order.
#[derive(Debug, Clone)]
pub struct ModelFamily {
    models: Vec<BetaModel>,
}

impl ModelFamily {
    pub fn new(params: &FamilyParams) -> Result<Self, ModalityError> {
        params.validate()?;

        let mut modalities = params.models.clone();
        modalities.sort();
        let models = modalities
            .into_iter()
            .map(|m| BetaModel::new(m, params))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { models })
    }

    pub fn models(&self) -> &[BetaModel] {
        &self.models
    }

    pub fn get(&self, modality: Modality) -> Option<&BetaModel> {
        self.models.iter().find(|m| m.modality == modality)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
