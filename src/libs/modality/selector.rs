use super::model::{log_sum_exp, Modality, ModelFamily};

/// Log-evidence of one model for one PSI vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelScore {
    pub modality: Modality,
    pub log_evidence: f64,
}

impl ModelScore {
    /// A model whose score is not finite cannot take part in the comparison.
    pub fn is_eligible(&self) -> bool {
        self.log_evidence.is_finite()
    }
}

/// A concrete pick of the selector.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub modality: Modality,
    /// Two-model softmax of best against runner-up, in [0.5, 1]
    pub confidence: f64,
    /// Softmax of the best score over all eligible models
    pub posterior: f64,
    /// Best minus runner-up log-evidence, never negative
    pub log_bayes_factor: f64,
    /// One entry per model of the family, in precedence order. Empty when
    /// the call was read back from a report.
    pub scores: Vec<ModelScore>,
}

impl Call {
    pub fn score_of(&self, modality: Modality) -> Option<f64> {
        self.scores
            .iter()
            .find(|s| s.modality == modality)
            .map(|s| s.log_evidence)
    }

    /// Log-evidence of the chosen model.
    pub fn best_log_evidence(&self) -> Option<f64> {
        self.score_of(self.modality)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shortfall {
    /// Fewer values than `min_samples`
    TooFewSamples,
    /// Every model produced a non-finite score
    AllModelsDegenerate,
}

impl Shortfall {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shortfall::TooFewSamples => "insufficient_data",
            Shortfall::AllModelsDegenerate => "degenerate",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Assigned(Call),
    /// The best model does not clear the ambiguity threshold against the flat null
    Ambiguous(Call),
    Insufficient(Shortfall),
}

impl Outcome {
    /// `assigned`, `ambiguous`, `insufficient_data` or `degenerate`.
    pub fn status(&self) -> &'static str {
        match self {
            Outcome::Assigned(_) => "assigned",
            Outcome::Ambiguous(_) => "ambiguous",
            Outcome::Insufficient(s) => s.as_str(),
        }
    }

    /// The label used when comparing groups; `None` when nothing was resolved.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Outcome::Assigned(call) => Some(call.modality.as_str()),
            Outcome::Ambiguous(_) => Some("ambiguous"),
            Outcome::Insufficient(_) => None,
        }
    }

    pub fn call(&self) -> Option<&Call> {
        match self {
            Outcome::Assigned(call) | Outcome::Ambiguous(call) => Some(call),
            Outcome::Insufficient(_) => None,
        }
    }

    /// The assigned modality. Ambiguous outcomes have none.
    pub fn modality(&self) -> Option<Modality> {
        match self {
            Outcome::Assigned(call) => Some(call.modality),
            _ => None,
        }
    }

    pub fn confidence(&self) -> Option<f64> {
        self.call().map(|c| c.confidence)
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Outcome::Insufficient(_))
    }
}

/// `1 / (1 + exp(-margin))` for a non-negative margin.
pub fn margin_confidence(margin: f64) -> f64 {
    if margin.is_infinite() {
        return 1.0;
    }
    1.0 / (1.0 + (-margin).exp())
}

/// Picks the best-supported model for one PSI vector.
///
/// Borrows the family, so any number of selectors can share one.
#[derive(Debug, Clone, Copy)]
pub struct Selector<'a> {
    family: &'a ModelFamily,
    min_samples: usize,
    tie_epsilon: f64,
    ambiguity_log_bf: Option<f64>,
}

impl<'a> Selector<'a> {
    pub fn new(
        family: &'a ModelFamily,
        min_samples: usize,
        tie_epsilon: f64,
        ambiguity_log_bf: Option<f64>,
    ) -> Self {
        Self {
            family,
            min_samples,
            tie_epsilon,
            ambiguity_log_bf,
        }
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    /// Log-evidence of every model, in precedence order.
    pub fn scores(&self, data: &[f64]) -> Vec<ModelScore> {
        self.family
            .models()
            .iter()
            .map(|model| ModelScore {
                modality: model.modality(),
                log_evidence: model.log_likelihood(data),
            })
            .collect()
    }

    /// `data` must hold validated PSI values.
    pub fn select(&self, data: &[f64]) -> Outcome {
        if data.len() < self.min_samples {
            return Outcome::Insufficient(Shortfall::TooFewSamples);
        }

        self.rank(self.scores(data))
    }

    /// Picks the best of `scores`, which hold one entry per model in precedence order.
    ///
    /// Non-finite scores take no part in the comparison.
    pub fn rank(&self, scores: Vec<ModelScore>) -> Outcome {
        let eligible: Vec<&ModelScore> = scores.iter().filter(|s| s.is_eligible()).collect();
        if eligible.is_empty() {
            return Outcome::Insufficient(Shortfall::AllModelsDegenerate);
        }

        let top = eligible
            .iter()
            .map(|s| s.log_evidence)
            .fold(f64::NEG_INFINITY, f64::max);

        // First in precedence order among the (near-)maxima
        let best: ModelScore = match eligible
            .iter()
            .find(|s| s.log_evidence >= top - self.tie_epsilon)
        {
            Some(s) => **s,
            None => *eligible[0],
        };

        let runner_up = eligible
            .iter()
            .filter(|s| s.modality != best.modality)
            .map(|s| s.log_evidence)
            .fold(f64::NEG_INFINITY, f64::max);

        let log_bayes_factor = (best.log_evidence - runner_up).max(0.0);
        let confidence = margin_confidence(log_bayes_factor);
        let posterior =
            (best.log_evidence - log_sum_exp(eligible.iter().map(|s| s.log_evidence))).exp();

        let call = Call {
            modality: best.modality,
            confidence,
            posterior,
            log_bayes_factor,
            scores,
        };

        match self.ambiguity_log_bf {
            // The flat Beta(1, 1) null scores exactly 0
            Some(threshold) if best.log_evidence < threshold => Outcome::Ambiguous(call),
            _ => Outcome::Assigned(call),
        }
    }
}
