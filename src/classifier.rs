/// Outcome of the binary classification.
///
/// The advisory text is derived from the verdict and nowhere else, so a
/// record can never carry a suggestion that disagrees with its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Cancer,
    NonCancer,
}

impl Verdict {
    /// Maps P(cancer) to a verdict. Cancer requires the probability to be
    /// strictly greater than the non-cancer probability, so exactly 0.5
    /// resolves to non-cancer.
    pub fn from_probability(probability: f32) -> Self {
        if probability > 1.0 - probability {
            Verdict::Cancer
        } else {
            Verdict::NonCancer
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Verdict::Cancer => "Cancer",
            Verdict::NonCancer => "Non-cancer",
        }
    }

    pub fn suggestion(self) -> &'static str {
        match self {
            Verdict::Cancer => "Segera periksa ke dokter!",
            Verdict::NonCancer => "Penyakit kanker tidak terdeteksi.",
        }
    }
}
