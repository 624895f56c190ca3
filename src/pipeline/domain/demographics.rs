use serde::Serialize;
use std::fmt;

/// Age ranges emitted by the age classifier, in output-index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgeBucket {
    Age0To2,
    Age4To6,
    Age8To12,
    Age15To20,
    Age25To32,
    Age38To43,
    Age48To53,
    Age60To100,
    Unknown,
}

impl AgeBucket {
    pub const RANGES: [AgeBucket; 8] = [
        AgeBucket::Age0To2,
        AgeBucket::Age4To6,
        AgeBucket::Age8To12,
        AgeBucket::Age15To20,
        AgeBucket::Age25To32,
        AgeBucket::Age38To43,
        AgeBucket::Age48To53,
        AgeBucket::Age60To100,
    ];

    pub fn from_index(index: usize) -> Self {
        Self::RANGES.get(index).copied().unwrap_or(AgeBucket::Unknown)
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgeBucket::Age0To2 => "(0-2)",
            AgeBucket::Age4To6 => "(4-6)",
            AgeBucket::Age8To12 => "(8-12)",
            AgeBucket::Age15To20 => "(15-20)",
            AgeBucket::Age25To32 => "(25-32)",
            AgeBucket::Age38To43 => "(38-43)",
            AgeBucket::Age48To53 => "(48-53)",
            AgeBucket::Age60To100 => "(60-100)",
            AgeBucket::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Gender {
    pub const LABELS: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn from_index(index: usize) -> Self {
        Self::LABELS.get(index).copied().unwrap_or(Gender::Unknown)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Unknown => "Unknown",
        }
    }
}

macro_rules! label_serde {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.label())
            }
        }
    };
}

label_serde!(AgeBucket);
label_serde!(Gender);

/// Age/gender labels for one face. `Unknown` marks a degraded estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Demographics {
    pub age_bucket: AgeBucket,
    pub gender: Gender,
}

impl Demographics {
    pub fn new(age_bucket: AgeBucket, gender: Gender) -> Self {
        Self { age_bucket, gender }
    }

    pub fn unknown() -> Self {
        Self::new(AgeBucket::Unknown, Gender::Unknown)
    }

    /// Decode raw classifier outputs by taking the highest-scoring label of each.
    pub fn from_scores(age_scores: &[f32], gender_scores: &[f32]) -> Self {
        Self {
            age_bucket: arg_max(age_scores)
                .map(AgeBucket::from_index)
                .unwrap_or(AgeBucket::Unknown),
            gender: arg_max(gender_scores)
                .map(Gender::from_index)
                .unwrap_or(Gender::Unknown),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.age_bucket == AgeBucket::Unknown && self.gender == Gender::Unknown
    }
}

impl Default for Demographics {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Index of the first maximum; NaN scores never win.
fn arg_max(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((index, score)),
        }
    }
    best.map(|(index, _)| index)
}
