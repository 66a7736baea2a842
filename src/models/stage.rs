use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The five workflow stages, in approval order.
///
/// Approving the last stage wraps back to [`Stage::Engineer`] and completes
/// a requirement cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Engineer,
    Researcher,
    Coder,
    Validator,
    Deployer,
}

impl Stage {
    /// All stages in approval order.
    pub const ALL: [Stage; 5] = [
        Stage::Engineer,
        Stage::Researcher,
        Stage::Coder,
        Stage::Validator,
        Stage::Deployer,
    ];

    /// The stage that follows this one; Deployer wraps to Engineer.
    pub fn next(self) -> Stage {
        match self {
            Stage::Engineer => Stage::Researcher,
            Stage::Researcher => Stage::Coder,
            Stage::Coder => Stage::Validator,
            Stage::Validator => Stage::Deployer,
            Stage::Deployer => Stage::Engineer,
        }
    }

    /// Whether approving this stage completes a requirement cycle.
    pub fn is_last(self) -> bool {
        self == Stage::Deployer
    }

    /// Directory holding this stage's deliverables, relative to the
    /// project root.
    pub fn deliverable_dir(self) -> &'static str {
        match self {
            Stage::Engineer => "deliverables/engineering",
            Stage::Researcher => "deliverables/research",
            Stage::Coder => "deliverables/coding",
            Stage::Validator => "deliverables/testing",
            Stage::Deployer => "deliverables/deployment",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Engineer => "Engineer",
            Stage::Researcher => "Researcher",
            Stage::Coder => "Coder",
            Stage::Validator => "Validator",
            Stage::Deployer => "Deployer",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "engineer" => Ok(Stage::Engineer),
            "researcher" => Ok(Stage::Researcher),
            "coder" => Ok(Stage::Coder),
            "validator" => Ok(Stage::Validator),
            "deployer" => Ok(Stage::Deployer),
            _ => Err(format!(
                "Unknown stage '{}'. Valid stages: Engineer, Researcher, Coder, Validator, Deployer.",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        assert_eq!(Stage::Engineer.next(), Stage::Researcher);
        assert_eq!(Stage::Researcher.next(), Stage::Coder);
        assert_eq!(Stage::Coder.next(), Stage::Validator);
        assert_eq!(Stage::Validator.next(), Stage::Deployer);
        assert_eq!(Stage::Deployer.next(), Stage::Engineer);
    }

    #[test]
    fn test_only_deployer_is_last() {
        for stage in Stage::ALL {
            assert_eq!(stage.is_last(), stage == Stage::Deployer);
        }
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("coder".parse::<Stage>(), Ok(Stage::Coder));
        assert_eq!("Deployer".parse::<Stage>(), Ok(Stage::Deployer));
        assert_eq!(" engineer ".parse::<Stage>(), Ok(Stage::Engineer));
        assert!("builder".parse::<Stage>().is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for stage in Stage::ALL {
            assert_eq!(stage.to_string().parse::<Stage>(), Ok(stage));
        }
    }
}
