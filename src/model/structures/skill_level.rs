use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use strum_macros::EnumIter;

/// Self-reported ability tier, used for roster grouping only. Never an input
/// to the rating formula.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Novice,
    Intermediate,
    Advanced
}

impl FromStr for SkillLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "novice" => Ok(SkillLevel::Novice),
            "intermediate" => Ok(SkillLevel::Intermediate),
            "advanced" => Ok(SkillLevel::Advanced),
            _ => Err(())
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SkillLevel::Novice => "Novice",
            SkillLevel::Intermediate => "Intermediate",
            SkillLevel::Advanced => "Advanced"
        };

        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use crate::model::structures::skill_level::SkillLevel;
    use strum::IntoEnumIterator;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("novice".parse(), Ok(SkillLevel::Novice));
        assert_eq!("INTERMEDIATE".parse(), Ok(SkillLevel::Intermediate));
        assert_eq!("Advanced".parse(), Ok(SkillLevel::Advanced));
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!("expert".parse::<SkillLevel>(), Err(()));
    }

    #[test]
    fn test_display() {
        assert_eq!(SkillLevel::Novice.to_string(), "Novice");
        assert_eq!(SkillLevel::Intermediate.to_string(), "Intermediate");
        assert_eq!(SkillLevel::Advanced.to_string(), "Advanced");
    }

    #[test]
    fn test_enumerate() {
        let levels = SkillLevel::iter().collect::<Vec<_>>();
        assert_eq!(
            levels,
            vec![SkillLevel::Novice, SkillLevel::Intermediate, SkillLevel::Advanced]
        );
    }
}
