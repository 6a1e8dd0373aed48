use serde_repr::{Deserialize_repr, Serialize_repr};
use std::{convert::TryFrom, fmt};

/// Which of the two recorded teams a value refers to. Serialized as the
/// integers 1 and 2, matching the stored winner marker.
#[derive(Deserialize_repr, Serialize_repr, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TeamSide {
    One = 1,
    Two = 2
}

impl TeamSide {
    pub fn other(self) -> TeamSide {
        match self {
            TeamSide::One => TeamSide::Two,
            TeamSide::Two => TeamSide::One
        }
    }
}

impl fmt::Display for TeamSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

impl TryFrom<i32> for TeamSide {
    type Error = ();

    fn try_from(v: i32) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(TeamSide::One),
            2 => Ok(TeamSide::Two),
            _ => Err(())
        }
    }
}
