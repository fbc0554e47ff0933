//! Method classes and optimisation objectives.
//!
//! A [`MethodClass`] is parsed once from its conventional name (`erk`,
//! `2S*`, ...) and from then on drives the codec layout, the structural zero
//! pattern of `A` and the guess heuristics.

use std::fmt;
use std::str::FromStr;

use crate::error::MethodError;

/// Zero pattern of the stage-coupling matrix of a Butcher-form class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ButcherStructure {
    /// Strictly lower-triangular `A`.
    Explicit,
    /// Dense `A`.
    Implicit,
    /// Lower-triangular `A`.
    DiagonallyImplicit,
    /// Lower-triangular `A` with one shared diagonal value.
    SinglyDiagonallyImplicit,
}

impl ButcherStructure {
    /// Whether entry `(i, j)` may be non-zero.
    pub fn allows(&self, i: usize, j: usize) -> bool {
        match self {
            ButcherStructure::Explicit => j < i,
            ButcherStructure::Implicit => true,
            ButcherStructure::DiagonallyImplicit | ButcherStructure::SinglyDiagonallyImplicit => {
                j <= i
            }
        }
    }

    /// Entries read from the parameter vector, row-major. The shared
    /// diagonal of the singly-diagonally-implicit class is not included.
    pub fn free_entries(&self, stages: usize) -> Vec<(usize, usize)> {
        let mut entries = Vec::new();
        for i in 0..stages {
            for j in 0..stages {
                let free = match self {
                    ButcherStructure::SinglyDiagonallyImplicit => j < i,
                    other => other.allows(i, j),
                };
                if free {
                    entries.push((i, j));
                }
            }
        }
        entries
    }
}

/// Register layout of a low-storage recurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LowStorageScheme {
    /// Two registers, the second accumulating `δ`-weighted stages.
    TwoS,
    /// Two registers, the second holding `u_n`.
    TwoSStar,
    /// Three registers: accumulator plus a copy of `u_n`.
    ThreeSStar,
}

/// A method class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MethodClass {
    /// Explicit Runge-Kutta.
    Erk,
    /// Fully implicit Runge-Kutta.
    Irk,
    /// Diagonally implicit Runge-Kutta.
    Dirk,
    /// Singly diagonally implicit Runge-Kutta.
    Sdirk,
    /// Low-storage 2S.
    TwoS,
    /// Low-storage 2S*.
    TwoSStar,
    /// Low-storage 3S*.
    ThreeSStar,
    /// Low-storage 2S with embedded pair.
    TwoSEmbedded,
    /// Low-storage 3S* with embedded pair.
    ThreeSStarEmbedded,
}

impl MethodClass {
    /// All classes, in listing order.
    pub const ALL: [MethodClass; 9] = [
        MethodClass::Erk,
        MethodClass::Irk,
        MethodClass::Dirk,
        MethodClass::Sdirk,
        MethodClass::TwoS,
        MethodClass::TwoSStar,
        MethodClass::ThreeSStar,
        MethodClass::TwoSEmbedded,
        MethodClass::ThreeSStarEmbedded,
    ];

    /// Conventional name.
    pub fn name(&self) -> &'static str {
        match self {
            MethodClass::Erk => "erk",
            MethodClass::Irk => "irk",
            MethodClass::Dirk => "dirk",
            MethodClass::Sdirk => "sdirk",
            MethodClass::TwoS => "2S",
            MethodClass::TwoSStar => "2S*",
            MethodClass::ThreeSStar => "3S*",
            MethodClass::TwoSEmbedded => "2Semb",
            MethodClass::ThreeSStarEmbedded => "3S*emb",
        }
    }

    /// Zero pattern for Butcher-form classes.
    pub fn butcher_structure(&self) -> Option<ButcherStructure> {
        match self {
            MethodClass::Erk => Some(ButcherStructure::Explicit),
            MethodClass::Irk => Some(ButcherStructure::Implicit),
            MethodClass::Dirk => Some(ButcherStructure::DiagonallyImplicit),
            MethodClass::Sdirk => Some(ButcherStructure::SinglyDiagonallyImplicit),
            _ => None,
        }
    }

    /// Register layout for low-storage classes.
    pub fn low_storage_scheme(&self) -> Option<LowStorageScheme> {
        match self {
            MethodClass::TwoS | MethodClass::TwoSEmbedded => Some(LowStorageScheme::TwoS),
            MethodClass::TwoSStar => Some(LowStorageScheme::TwoSStar),
            MethodClass::ThreeSStar | MethodClass::ThreeSStarEmbedded => {
                Some(LowStorageScheme::ThreeSStar)
            }
            _ => None,
        }
    }

    /// Whether the class carries an embedded pair.
    pub fn has_embedded(&self) -> bool {
        matches!(
            self,
            MethodClass::TwoSEmbedded | MethodClass::ThreeSStarEmbedded
        )
    }

    /// Whether every stage is explicit.
    pub fn is_explicit(&self) -> bool {
        !matches!(
            self,
            MethodClass::Irk | MethodClass::Dirk | MethodClass::Sdirk
        )
    }
}

impl FromStr for MethodClass {
    type Err = MethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();
        match lower.as_str() {
            "erk" => Ok(MethodClass::Erk),
            "irk" => Ok(MethodClass::Irk),
            "dirk" => Ok(MethodClass::Dirk),
            "sdirk" => Ok(MethodClass::Sdirk),
            "2s" => Ok(MethodClass::TwoS),
            "2s*" => Ok(MethodClass::TwoSStar),
            "3s*" => Ok(MethodClass::ThreeSStar),
            "2semb" => Ok(MethodClass::TwoSEmbedded),
            "3s*emb" => Ok(MethodClass::ThreeSStarEmbedded),
            _ => Err(MethodError::UnknownClass(trimmed.to_string())),
        }
    }
}

impl fmt::Display for MethodClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the search optimises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Objective {
    /// Maximise the SSP coefficient.
    Ssp,
    /// Minimise the leading truncation-error norm.
    Acc,
}

impl Objective {
    /// Conventional name.
    pub fn name(&self) -> &'static str {
        match self {
            Objective::Ssp => "ssp",
            Objective::Acc => "acc",
        }
    }

    /// Whether the parameter vector carries a trailing SSP anchor.
    pub fn has_anchor(&self) -> bool {
        matches!(self, Objective::Ssp)
    }
}

impl FromStr for Objective {
    type Err = MethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ssp" => Ok(Objective::Ssp),
            "acc" => Ok(Objective::Acc),
            _ => Err(MethodError::UnknownObjective(s.trim().to_string())),
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
