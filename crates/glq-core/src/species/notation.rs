//! Spectroscopic species names such as `H I` or `He II`.

use crate::domain::{GlqError, GlqResult};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub const ELEMENT_SYMBOLS: [&str; 30] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn",
];

const ROMAN_NUMERALS: [(u32, &str); 13] = [
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

/// Element plus ionization stage; stage 1 is the neutral atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpeciesName {
    atomic_number: u32,
    stage: u32,
}

impl SpeciesName {
    pub fn new(atomic_number: u32, stage: u32) -> GlqResult<Self> {
        if atomic_number == 0 || atomic_number as usize > ELEMENT_SYMBOLS.len() {
            return Err(GlqError::configuration(
                "CONFIG.SPECIES_NAME",
                format!("atomic number {atomic_number} has no tabulated element"),
            ));
        }
        if stage == 0 || stage > atomic_number {
            let symbol = ELEMENT_SYMBOLS[atomic_number as usize - 1];
            return Err(GlqError::configuration(
                "CONFIG.SPECIES_NAME",
                format!(
                    "ionization stage {stage} is impossible for {symbol}, highest photoionizable stage is {}",
                    arabic_to_roman(atomic_number)
                ),
            ));
        }
        Ok(Self {
            atomic_number,
            stage,
        })
    }

    pub const fn atomic_number(&self) -> u32 {
        self.atomic_number
    }

    pub const fn stage(&self) -> u32 {
        self.stage
    }

    /// Bound electrons left on the ion.
    pub const fn electrons(&self) -> u32 {
        self.atomic_number + 1 - self.stage
    }

    pub fn symbol(&self) -> &'static str {
        ELEMENT_SYMBOLS[self.atomic_number as usize - 1]
    }

    /// Name without the separating space, as used in column labels (`HeII`).
    pub fn compact(&self) -> String {
        format!("{}{}", self.symbol(), arabic_to_roman(self.stage))
    }
}

impl Display for SpeciesName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.symbol(), arabic_to_roman(self.stage))
    }
}

impl FromStr for SpeciesName {
    type Err = GlqError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut tokens = value.split_whitespace();
        let (Some(symbol), Some(numeral), None) = (tokens.next(), tokens.next(), tokens.next())
        else {
            return Err(GlqError::configuration(
                "CONFIG.SPECIES_NAME",
                format!("species '{value}' must look like 'He II': element symbol then roman stage"),
            ));
        };

        let atomic_number = ELEMENT_SYMBOLS
            .iter()
            .position(|candidate| *candidate == symbol)
            .map(|index| index as u32 + 1)
            .ok_or_else(|| {
                GlqError::configuration(
                    "CONFIG.SPECIES_NAME",
                    format!("unknown element symbol '{symbol}' in species '{value}'"),
                )
            })?;
        let stage = roman_to_arabic(numeral).ok_or_else(|| {
            GlqError::configuration(
                "CONFIG.SPECIES_NAME",
                format!("'{numeral}' is not a roman numeral ionization stage"),
            )
        })?;

        Self::new(atomic_number, stage)
    }
}

pub fn arabic_to_roman(mut value: u32) -> String {
    let mut roman = String::new();
    for (weight, numeral) in ROMAN_NUMERALS {
        while value >= weight {
            roman.push_str(numeral);
            value -= weight;
        }
    }
    roman
}

/// Parses canonical upper-case numerals only; `IIII` or `iv` are rejected.
pub fn roman_to_arabic(numeral: &str) -> Option<u32> {
    if numeral.is_empty() {
        return None;
    }

    let mut total: u32 = 0;
    let mut last = 0;
    for character in numeral.chars().rev() {
        let value = match character {
            'I' => 1,
            'V' => 5,
            'X' => 10,
            'L' => 50,
            'C' => 100,
            'D' => 500,
            'M' => 1000,
            _ => return None,
        };
        if value < last {
            total = total.checked_sub(value)?;
        } else {
            total = total.checked_add(value)?;
            last = value;
        }
    }

    (total > 0 && arabic_to_roman(total) == numeral).then_some(total)
}
