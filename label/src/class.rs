use anyhow::{bail, ensure, Result};
use std::fmt;

/// The number of classes per digit position, ten digits plus the blank class.
pub const NUM_DIGIT_CLASSES: usize = 11;

/// The class of a digit position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigitClass {
    Digit(u8),
    /// No digit at this position.
    Blank,
}

impl DigitClass {
    pub fn from_digit(digit: u8) -> Result<Self> {
        ensure!(digit <= 9, "digit must be within 0..=9, but get {}", digit);
        Ok(Self::Digit(digit))
    }

    pub fn from_char(ch: char) -> Result<Self> {
        match ch.to_digit(10) {
            Some(digit) => Ok(Self::Digit(digit as u8)),
            None => bail!("'{}' is not a decimal digit", ch),
        }
    }

    /// Convert the label value stored in SVHN annotations, where `10` stands for digit zero.
    pub fn from_annotation(value: f64) -> Result<Self> {
        ensure!(
            value.fract() == 0.0 && (1.0..=10.0).contains(&value),
            "annotation label must be an integer within 1..=10, but get {}",
            value
        );
        Ok(Self::Digit(value as u8 % 10))
    }

    /// The zero-based one-hot index.
    pub fn index(&self) -> usize {
        match *self {
            Self::Digit(digit) => digit as usize,
            Self::Blank => NUM_DIGIT_CLASSES - 1,
        }
    }

    /// The one-based class id. Digits map to `1..=10` and blank maps to `11`.
    pub fn class_id(&self) -> usize {
        self.index() + 1
    }

    pub fn from_index(index: usize) -> Result<Self> {
        match index {
            0..=9 => Ok(Self::Digit(index as u8)),
            10 => Ok(Self::Blank),
            _ => bail!("class index {} is out of range", index),
        }
    }

    pub fn to_char(&self) -> Option<char> {
        match *self {
            Self::Digit(digit) => Some((b'0' + digit) as char),
            Self::Blank => None,
        }
    }
}

impl fmt::Display for DigitClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_char() {
            Some(ch) => write!(f, "{}", ch),
            None => write!(f, "_"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_class_indexes() {
        let zero = DigitClass::from_char('0').unwrap();
        let nine = DigitClass::from_char('9').unwrap();
        assert_eq!(zero.class_id(), 1);
        assert_eq!(nine.class_id(), 10);
        assert_eq!(DigitClass::Blank.class_id(), 11);
        assert_eq!(DigitClass::Blank.index(), 10);

        let digit_indexes: Vec<_> = (0..=9)
            .map(|digit| DigitClass::from_digit(digit).unwrap().index())
            .collect();
        assert!(!digit_indexes.contains(&DigitClass::Blank.index()));
    }

    #[test]
    fn digit_class_from_annotation() {
        assert_eq!(
            DigitClass::from_annotation(10.0).unwrap(),
            DigitClass::Digit(0)
        );
        assert_eq!(DigitClass::from_annotation(3.0).unwrap(), DigitClass::Digit(3));
        assert!(DigitClass::from_annotation(0.0).is_err());
        assert!(DigitClass::from_annotation(11.0).is_err());
        assert!(DigitClass::from_annotation(2.5).is_err());
    }

    #[test]
    fn digit_class_round_trip_index() {
        for index in 0..NUM_DIGIT_CLASSES {
            assert_eq!(DigitClass::from_index(index).unwrap().index(), index);
        }
        assert!(DigitClass::from_index(NUM_DIGIT_CLASSES).is_err());
        assert!(DigitClass::from_char('a').is_err());
    }
}
