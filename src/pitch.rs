//! Notated pitch: letter, alteration and octave.
//!
//! Transposition works on the diatonic letter and the chromatic count at
//! the same time, so the spelling of the result follows from the interval
//! (a major second above F♯ is G♯, never A♭).

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::interval::Interval;

/// Octaves a written pitch may sit in.
pub const OCTAVE_RANGE: RangeInclusive<i32> = -1..=10;

/// Alterations a written pitch may carry, double flat to double sharp.
pub const ALTER_RANGE: RangeInclusive<i32> = -2..=2;

/// Note letter. Variants are ordered C..B within an octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    pub const ALL: [Step; 7] = [Step::C, Step::D, Step::E, Step::F, Step::G, Step::A, Step::B];

    /// Position within the octave (C = 0 .. B = 6).
    pub fn index(self) -> i32 {
        self as i32
    }

    /// Letter for any diatonic index, wrapping across octaves.
    pub fn from_index(index: i32) -> Step {
        Self::ALL[index.rem_euclid(7) as usize]
    }

    /// Semitones above C of the natural letter.
    pub fn semitones(self) -> i32 {
        match self {
            Step::C => 0,
            Step::D => 2,
            Step::E => 4,
            Step::F => 5,
            Step::G => 7,
            Step::A => 9,
            Step::B => 11,
        }
    }

    /// Position of the natural letter on the circle of fifths relative to C.
    pub fn fifths(self) -> i32 {
        match self {
            Step::F => -1,
            Step::C => 0,
            Step::G => 1,
            Step::D => 2,
            Step::A => 3,
            Step::E => 4,
            Step::B => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Step::C => "C",
            Step::D => "D",
            Step::E => "E",
            Step::F => "F",
            Step::G => "G",
            Step::A => "A",
            Step::B => "B",
        }
    }

    pub fn from_letter(letter: char) -> Option<Step> {
        match letter.to_ascii_uppercase() {
            'C' => Some(Step::C),
            'D' => Some(Step::D),
            'E' => Some(Step::E),
            'F' => Some(Step::F),
            'G' => Some(Step::G),
            'A' => Some(Step::A),
            'B' => Some(Step::B),
            _ => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Step::from_letter(c).ok_or_else(|| format!("Invalid step '{s}'")),
            _ => Err(format!("Invalid step '{s}'")),
        }
    }
}

/// A letter with an alteration but no octave (a key root, for example).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PitchClass {
    pub step: Step,
    pub alter: i32,
}

impl PitchClass {
    pub fn new(step: Step, alter: i32) -> Self {
        Self { step, alter }
    }

    /// C moved by `fifths` perfect fifths (`-2` is B♭, `3` is A).
    pub fn from_fifths(fifths: i32) -> Self {
        // Letters in fifths order starting one fifth below C.
        const ORDER: [Step; 7] = [Step::F, Step::C, Step::G, Step::D, Step::A, Step::E, Step::B];
        let position = fifths + 1;
        Self {
            step: ORDER[position.rem_euclid(7) as usize],
            alter: position.div_euclid(7),
        }
    }

    /// Position on the circle of fifths; the signature count of the major
    /// key on this root before any enharmonic folding.
    pub fn fifths(self) -> i32 {
        self.step.fifths() + 7 * self.alter
    }

    pub fn transpose(self, interval: Interval) -> Self {
        Pitch::new(self.step, self.alter, 4).transpose(interval).class()
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.step, accidental_suffix(self.alter))
    }
}

/// A single notated pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pitch {
    /// Note name: A, B, C, D, E, F, G
    pub step: Step,
    /// Chromatic alteration: -1 = flat, 1 = sharp, 0 = natural
    pub alter: i32,
    /// Octave number (middle C = C4)
    pub octave: i32,
}

impl Pitch {
    pub fn new(step: Step, alter: i32, octave: i32) -> Self {
        Self { step, alter, octave }
    }

    /// Letter position counted from C0.
    pub fn diatonic_index(&self) -> i32 {
        self.octave * 7 + self.step.index()
    }

    /// MIDI note number. Middle C (C4) = 60.
    pub fn to_midi(&self) -> i32 {
        (self.octave + 1) * 12 + self.step.semitones() + self.alter
    }

    /// Move by `interval`. The letter advances by the interval's diatonic
    /// steps; the alteration is whatever makes the chromatic distance come
    /// out right.
    pub fn transpose(&self, interval: Interval) -> Pitch {
        let index = self.diatonic_index() + interval.diatonic;
        let step = Step::from_index(index);
        let octave = index.div_euclid(7);
        let natural = Pitch::new(step, 0, octave).to_midi();
        let alter = self.to_midi() + interval.chromatic - natural;
        Pitch::new(step, alter, octave)
    }

    /// The interval that carries `self` onto `other`.
    pub fn interval_to(&self, other: &Pitch) -> Interval {
        Interval::new(
            other.diatonic_index() - self.diatonic_index(),
            other.to_midi() - self.to_midi(),
        )
    }

    pub fn class(&self) -> PitchClass {
        PitchClass::new(self.step, self.alter)
    }
}

fn accidental_suffix(alter: i32) -> String {
    match alter {
        a if a > 0 => "#".repeat(a as usize),
        a if a < 0 => "b".repeat(a.unsigned_abs() as usize),
        _ => String::new(),
    }
}

/// Scientific pitch notation: `C4`, `F#4`, `Bb3`, `C##5`.
impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.step, accidental_suffix(self.alter), self.octave)
    }
}

impl FromStr for Pitch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let step = chars
            .next()
            .and_then(Step::from_letter)
            .ok_or_else(|| format!("Invalid pitch '{s}'"))?;
        let rest = chars.as_str();
        let digits = rest
            .find(|c: char| c.is_ascii_digit() || c == '-')
            .ok_or_else(|| format!("Missing octave in pitch '{s}'"))?;
        let (accidentals, octave) = rest.split_at(digits);
        let alter = accidentals.chars().try_fold(0, |acc, c| match c {
            '#' => Ok(acc + 1),
            'b' => Ok(acc - 1),
            'x' => Ok(acc + 2),
            _ => Err(format!("Invalid accidental in pitch '{s}'")),
        })?;
        let octave = octave
            .parse()
            .ok()
            .filter(|o| OCTAVE_RANGE.contains(o))
            .ok_or_else(|| format!("Invalid octave in pitch '{s}'"))?;
        Ok(Pitch::new(step, alter, octave))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Pitch {
        s.parse().unwrap()
    }

    #[test]
    fn midi_numbers() {
        assert_eq!(p("C4").to_midi(), 60);
        assert_eq!(p("D4").to_midi(), 62);
        assert_eq!(p("Bb3").to_midi(), 58);
        assert_eq!(p("B#3").to_midi(), 60);
    }

    #[test]
    fn major_second_advances_the_letter() {
        let m2 = Interval::new(1, 2);
        assert_eq!(p("F#4").transpose(m2), p("G#4"));
        assert_eq!(p("B4").transpose(m2), p("C#5"));
        assert_eq!(p("B#4").transpose(m2), p("C##5"));
        assert_eq!(p("Eb4").transpose(m2), p("F4"));
    }

    #[test]
    fn descending_intervals_cross_octaves() {
        let down_m2 = Interval::new(-1, -2);
        assert_eq!(p("C4").transpose(down_m2), p("Bb3"));
        let down_p5 = Interval::new(-4, -7);
        assert_eq!(p("E4").transpose(down_p5), p("A3"));
    }

    #[test]
    fn interval_between_pitches() {
        assert_eq!(p("C4").interval_to(&p("D4")), Interval::new(1, 2));
        assert_eq!(p("D4").interval_to(&p("C4")), Interval::new(-1, -2));
        assert_eq!(p("C4").interval_to(&p("A5")), Interval::new(12, 21));
    }

    #[test]
    fn pitch_classes_on_the_circle_of_fifths() {
        assert_eq!(PitchClass::from_fifths(0).to_string(), "C");
        assert_eq!(PitchClass::from_fifths(3).to_string(), "A");
        assert_eq!(PitchClass::from_fifths(-2).to_string(), "Bb");
        assert_eq!(PitchClass::from_fifths(6).to_string(), "F#");
        assert_eq!(PitchClass::from_fifths(-6).to_string(), "Gb");
        for fifths in -7..=7 {
            assert_eq!(PitchClass::from_fifths(fifths).fifths(), fifths);
        }
    }

    #[test]
    fn display_and_parse() {
        assert_eq!(Pitch::new(Step::C, 2, 4).to_string(), "C##4");
        assert_eq!(Pitch::new(Step::D, -2, 3).to_string(), "Dbb3");
        assert_eq!(p("Ab-1"), Pitch::new(Step::A, -1, -1));
        assert!("H4".parse::<Pitch>().is_err());
        assert!("C".parse::<Pitch>().is_err());
        assert!("C2000000000".parse::<Pitch>().is_err());
    }
}
