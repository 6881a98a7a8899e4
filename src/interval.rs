//! Interval arithmetic.
//!
//! An [`Interval`] is a vector of (diatonic steps, chromatic semitones).
//! Transposition specifications arrive as short tokens (`P1`, `M2`, `-m3`,
//! `M6+8va`, `-15ma`); [`normalize`] turns them into intervals, and
//! [`relative`] measures the distance between two of them by transposing a
//! reference pitch rather than subtracting tokens symbolically.
//!
//! Grammar accepted by [`Interval::parse`]:
//!
//! ```text
//! spec     := sign? body compound?
//! sign     := '+' | '-'
//! body     := quality number | number quality | octave
//! quality  := 'P' | 'M' | 'm' | 'A'+ | 'd'+
//! compound := ('+' | '-') octave
//! octave   := '8va' | '15ma'
//! ```

use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IntervalError;
use crate::pitch::{Pitch, Step};

/// Semitones of the major/perfect interval for each simple size (unison..seventh).
const BASE_SEMITONES: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Widest interval accepted, in either direction: ten octaves.
pub const MAX_SEMITONES: i32 = 120;
const MAX_NUMBER: i32 = 7 * 10 + 1;

/// Diatonic size used to spell each chromatic count within an octave.
const SEMITONE_STEPS: [i32; 12] = [0, 1, 1, 2, 2, 3, 4, 4, 5, 5, 6, 6];

/// A signed musical distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Interval {
    pub diatonic: i32,
    pub chromatic: i32,
}

impl Interval {
    pub const IDENTITY: Interval = Interval { diatonic: 0, chromatic: 0 };
    pub const OCTAVE: Interval = Interval { diatonic: 7, chromatic: 12 };

    pub const fn new(diatonic: i32, chromatic: i32) -> Self {
        Self { diatonic, chromatic }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Descending intervals move the letter down, or keep the letter and
    /// lower the pitch (a descending augmented unison).
    pub fn is_descending(&self) -> bool {
        self.diatonic < 0 || (self.diatonic == 0 && self.chromatic < 0)
    }

    /// Spell a chromatic count with its simplest interval
    /// (`P1 m2 M2 m3 M3 P4 d5 P5 m6 M6 m7 M7`, plus octaves).
    /// Counts wider than [`MAX_SEMITONES`] are clamped.
    pub fn from_semitones(semitones: i32) -> Self {
        let magnitude = semitones.unsigned_abs().min(MAX_SEMITONES as u32) as i32;
        let octaves = magnitude / 12;
        let steps = SEMITONE_STEPS[(magnitude % 12) as usize] + 7 * octaves;
        let interval = Interval::new(steps, magnitude);
        if semitones < 0 {
            -interval
        } else {
            interval
        }
    }

    pub fn parse(spec: &str) -> Result<Self, IntervalError> {
        let trimmed = spec.trim();
        if trimmed.is_empty() {
            return Ok(Self::IDENTITY);
        }

        let (negative, rest) = match trimmed.as_bytes()[0] {
            b'-' => (true, &trimmed[1..]),
            b'+' => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let (body, compound) = match rest.find(|c: char| c == '+' || c == '-') {
            Some(i) => (&rest[..i], Some(&rest[i..])),
            None => (rest, None),
        };

        let mut interval = parse_body(body, spec)?;

        if let Some(suffix) = compound {
            let octaves = octave_mark(&suffix[1..])
                .ok_or_else(|| IntervalError::Invalid(spec.to_string()))?;
            interval = if suffix.starts_with('+') {
                interval + octaves
            } else {
                interval - octaves
            };
        }

        Ok(if negative { -interval } else { interval })
    }
}

impl Add for Interval {
    type Output = Interval;

    fn add(self, rhs: Interval) -> Interval {
        Interval::new(self.diatonic + rhs.diatonic, self.chromatic + rhs.chromatic)
    }
}

impl Sub for Interval {
    type Output = Interval;

    fn sub(self, rhs: Interval) -> Interval {
        self + -rhs
    }
}

impl Neg for Interval {
    type Output = Interval;

    fn neg(self) -> Interval {
        Interval::new(-self.diatonic, -self.chromatic)
    }
}

impl FromStr for Interval {
    type Err = IntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interval::parse(s)
    }
}

/// Token form: `P1`, `M2`, `-m3`, `M9`, `AA4`.
impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let descending = self.is_descending();
        let abs = if descending { -*self } else { *self };
        let simple = abs.diatonic.rem_euclid(7);
        let octaves = abs.diatonic.div_euclid(7);
        let deviation = abs.chromatic - (BASE_SEMITONES[simple as usize] + 12 * octaves);

        let quality = if is_perfect_size(simple) {
            match deviation {
                0 => "P".to_string(),
                n if n > 0 => "A".repeat(n as usize),
                n => "d".repeat(n.unsigned_abs() as usize),
            }
        } else {
            match deviation {
                0 => "M".to_string(),
                -1 => "m".to_string(),
                n if n > 0 => "A".repeat(n as usize),
                n => "d".repeat((-n - 1) as usize),
            }
        };

        let sign = if descending { "-" } else { "" };
        write!(f, "{sign}{quality}{}", abs.diatonic + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quality {
    Perfect,
    Major,
    Minor,
    Augmented(i32),
    Diminished(i32),
}

impl Quality {
    fn parse(token: &str) -> Option<Quality> {
        match token {
            "P" => Some(Quality::Perfect),
            "M" => Some(Quality::Major),
            "m" => Some(Quality::Minor),
            t if (1..=3).contains(&t.len()) && t.chars().all(|c| c == 'A') => {
                Some(Quality::Augmented(t.len() as i32))
            }
            t if (1..=3).contains(&t.len()) && t.chars().all(|c| c == 'd') => {
                Some(Quality::Diminished(t.len() as i32))
            }
            _ => None,
        }
    }
}

/// Unisons, fourths and fifths take perfect qualities.
fn is_perfect_size(simple: i32) -> bool {
    matches!(simple, 0 | 3 | 4)
}

fn octave_mark(token: &str) -> Option<Interval> {
    match token {
        "8va" => Some(Interval::OCTAVE),
        "15ma" => Some(Interval::OCTAVE + Interval::OCTAVE),
        _ => None,
    }
}

fn parse_body(body: &str, spec: &str) -> Result<Interval, IntervalError> {
    if let Some(octaves) = octave_mark(body) {
        return Ok(octaves);
    }

    let invalid = || IntervalError::Invalid(spec.to_string());
    let starts_with_digit = body.starts_with(|c: char| c.is_ascii_digit());
    let split = if starts_with_digit {
        body.find(|c: char| !c.is_ascii_digit())
    } else {
        body.find(|c: char| c.is_ascii_digit())
    }
    .ok_or_else(invalid)?;

    let (quality, number) = if starts_with_digit {
        (&body[split..], &body[..split])
    } else {
        (&body[..split], &body[split..])
    };

    let number: i32 = number.parse().map_err(|_| invalid())?;
    if !(1..=MAX_NUMBER).contains(&number) {
        return Err(invalid());
    }
    let parsed = Quality::parse(quality).ok_or_else(invalid)?;

    let diatonic = number - 1;
    let simple = diatonic % 7;
    let base = BASE_SEMITONES[simple as usize] + 12 * (diatonic / 7);
    let offset = match (parsed, is_perfect_size(simple)) {
        (Quality::Perfect, true) | (Quality::Major, false) => 0,
        (Quality::Minor, false) => -1,
        (Quality::Augmented(n), _) => n,
        (Quality::Diminished(n), true) => -n,
        (Quality::Diminished(n), false) => -1 - n,
        _ => {
            return Err(IntervalError::QualityMismatch {
                spec: spec.to_string(),
                quality: quality.to_string(),
                number,
            })
        }
    };

    Ok(Interval::new(diatonic, base + offset))
}

/// Parse a transposition specification, falling back to the identity
/// interval (with a warning) when it cannot be read.
pub fn normalize(spec: &str) -> Interval {
    match Interval::parse(spec) {
        Ok(interval) => interval,
        Err(e) => {
            log::warn!("{e}; using P1");
            Interval::IDENTITY
        }
    }
}

/// `target` minus `source`, measured between the two pitches the
/// specifications produce from C4.
pub fn relative(target: &str, source: &str) -> Interval {
    let reference = Pitch::new(Step::C, 0, 4);
    let to_target = reference.transpose(normalize(target));
    let to_source = reference.transpose(normalize(source));
    to_source.interval_to(&to_target)
}

/// Add a free chromatic shift (octave nudge, key slider) to `base`.
pub fn combine(base: Interval, extra_semitones: i32) -> Interval {
    if extra_semitones.unsigned_abs() > MAX_SEMITONES as u32 {
        log::warn!("shift of {extra_semitones} semitones clamped to {MAX_SEMITONES}");
    }
    base + Interval::from_semitones(extra_semitones)
}
