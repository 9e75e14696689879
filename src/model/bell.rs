//! Bell Module
//! A single bell with its designation, weight and founding details.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Kilograms per hundredweight.
pub const CWT_TO_KG: f64 = 50.8023;
/// Kilograms per pound.
pub const LB_TO_KG: f64 = 0.453592;
/// Centimetres per inch.
pub const IN_TO_CM: f64 = 2.54;

#[derive(Error, Debug, PartialEq)]
pub enum WeightError {
    #[error("Expected weight as cwt-qr-lb, got '{0}'")]
    Malformed(String),
}

/// Flat or sharp suffix on a bell or chime number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Accidental {
    Flat,
    Sharp,
}

impl Accidental {
    pub fn symbol(self) -> char {
        match self {
            Accidental::Flat => 'b',
            Accidental::Sharp => '#',
        }
    }
}

/// Position of a bell in the ring.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BellRole {
    /// A plain numbered bell of the ring.
    Numbered(u32),
    /// A semitone bell, e.g. `2b` or `6#`.
    Accidental(u32, Accidental),
    /// A bell known by name only.
    Named(String),
    /// Designation that could not be parsed.
    Extra,
}

impl BellRole {
    pub fn number(&self) -> Option<u32> {
        match self {
            BellRole::Numbered(n) | BellRole::Accidental(n, _) => Some(*n),
            BellRole::Named(_) | BellRole::Extra => None,
        }
    }

    pub fn is_numbered(&self) -> bool {
        matches!(self, BellRole::Numbered(_))
    }

    fn rank(&self) -> u8 {
        match self {
            BellRole::Numbered(_) => 0,
            BellRole::Accidental(_, Accidental::Flat) => 1,
            BellRole::Accidental(_, Accidental::Sharp) => 2,
            BellRole::Named(_) => 3,
            BellRole::Extra => 4,
        }
    }
}

impl PartialOrd for BellRole {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BellRole {
    /// Numbered bells first by number, semitones beside them, then names and extras.
    fn cmp(&self, other: &Self) -> Ordering {
        let by_number = match (self.number(), other.number()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_number
            .then_with(|| self.rank().cmp(&other.rank()))
            .then_with(|| match (self, other) {
                (BellRole::Named(a), BellRole::Named(b)) => a.cmp(b),
                _ => Ordering::Equal,
            })
    }
}

impl fmt::Display for BellRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BellRole::Numbered(n) => write!(f, "{n}"),
            BellRole::Accidental(n, acc) => write!(f, "{n}{}", acc.symbol()),
            BellRole::Named(name) => f.write_str(name),
            BellRole::Extra => f.write_str("Extra"),
        }
    }
}

/// Chime number, optionally flat or sharp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chime {
    pub number: u32,
    pub accidental: Option<Accidental>,
}

impl fmt::Display for Chime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number)?;
        if let Some(acc) = self.accidental {
            write!(f, "{}", acc.symbol())?;
        }
        Ok(())
    }
}

/// Bell weight held in every unit at once.
///
/// Only constructed from pounds or from the `cwt-qr-lb` text, so the
/// representations never disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weight {
    lb: f64,
    kg: f64,
    cwt: f64,
    text: String,
}

impl Weight {
    pub fn from_pounds(lb: f64) -> Self {
        let kg = lb * LB_TO_KG;
        let cwt = kg / CWT_TO_KG;
        Self {
            lb,
            kg,
            cwt,
            text: cwt_to_text(cwt),
        }
    }

    /// Parse `c-q-l` (hundredweight, quarters, pounds). Empty text is no weight.
    pub fn from_cwt_text(text: &str) -> Result<Option<Self>, WeightError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let cwt = text_to_cwt(trimmed)?;
        let kg = cwt * CWT_TO_KG;
        Ok(Some(Self {
            lb: kg / LB_TO_KG,
            kg,
            cwt,
            text: trimmed.to_string(),
        }))
    }

    pub fn lb(&self) -> f64 {
        self.lb
    }

    pub fn kg(&self) -> f64 {
        self.kg
    }

    pub fn cwt(&self) -> f64 {
        self.cwt
    }

    /// `cwt-qr-lb` form, e.g. `12-1-4`.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Hundredweight float from `c-q-l` text.
pub fn text_to_cwt(text: &str) -> Result<f64, WeightError> {
    let parts: Vec<f64> = text
        .split('-')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| WeightError::Malformed(text.to_string()))?;
    match parts.as_slice() {
        [c, q, l] => Ok(c + q / 4.0 + l / 112.0),
        _ => Err(WeightError::Malformed(text.to_string())),
    }
}

/// `c-q-l` text from a hundredweight float, pounds rounded to nearest.
pub fn cwt_to_text(cwt: f64) -> String {
    let mut whole = cwt.trunc() as i64;
    let quarters = (cwt - whole as f64) * 4.0;
    let mut whole_quarters = quarters.trunc() as i64;
    let mut lbs = ((quarters - whole_quarters as f64) * 28.0).round() as i64;
    if lbs == 28 {
        lbs = 0;
        whole_quarters += 1;
    }
    if whole_quarters == 4 {
        whole_quarters = 0;
        whole += 1;
    }
    format!("{whole}-{whole_quarters}-{lbs}")
}

/// A bell and its Dove attributes. Missing values are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bell {
    pub role: Option<BellRole>,
    pub chime: Option<Chime>,
    pub dove_id: Option<i64>,
    pub note: Option<String>,
    /// Nominal frequency in Hz.
    pub nominal: Option<f64>,
    pub weight: Option<Weight>,
    /// Diameter in cm.
    pub diameter: Option<f64>,
    pub caster: Option<String>,
    pub founder: Option<String>,
    /// Year the bell was cast.
    pub dated: Option<i32>,
    pub collection_type: Option<String>,
    pub listed: Option<String>,
    pub canons: Option<String>,
    pub turnings: Option<String>,
    pub cracked: Option<String>,
    pub frame_id: Option<i64>,
}

/// One row of the bell summary table.
#[derive(Debug, Clone, PartialEq)]
pub struct BellSummary {
    pub n: Option<String>,
    pub c: Option<String>,
    pub note: Option<String>,
    pub nominal: Option<f64>,
    pub weight: Option<String>,
    pub cwt: Option<f64>,
    pub diameter: Option<f64>,
    pub dated: Option<i32>,
    pub dove_id: Option<i64>,
}

impl Bell {
    /// Set the diameter from a Dove value in inches.
    pub fn with_diameter_inches(mut self, inches: Option<f64>) -> Self {
        self.diameter = inches.map(|d| d * IN_TO_CM);
        self
    }

    pub fn kg(&self) -> Option<f64> {
        self.weight.as_ref().map(Weight::kg)
    }

    pub fn cwt(&self) -> Option<f64> {
        self.weight.as_ref().map(Weight::cwt)
    }

    pub fn is_numbered(&self) -> bool {
        self.role.as_ref().is_some_and(BellRole::is_numbered)
    }

    pub fn summary(&self) -> BellSummary {
        BellSummary {
            n: self.role.as_ref().map(ToString::to_string),
            c: self.chime.map(|c| c.to_string()),
            note: self.note.clone(),
            nominal: self.nominal,
            weight: self.weight.as_ref().map(|w| w.text().to_string()),
            cwt: self.cwt(),
            diameter: self.diameter,
            dated: self.dated,
            dove_id: self.dove_id,
        }
    }
}
