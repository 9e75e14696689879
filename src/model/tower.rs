//! Tower Module
//! A bell tower, its location and administrative details, and its bells.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::bell::{Bell, BellRole, BellSummary, Weight};
use super::coords::Coords;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tower {
    /// Dedication, e.g. "S Mary".
    pub name: String,
    pub place: String,
    pub dove_id: i64,
    pub bells: Vec<Bell>,
    pub coordinates: Option<Coords>,
    pub postcode: String,
    pub grid_reference: Option<String>,
    pub country: String,
    pub county: String,
    pub diocese: Option<String>,
    pub affiliation: Option<String>,
    pub practice: Option<String>,
    pub listed_grade: Option<String>,
}

/// One row of the tower summary table.
#[derive(Debug, Clone, PartialEq)]
pub struct TowerSummary {
    pub dove_id: i64,
    pub name: String,
    pub place: String,
    pub bells: usize,
    pub tenor: Option<String>,
    pub hundredweight: Option<f64>,
    pub country: String,
    pub county: String,
    pub postcode: String,
}

impl Tower {
    pub fn new(dove_id: i64, name: impl Into<String>, place: impl Into<String>) -> Self {
        Self {
            dove_id,
            name: name.into(),
            place: place.into(),
            ..Default::default()
        }
    }

    pub fn add_bell(&mut self, bell: Bell) {
        self.bells.push(bell);
    }

    pub fn add_bells(&mut self, bells: impl IntoIterator<Item = Bell>) {
        self.bells.extend(bells);
    }

    /// Add undocumented bells from (weight, nominal) pairs numbered from `start_n`.
    pub fn add_bells_by_weight_nominal(&mut self, bells: &[(Weight, f64)], start_n: u32) {
        for (offset, (weight, nominal)) in (0u32..).zip(bells) {
            self.add_bell(Bell {
                role: Some(BellRole::Numbered(start_n + offset)),
                weight: Some(weight.clone()),
                nominal: Some(*nominal),
                ..Default::default()
            });
        }
    }

    /// The bell rung as `number` in the ring.
    pub fn get_bell(&self, number: u32) -> Option<&Bell> {
        let found = self
            .bells
            .iter()
            .find(|b| b.role == Some(BellRole::Numbered(number)));
        if found.is_none() {
            log::warn!("Couldn't find bell {number} in tower {}", self.dove_id);
        }
        found
    }

    /// Heaviest bell with a known weight.
    pub fn tenor(&self) -> Option<&Bell> {
        self.weighed_bells()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(bell, _)| bell)
    }

    /// Lightest bell with a known weight.
    pub fn treble(&self) -> Option<&Bell> {
        self.weighed_bells()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(bell, _)| bell)
    }

    fn weighed_bells(&self) -> impl Iterator<Item = (&Bell, f64)> {
        self.bells.iter().filter_map(|b| b.kg().map(|kg| (b, kg)))
    }

    /// Number of bells in the ring, chimes and semitones excluded.
    pub fn n_bells(&self) -> usize {
        self.bells.iter().filter(|b| b.is_numbered()).count()
    }

    /// Every bell including chimes.
    pub fn n_bells_all(&self) -> usize {
        self.bells.len()
    }

    pub fn summary(&self) -> TowerSummary {
        let tenor = self.tenor();
        TowerSummary {
            dove_id: self.dove_id,
            name: self.name.clone(),
            place: self.place.clone(),
            bells: self.n_bells(),
            tenor: tenor.and_then(|b| b.weight.as_ref()).map(|w| w.text().to_string()),
            hundredweight: tenor.and_then(Bell::cwt),
            country: self.country.clone(),
            county: self.county.clone(),
            postcode: self.postcode.clone(),
        }
    }

    /// Bell rows ordered by designation then weight.
    pub fn bell_summaries(&self) -> Vec<BellSummary> {
        let mut bells: Vec<&Bell> = self.bells.iter().collect();
        // Chime-only entries (no role) go last.
        bells.sort_by(|a, b| {
            let by_role = match (&a.role, &b.role) {
                (Some(ra), Some(rb)) => ra.cmp(rb),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            by_role.then_with(|| {
                let wa = a.cwt().unwrap_or(f64::INFINITY);
                let wb = b.cwt().unwrap_or(f64::INFINITY);
                wa.total_cmp(&wb)
            })
        });
        bells.into_iter().map(Bell::summary).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::bell::{Accidental, Chime};

    fn bell(role: Option<BellRole>, lb: Option<f64>) -> Bell {
        Bell {
            role,
            weight: lb.map(Weight::from_pounds),
            ..Default::default()
        }
    }

    fn sample_tower() -> Tower {
        let mut tower = Tower::new(42, "S Mary", "Anytown");
        tower.add_bells([
            bell(Some(BellRole::Numbered(1)), Some(400.0)),
            bell(Some(BellRole::Numbered(2)), Some(500.0)),
            bell(Some(BellRole::Accidental(2, Accidental::Flat)), Some(450.0)),
            bell(Some(BellRole::Numbered(3)), Some(1200.0)),
            bell(Some(BellRole::Named("Sanctus".into())), Some(90.0)),
            bell(Some(BellRole::Extra), None),
            Bell {
                chime: Some(Chime {
                    number: 1,
                    accidental: None,
                }),
                ..Default::default()
            },
        ]);
        tower
    }

    #[test]
    fn test_bell_count_excludes_chimes() {
        let tower = sample_tower();
        assert_eq!(tower.n_bells(), 3);
        assert_eq!(tower.n_bells_all(), 7);
    }

    #[test]
    fn test_tenor_and_treble() {
        let tower = sample_tower();
        assert_eq!(tower.tenor().unwrap().role, Some(BellRole::Numbered(3)));
        assert_eq!(
            tower.treble().unwrap().role,
            Some(BellRole::Named("Sanctus".into()))
        );
        assert!(Tower::default().tenor().is_none());
    }

    #[test]
    fn test_get_bell() {
        let tower = sample_tower();
        assert!(tower.get_bell(2).unwrap().kg().unwrap() > 200.0);
        assert!(tower.get_bell(9).is_none());
    }

    #[test]
    fn test_towers_do_not_share_bells() {
        let mut a = Tower::default();
        let b = Tower::default();
        a.add_bell(Bell::default());
        assert_eq!(a.bells.len(), 1);
        assert!(b.bells.is_empty());
    }

    #[test]
    fn test_add_by_weight_nominal() {
        let mut tower = Tower::default();
        tower.add_bells_by_weight_nominal(
            &[(Weight::from_pounds(300.0), 1200.0), (Weight::from_pounds(400.0), 1100.0)],
            5,
        );
        assert_eq!(tower.n_bells(), 2);
        assert_eq!(tower.get_bell(6).unwrap().nominal, Some(1100.0));
    }

    #[test]
    fn test_summary() {
        let tower = sample_tower();
        let summary = tower.summary();
        assert_eq!(summary.bells, 3);
        assert_eq!(summary.tenor.as_deref(), Some("10-2-24"));

        let rows = tower.bell_summaries();
        let order: Vec<Option<String>> = rows.iter().map(|r| r.n.clone()).collect();
        assert_eq!(
            order,
            [
                Some("1".to_string()),
                Some("2".to_string()),
                Some("2b".to_string()),
                Some("3".to_string()),
                Some("Sanctus".to_string()),
                Some("Extra".to_string()),
                None,
            ]
        );
    }
}
