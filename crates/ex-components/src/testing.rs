//! In-memory network and fixtures for unit tests.

use ex_chem::acid_base::{AcidBaseConstants, balancing_sid, total_co2};
use ex_chem::oxygen::{DEFAULT_DPG, oxygen_content, saturation};

use crate::blood::BloodContent;
use crate::error::ComponentResult;
use crate::model::Model;
use crate::traits::{Behavior, Network, StepContext};

pub struct TestNetwork {
    models: Vec<(String, Model)>,
}

impl TestNetwork {
    pub fn new(models: Vec<(&str, Model)>) -> Self {
        Self {
            models: models
                .into_iter()
                .map(|(name, model)| (name.to_string(), model))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Model> {
        self.model(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Model> {
        self.model_mut(name)
    }

    /// Step one component that is not part of the network.
    pub fn step<B: Behavior + ?Sized>(&mut self, component: &mut B, dt: f64) -> ComponentResult<()> {
        let mut ctx = StepContext {
            dt,
            time: 0.0,
            network: self,
        };
        component.step(&mut ctx)
    }

    fn index(&self, name: &str) -> Option<usize> {
        self.models.iter().position(|(n, _)| n == name)
    }
}

impl Network for TestNetwork {
    fn model(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }

    fn model_mut(&mut self, name: &str) -> Option<&mut Model> {
        self.models
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, m)| m)
    }

    fn pair_mut(&mut self, first: &str, second: &str) -> Option<(&mut Model, &mut Model)> {
        let (i, j) = (self.index(first)?, self.index(second)?);
        if i == j {
            return None;
        }
        let (lo, hi) = (i.min(j), i.max(j));
        let (left, right) = self.models.split_at_mut(hi);
        let (a, b) = (&mut left[lo].1, &mut right[0].1);
        Some(if i < j { (a, b) } else { (b, a) })
    }
}

/// Blood whose solved composition is the given pH, pCO2 and pO2.
pub fn blood_at(ph: f64, pco2: f64, po2: f64) -> BloodContent {
    let k = AcidBaseConstants::default();
    let mut blood = BloodContent {
        tco2: total_co2(ph, pco2, &k),
        ..BloodContent::default()
    };
    blood
        .solutes
        .insert("na".into(), balancing_sid(ph, pco2, 25.0, 1.64, 3.0, &k));
    blood.solutes.insert("albumin".into(), 25.0);
    blood.solutes.insert("phosphates".into(), 1.64);
    blood.solutes.insert("uma".into(), 3.0);
    blood.solutes.insert("hemoglobin".into(), 8.0);
    let so2 = saturation(po2, 37.0, ph, 0.0, DEFAULT_DPG);
    blood.to2 = oxygen_content(po2, so2, 8.0, 37.0);
    blood
}
