//! Additive influence factors on baseline parameters.
//!
//! A parameter's effective value is its baseline plus one linear term per
//! factor: `base + Σ (value - 1) * base * weight`. Factors are not compounded.
//! Each factor is addressable by name (`el_base_ans_factor`), defaults to 1.0
//! and so contributes nothing until another subsystem changes it.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Which runtime weight multiplies a factor's contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scaling {
    Unit,
    /// Autonomic activity (`ans_activity_factor`)
    Activity,
    /// Component sensitivity
    Sensitivity,
    ActivitySensitivity,
}

/// Runtime weights resolved once per step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorWeights {
    pub activity: f64,
    pub sensitivity: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            activity: 1.0,
            sensitivity: 1.0,
        }
    }
}

impl FactorWeights {
    pub fn activity(activity: f64) -> Self {
        Self {
            activity,
            ..Self::default()
        }
    }

    fn weight(&self, scaling: Scaling) -> f64 {
        match scaling {
            Scaling::Unit => 1.0,
            Scaling::Activity => self.activity,
            Scaling::Sensitivity => self.sensitivity,
            Scaling::ActivitySensitivity => self.activity * self.sensitivity,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    pub name: String,
    pub value: f64,
    pub scaling: Scaling,
}

/// Ordered list of factors acting on one parameter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FactorSet {
    factors: Vec<Factor>,
}

impl FactorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// `<param>_factor` plus one `<param>_<source>_factor` per source.
    pub fn standard(param: &str, sources: &[(&str, Scaling)]) -> Self {
        let mut set = Self::new().with(format!("{param}_factor"), Scaling::Unit);
        for (source, scaling) in sources {
            set = set.with(format!("{param}_{source}_factor"), *scaling);
        }
        set
    }

    pub fn with(mut self, name: impl Into<String>, scaling: Scaling) -> Self {
        self.factors.push(Factor {
            name: name.into(),
            value: 1.0,
            scaling,
        });
        self
    }

    /// Effective value of `base` under this set.
    pub fn apply(&self, base: f64, weights: FactorWeights) -> f64 {
        self.factors.iter().fold(base, |acc, f| {
            acc + (f.value - 1.0) * base * weights.weight(f.scaling)
        })
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.factors.iter().find(|f| f.name == name).map(|f| f.value)
    }

    /// Set a factor by name. Returns false if this set has no such factor.
    pub fn set(&mut self, name: &str, value: f64) -> bool {
        match self.factors.iter_mut().find(|f| f.name == name) {
            Some(f) => {
                f.value = value;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Factor> {
        self.factors.iter()
    }
}

impl Serialize for FactorSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.factors.len()))?;
        for f in &self.factors {
            map.serialize_entry(&f.name, &f.value)?;
        }
        map.end()
    }
}

/// Look a factor up across several sets.
pub(crate) fn get_factor(sets: &[&FactorSet], name: &str) -> Option<f64> {
    sets.iter().find_map(|s| s.get(name))
}

/// Set a factor in every set that carries it. Returns false if none did.
pub(crate) fn set_factor(sets: &mut [&mut FactorSet], name: &str, value: f64) -> bool {
    let mut found = false;
    for set in sets.iter_mut() {
        found |= set.set(name, value);
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_base_untouched() {
        let set = FactorSet::standard("el_base", &[("circ", Scaling::Unit), ("ans", Scaling::Activity)]);
        assert_eq!(set.apply(1500.0, FactorWeights::default()), 1500.0);
    }

    #[test]
    fn factors_add_not_compound() {
        let mut set = FactorSet::standard("el_base", &[("circ", Scaling::Unit)]);
        assert!(set.set("el_base_factor", 2.0));
        assert!(set.set("el_base_circ_factor", 2.0));
        // 1 + 1 + 1, not 1 * 2 * 2
        assert_eq!(set.apply(1.0, FactorWeights::default()), 3.0);
    }

    #[test]
    fn activity_weights_only_activity_factors() {
        let mut set = FactorSet::standard("u_vol", &[("ans", Scaling::Activity)]);
        set.set("u_vol_ans_factor", 1.5);
        set.set("u_vol_factor", 1.5);
        let w = FactorWeights::activity(0.5);
        // 2 + 0.5*2*1 + 0.5*2*0.5
        assert_eq!(set.apply(2.0, w), 3.5);
    }

    #[test]
    fn sensitivity_scaling() {
        let mut set = FactorSet::new()
            .with("r_factor", Scaling::Unit)
            .with("r_ans_factor", Scaling::ActivitySensitivity);
        set.set("r_ans_factor", 2.0);
        let w = FactorWeights {
            activity: 0.5,
            sensitivity: 0.2,
        };
        assert!((set.apply(100.0, w) - 110.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_factor_is_reported() {
        let mut set = FactorSet::standard("el_k", &[]);
        assert!(!set.set("el_k_drug_factor", 2.0));
        assert_eq!(set.get("el_k_factor"), Some(1.0));
    }

    #[test]
    fn shared_factor_updates_every_set() {
        let mut a = FactorSet::new().with("r_mob_factor", Scaling::Sensitivity);
        let mut b = FactorSet::new()
            .with("r_k_factor", Scaling::Unit)
            .with("r_mob_factor", Scaling::Sensitivity);
        assert!(set_factor(&mut [&mut a, &mut b], "r_mob_factor", 3.0));
        assert_eq!(a.get("r_mob_factor"), Some(3.0));
        assert_eq!(b.get("r_mob_factor"), Some(3.0));
        assert_eq!(get_factor(&[&a, &b], "r_k_factor"), Some(1.0));
    }
}
