//! Gas-filled compartments.
//!
//! Gas content is carried as per-species concentrations (mmol/L). Each step
//! warms the gas toward its target temperature, evaporates water toward
//! saturation and refreshes partial pressures and fractions. Fixed-composition
//! compartments act as infinite reservoirs and ignore volume transfers.

use ex_chem::gas::{GasMixture, GasSpecies, InspiredGas, compose, saturated_vapour_pressure};
use ex_core::{ATMOSPHERIC_PRESSURE, GAS_CONSTANT, kelvin_from_celsius};
use serde::Serialize;

use crate::capacitance::{Capacitance, volume_function};
use crate::common::{add_amount, blend, withdraw};
use crate::error::{ComponentError, ComponentResult};
use crate::factors::Scaling;
use crate::property::{Properties, PropertyValue, boolean, chain_set, number};
use crate::traits::{Behavior, Compartment, StepContext};

const GAS_SOURCES: [(&str, Scaling); 3] = [
    ("resp", Scaling::Unit),
    ("ans", Scaling::Activity),
    ("drug", Scaling::Unit),
];

/// Fraction of the temperature gap closed per step.
const HEAT_TRANSFER_RATE: f64 = 0.0005;

/// Evaporation rate (mmol per mmHg of vapour deficit per second).
const EVAPORATION_RATE: f64 = 0.00001;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GasContent {
    /// Total gas concentration (mmol/L)
    pub ctotal: f64,
    pub co2: f64,
    pub cco2: f64,
    pub cn2: f64,
    pub ch2o: f64,
    pub cother: f64,
    pub po2: f64,
    pub pco2: f64,
    pub pn2: f64,
    pub ph2o: f64,
    pub pother: f64,
    pub fo2: f64,
    pub fco2: f64,
    pub fn2: f64,
    pub fh2o: f64,
    pub fother: f64,
    /// degC
    pub temp: f64,
    pub target_temp: f64,
    /// Relative humidity (0..1)
    pub humidity: f64,
    pub pres_atm: f64,
    /// Pressure relative to atmosphere (mmHg)
    pub pres_rel: f64,
    pub fixed_composition: bool,
}

impl Default for GasContent {
    fn default() -> Self {
        Self {
            ctotal: 0.0,
            co2: 0.0,
            cco2: 0.0,
            cn2: 0.0,
            ch2o: 0.0,
            cother: 0.0,
            po2: 0.0,
            pco2: 0.0,
            pn2: 0.0,
            ph2o: 0.0,
            pother: 0.0,
            fo2: 0.0,
            fco2: 0.0,
            fn2: 0.0,
            fh2o: 0.0,
            fother: 0.0,
            temp: 0.0,
            target_temp: 0.0,
            humidity: 0.0,
            pres_atm: ATMOSPHERIC_PRESSURE,
            pres_rel: 0.0,
            fixed_composition: false,
        }
    }
}

impl GasContent {
    pub fn concentrations(&self) -> GasSpecies {
        GasSpecies {
            h2o: self.ch2o,
            o2: self.co2,
            co2: self.cco2,
            n2: self.cn2,
            other: self.cother,
        }
    }

    pub fn apply_mixture(&mut self, mix: &GasMixture) {
        self.ctotal = mix.ctotal;
        let c = mix.concentration;
        (self.ch2o, self.co2, self.cco2, self.cn2, self.cother) = (c.h2o, c.o2, c.co2, c.n2, c.other);
        let p = mix.partial_pressure;
        (self.ph2o, self.po2, self.pco2, self.pn2, self.pother) = (p.h2o, p.o2, p.co2, p.n2, p.other);
        let f = mix.fraction;
        (self.fh2o, self.fo2, self.fco2, self.fn2, self.fother) = (f.h2o, f.o2, f.co2, f.n2, f.other);
    }

    /// Refresh partial pressures and fractions from the concentrations.
    ///
    /// An empty mixture keeps its previous values.
    pub fn update_partial_pressures(&mut self, pres: f64) {
        if let Some(mix) = GasMixture::from_concentrations(self.concentrations(), pres) {
            self.apply_mixture(&mix);
        }
    }

    pub fn blend_from(&mut self, source: &GasContent, dvol: f64, vol: f64) {
        self.co2 = blend(self.co2, source.co2, dvol, vol);
        self.cco2 = blend(self.cco2, source.cco2, dvol, vol);
        self.cn2 = blend(self.cn2, source.cn2, dvol, vol);
        self.ch2o = blend(self.ch2o, source.ch2o, dvol, vol);
        self.cother = blend(self.cother, source.cother, dvol, vol);
        self.temp = blend(self.temp, source.temp, dvol, vol);
    }

    fn field(&self, key: &str) -> Option<PropertyValue> {
        let v = match key {
            "ctotal" => self.ctotal,
            "co2" => self.co2,
            "cco2" => self.cco2,
            "cn2" => self.cn2,
            "ch2o" => self.ch2o,
            "cother" => self.cother,
            "po2" => self.po2,
            "pco2" => self.pco2,
            "pn2" => self.pn2,
            "ph2o" => self.ph2o,
            "pother" => self.pother,
            "fo2" => self.fo2,
            "fco2" => self.fco2,
            "fn2" => self.fn2,
            "fh2o" => self.fh2o,
            "fother" => self.fother,
            "temp" => self.temp,
            "target_temp" => self.target_temp,
            "humidity" => self.humidity,
            "pres_atm" => self.pres_atm,
            "pres_rel" => self.pres_rel,
            "fixed_composition" => return Some(PropertyValue::Bool(self.fixed_composition)),
            _ => return None,
        };
        Some(PropertyValue::Number(v))
    }

    fn field_mut(&mut self, key: &str) -> Option<&mut f64> {
        Some(match key {
            "ctotal" => &mut self.ctotal,
            "co2" => &mut self.co2,
            "cco2" => &mut self.cco2,
            "cn2" => &mut self.cn2,
            "ch2o" => &mut self.ch2o,
            "cother" => &mut self.cother,
            "po2" => &mut self.po2,
            "pco2" => &mut self.pco2,
            "pn2" => &mut self.pn2,
            "ph2o" => &mut self.ph2o,
            "pother" => &mut self.pother,
            "fo2" => &mut self.fo2,
            "fco2" => &mut self.fco2,
            "fn2" => &mut self.fn2,
            "fh2o" => &mut self.fh2o,
            "fother" => &mut self.fother,
            "temp" => &mut self.temp,
            "target_temp" => &mut self.target_temp,
            "humidity" => &mut self.humidity,
            "pres_atm" => &mut self.pres_atm,
            "pres_rel" => &mut self.pres_rel,
            _ => return None,
        })
    }
}

impl Properties for GasContent {
    fn property(&self, key: &str, sub: Option<&str>) -> Option<PropertyValue> {
        if sub.is_some() {
            return None;
        }
        self.field(key)
    }

    fn set_property(
        &mut self,
        key: &str,
        sub: Option<&str>,
        value: &PropertyValue,
    ) -> ComponentResult<()> {
        if sub.is_some() {
            return Err(ComponentError::unknown(key));
        }
        if key == "fixed_composition" {
            self.fixed_composition = boolean(key, value)?;
            return Ok(());
        }
        match self.field_mut(key) {
            Some(slot) => {
                *slot = number(key, value)?;
                Ok(())
            }
            None => Err(ComponentError::unknown(key)),
        }
    }
}

/// Elastic gas space (airway, alveolus, ventilator circuit, ambient air).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GasCapacitance {
    #[serde(flatten)]
    pub space: Capacitance,
    #[serde(flatten)]
    pub gas: GasContent,
}

impl Default for GasCapacitance {
    fn default() -> Self {
        Self {
            space: Capacitance::with_sources(&GAS_SOURCES),
            gas: GasContent::default(),
        }
    }
}

impl GasCapacitance {
    /// Elastic pressure plus atmosphere.
    pub fn update_pressure(&mut self) {
        self.space.update_elastances();
        self.space.update_pressure();
        self.space.pres += self.gas.pres_atm;
        self.gas.pres_rel = self.space.pres - self.gas.pres_atm;
    }

    /// Move toward the target temperature; the gas expands or contracts
    /// with it.
    pub fn add_heat(&mut self) {
        let d_temp = (self.gas.target_temp - self.gas.temp) * HEAT_TRANSFER_RATE;
        self.gas.temp += d_temp;
        let pres = self.space.pres;
        if pres != 0.0 && !self.gas.fixed_composition {
            let dvol = self.gas.ctotal * self.space.vol * GAS_CONSTANT * d_temp / pres;
            self.space.vol += dvol / 1000.0;
        }
        if self.space.vol < 0.0 {
            self.space.vol = 0.0;
        }
    }

    /// Evaporate water toward the saturated vapour pressure.
    pub fn add_water_vapour(&mut self, dt: f64) {
        let ph2o_sat = saturated_vapour_pressure(self.gas.temp);
        let dh2o = EVAPORATION_RATE * (ph2o_sat - self.gas.ph2o) * dt;
        self.gas.ch2o = add_amount(self.gas.ch2o, dh2o, self.space.vol);
        let pres = self.space.pres;
        if pres != 0.0 && !self.gas.fixed_composition {
            self.space.vol +=
                GAS_CONSTANT * kelvin_from_celsius(self.gas.temp) / pres * (dh2o / 1000.0);
        }
    }

    /// Fill the compartment with humidified gas at its current pressure.
    pub fn set_composition(&mut self, inspired: &InspiredGas) -> ComponentResult<()> {
        self.update_pressure();
        let mix = compose(self.space.pres, inspired)?;
        self.gas.apply_mixture(&mix);
        Ok(())
    }
}

impl Properties for GasCapacitance {
    fn property(&self, key: &str, sub: Option<&str>) -> Option<PropertyValue> {
        self.space
            .property(key, sub)
            .or_else(|| self.gas.property(key, sub))
    }

    fn set_property(
        &mut self,
        key: &str,
        sub: Option<&str>,
        value: &PropertyValue,
    ) -> ComponentResult<()> {
        chain_set(self.space.set_property(key, sub, value), || {
            self.gas.set_property(key, sub, value)
        })
    }
}

impl Behavior for GasCapacitance {
    fn step(&mut self, ctx: &mut StepContext<'_>) -> ComponentResult<()> {
        self.update_pressure();
        self.add_heat();
        self.add_water_vapour(ctx.dt);
        self.gas.update_partial_pressures(self.space.pres);
        Ok(())
    }

    fn call(&mut self, function: &str, args: &[PropertyValue]) -> ComponentResult<()> {
        match function {
            "set_gas_composition" => {
                let defaults = InspiredGas::default();
                let arg = |i: usize, default: f64| -> ComponentResult<f64> {
                    args.get(i).map_or(Ok(default), |v| number(function, v))
                };
                let inspired = InspiredGas {
                    fio2: arg(0, defaults.fio2)?,
                    temp: arg(1, defaults.temp)?,
                    humidity: arg(2, defaults.humidity)?,
                    fico2: arg(3, defaults.fico2)?,
                };
                self.set_composition(&inspired)
            }
            _ => volume_function(self, function, args),
        }
    }
}

impl Compartment for GasCapacitance {
    fn volume(&self) -> f64 {
        self.space.vol
    }

    fn pressure(&self) -> f64 {
        self.space.pres
    }

    fn volume_in(&mut self, dvol: f64, source: &dyn Compartment) {
        if self.gas.fixed_composition {
            return;
        }
        self.space.vol += dvol;
        if self.space.vol > 0.0 {
            if let Some(src) = source.gas() {
                self.gas.blend_from(src, dvol, self.space.vol);
            }
        }
    }

    fn volume_out(&mut self, dvol: f64) -> f64 {
        if self.gas.fixed_composition {
            return 0.0;
        }
        withdraw(&mut self.space.vol, dvol)
    }

    fn add_external_pressure(&mut self, pres: f64) {
        self.space.pres_ext += pres;
    }

    fn gas(&self) -> Option<&GasContent> {
        Some(&self.gas)
    }

    fn gas_mut(&mut self) -> Option<&mut GasContent> {
        Some(&mut self.gas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alveolus() -> GasCapacitance {
        let mut g = GasCapacitance::default();
        g.space.vol = 0.1;
        g.space.u_vol = 0.05;
        g.space.el_base = 1000.0;
        g.gas.temp = 37.0;
        g.gas.target_temp = 37.0;
        g.call("set_gas_composition", &[]).unwrap();
        g
    }

    #[test]
    fn pressure_is_absolute() {
        let g = alveolus();
        assert!((g.space.pres - (760.0 + 50.0)).abs() < 1e-9);
        assert!((g.gas.pres_rel - 50.0).abs() < 1e-9);
    }

    #[test]
    fn composition_sums_to_pressure() {
        let g = alveolus();
        let partials = g.gas.po2 + g.gas.pco2 + g.gas.pn2 + g.gas.ph2o + g.gas.pother;
        assert!((partials - g.space.pres).abs() < 1e-9);
        let fractions = g.gas.fo2 + g.gas.fco2 + g.gas.fn2 + g.gas.fh2o + g.gas.fother;
        assert!((fractions - 1.0).abs() < 1e-12);
    }

    #[test]
    fn custom_fio2() {
        let mut g = alveolus();
        g.call("set_gas_composition", &[0.6.into(), 37.0.into(), 0.0.into()]).unwrap();
        assert!(g.gas.ph2o.abs() < 1e-12);
        assert!((g.gas.fo2 - 0.6).abs() < 1e-9);
    }

    #[test]
    fn warming_expands_gas() {
        let mut g = alveolus();
        g.gas.target_temp = 40.0;
        let vol = g.space.vol;
        g.add_heat();
        assert!(g.gas.temp > 37.0);
        assert!(g.space.vol > vol);
    }

    #[test]
    fn fixed_composition_ignores_transfers() {
        let mut air = alveolus();
        air.gas.fixed_composition = true;
        let other = alveolus();
        let vol = air.space.vol;
        assert_eq!(air.volume_out(0.05), 0.0);
        air.volume_in(0.05, &other);
        assert_eq!(air.space.vol, vol);
    }

    #[test]
    fn inflow_mixes_species_and_temperature() {
        let mut dest = alveolus();
        let mut source = alveolus();
        source.gas.co2 = dest.gas.co2 * 2.0;
        source.gas.temp = 20.0;
        let before = dest.gas.co2;
        dest.volume_in(0.1, &source);
        assert!(dest.gas.co2 > before);
        assert!(dest.gas.temp < 37.0);
    }

    #[test]
    fn step_runs_in_order() {
        let mut g = alveolus();
        let mut net = crate::testing::TestNetwork::new(vec![]);
        net.step(&mut g, 0.0005).unwrap();
        assert!(g.gas.fh2o > 0.0);
        assert!(g.space.pres > 760.0);
    }
}
