//! Ideal-gas composition of humidified gas mixtures.
//!
//! Concentrations are mmol/L, pressures mmHg, temperatures degC.

use ex_core::{GAS_CONSTANT, kelvin_from_celsius};
use serde::{Deserialize, Serialize};

use crate::error::{ChemError, ChemResult};

/// Dry-gas reference fractions used to rebalance nitrogen.
const FO2_DRY: f64 = 0.205;
const FCO2_DRY: f64 = 0.000392;
const FN2_DRY: f64 = 0.794608;
const FOTHER_DRY: f64 = 0.0;

/// One value per gas species.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GasSpecies {
    pub h2o: f64,
    pub o2: f64,
    pub co2: f64,
    pub n2: f64,
    pub other: f64,
}

impl GasSpecies {
    pub fn total(&self) -> f64 {
        self.h2o + self.o2 + self.co2 + self.n2 + self.other
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            h2o: f(self.h2o),
            o2: f(self.o2),
            co2: f(self.co2),
            n2: f(self.n2),
            other: f(self.other),
        }
    }
}

/// Concentrations, partial pressures and fractions of a mixture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GasMixture {
    pub ctotal: f64,
    pub concentration: GasSpecies,
    pub partial_pressure: GasSpecies,
    pub fraction: GasSpecies,
}

impl GasMixture {
    /// Derive fractions and partial pressures from concentrations.
    ///
    /// Returns `None` for an empty mixture.
    pub fn from_concentrations(concentration: GasSpecies, pressure: f64) -> Option<Self> {
        let ctotal = concentration.total();
        if ctotal == 0.0 {
            return None;
        }
        let fraction = concentration.map(|c| c / ctotal);
        Some(Self {
            ctotal,
            concentration,
            partial_pressure: fraction.map(|f| f * pressure),
            fraction,
        })
    }
}

/// Inspired gas settings used to fill a compartment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InspiredGas {
    /// Dry O2 fraction
    pub fio2: f64,
    /// Dry CO2 fraction
    pub fico2: f64,
    /// degC
    pub temp: f64,
    /// Relative humidity (0..1)
    pub humidity: f64,
}

impl Default for InspiredGas {
    fn default() -> Self {
        Self {
            fio2: FO2_DRY,
            fico2: FCO2_DRY,
            temp: 37.0,
            humidity: 1.0,
        }
    }
}

/// Saturated water vapour pressure (mmHg) at `temp` degC.
pub fn saturated_vapour_pressure(temp: f64) -> f64 {
    (20.386 - 5132.0 / (temp + 273.0)).exp()
}

/// Total gas concentration (mmol/L) at a pressure and temperature.
pub fn total_concentration(pressure: f64, temp: f64) -> f64 {
    pressure / (GAS_CONSTANT * kelvin_from_celsius(temp)) * 1000.0
}

/// Compose a humidified mixture at `pressure` from dry inspired fractions.
///
/// Nitrogen and other gases take the dry balance left by O2 and CO2 in the
/// proportions of room air.
pub fn compose(pressure: f64, inspired: &InspiredGas) -> ChemResult<GasMixture> {
    if !(pressure > 0.0) || !pressure.is_finite() {
        return Err(ChemError::InvalidArg {
            what: "gas pressure must be positive",
        });
    }
    let balance = (1.0 - (inspired.fio2 + inspired.fico2)) / (1.0 - (FO2_DRY + FCO2_DRY));
    let dry = GasSpecies {
        h2o: 0.0,
        o2: inspired.fio2,
        co2: inspired.fico2,
        n2: FN2_DRY * balance,
        other: FOTHER_DRY * balance,
    };

    let ctotal = total_concentration(pressure, inspired.temp);
    let ph2o = saturated_vapour_pressure(inspired.temp) * inspired.humidity;
    let partial_pressure = GasSpecies {
        h2o: ph2o,
        ..dry.map(|f| f * (pressure - ph2o))
    };
    let fraction = partial_pressure.map(|p| p / pressure);

    Ok(GasMixture {
        ctotal,
        concentration: fraction.map(|f| f * ctotal),
        partial_pressure,
        fraction,
    })
}
