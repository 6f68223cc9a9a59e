// ex-core/src/units.rs
//
// The kernel computes in clinical units (mmHg, L, mmol/L, degrees Celsius) as
// plain `Real`s. These helpers bridge to uom SI types where a conversion is
// actually needed.

use uom::si::f64::ThermodynamicTemperature as UomThermodynamicTemperature;

pub type Temperature = UomThermodynamicTemperature;

/// Ideal gas constant in L·mmHg/(mol·K).
pub const GAS_CONSTANT: f64 = 62.36367;

/// Standard atmospheric pressure in mmHg.
pub const ATMOSPHERIC_PRESSURE: f64 = 760.0;

#[inline]
pub fn celsius(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::degree_celsius;
    Temperature::new::<degree_celsius>(v)
}

/// Absolute temperature in kelvin for a Celsius reading.
#[inline]
pub fn kelvin_from_celsius(v: f64) -> f64 {
    use uom::si::thermodynamic_temperature::kelvin;
    celsius(v).get::<kelvin>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_temperature_in_kelvin() {
        assert!((kelvin_from_celsius(37.0) - 310.15).abs() < 1e-9);
    }

    #[test]
    fn freezing_point() {
        assert!((kelvin_from_celsius(0.0) - 273.15).abs() < 1e-9);
    }
}
