//! NTC thermistor temperature from a voltage-divider reading.
//!
//! The thermistor is the low side of a divider fed by `supply_voltage`
//! through `series_resistance`; the converter measures the voltage across
//! the thermistor.

const KELVIN: f64 = 273.15;

/// Divider and thermistor constants.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct Thermistor {
    /// Fixed resistor between supply and the measured node (Ω)
    pub series_resistance: f64,
    /// Divider supply (V)
    pub supply_voltage: f64,
    /// Beta coefficient (K)
    pub beta: f64,
    /// Temperature at which the thermistor measures `nominal_resistance` (°C)
    pub nominal_temperature: f64,
    /// Thermistor resistance at `nominal_temperature` (Ω)
    pub nominal_resistance: f64,
}

impl Default for Thermistor {
    fn default() -> Self {
        Self {
            series_resistance: 10_040.0,
            supply_voltage: 3.34,
            beta: 3950.0,
            nominal_temperature: 23.0,
            nominal_resistance: 9500.0,
        }
    }
}

impl Thermistor {
    /// Thermistor resistance for a measured voltage, or `None` outside
    /// the open interval `(0, supply_voltage)`.
    pub fn resistance(&self, voltage: f64) -> Option<f64> {
        if !(voltage > 0.0 && voltage < self.supply_voltage) {
            return None;
        }

        Some(voltage * self.series_resistance / (self.supply_voltage - voltage))
    }

    /// Temperature in °C, using the beta form of the Steinhart-Hart
    /// equation.
    pub fn celsius(&self, voltage: f64) -> Option<f64> {
        let resistance = self.resistance(voltage)?;
        let inverse = (resistance / self.nominal_resistance).ln() / self.beta
            + 1.0 / (self.nominal_temperature + KELVIN);

        Some(1.0 / inverse - KELVIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nominal_resistance_gives_nominal_temperature() {
        let thermistor = Thermistor::default();
        // divider voltage at which the thermistor measures 9500 Ω
        let voltage = 9500.0 * 3.34 / (10_040.0 + 9500.0);

        let celsius = thermistor.celsius(voltage).unwrap();
        assert!((celsius - 23.0).abs() < 1e-9, "{celsius}");
    }

    #[test]
    fn warmer_means_lower_voltage() {
        let thermistor = Thermistor::default();

        let cold = thermistor.celsius(2.0).unwrap();
        let warm = thermistor.celsius(1.2).unwrap();
        assert!(warm > cold);
        assert_eq!(format!("{:.1}", thermistor.celsius(1.67).unwrap()), "21.8");
    }

    #[test]
    fn out_of_range() {
        let thermistor = Thermistor::default();

        assert_eq!(thermistor.celsius(0.0), None);
        assert_eq!(thermistor.celsius(3.34), None);
        assert_eq!(thermistor.celsius(5.0), None);
        assert_eq!(thermistor.celsius(f64::NAN), None);
    }
}
