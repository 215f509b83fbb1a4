//! Weather feature channels and the per-energy-type feature sets.

use serde::{Deserialize, Serialize};

use crate::energy::EnergyType;

/// Named channels of the gridded weather dataset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Feature {
    Height,
    Wnd100m,
    Roughness,
    InfluxToa,
    InfluxDirect,
    InfluxDiffuse,
    Albedo,
    Temperature,
    SoilTemperature,
    Runoff,
}

/// All channels, in the persisted column order of the regional dataset.
pub const ALL_FEATURES: [Feature; 10] = [
    Feature::Height,
    Feature::Wnd100m,
    Feature::Roughness,
    Feature::InfluxToa,
    Feature::InfluxDirect,
    Feature::InfluxDiffuse,
    Feature::Albedo,
    Feature::Temperature,
    Feature::SoilTemperature,
    Feature::Runoff,
];

const WIND_FEATURES: [Feature; 3] = [Feature::Height, Feature::Wnd100m, Feature::Roughness];
const SOLAR_FEATURES: [Feature; 4] = [
    Feature::InfluxToa,
    Feature::InfluxDirect,
    Feature::InfluxDiffuse,
    Feature::Temperature,
];
const RIVER_FEATURES: [Feature; 0] = [];

impl Feature {
    /// Position of this channel in [`ALL_FEATURES`] and in the persisted
    /// regional dataset.
    pub fn index(&self) -> usize {
        match self {
            Feature::Height => 0,
            Feature::Wnd100m => 1,
            Feature::Roughness => 2,
            Feature::InfluxToa => 3,
            Feature::InfluxDirect => 4,
            Feature::InfluxDiffuse => 5,
            Feature::Albedo => 6,
            Feature::Temperature => 7,
            Feature::SoilTemperature => 8,
            Feature::Runoff => 9,
        }
    }

    /// Column name in the weather datasets.
    pub fn column(&self) -> &'static str {
        match self {
            Feature::Height => "height",
            Feature::Wnd100m => "wnd100m",
            Feature::Roughness => "roughness",
            Feature::InfluxToa => "influx_toa",
            Feature::InfluxDirect => "influx_direct",
            Feature::InfluxDiffuse => "influx_diffuse",
            Feature::Albedo => "albedo",
            Feature::Temperature => "temperature",
            Feature::SoilTemperature => "soil_temperature",
            Feature::Runoff => "runoff",
        }
    }
}

/// The required weather channels for an energy type, in the order they are
/// stacked into the feature matrix. The order is part of the contract:
/// it determines which model importance corresponds to which physical
/// channel. Returns `None` only for the `NotDefined` sentinel.
pub fn feature_set(energy_type: EnergyType) -> Option<&'static [Feature]> {
    match energy_type {
        EnergyType::OffwindAc | EnergyType::OffwindDc | EnergyType::Onwind => Some(&WIND_FEATURES),
        EnergyType::Solar => Some(&SOLAR_FEATURES),
        EnergyType::Ror => Some(&RIVER_FEATURES),
        EnergyType::NotDefined => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_set_is_total_over_defined_types() {
        for et in [
            EnergyType::OffwindAc,
            EnergyType::OffwindDc,
            EnergyType::Onwind,
            EnergyType::Solar,
            EnergyType::Ror,
        ] {
            assert!(feature_set(et).is_some(), "no feature set for {et:?}");
        }
        assert!(feature_set(EnergyType::NotDefined).is_none());
    }

    #[test]
    fn wind_features_start_with_height() {
        let features = feature_set(EnergyType::Onwind).unwrap();
        assert_eq!(
            features,
            &[Feature::Height, Feature::Wnd100m, Feature::Roughness]
        );
    }

    #[test]
    fn solar_features_include_irradiance_and_temperature() {
        let features = feature_set(EnergyType::Solar).unwrap();
        assert_eq!(features.len(), 4);
        assert_eq!(features[3], Feature::Temperature);
    }

    #[test]
    fn ror_has_no_features() {
        assert!(feature_set(EnergyType::Ror).unwrap().is_empty());
    }
}
