//! Renewable energy source categories and the region naming scheme shared
//! by the aggregation and forecasting stages.

use serde::{Deserialize, Serialize};

/// Renewable energy source categories as they appear in capacity-factor
/// column suffixes. `NotDefined` is the explicit sentinel for an
/// unrecognized suffix; `Ror` (run-of-river) is recognized but carries no
/// weather features and is always skipped by the forecaster.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EnergyType {
    OffwindAc,
    OffwindDc,
    Onwind,
    Solar,
    Ror,
    NotDefined,
}

/// Whether a region polygon belongs to the onshore or offshore collection.
/// The two sets are disjoint namespaces disambiguated by a name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shore {
    On,
    Off,
}

impl Shore {
    /// Suffix appended to region names so that onshore and offshore
    /// regions with the same base name never collide.
    pub fn suffix(&self) -> &'static str {
        match self {
            Shore::On => " on",
            Shore::Off => " off",
        }
    }
}

impl EnergyType {
    /// Parse a capacity-factor column suffix. Both `onwind` and
    /// `onwind-dc` label onshore wind in circulating datasets, so both
    /// are accepted.
    pub fn from_suffix(name: &str) -> EnergyType {
        match name {
            "offwind-ac" => EnergyType::OffwindAc,
            "offwind-dc" => EnergyType::OffwindDc,
            "onwind" | "onwind-dc" => EnergyType::Onwind,
            "solar" => EnergyType::Solar,
            "ror" => EnergyType::Ror,
            _ => EnergyType::NotDefined,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EnergyType::OffwindAc => "offwind-ac",
            EnergyType::OffwindDc => "offwind-dc",
            EnergyType::Onwind => "onwind",
            EnergyType::Solar => "solar",
            EnergyType::Ror => "ror",
            EnergyType::NotDefined => "not-defined",
        }
    }

    /// Which shore collection the weather covariates for this energy type
    /// come from. `NotDefined` has no shore; usable columns never reach
    /// that branch.
    pub fn shore(&self) -> Option<Shore> {
        match self {
            EnergyType::Onwind | EnergyType::Solar | EnergyType::Ror => Some(Shore::On),
            EnergyType::OffwindAc | EnergyType::OffwindDc => Some(Shore::Off),
            EnergyType::NotDefined => None,
        }
    }

    /// True for energy types the forecaster trains models for. Run-of-river
    /// has no weather features and unrecognized types cannot be resolved.
    pub fn is_forecastable(&self) -> bool {
        !matches!(self, EnergyType::Ror | EnergyType::NotDefined)
    }
}

/// Lookup key into the regional weather dataset for a region/energy-type
/// pair: region name + `" 0"` + shore suffix. This is a compatibility
/// contract with the aggregator's region naming and must match exactly.
pub fn region_key(region_name: &str, energy_type: EnergyType) -> String {
    let mut key = format!("{region_name} 0");
    if let Some(shore) = energy_type.shore() {
        key.push_str(shore.suffix());
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_parsing_covers_known_types() {
        assert_eq!(EnergyType::from_suffix("offwind-ac"), EnergyType::OffwindAc);
        assert_eq!(EnergyType::from_suffix("offwind-dc"), EnergyType::OffwindDc);
        assert_eq!(EnergyType::from_suffix("onwind"), EnergyType::Onwind);
        assert_eq!(EnergyType::from_suffix("onwind-dc"), EnergyType::Onwind);
        assert_eq!(EnergyType::from_suffix("solar"), EnergyType::Solar);
        assert_eq!(EnergyType::from_suffix("ror"), EnergyType::Ror);
        assert_eq!(EnergyType::from_suffix("coal"), EnergyType::NotDefined);
    }

    #[test]
    fn region_key_uses_shore_suffix() {
        assert_eq!(region_key("DE0", EnergyType::OffwindAc), "DE0 0 off");
        assert_eq!(region_key("DE0", EnergyType::OffwindDc), "DE0 0 off");
        assert_eq!(region_key("DE0", EnergyType::Onwind), "DE0 0 on");
        assert_eq!(region_key("DE0", EnergyType::Solar), "DE0 0 on");
        assert_eq!(region_key("DE0", EnergyType::Ror), "DE0 0 on");
        assert_eq!(region_key("DE0", EnergyType::NotDefined), "DE0 0");
    }

    #[test]
    fn forecastable_excludes_ror_and_sentinel() {
        assert!(EnergyType::Onwind.is_forecastable());
        assert!(EnergyType::Solar.is_forecastable());
        assert!(!EnergyType::Ror.is_forecastable());
        assert!(!EnergyType::NotDefined.is_forecastable());
    }
}
