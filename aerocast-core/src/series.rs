use std::{collections::HashMap, convert::TryFrom, fmt};

/// Values at or below this are the upstream "no data" fill value.
pub const MISSING_SENTINEL: f64 = -999.0;

/// Daily climate parameters requested from the upstream source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Variable {
    MaxTemperature,
    MinTemperature,
    Precipitation,
    MaxWindSpeed,
    RelativeHumidity,
    SolarIrradiance,
    SpecificHumidity,
}

impl Variable {
    /// Upstream parameter name, e.g. `T2M_MAX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Variable::MaxTemperature => "T2M_MAX",
            Variable::MinTemperature => "T2M_MIN",
            Variable::Precipitation => "PRECTOTCORR",
            Variable::MaxWindSpeed => "WS10M_MAX",
            Variable::RelativeHumidity => "RH2M",
            Variable::SolarIrradiance => "ALLSKY_SFC_SW_DWN",
            Variable::SpecificHumidity => "QV2M",
        }
    }

    /// Every parameter, in the order they are requested upstream.
    pub const fn all() -> &'static [Variable] {
        &[
            Variable::MaxTemperature,
            Variable::Precipitation,
            Variable::MaxWindSpeed,
            Variable::MinTemperature,
            Variable::RelativeHumidity,
            Variable::SolarIrradiance,
            Variable::SpecificHumidity,
        ]
    }

    /// Parameters the aggregator cannot work without.
    pub const fn required() -> &'static [Variable] {
        &[
            Variable::MaxTemperature,
            Variable::MinTemperature,
            Variable::Precipitation,
            Variable::MaxWindSpeed,
        ]
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Variable {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let upper = value.to_uppercase();

        Variable::all()
            .iter()
            .copied()
            .find(|v| v.as_str() == upper)
            .ok_or_else(|| anyhow::anyhow!("Unknown climate parameter '{value}'."))
    }
}

/// Read access to a multi-year daily series, independent of how it was delivered.
///
/// Implementations return `None` both for absent days and for sentinel values.
pub trait ClimateSeries {
    fn lookup(&self, variable: Variable, year: i32, month: u32, day: u32) -> Option<f64>;
}

/// Date key used by the upstream payload: `YYYYMMDD`.
pub fn date_key(year: i32, month: u32, day: u32) -> String {
    format!("{year}{month:02}{day:02}")
}

/// In-memory daily series: variable -> `YYYYMMDD` -> value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailySeries {
    values: HashMap<Variable, HashMap<String, f64>>,
}

impl DailySeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, variable: Variable, year: i32, month: u32, day: u32, value: f64) {
        self.insert_keyed(variable, date_key(year, month, day), value);
    }

    pub fn insert_keyed(&mut self, variable: Variable, key: String, value: f64) {
        self.values.entry(variable).or_default().insert(key, value);
    }

    /// Replace a whole column at once, as delivered by the upstream source.
    pub fn set_column(&mut self, variable: Variable, column: HashMap<String, f64>) {
        self.values.insert(variable, column);
    }

    pub fn has_variable(&self, variable: Variable) -> bool {
        self.values.contains_key(&variable)
    }

    /// Number of days recorded for a variable, sentinels included.
    pub fn len(&self, variable: Variable) -> usize {
        self.values.get(&variable).map_or(0, HashMap::len)
    }
}

impl ClimateSeries for DailySeries {
    fn lookup(&self, variable: Variable, year: i32, month: u32, day: u32) -> Option<f64> {
        self.values
            .get(&variable)?
            .get(&date_key(year, month, day))
            .copied()
            .filter(|v| *v > MISSING_SENTINEL)
    }
}
