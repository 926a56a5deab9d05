//! Semantic labels carried by ports.
//!
//! Values in the buffer are plain `f64`; the load type and unit are what the
//! connection resolver checks before allowing an output to feed an input.

use core::fmt;

/// What physical quantity a port carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LoadType {
    /// Wildcard accepted on either side of a connection.
    Any,
    Electricity,
    Irradiance,
    Speed,
    Heating,
    Cooling,
    Volume,
    Temperature,
    Time,
    Gas,
    Hydrogen,
    Oxygen,
    Water,
    WarmWater,
    Oil,
    DistrictHeating,
    Price,
    /// 0 means off and 1 means on.
    OnOff,
    Activation,
}

impl LoadType {
    pub fn as_str(self) -> &'static str {
        match self {
            LoadType::Any => "Any",
            LoadType::Electricity => "Electricity",
            LoadType::Irradiance => "Irradiance",
            LoadType::Speed => "Speed",
            LoadType::Heating => "Heating",
            LoadType::Cooling => "Cooling",
            LoadType::Volume => "Volume",
            LoadType::Temperature => "Temperature",
            LoadType::Time => "Time",
            LoadType::Gas => "Gas",
            LoadType::Hydrogen => "Hydrogen",
            LoadType::Oxygen => "Oxygen",
            LoadType::Water => "Water",
            LoadType::WarmWater => "WarmWater",
            LoadType::Oil => "Oil",
            LoadType::DistrictHeating => "DistrictHeating",
            LoadType::Price => "Price",
            LoadType::OnOff => "OnOff",
            LoadType::Activation => "Activation",
        }
    }
}

impl fmt::Display for LoadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit of the scalar stored for a port.
///
/// SI without multipliers, except where the energy-system convention is
/// kilo-based (kW, kWh, kg).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Unit {
    /// Wildcard accepted on either side of a connection.
    Any,
    Percent,
    Watt,
    Kilowatt,
    KwhPerTimestep,
    WattPerSquareMeter,
    WattHourPerSquareMeter,
    MeterPerSecond,
    WattHour,
    Kwh,
    Liter,
    LiterPerTimestep,
    Kg,
    KgPerSec,
    Celsius,
    Kelvin,
    Degrees,
    Seconds,
    Timesteps,
    CentsPerKwh,
    Binary,
}

impl Unit {
    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Any => "-",
            Unit::Percent => "%",
            Unit::Watt => "W",
            Unit::Kilowatt => "kW",
            Unit::KwhPerTimestep => "kWh per timestep",
            Unit::WattPerSquareMeter => "W per square meter",
            Unit::WattHourPerSquareMeter => "Wh per square meter",
            Unit::MeterPerSecond => "m/s",
            Unit::WattHour => "Wh",
            Unit::Kwh => "kWh",
            Unit::Liter => "L",
            Unit::LiterPerTimestep => "Liter per timestep",
            Unit::Kg => "kg",
            Unit::KgPerSec => "kg/s",
            Unit::Celsius => "°C",
            Unit::Kelvin => "K",
            Unit::Degrees => "Degrees",
            Unit::Seconds => "s",
            Unit::Timesteps => "timesteps",
            Unit::CentsPerKwh => "Cents per kWh",
            Unit::Binary => "binary",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic label used by dynamic (tag-based) wiring.
///
/// Mixes device classes (`Pv`, `Battery`, ...) with flow roles
/// (`ElectricityProduction`, `ElectricityTarget`, ...); a port usually
/// carries one of each.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Tag {
    // Device classes
    Pv,
    SmartDevice,
    HeatPump,
    GasHeater,
    Battery,
    FuelCell,
    Electrolyzer,
    Boiler,
    Buffer,
    CarBattery,
    // Flow roles
    MassFlow,
    ControlSignal,
    ElectricityTarget,
    ElectricityReal,
    Production,
    Consumption,
    ElectricityProduction,
    ElectricityConsumptionUncontrolled,
    ElectricityConsumptionControlled,
    HeatToBuilding,
    HeatToBuffer,
}

impl Tag {
    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Pv => "PV",
            Tag::SmartDevice => "SmartDevice",
            Tag::HeatPump => "HeatPump",
            Tag::GasHeater => "GasHeater",
            Tag::Battery => "Battery",
            Tag::FuelCell => "FuelCell",
            Tag::Electrolyzer => "Electrolyzer",
            Tag::Boiler => "Boiler",
            Tag::Buffer => "Buffer",
            Tag::CarBattery => "CarBattery",
            Tag::MassFlow => "Massflow",
            Tag::ControlSignal => "ControlSignal",
            Tag::ElectricityTarget => "ElectricityTarget",
            Tag::ElectricityReal => "ElectricityReal",
            Tag::Production => "Production",
            Tag::Consumption => "Consumption",
            Tag::ElectricityProduction => "ElectricityProduction",
            Tag::ElectricityConsumptionUncontrolled => "ElectricityConsumptionUncontrolled",
            Tag::ElectricityConsumptionControlled => "ElectricityConsumptionControlled",
            Tag::HeatToBuilding => "HeatToBuilding",
            Tag::HeatToBuffer => "HeatToBuffer",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True when every tag in `wanted` is present in `have`.
pub fn tags_superset(have: &[Tag], wanted: &[Tag]) -> bool {
    wanted.iter().all(|t| have.contains(t))
}
