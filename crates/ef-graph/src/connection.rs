//! Connection requests and port compatibility.

use ef_core::{InputId, LoadType, OutputId, Unit};
use tracing::warn;

/// "Wire my input `input` to output `source_output` of a component of class
/// `source_class`."
///
/// Declared by a component through `default_connections()` and resolved by
/// automatic wiring.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionRequest {
    pub input: String,
    pub source_class: String,
    pub source_output: String,
    /// Restrict matching to the component with this name.
    pub source_instance: Option<String>,
}

impl ConnectionRequest {
    pub fn new(
        input: impl Into<String>,
        source_class: impl Into<String>,
        source_output: impl Into<String>,
    ) -> Self {
        Self {
            input: input.into(),
            source_class: source_class.into(),
            source_output: source_output.into(),
            source_instance: None,
        }
    }

    pub fn from_instance(mut self, name: impl Into<String>) -> Self {
        self.source_instance = Some(name.into());
        self
    }
}

/// A resolved edge: `source` feeds `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Connection {
    pub source: OutputId,
    pub target: InputId,
}

/// Whether a source with (`load`, `unit`) may feed an input declared with
/// (`input_load`, `input_unit`).
///
/// `Any` on either side is accepted; the match is logged so a misdeclared
/// port stays visible.
pub fn compatible(
    input_load: LoadType,
    input_unit: Unit,
    source_load: LoadType,
    source_unit: Unit,
    context: &str,
) -> bool {
    let load_ok = input_load == source_load;
    let unit_ok = input_unit == source_unit;
    if load_ok && unit_ok {
        return true;
    }

    let load_wild = input_load == LoadType::Any || source_load == LoadType::Any;
    let unit_wild = input_unit == Unit::Any || source_unit == Unit::Any;
    if (load_ok || load_wild) && (unit_ok || unit_wild) {
        warn!(
            connection = context,
            %input_load, %input_unit, %source_load, %source_unit,
            "accepting connection through an Any load type or unit"
        );
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_is_compatible() {
        assert!(compatible(
            LoadType::Electricity,
            Unit::Watt,
            LoadType::Electricity,
            Unit::Watt,
            "a"
        ));
    }

    #[test]
    fn any_is_a_wildcard_on_either_side() {
        assert!(compatible(
            LoadType::Any,
            Unit::Any,
            LoadType::Heating,
            Unit::Watt,
            "a"
        ));
        assert!(compatible(
            LoadType::Heating,
            Unit::Watt,
            LoadType::Heating,
            Unit::Any,
            "a"
        ));
    }

    #[test]
    fn mismatch_is_rejected() {
        assert!(!compatible(
            LoadType::Electricity,
            Unit::Watt,
            LoadType::Heating,
            Unit::Watt,
            "a"
        ));
        assert!(!compatible(
            LoadType::Electricity,
            Unit::Watt,
            LoadType::Electricity,
            Unit::Kilowatt,
            "a"
        ));
    }

    #[test]
    fn request_instance_pinning() {
        let req = ConnectionRequest::new("Input1", "Source", "Out").from_instance("SourceA");
        assert_eq!(req.source_instance.as_deref(), Some("SourceA"));
    }
}
