//! Integration tests for ef-graph.

use ef_core::{LoadType, Tag, Unit};
use ef_graph::{
    BufferLayout, ConnectionRequest, GraphBuilder, GraphError, InputSpec, OutputSpec, StepValues,
    ValueBuffer,
};
use proptest::prelude::*;

fn watt_out(name: &str) -> OutputSpec {
    OutputSpec::new(name, LoadType::Electricity, Unit::Watt)
}

fn watt_in(name: &str) -> InputSpec {
    InputSpec::mandatory(name, LoadType::Electricity, Unit::Watt)
}

#[test]
fn chain_reads_through_layout() {
    // SourceA, SourceB -> Sum
    let mut b = GraphBuilder::new();
    let a = b.add_component("SourceA", "Constant").unwrap();
    let s = b.add_component("SourceB", "Constant").unwrap();
    let sum = b.add_component("Sum", "Sum").unwrap();
    let out_a = b.register_output(a, watt_out("Output")).unwrap();
    let out_b = b.register_output(s, watt_out("Output")).unwrap();
    let in1 = b.register_input(sum, watt_in("Input1")).unwrap();
    let in2 = b.register_input(sum, watt_in("Input2")).unwrap();
    b.connect(in1, a, "Output").unwrap();
    b.connect(in2, s, "Output").unwrap();
    let graph = b.build().unwrap();

    assert_eq!(graph.dependencies(), vec![(a, sum), (s, sum)]);

    let layout = BufferLayout::from_graph(&graph);
    let mut buffer = ValueBuffer::new(layout.len());
    let mut values = StepValues::new(&mut buffer, &layout);
    values.set_output(out_a, 150.0);
    values.set_output(out_b, 15.0);
    assert_eq!(values.input(in1) + values.input(in2), 165.0);
}

#[test]
fn automatic_wiring_matches_class_and_output() {
    let mut b = GraphBuilder::new();
    let weather = b.add_component("Weather", "Weather").unwrap();
    b.register_output(
        weather,
        OutputSpec::new("TemperatureOutside", LoadType::Temperature, Unit::Celsius),
    )
    .unwrap();
    let house = b.add_component("House", "Building").unwrap();
    let t = b
        .register_input(
            house,
            InputSpec::mandatory("TemperatureOutside", LoadType::Temperature, Unit::Celsius),
        )
        .unwrap();
    b.set_default_connections(
        house,
        vec![ConnectionRequest::new(
            "TemperatureOutside",
            "Weather",
            "TemperatureOutside",
        )],
    )
    .unwrap();

    assert_eq!(b.connect_automatically(house).unwrap(), 1);
    let graph = b.build().unwrap();
    assert_eq!(graph.input(t).unwrap().source, Some(graph.outputs()[0].id));
}

#[test]
fn automatic_wiring_missing_and_ambiguous() {
    let mut b = GraphBuilder::new();
    let car = b.add_component("Car", "CarBattery").unwrap();
    b.register_input(car, watt_in("ChargingPower")).unwrap();
    b.set_default_connections(
        car,
        vec![ConnectionRequest::new("ChargingPower", "Charger", "Power")],
    )
    .unwrap();
    assert!(matches!(
        b.connect_automatically(car),
        Err(GraphError::MissingDefaultSource { .. })
    ));

    let mut b = GraphBuilder::new();
    for name in ["Charger1", "Charger2"] {
        let c = b.add_component(name, "Charger").unwrap();
        b.register_output(c, watt_out("Power")).unwrap();
    }
    let car = b.add_component("Car", "CarBattery").unwrap();
    b.register_input(car, watt_in("ChargingPower")).unwrap();
    b.set_default_connections(
        car,
        vec![ConnectionRequest::new("ChargingPower", "Charger", "Power")],
    )
    .unwrap();
    let err = b.connect_automatically(car).unwrap_err();
    assert!(matches!(
        err,
        GraphError::AmbiguousDefaultSource { candidates: 2, .. }
    ));
    assert!(err.to_string().contains("Car.ChargingPower"));
}

#[test]
fn instance_pinning_breaks_ambiguity() {
    let mut b = GraphBuilder::new();
    let mut chargers = Vec::new();
    for name in ["Charger1", "Charger2"] {
        let c = b.add_component(name, "Charger").unwrap();
        chargers.push(b.register_output(c, watt_out("Power")).unwrap());
    }
    let car = b.add_component("Car", "CarBattery").unwrap();
    let input = b.register_input(car, watt_in("ChargingPower")).unwrap();
    b.set_default_connections(
        car,
        vec![ConnectionRequest::new("ChargingPower", "Charger", "Power").from_instance("Charger2")],
    )
    .unwrap();
    b.connect_automatically(car).unwrap();
    assert_eq!(b.input(input).unwrap().source, Some(chargers[1]));
}

#[test]
fn defaults_from_named_source() {
    let mut b = GraphBuilder::new();
    let c1 = b.add_component("Charger1", "Charger").unwrap();
    b.register_output(c1, watt_out("Power")).unwrap();
    let c2 = b.add_component("Charger2", "Charger").unwrap();
    let p2 = b.register_output(c2, watt_out("Power")).unwrap();
    let car = b.add_component("Car", "CarBattery").unwrap();
    let input = b.register_input(car, watt_in("ChargingPower")).unwrap();
    b.set_default_connections(
        car,
        vec![ConnectionRequest::new("ChargingPower", "Charger", "Power")],
    )
    .unwrap();

    assert_eq!(b.connect_defaults_from(car, c2).unwrap(), 1);
    assert_eq!(b.input(input).unwrap().source, Some(p2));
}

#[test]
fn unwired_mandatory_input_fails_build() {
    let mut b = GraphBuilder::new();
    let car = b.add_component("Car2", "CarBattery").unwrap();
    b.register_input(car, watt_in("ChargingPower")).unwrap();
    let err = b.build().unwrap_err();
    assert_eq!(
        err,
        GraphError::UnwiredMandatoryInput {
            component: "Car2".into(),
            input: "ChargingPower".into(),
        }
    );
}

#[test]
fn dynamic_inputs_by_tag_superset() {
    let mut b = GraphBuilder::new();
    let pv = b.add_component("PV", "Photovoltaic").unwrap();
    let pv_out = b.register_output(pv, watt_out("Power")).unwrap();
    let house = b.add_component("House", "Occupancy").unwrap();
    let house_out = b.register_output(house, watt_out("Consumption")).unwrap();
    let meter = b.add_component("Meter", "ElectricityMeter").unwrap();

    let a = b
        .add_dynamic_input(
            meter,
            InputSpec::optional("Input_PV_Power_0", LoadType::Electricity, Unit::Watt),
            vec![Tag::Pv, Tag::ElectricityProduction],
            0,
            pv_out,
        )
        .unwrap();
    let c = b
        .add_dynamic_input(
            meter,
            InputSpec::optional("Input_House_Consumption_1", LoadType::Electricity, Unit::Watt),
            vec![Tag::ElectricityConsumptionUncontrolled],
            0,
            house_out,
        )
        .unwrap();
    let graph = b.build().unwrap();

    assert_eq!(
        graph.dynamic_inputs(meter, &[Tag::ElectricityProduction]),
        vec![a]
    );
    assert_eq!(
        graph.dynamic_inputs(meter, &[Tag::ElectricityConsumptionUncontrolled]),
        vec![c]
    );
    assert!(
        graph
            .dynamic_inputs(meter, &[Tag::ElectricityProduction, Tag::Battery])
            .is_empty()
    );
    assert_eq!(graph.dynamic_inputs(meter, &[]), vec![a, c]);
}

#[test]
fn dynamic_outputs_by_tag_and_weight() {
    let mut b = GraphBuilder::new();
    let ems = b.add_component("EMS", "EnergyManagementSystem").unwrap();
    let low = b
        .add_dynamic_output(
            ems,
            watt_out("Output1")
                .with_tags([Tag::Battery, Tag::ElectricityTarget])
                .with_weight(1),
        )
        .unwrap();
    let high = b
        .add_dynamic_output(
            ems,
            watt_out("Output2")
                .with_tags([Tag::HeatPump, Tag::ElectricityTarget])
                .with_weight(2),
        )
        .unwrap();
    let graph = b.build().unwrap();

    assert_eq!(
        graph.first_dynamic_output(ems, &[Tag::ElectricityTarget], 2),
        Some(high)
    );
    assert_eq!(
        graph.dynamic_outputs(ems, &[Tag::Battery], 1),
        vec![low]
    );
    assert_eq!(graph.first_dynamic_output(ems, &[Tag::Battery], 2), None);
}

fn build_fanout(sizes: &[usize]) -> ef_graph::WiringGraph {
    let mut b = GraphBuilder::new();
    for (c, &n) in sizes.iter().enumerate() {
        let comp = b.add_component(format!("C{c}"), "Gen").unwrap();
        for o in 0..n {
            b.register_output(comp, watt_out(&format!("O{o}"))).unwrap();
        }
    }
    b.build().unwrap()
}

proptest! {
    #[test]
    fn global_indices_are_exactly_zero_to_n(sizes in prop::collection::vec(0usize..6, 0..12)) {
        let graph = build_fanout(&sizes);
        let total: usize = sizes.iter().sum();
        let mut idx: Vec<usize> = graph
            .outputs()
            .iter()
            .map(|o| o.global_index.unwrap())
            .collect();
        idx.sort_unstable();
        prop_assert_eq!(idx, (0..total).collect::<Vec<_>>());
    }

    #[test]
    fn tag_query_is_superset_filter(
        tag_sets in prop::collection::vec(prop::collection::vec(0usize..4, 0..4), 1..10),
        wanted in prop::collection::vec(0usize..4, 0..3),
    ) {
        const TAGS: [Tag; 4] = [Tag::Pv, Tag::Battery, Tag::ElectricityProduction, Tag::HeatPump];
        let mut b = GraphBuilder::new();
        let src = b.add_component("Src", "Gen").unwrap();
        let out = b.register_output(src, watt_out("O")).unwrap();
        let agg = b.add_component("Agg", "Meter").unwrap();
        let mut added = Vec::new();
        for (n, set) in tag_sets.iter().enumerate() {
            let tags: Vec<Tag> = set.iter().map(|&i| TAGS[i]).collect();
            let id = b
                .add_dynamic_input(
                    agg,
                    InputSpec::optional(format!("In{n}"), LoadType::Electricity, Unit::Watt),
                    tags.clone(),
                    0,
                    out,
                )
                .unwrap();
            added.push((id, tags));
        }
        let graph = b.build().unwrap();
        let wanted: Vec<Tag> = wanted.iter().map(|&i| TAGS[i]).collect();

        let expected: Vec<_> = added
            .iter()
            .filter(|(_, tags)| wanted.iter().all(|t| tags.contains(t)))
            .map(|(id, _)| *id)
            .collect();
        prop_assert_eq!(graph.dynamic_inputs(agg, &wanted), expected);
    }

    #[test]
    fn automatic_wiring_is_deterministic(consumers in 1usize..8) {
        let wire = || {
            let mut b = GraphBuilder::new();
            let src = b.add_component("Grid", "Grid").unwrap();
            b.register_output(src, watt_out("Power")).unwrap();
            for n in 0..consumers {
                let c = b.add_component(format!("Load{n}"), "Load").unwrap();
                b.register_input(c, watt_in("Supply")).unwrap();
                b.set_default_connections(c, vec![ConnectionRequest::new("Supply", "Grid", "Power")])
                    .unwrap();
                b.connect_automatically(c).unwrap();
            }
            b.build().unwrap().connections().to_vec()
        };
        prop_assert_eq!(wire(), wire());
    }
}
