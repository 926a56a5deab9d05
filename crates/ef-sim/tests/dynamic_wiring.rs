//! Tagged dynamic ports resolved at prepare time.

mod common;

use common::{Source, hourly_params};
use ef_core::{InputId, LoadType, OutputId, Tag, Unit};
use ef_graph::{GraphResult, OutputSpec, StepValues};
use ef_sim::{Component, ComponentResult, PortRegistrar, PrepareContext, Simulator};

/// Balance = sum(production) - sum(consumption), written to the dynamic
/// output tagged `[ElectricityReal]` with weight 1.
#[derive(Default)]
struct Meter {
    production: Vec<InputId>,
    consumption: Vec<(InputId, i32)>,
    balance: Option<OutputId>,
}

impl Component for Meter {
    fn name(&self) -> &str {
        "Meter"
    }

    fn register(&mut self, _ports: &mut PortRegistrar<'_>) -> GraphResult<()> {
        Ok(())
    }

    fn prepare_simulation(&mut self, ctx: &mut PrepareContext<'_>) -> ComponentResult<()> {
        self.production = ctx.dynamic_inputs(&[Tag::ElectricityProduction]);
        self.consumption = ctx.dynamic_inputs_by_weight(&[Tag::Consumption]);
        self.balance = ctx.first_dynamic_output(&[Tag::ElectricityReal], 1);
        Ok(())
    }

    fn simulate(&mut self, _t: usize, values: &mut StepValues<'_>, _force: bool) -> ComponentResult<()> {
        let produced = values.sum_inputs(&self.production);
        let consumed: f64 = self.consumption.iter().map(|&(i, _)| values.input(i)).sum();
        if let Some(out) = self.balance {
            values.set_output(out, produced - consumed);
        }
        Ok(())
    }

    fn save_state(&mut self) {}
    fn restore_state(&mut self) {}
}

#[test]
fn meter_sums_tagged_inputs() {
    let mut sim = Simulator::with_parameters(hourly_params(2)).expect("params");
    let east = sim
        .add_component(Source::new("East", 100.0).with_class("PvSystem"), false)
        .expect("east");
    let west = sim
        .add_component(Source::new("West", 50.0).with_class("PvSystem"), false)
        .expect("west");
    let house = sim.add_component(Source::new("House", 30.0), false).expect("house");
    let heat_pump = sim.add_component(Source::new("HeatPump", 20.0), false).expect("hp");
    let meter = sim.add_component(Meter::default(), false).expect("meter");

    let inputs = sim
        .add_component_inputs_and_connect(
            meter,
            &[east, west],
            "Pow",
            vec![Tag::ElectricityProduction, Tag::Pv],
            0,
        )
        .expect("pv inputs");
    assert_eq!(inputs.len(), 2);

    sim.add_component_input_and_connect(meter, heat_pump, "Power", vec![Tag::Consumption, Tag::HeatPump], 2)
        .expect("hp input");
    sim.add_component_input_and_connect(meter, house, "Power", vec![Tag::Consumption], 1)
        .expect("house input");

    let balance = sim
        .add_component_output(
            meter,
            OutputSpec::new("Balance", LoadType::Electricity, Unit::Watt)
                .with_tags([Tag::ElectricityReal])
                .with_weight(1),
        )
        .expect("balance");

    sim.run_all_timesteps().expect("run");
    assert_eq!(sim.value("Meter", "BalanceOutput1"), Some(100.0));

    let graph = sim.graph().expect("graph");
    let names: Vec<&str> = graph
        .inputs_of(meter)
        .map(|i| i.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "Input_East_Power_0",
            "Input_West_Power_1",
            "Input_HeatPump_Power_2",
            "Input_House_Power_3",
        ]
    );
    assert!(graph.inputs_of(meter).all(|i| i.mandatory && i.dynamic));
    assert_eq!(graph.output_label(balance), "Meter.BalanceOutput1");

    // Ascending weight: house (1) before heat pump (2).
    let by_weight = graph.dynamic_inputs_by_weight(meter, &[Tag::Consumption]);
    let weights: Vec<i32> = by_weight.iter().map(|&(_, w)| w).collect();
    assert_eq!(weights, vec![1, 2]);
    assert_eq!(graph.dynamic_inputs(meter, &[Tag::Consumption, Tag::HeatPump]).len(), 1);
}

#[test]
fn fragment_matching_nothing_adds_no_inputs() {
    let mut sim = Simulator::with_parameters(hourly_params(1)).expect("params");
    let pv = sim.add_component(Source::new("Pv", 1.0), false).expect("pv");
    let meter = sim.add_component(Meter::default(), false).expect("meter");
    let inputs = sim
        .add_component_inputs_and_connect(meter, &[pv], "Heat", vec![Tag::Production], 0)
        .expect("no match is fine");
    assert!(inputs.is_empty());
}

#[test]
fn second_dynamic_output_is_numbered_after_existing_outputs() {
    let mut sim = Simulator::with_parameters(hourly_params(1)).expect("params");
    let meter = sim.add_component(Meter::default(), false).expect("meter");
    let spec = OutputSpec::new("Surplus", LoadType::Electricity, Unit::Watt).with_tags([Tag::Production]);
    let first = sim.add_component_output(meter, spec.clone()).expect("first");
    let second = sim.add_component_output(meter, spec.with_weight(2)).expect("second");
    sim.freeze().expect("freeze");
    let graph = sim.graph().expect("graph");
    assert_eq!(graph.output(first).expect("out").name, "SurplusOutput1");
    assert_eq!(graph.output(second).expect("out").name, "SurplusOutput2");
    assert_eq!(graph.dynamic_outputs(meter, &[Tag::Production], 2), vec![second]);
}
