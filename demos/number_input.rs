//! Number Input Spinner
//!
//! A number field with increment/decrement buttons. Holding a button
//! steps the value once, then keeps stepping on an interval until the
//! button is released or the value reaches its bound.
//!
//! Key concepts:
//! - Named guards, actions and delays supplied through `MachineOptions`
//! - `after` and `every` timers driven by a virtual clock
//! - Derived fields recomputed on every context change
//! - Subscribing to state changes and taking a snapshot
//!
//! Run with: cargo run --example number_input

use serde::Serialize;
use statecore::guards::not;
use statecore::{
    create_machine, MachineBuilder, MachineOptions, ManualScheduler, RuntimeState, StateNode,
    Transition,
};
use std::time::Duration;

#[derive(Clone, Debug, Serialize)]
struct NumberInput {
    value: i64,
    min: i64,
    max: i64,
    step: i64,
    is_at_max: bool,
    is_at_min: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("statecore=debug")
        .init();

    println!("=== Number Input Spinner ===\n");

    let definition = MachineBuilder::new()
        .id("number-input")
        .initial("idle")
        .context(NumberInput {
            value: 8,
            min: 0,
            max: 10,
            step: 1,
            is_at_max: false,
            is_at_min: false,
        })
        .computed("bounds")
        .state(
            "idle",
            StateNode::new()
                .on("FOCUS", "focused")
                .on("PRESS.INC", Transition::to("incrementing").action("increment"))
                .on("PRESS.DEC", Transition::to("decrementing").action("decrement")),
        )
        .state(
            "focused",
            StateNode::new()
                .tag("focus")
                .on("BLUR", "idle")
                .on("PRESS.INC", Transition::to("incrementing").action("increment"))
                .on("PRESS.DEC", Transition::to("decrementing").action("decrement")),
        )
        .state(
            "incrementing",
            StateNode::new()
                .tag("focus")
                .every(
                    "SPIN_INTERVAL",
                    Transition::new().guard(not("isAtMax")).action("increment"),
                )
                .on("RELEASE", "focused"),
        )
        .state(
            "decrementing",
            StateNode::new()
                .tag("focus")
                .every(
                    "SPIN_INTERVAL",
                    Transition::new().guard(not("isAtMin")).action("decrement"),
                )
                .on("RELEASE", "focused"),
        )
        .build()?;

    let clock = ManualScheduler::new();
    let options = MachineOptions::new()
        .computed("bounds", |ctx: &mut NumberInput| {
            ctx.is_at_max = ctx.value >= ctx.max;
            ctx.is_at_min = ctx.value <= ctx.min;
        })
        .guard("isAtMax", |ctx: &NumberInput, _| ctx.is_at_max)
        .guard("isAtMin", |ctx: &NumberInput, _| ctx.is_at_min)
        .action("increment", |scope| {
            scope.set(|ctx| ctx.value = (ctx.value + ctx.step).min(ctx.max))?;
            Ok(())
        })
        .action("decrement", |scope| {
            scope.set(|ctx| ctx.value = (ctx.value - ctx.step).max(ctx.min))?;
            Ok(())
        })
        .delay("SPIN_INTERVAL", Duration::from_millis(50))
        .scheduler(clock.clone());

    let machine = create_machine(&definition, &options)?;
    let _subscription = machine.subscribe(|state: &RuntimeState, ctx: &NumberInput| {
        println!(
            "  {:<14} value={:<3} event={}",
            state.value().unwrap_or("-"),
            ctx.value,
            state.event.kind()
        );
    });

    machine.start()?;
    machine.send("FOCUS")?;

    println!("\nHolding increment for 200ms:");
    machine.send("PRESS.INC")?;
    clock.advance(Duration::from_millis(200));
    machine.send("RELEASE")?;
    println!("  stopped at the max: {}", machine.context().is_at_max);

    println!("\nHolding decrement for 120ms:");
    machine.send("PRESS.DEC")?;
    clock.advance(Duration::from_millis(120));
    machine.send("RELEASE")?;
    machine.send("BLUR")?;

    println!("\nSnapshot:\n{}", machine.snapshot().to_json_pretty()?);

    machine.stop()?;
    println!("\n=== Example Complete ===");
    Ok(())
}
