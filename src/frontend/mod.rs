//! HDL Frontend (spec §1 "external *Frontend*", retained per spec_full as a
//! first consumer/demo of the core's netlist contract, not part of the
//! core's public API). Lowers a restricted JS boolean-expression subset,
//! through the teacher's original oxc-based parser and semantics pass, into
//! a `netlist::Netlist` built against a gate `InstanceLibrary` — generalized
//! from the teacher's original `compile -> optimize -> layout -> write_schem`
//! pipeline, which wrote blocks directly instead of handing off a netlist.

mod compiler;
mod optimizer;
mod parser;
mod semantics;

use std::collections::HashMap;

use anyhow::Result;

use crate::library::InstanceLibrary;
use crate::netlist::{InstanceId, Netlist, Network, NetworkId, PinRef};
use compiler::Program;

fn lower_to_netlist(program: Program, library: &InstanceLibrary) -> Result<Netlist> {
    let mut instances = HashMap::new();
    for gate in &program.gates {
        let instance = library
            .instantiate(gate.kind)
            .map_err(|e| anyhow::anyhow!("no built-in gate `{}`: {e}", gate.kind))?;
        instances.insert(InstanceId(gate.id.clone()), instance);
    }

    let mut consumers: HashMap<String, Vec<PinRef>> = HashMap::new();
    for gate in &program.gates {
        for (j, input_signal) in gate.inputs.iter().enumerate() {
            consumers.entry(input_signal.clone()).or_default().push(PinRef {
                instance: InstanceId(gate.id.clone()),
                port: "in".to_string(),
                pin_index: j,
            });
        }
    }

    let mut networks = Vec::with_capacity(program.gates.len());
    for gate in &program.gates {
        let driver = PinRef {
            instance: InstanceId(gate.id.clone()),
            port: "out".to_string(),
            pin_index: 0,
        };
        let mut members = vec![driver];
        members.extend(consumers.remove(&gate.output).unwrap_or_default());
        networks.push(Network {
            id: NetworkId(gate.output.clone()),
            members,
            driver_index: 0,
        });
    }

    Ok(Netlist::build(instances, networks)?)
}

/// Parse, check, compile, and lower `code` into a flat netlist ready for
/// `assembly::synthesize` (spec §4.3's "built once per run, then immutable").
pub fn compile_source(code: &str, library: &InstanceLibrary) -> Result<Netlist> {
    let ast = parser::parse_and_validate(code)?;
    let sem = semantics::analyze(&ast)?;
    let program = compiler::compile(&ast, &sem)?;
    let program = optimizer::optimize(program);
    lower_to_netlist(program, library)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::builtin_gate_library;

    #[test]
    fn compiles_a_simple_and_expression_to_a_routable_netlist() {
        let library = builtin_gate_library();
        // `y = y;` marks `y` as a real output so dead-gate elimination keeps
        // the AND gate computing it (only assignment statements, not `let`
        // bindings, are tracked as outputs).
        let netlist = compile_source("let a; let b; let y = a && b; y = y;", &library).unwrap();
        assert!(netlist.instances.len() >= 3);
        assert!(netlist.networks.iter().any(|n| n.sinks().count() >= 1));
    }

    #[test]
    fn rejects_destructuring() {
        let library = builtin_gate_library();
        assert!(compile_source("let [a, b] = [true, false];", &library).is_err());
    }

    #[test]
    fn dead_gate_elimination_drops_unused_subexpressions() {
        let library = builtin_gate_library();
        let netlist = compile_source("let a; let unused = !a; let y = a; y = y;", &library).unwrap();
        // `unused`'s NOT gate feeds no assignment output, so it is pruned;
        // the INPUT and the BUF-forced `y` output survive.
        let not_gates = netlist
            .instances
            .values()
            .filter(|i| i.library_key == "NOT")
            .count();
        assert_eq!(not_gates, 0);
        assert!(netlist.instances.values().any(|i| i.library_key == "BUF"));
    }
}
