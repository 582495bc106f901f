//! Dead-gate elimination (spec_full "HDL Frontend" supplement), ported from
//! the teacher's original `optimizer::optimize` to operate on
//! `compiler::Program` instead of a raw block-emitting `Circuit`.

use std::collections::{HashMap, HashSet};

use super::compiler::Program;

/// Drop every gate not reachable (by input signal) from the declared
/// outputs.
pub fn optimize(mut program: Program) -> Program {
    let producers: HashMap<String, usize> = program
        .gates
        .iter()
        .enumerate()
        .map(|(i, g)| (g.output.clone(), i))
        .collect();

    let mut reachable: HashSet<String> = HashSet::new();
    let mut stack: Vec<String> = program.outputs.clone();
    while let Some(sig) = stack.pop() {
        if !reachable.insert(sig.clone()) {
            continue;
        }
        if let Some(&idx) = producers.get(&sig) {
            for input in &program.gates[idx].inputs {
                stack.push(input.clone());
            }
        }
    }

    program.gates.retain(|g| reachable.contains(&g.output));
    program
}

#[cfg(test)]
mod tests {
    use super::super::compiler::Gate;
    use super::*;

    #[test]
    fn drops_gates_not_feeding_an_output() {
        let program = Program {
            gates: vec![
                Gate { id: "g1".into(), kind: "INPUT", inputs: vec![], output: "sig_1".into() },
                Gate { id: "g2".into(), kind: "NOT", inputs: vec!["sig_1".into()], output: "sig_2".into() },
                Gate { id: "g3".into(), kind: "NOT", inputs: vec!["sig_1".into()], output: "sig_3".into() },
            ],
            inputs: vec!["sig_1".into()],
            outputs: vec!["sig_2".into()],
        };
        let optimized = optimize(program);
        assert_eq!(optimized.gates.len(), 2);
        assert!(optimized.gates.iter().any(|g| g.output == "sig_2"));
        assert!(!optimized.gates.iter().any(|g| g.output == "sig_3"));
    }
}
