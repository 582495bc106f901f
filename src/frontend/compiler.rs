//! Boolean-expression compiler (spec_full "HDL Frontend" supplement):
//! lowers the parsed AST to a flat gate list against the built-in gate
//! kinds, retargeted from the teacher's original `compiler::compile` (which
//! produced raw block lists) to instead produce data consumed by
//! `lower_to_netlist`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use serde_json::Value;

use super::semantics::Semantics;

/// One logic gate: a builtin-library kind plus its ordered input signal
/// names and its own output signal name.
#[derive(Debug, Clone)]
pub struct Gate {
    pub id: String,
    pub kind: &'static str,
    pub inputs: Vec<String>,
    pub output: String,
}

/// The gate list plus the program's declared (unassigned) inputs and
/// assigned outputs, by signal name.
pub struct Program {
    pub gates: Vec<Gate>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

static GID: AtomicUsize = AtomicUsize::new(1);

fn next_id() -> String {
    let id = GID.fetch_add(1, Ordering::SeqCst);
    format!("g{id}")
}

fn push_gate(gates: &mut Vec<Gate>, kind: &'static str, inputs: Vec<String>) -> String {
    let id = next_id();
    let output = format!("sig_{id}");
    gates.push(Gate { id, kind, inputs, output: output.clone() });
    output
}

fn compile_expr(expr: &Value, var_signal: &mut HashMap<String, String>, gates: &mut Vec<Gate>) -> Result<String> {
    match expr.get("type").and_then(|t| t.as_str()) {
        Some("Literal") => {
            if let Some(b) = expr.get("value").and_then(|v| v.as_bool()) {
                Ok(if b { "CONST_TRUE_SIG".into() } else { "CONST_FALSE_SIG".into() })
            } else {
                anyhow::bail!("Only boolean literals allowed")
            }
        }
        Some("Identifier") => {
            let name = expr.get("name").and_then(|n| n.as_str()).expect("name");
            var_signal.get(name).cloned().ok_or_else(|| anyhow::anyhow!("Undefined: {name}"))
        }
        Some("UnaryExpression") => {
            let arg = compile_expr(expr.get("argument").unwrap(), var_signal, gates)?;
            Ok(push_gate(gates, "NOT", vec![arg]))
        }
        Some("LogicalExpression") => {
            let l = compile_expr(expr.get("left").unwrap(), var_signal, gates)?;
            let r = compile_expr(expr.get("right").unwrap(), var_signal, gates)?;
            let kind = match expr.get("operator").and_then(|s| s.as_str()) {
                Some("&&") => "AND",
                Some("||") => "OR",
                _ => anyhow::bail!("Unsupported logical operator"),
            };
            Ok(push_gate(gates, kind, vec![l, r]))
        }
        Some("ConditionalExpression") => {
            // MUX: (t && c) || (!t && a)
            let t = compile_expr(expr.get("test").unwrap(), var_signal, gates)?;
            let c = compile_expr(expr.get("consequent").unwrap(), var_signal, gates)?;
            let a = compile_expr(expr.get("alternate").unwrap(), var_signal, gates)?;
            let not_t = push_gate(gates, "NOT", vec![t.clone()]);
            let t_and_c = push_gate(gates, "AND", vec![t, c]);
            let nt_and_a = push_gate(gates, "AND", vec![not_t, a]);
            Ok(push_gate(gates, "OR", vec![t_and_c, nt_and_a]))
        }
        Some("BinaryExpression") => {
            // XOR = (l || r) && !(l && r); equality is its negation.
            let l = compile_expr(expr.get("left").unwrap(), var_signal, gates)?;
            let r = compile_expr(expr.get("right").unwrap(), var_signal, gates)?;
            let or_sig = push_gate(gates, "OR", vec![l.clone(), r.clone()]);
            let and_sig = push_gate(gates, "AND", vec![l, r]);
            let not_and = push_gate(gates, "NOT", vec![and_sig]);
            let xor = push_gate(gates, "AND", vec![or_sig, not_and]);
            match expr.get("operator").and_then(|s| s.as_str()) {
                Some("!=") => Ok(xor),
                Some("==") => Ok(push_gate(gates, "NOT", vec![xor])),
                _ => anyhow::bail!("Unsupported binary op"),
            }
        }
        _ => anyhow::bail!("Unsupported expr"),
    }
}

/// Lower the parsed program to a flat gate list (spec_full "HDL Frontend").
pub fn compile(program: &Value, _sem: &Semantics) -> Result<Program> {
    let mut gates = Vec::new();
    let mut var_signal: HashMap<String, String> = HashMap::new();

    gates.push(Gate { id: "g_const_true".into(), kind: "CONST_TRUE", inputs: vec![], output: "CONST_TRUE_SIG".into() });
    gates.push(Gate { id: "g_const_false".into(), kind: "CONST_FALSE", inputs: vec![], output: "CONST_FALSE_SIG".into() });

    let mut declared_inputs = Vec::new();
    let mut outputs = Vec::new();

    if let Some(body) = program.get("body").and_then(|b| b.as_array()) {
        for stmt in body {
            let Some(t) = stmt.get("type").and_then(|s| s.as_str()) else { continue };
            if t == "VariableDeclaration" {
                for d in stmt.get("declarations").unwrap().as_array().unwrap() {
                    let name = d.get("id").unwrap().get("name").unwrap().as_str().unwrap();
                    if let Some(init) = d.get("init") {
                        let sig = compile_expr(init, &mut var_signal, &mut gates)?;
                        var_signal.insert(name.into(), sig);
                    } else {
                        let sig = push_gate(&mut gates, "INPUT", vec![]);
                        var_signal.insert(name.into(), sig.clone());
                        declared_inputs.push(sig);
                    }
                }
            } else if t == "ExpressionStatement" {
                if let Some(expr) = stmt.get("expression") {
                    if expr.get("type").and_then(|s| s.as_str()) == Some("AssignmentExpression") {
                        let name = expr.get("left").unwrap().get("name").unwrap().as_str().unwrap();
                        let right = expr.get("right").unwrap();
                        let sig = compile_expr(right, &mut var_signal, &mut gates)?;
                        // Force a distinct, named signal for the assignment target.
                        let out = push_gate(&mut gates, "BUF", vec![sig]);
                        var_signal.insert(name.into(), out.clone());
                        outputs.push(out);
                    }
                }
            }
        }
    }

    Ok(Program { gates, inputs: declared_inputs, outputs })
}
