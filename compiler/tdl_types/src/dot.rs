//! Graphviz rendering of a type environment.
//!
//! Debug aid for inspecting inference results: dotted edges are
//! equivalence links, solid labeled edges are derivation steps, dashed
//! edges are deferred constraints. Free roots carry their typeset in the
//! node label. Output is deterministic (nodes and edges sorted by
//! display form) so renderings diff cleanly.

use std::fmt::Write as _;

use rustc_hash::{FxHashMap, FxHashSet};
use tdl_ir::{TvRef, TypeVarPool, VarPool};

use crate::constraint::Constraint;
use crate::env::TypeEnv;

impl TypeEnv {
    /// Render this environment as a Graphviz `digraph`.
    pub fn dot(&self, pool: &TypeVarPool, vars: &VarPool) -> String {
        let mut nodes: Vec<TvRef> = Vec::new();
        let mut seen = FxHashSet::default();
        let mut add = |tv: TvRef, nodes: &mut Vec<TvRef>| {
            // Walk the derivation chain so every base appears too.
            let mut cur = tv;
            loop {
                if !seen.insert(cur) {
                    break;
                }
                nodes.push(cur);
                match pool.derived_parts(cur) {
                    Some((_, base)) => cur = base,
                    None => break,
                }
            }
        };

        for (&a, &b) in self.type_map() {
            add(a, &mut nodes);
            add(b, &mut nodes);
        }
        for constr in self.constraints() {
            match constr {
                Constraint::TypesEqual(a, b) => {
                    add(*a, &mut nodes);
                    add(*b, &mut nodes);
                }
                Constraint::InTypeSet(tv, _) => add(*tv, &mut nodes),
            }
        }
        for &v in self.registered_vars() {
            add(vars.typevar(v), &mut nodes);
        }

        nodes.sort_by_key(|&tv| pool.display(tv));
        let ids: FxHashMap<TvRef, usize> =
            nodes.iter().enumerate().map(|(i, &tv)| (tv, i)).collect();

        let mut out = String::from("digraph type_env {\n");
        for (i, &tv) in nodes.iter().enumerate() {
            let label = if pool.is_derived(tv) {
                pool.display(tv)
            } else {
                format!("{} {}", pool.display(tv), pool.typeset(tv))
            };
            let _ = writeln!(out, "    n{i} [label=\"{label}\"];");
        }

        let mut edges: Vec<String> = Vec::new();
        for &tv in &nodes {
            if let Some((func, base)) = pool.derived_parts(tv) {
                edges.push(format!(
                    "    n{} -> n{} [label=\"{func}\"];",
                    ids[&tv], ids[&base]
                ));
            }
        }
        for (&a, &b) in self.type_map() {
            edges.push(format!("    n{} -> n{} [style=dotted];", ids[&a], ids[&b]));
        }
        for constr in self.constraints() {
            match constr {
                Constraint::TypesEqual(a, b) => edges.push(format!(
                    "    n{} -> n{} [style=dashed, dir=none];",
                    ids[a], ids[b]
                )),
                Constraint::InTypeSet(tv, ts) => edges.push(format!(
                    "    n{} -> \"{ts}\" [style=dashed];",
                    ids[tv]
                )),
            }
        }
        edges.sort();
        for e in edges {
            out.push_str(&e);
            out.push('\n');
        }
        out.push_str("}\n");
        out
    }
}
