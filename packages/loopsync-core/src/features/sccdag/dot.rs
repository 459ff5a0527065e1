//! Graphviz dump of an SCCDAG (diagnostics only)

use super::dag::SccDag;
use crate::shared::models::Function;
use std::fmt::Write as _;
use std::path::Path;

/// Render the SCCDAG as a DOT digraph, one cluster per SCC
pub fn render_dot(dag: &SccDag, func: &Function, title: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "digraph \"{}\" {{", escape(title));
    let _ = writeln!(out, "  compound=true;");
    let _ = writeln!(out, "  node [shape=box, fontname=monospace];");

    for scc in dag.nodes() {
        let _ = writeln!(out, "  subgraph cluster_{} {{", scc.id().0);
        let _ = writeln!(out, "    label=\"{}\";", scc.id());
        for &inst in scc.members() {
            let label = func
                .inst(inst)
                .map(|i| i.label())
                .unwrap_or_else(|| inst.to_string());
            let _ = writeln!(out, "    n{} [label=\"{}\"];", inst.0, escape(&label));
        }
        for edge in scc.internal_edges() {
            let _ = writeln!(
                out,
                "    n{} -> n{} [label=\"{}\"{}];",
                edge.from.0,
                edge.to.0,
                edge.kind.as_str(),
                if edge.loop_carried { ", style=dashed" } else { "" }
            );
        }
        let _ = writeln!(out, "  }}");
    }

    for dag_edge in dag.edges() {
        for edge in &dag_edge.dependences {
            let _ = writeln!(
                out,
                "  n{} -> n{} [label=\"{}\"{}];",
                edge.from.0,
                edge.to.0,
                edge.kind.as_str(),
                if edge.loop_carried { ", style=dashed" } else { "" }
            );
        }
    }
    out.push_str("}\n");
    out
}

/// Write the DOT rendering to `path`
pub fn write_dot(dag: &SccDag, func: &Function, title: &str, path: &Path) -> std::io::Result<()> {
    std::fs::write(path, render_dot(dag, func, title))
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
