use std::path::Path;

use petgraph::dot::Dot;
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::driver::Driver;
use crate::graph::TopLevelBindingGraph;
use crate::utils::indent;

/// Prints each root's network. Defects are emitted but do not fail the
/// command; only malformed declarations do.
pub(super) fn action(driver: &mut Driver, manifest: &Path, dot: bool) -> bool {
    let compiled = match driver.load(manifest).and_then(|decls| driver.compile(&decls)) {
        Ok(compiled) => compiled,
        Err(errs) => {
            driver.emit_errors(errs);
            return false;
        }
    };

    for c in compiled.iter() {
        if dot {
            println!("{}", Dot::new(c.graph.network()));
        } else {
            println!("{}", listing(&c.graph));
        }
        driver.emit_defects(&c.defects);
    }
    true
}

fn listing(graph: &TopLevelBindingGraph) -> String {
    let mut lines = vec![format!(
        "{} ({} nodes, {} edges, fingerprint {:016x})",
        graph.tree().root().path,
        graph.node_count(),
        graph.edge_count(),
        graph.fingerprint()
    )];

    for id in graph.nodes() {
        lines.push(indent(graph.node(id).to_string(), 1));
        let mut edges = graph
            .network()
            .edges_directed(id, Direction::Outgoing)
            .collect::<Vec<_>>();
        edges.sort_by_key(|e| e.id());
        for e in edges {
            lines.push(indent(
                format!("-> {}: {}", e.weight(), graph.node(e.target())),
                2,
            ));
        }
    }
    lines.join("\n")
}
