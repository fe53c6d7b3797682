//! Read-only view of a generated reachability graph.

use std::io;

use super::{StateId, StateNode};

/// Borrowed reachability graph over an explorer's canonical states.
#[derive(Debug, Clone, Copy)]
pub struct ReachabilityGraph<'a, N> {
    nodes: &'a [StateNode<N>],
}

impl<'a, N> ReachabilityGraph<'a, N> {
    pub(crate) const fn new(nodes: &'a [StateNode<N>]) -> Self { Self { nodes } }

    /// Number of vertices.
    #[must_use]
    pub const fn state_count(&self) -> usize { self.nodes.len() }

    /// Every edge as `(from, to)`, grouped by source in discovery order.
    pub fn edges(&self) -> impl Iterator<Item = (StateId, StateId)> + 'a {
        self.nodes.iter().enumerate().flat_map(|(index, node)| {
            node.successors
                .iter()
                .map(move |successor| (StateId(index), *successor))
        })
    }

    /// Write the graph as a DOT digraph called `name`, one line per edge.
    ///
    /// # Errors
    ///
    /// Propagates errors from `out`.
    pub fn write_dot<W: io::Write>(&self, name: &str, out: &mut W) -> io::Result<()> {
        writeln!(out, "digraph {name} {{")?;
        for (from, to) in self.edges() {
            writeln!(out, "\t\"{from}\" -> \"{to}\";")?;
        }
        writeln!(out, "}}")
    }

    /// Render [`ReachabilityGraph::write_dot`] into a string.
    #[must_use]
    pub fn to_dot(&self, name: &str) -> String {
        let mut buf = Vec::new();
        if self.write_dot(name, &mut buf).is_err() {
            return String::new();
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use crate::{nets::counter::CounterNet, statespace::Explorer};

    #[test]
    fn dot_lists_every_edge() {
        let net = CounterNet::new(2);
        let mut explorer = Explorer::new(&net, 1);
        explorer.generate();
        assert_eq!(
            explorer.graph().to_dot("g"),
            "digraph g {\n\t\"s0\" -> \"s1\";\n\t\"s1\" -> \"s2\";\n}\n"
        );
    }

    #[test]
    fn verify_generates_before_writing() {
        let net = CounterNet::new(1);
        let mut explorer = Explorer::new(&net, 2);
        let mut out = Vec::new();
        explorer.verify(&mut out).expect("verify");
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(text.lines().filter(|line| line.contains("->")).count(), 4);
        assert!(text.starts_with("digraph statespace {"));
    }
}
