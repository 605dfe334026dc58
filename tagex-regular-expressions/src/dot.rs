use crate::graph::Graph;
use crate::{Dfa, Nfa};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::io;
use std::io::Write;

fn label(value: &impl Debug) -> String {
    format!("{value:?}").replace('\\', "\\\\").replace('"', "\\\"")
}

impl<S, A, T> Nfa<S, A, T>
where
    S: Ord + Clone + Debug,
    A: Ord + Clone + Debug,
    T: Ord + Clone + Debug,
{
    /// Writes this automaton as a graphviz digraph. Epsilon transitions are labelled `ε`,
    /// tags are drawn as dashed edges from their start to their end state.
    pub fn output_dot(&self, w: &mut impl Write) -> io::Result<()> {
        writeln!(w, "digraph {{")?;

        let ids: BTreeMap<&S, usize> = self
            .graph()
            .vertices()
            .into_iter()
            .enumerate()
            .map(|(id, state)| (state, id))
            .collect();

        for (state, src) in &ids {
            let attrs = if *state == self.initial() {
                ", shape=box"
            } else {
                ""
            };
            writeln!(w, "node[label=\"{}\"{attrs}] id{src}", label(state))?;
        }

        for path in self.graph().traverse().all_paths() {
            let sym = match path.edge {
                Some(symbol) => label(symbol),
                None => "ε".to_string(),
            };
            writeln!(w, "id{} -> id{} [label=\"{sym}\"]", ids[path.start], ids[path.end])?;
        }

        for tag in self.tags() {
            writeln!(
                w,
                "id{} -> id{} [label=\"{}\", style=dashed]",
                ids[&tag.start],
                ids[&tag.end],
                label(&tag.name)
            )?;
        }

        writeln!(w, "}}")?;

        Ok(())
    }
}

impl<D, A, T> Dfa<D, A, T>
where
    D: Ord + Clone + Debug,
    A: Ord + Clone + Debug,
    T: Ord + Clone + Debug,
{
    /// Writes this automaton as a graphviz digraph. States are labelled with the tags that start
    /// (`+`) and end (`-`) in them; states in which any tag ends are drawn as double circles.
    pub fn output_dot(&self, w: &mut impl Write) -> io::Result<()> {
        writeln!(w, "digraph {{")?;

        let ids: BTreeMap<&D, usize> = self
            .states()
            .enumerate()
            .map(|(id, state)| (state, id))
            .collect();

        for (state, src) in &ids {
            let starting: Vec<_> = self.tags_starting(state).map(label).collect();
            let ending: Vec<_> = self.tags_ending(state).map(label).collect();
            let attrs = if ending.is_empty() {
                ""
            } else {
                ", shape=doublecircle"
            };
            writeln!(
                w,
                "node[label=\"{src} +[{}] -[{}]\"{attrs}] id{src}",
                starting.join(","),
                ending.join(",")
            )?;

            for (sym, tgt) in self.graph().edges(state).into_iter().flatten() {
                writeln!(w, "id{src} -> id{} [label=\"{}\"]", ids[tgt], label(sym))?;
            }
        }

        writeln!(w, "}}")?;

        Ok(())
    }
}
