use crate::{Automaton, Target};
use std::io;
use std::io::Write;

impl Automaton {
    /// Writes the automaton in Graphviz format. Deferred repetitions are drawn as dashed edges
    /// into a box for their pin.
    pub fn output_dot(&self, w: &mut impl Write) -> io::Result<()> {
        writeln!(w, "digraph {{")?;
        writeln!(w, "start[shape=point] start -> {}", self.entry())?;

        for src in self.positions() {
            let shape = if src == self.exit() {
                "doublecircle"
            } else {
                "circle"
            };
            writeln!(w, "node[shape={shape}] {src}")?;

            for transition in self.transitions(src) {
                let label = match transition.label {
                    Some(set) => set.to_string(),
                    None => "ε".to_string(),
                };
                match transition.target {
                    Target::Concrete(tgt) => {
                        writeln!(w, "{src} -> {tgt} [label=\"{label}\"]")?;
                    }
                    Target::Deferred(pin) => {
                        writeln!(w, "node[shape=box] {pin}")?;
                        writeln!(w, "{src} -> {pin} [label=\"{label}\", style=dashed]")?;
                    }
                }
            }
        }

        writeln!(w, "}}")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Allocator, Automaton, ByteRangeSet, DeferredTable};

    #[test]
    fn writes_every_transition() {
        let mut alloc = Allocator::new();
        let mut table = DeferredTable::new();
        let a = Automaton::literal(&mut alloc, ByteRangeSet::single(b'a'));
        let b = Automaton::literal(&mut alloc, ByteRangeSet::single(b'b'));
        let automaton = a.concat(Automaton::deferred(b, &mut alloc, &mut table));

        let mut out = Vec::new();
        automaton.output_dot(&mut out).unwrap();
        let dot = String::from_utf8(out).unwrap();

        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("p1 -> p2 [label=\"[a]\"]"));
        assert!(dot.contains("p2 -> p5 [label=\"ε\"]"));
        assert!(dot.contains("style=dashed"));
        assert!(dot.contains("shape=doublecircle] p6"));
    }
}
