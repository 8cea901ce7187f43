// Graphviz export of the finished block graph. Each block becomes one record
// node listing its instructions, each successor link becomes an edge labeled
// "fall" or "branch", each dominator link a dotted "dom" edge, and each
// loop-entry back-reference a dashed "loop" edge. Contexts render as one
// cluster per function. The output is stable for a fixed source so graphs
// can be diffed across reimplementations.

//! Graphviz export of a compiled [`Program`].

use crate::core::Program;

/// Render the whole program as a `digraph`.
pub fn render(program: &Program) -> String {
    let mut out = String::from("digraph program {\n");
    out.push_str("  node [shape=record];\n");

    for (i, ctx) in program.contexts().enumerate() {
        out.push_str(&format!("  subgraph cluster_{i} {{\n"));
        out.push_str(&format!("    label=\"{}\";\n", ctx.name()));
        for block in ctx.blocks() {
            let mut label = format!("BB{}", block.id);
            for instr in block.instrs() {
                label.push_str("\\l");
                label.push_str(&escape(&instr.to_string()));
            }
            label.push_str("\\l");
            out.push_str(&format!("    bb{} [label=\"{label}\"];\n", block.id));
        }
        out.push_str("  }\n");
    }

    for ctx in program.contexts() {
        for block in ctx.blocks() {
            if let Some(succ) = block.fallthrough {
                out.push_str(&format!(
                    "  bb{} -> bb{} [label=\"fall\"];\n",
                    block.id,
                    ctx.block(succ).id
                ));
            }
            if let Some(succ) = block.branch {
                out.push_str(&format!(
                    "  bb{} -> bb{} [label=\"branch\"];\n",
                    block.id,
                    ctx.block(succ).id
                ));
            }
            if let Some(dom) = block.dominator {
                out.push_str(&format!(
                    "  bb{} -> bb{} [style=dotted, label=\"dom\"];\n",
                    block.id,
                    ctx.block(dom).id
                ));
            }
            if let Some(entry) = block.loop_entry {
                out.push_str(&format!(
                    "  bb{} -> bb{} [style=dashed, label=\"loop\"];\n",
                    block.id,
                    ctx.block(entry).id
                ));
            }
        }
    }

    out.push_str("}\n");
    out
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' | '{' | '}' | '|' | '<' | '>' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}
