// Textual dump of the finished block graph, one tree per function. Blocks
// print depth-first, fallthrough side first, indenting sixteen columns per
// level; a block reached a second time (every merge block is) prints as a
// one-line "merged" stub instead of repeating its instructions. Instruction
// lines use the stable Display forms defined on Instr.

//! Textual dump of a compiled [`Program`].

use std::collections::HashSet;

use crate::core::{Block, BlockId, Program, SsaContext};

const INDENT_STEP: usize = 16;

/// Render every context of the program, main first.
pub fn render(program: &Program) -> String {
    let mut out = String::new();
    for ctx in program.contexts() {
        out.push_str(ctx.name());
        out.push_str(":\n");
        render_context(ctx, &mut out);
    }
    out
}

fn render_context(ctx: &SsaContext, out: &mut String) {
    let mut seen = HashSet::new();
    walk(ctx, ctx.entry(), 0, &mut seen, out);
}

fn walk(ctx: &SsaContext, id: BlockId, indent: usize, seen: &mut HashSet<u64>, out: &mut String) {
    let block: &Block = ctx.block(id);
    let pad = " ".repeat(indent);

    if !seen.insert(block.id) {
        out.push_str(&format!("{pad}└ BB{} merged\n", block.id));
        return;
    }

    if indent == 0 {
        out.push_str(&format!("BB{}\n", block.id));
        for instr in block.instrs() {
            out.push_str(&format!("{instr}\n"));
        }
    } else {
        out.push_str(&format!("{pad}├ BB{}\n", block.id));
        for instr in block.instrs() {
            out.push_str(&format!("{pad}│ {instr}\n"));
        }
    }

    if block.fallthrough.is_some() || block.branch.is_some() {
        out.push_str(&format!("{pad}└───────────────┐\n"));
    }
    if let Some(next) = block.fallthrough {
        walk(ctx, next, indent + INDENT_STEP, seen, out);
    }
    if let Some(next) = block.branch {
        walk(ctx, next, indent + INDENT_STEP, seen, out);
    }
}
