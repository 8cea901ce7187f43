// This module is the recursive-descent grammar driver. Each production mirrors
// one grammar rule and calls into the active SSA context in grammar order:
// factors push constants and resolved symbols, expression tails emit
// arithmetic through the CSE path, relations emit a Cmp plus a negated
// conditional branch left unpatched for back-patching, and the if/while
// productions frame block creation, phi seeding, arm lowering and commit.
// Function declarations each get a fresh SSA context; the module-level
// function table records entry value number, parameter count and void-ness
// before the body is parsed so recursive calls check out. Missing expected
// tokens are counted and parsing continues; arity and call-context misuse
// are fatal.

//! Recursive-descent parser driving the SSA engine.

use std::collections::HashMap;
use std::rc::Rc;

use crate::core::{
    CompileError, CompileResult, Counters, Diagnostic, FunctionInfo, JoinNode, Opcode, Program,
    SsaContext, ValueNum, SYM_INPUT_NUM,
};
use crate::core::symbols::SymId;

use super::token::{TokenKind, TokenList};

/// The grammar driver. Consumes the token stream and produces a [`Program`].
pub struct Parser {
    toks: TokenList,
    contexts: Vec<SsaContext>,
    cur: usize,
    functions: HashMap<SymId, FunctionInfo>,
    counters: Rc<Counters>,
    diags: Vec<Diagnostic>,
}

impl Parser {
    pub fn new(toks: TokenList) -> Self {
        let counters = Rc::new(Counters::new());
        let contexts = vec![SsaContext::new("main", counters.clone())];
        Self {
            toks,
            contexts,
            cur: 0,
            functions: HashMap::new(),
            counters,
            diags: Vec::new(),
        }
    }

    /// computation = "main" [varDecl] {funcDecl} "{" statSequence "}" "."
    pub fn parse(mut self) -> CompileResult<Program> {
        self.expect(TokenKind::Main, "'main'");

        if self.toks.kind() == TokenKind::Var {
            self.var_decl();
        }

        while matches!(self.toks.kind(), TokenKind::Void | TokenKind::Function) {
            self.func_decl()?;
        }

        self.expect(TokenKind::LBrace, "'{'");
        self.stat_sequence()?;
        self.expect(TokenKind::RBrace, "'}'");
        self.expect(TokenKind::Period, "'.'");

        if self.toks.remaining() != 0 {
            self.syntax_error("expected end of input".to_string());
        }

        let mut diags = std::mem::take(&mut self.diags);
        for ctx in &mut self.contexts {
            diags.extend(ctx.take_diags());
        }
        Ok(Program::new(self.contexts, self.functions, diags))
    }

    fn ssa(&mut self) -> &mut SsaContext {
        &mut self.contexts[self.cur]
    }

    fn syntax_error(&mut self, message: String) {
        log::error!("[syntax error] {message}");
        self.diags.push(Diagnostic::error(message));
    }

    fn expected(&mut self, what: &str) {
        let got = match self.toks.current() {
            Some(t) if !t.text.is_empty() => format!("{:?} \"{}\"", t.kind, t.text),
            Some(t) => format!("{:?}", t.kind),
            None => "end of input".to_string(),
        };
        self.syntax_error(format!("expected {what}, got {got}"));
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> bool {
        if self.toks.kind() == kind {
            self.toks.eat();
            true
        } else {
            self.expected(what);
            false
        }
    }

    /// Current token as an identifier (id, spelling), without advancing.
    fn ident(&self) -> Option<(SymId, String)> {
        self.toks
            .current()
            .filter(|t| t.kind == TokenKind::Ident)
            .map(|t| (t.val.unwrap_or(0), t.text.clone()))
    }

    /// varDecl = "var" ident {"," ident} ";"
    fn var_decl(&mut self) {
        self.toks.eat(); // var

        while self.toks.kind() == TokenKind::Ident {
            if let Some((id, name)) = self.ident() {
                self.ssa().declare_symbol(id, &name, None);
            }
            self.toks.eat();

            if self.toks.kind() != TokenKind::Comma {
                if self.toks.kind() != TokenKind::Semi {
                    self.expected("','");
                }
                break;
            }
            self.toks.eat();
        }

        if self.toks.kind() != TokenKind::Semi {
            self.expected("';'");
            return;
        }
        self.toks.eat();
    }

    /// funcDecl = ["void"] "function" ident formalParam ";" funcBody ";"
    fn func_decl(&mut self) -> CompileResult<()> {
        let result = self.func_decl_body();
        // whatever happened inside, subsequent parsing belongs to main
        self.cur = 0;
        result
    }

    fn func_decl_body(&mut self) -> CompileResult<()> {
        let is_void = if self.toks.kind() == TokenKind::Void {
            self.toks.eat();
            true
        } else {
            false
        };

        if !self.expect(TokenKind::Function, "'function'") {
            return Ok(());
        }

        let Some((fn_id, fn_name)) = self.ident() else {
            self.expected("identifier");
            return Ok(());
        };
        self.toks.eat();

        // fresh context; the placeholder anchors the entry value number
        self.contexts
            .push(SsaContext::new(fn_name.clone(), self.counters.clone()));
        self.cur = self.contexts.len() - 1;
        self.ssa().add_instr(Opcode::Placeholder)?;
        let entry_block = self.ssa().entry();
        let entry = self.ssa().first_instr_num(entry_block).ok_or_else(|| {
            CompileError::Inconsistent {
                reason: "function entry block has no anchor".to_string(),
            }
        })?;
        self.functions.insert(
            fn_id,
            FunctionInfo {
                entry,
                params: 0,
                is_void,
            },
        );
        self.ssa().clear_stack();

        // formalParam = "(" [ident {"," ident}] ")"
        if !self.expect(TokenKind::LParen, "'('") {
            return Ok(());
        }
        let mut count: u64 = 0;
        while self.toks.kind() == TokenKind::Ident {
            let Some((pid, pname)) = self.ident() else {
                break;
            };
            self.toks.eat();

            count += 1;
            self.ssa().push_value(count);
            self.ssa().add_instr(Opcode::GetParam)?;
            let value = self.ssa().pop_value();
            self.ssa().declare_symbol(pid, &pname, value);

            if self.toks.kind() != TokenKind::Comma {
                break;
            }
            self.toks.eat();
        }
        if let Some(info) = self.functions.get_mut(&fn_id) {
            info.params = count;
        }
        if !self.expect(TokenKind::RParen, "')'") {
            return Ok(());
        }
        if !self.expect(TokenKind::Semi, "';'") {
            return Ok(());
        }

        self.func_body()?;

        self.expect(TokenKind::Semi, "';'");

        if self.ssa().last_instr().map(|i| i.op) != Some(Opcode::Return) {
            if !is_void {
                log::warn!("missing explicit return in function '{fn_name}'");
                self.diags.push(Diagnostic::warning(format!(
                    "missing explicit return in function '{fn_name}'"
                )));
            }
            self.ssa().clear_stack();
            self.ssa().add_instr(Opcode::Return)?;
        }
        Ok(())
    }

    /// funcBody = [varDecl] "{" [statSequence] "}"
    fn func_body(&mut self) -> CompileResult<()> {
        if self.toks.kind() == TokenKind::Var {
            self.var_decl();
        }
        if !self.expect(TokenKind::LBrace, "'{'") {
            return Ok(());
        }
        self.stat_sequence()?;
        self.expect(TokenKind::RBrace, "'}'");
        Ok(())
    }

    /// statSequence = statement {";" statement}
    fn stat_sequence(&mut self) -> CompileResult<()> {
        loop {
            let was_return = self.statement()?;
            if self.toks.kind() == TokenKind::Semi {
                self.toks.eat();
            } else {
                break;
            }
            if was_return {
                break;
            }
        }
        Ok(())
    }

    /// statement = assignment | funcCall | ifStatement | whileStatement
    ///           | returnStatement
    ///
    /// Returns whether the statement was a return (ending the sequence).
    fn statement(&mut self) -> CompileResult<bool> {
        match self.toks.kind() {
            TokenKind::Let => self.assignment()?,
            TokenKind::Call => {
                let (is_void, name) = self.func_call()?;
                if !is_void {
                    return Err(CompileError::ValueInStatement { name });
                }
                self.ssa().clear_stack();
            }
            TokenKind::If => self.if_statement()?,
            TokenKind::While => self.while_statement()?,
            TokenKind::Return => {
                self.return_statement()?;
                self.ssa().clear_stack();
                return Ok(true);
            }
            _ => {}
        }
        Ok(false)
    }

    /// assignment = "let" ident "<-" expression
    fn assignment(&mut self) -> CompileResult<()> {
        self.toks.eat(); // let

        let Some((id, name)) = self.ident() else {
            self.expected("identifier");
            return Ok(());
        };
        self.toks.eat();

        if !self.expect(TokenKind::Assign, "'<-'") {
            return Ok(());
        }

        self.expression()?;
        self.ssa().set_symbol(id, &name)?;

        // an arm consisting only of assignments must stay a valid branch
        // target
        let current = self.ssa().current();
        if self.ssa().block(current).is_empty() {
            self.ssa().add_instr(Opcode::Placeholder)?;
        }
        Ok(())
    }

    /// funcCall = "call" ident ["(" [expression {"," expression}] ")"]
    ///
    /// Returns the callee's void-ness and name; the caller enforces the
    /// statement/expression context rule.
    fn func_call(&mut self) -> CompileResult<(bool, String)> {
        self.toks.eat(); // call

        let Some((id, name)) = self.ident() else {
            self.expected("identifier");
            return Ok((true, String::new()));
        };
        self.toks.eat();

        let mut args: Vec<ValueNum> = Vec::new();
        if self.toks.kind() == TokenKind::LParen {
            self.toks.eat();
            while self.toks.kind() != TokenKind::RParen {
                let before_depth = self.ssa().stack_len();
                let before_pos = self.toks.position();
                self.expression()?;
                if self.ssa().stack_len() > before_depth {
                    if let Some(v) = self.ssa().pop_value() {
                        args.push(v);
                    }
                }
                match self.toks.kind() {
                    TokenKind::Comma => {
                        self.toks.eat();
                        if self.toks.kind() == TokenKind::RParen {
                            self.expected("expression");
                            break;
                        }
                    }
                    TokenKind::RParen => break,
                    _ => {
                        if self.toks.position() == before_pos {
                            self.expected("')'");
                            break;
                        }
                    }
                }
            }
            if self.toks.kind() == TokenKind::RParen {
                self.toks.eat();
            }
        }

        if let Some(&info) = self.functions.get(&id) {
            if info.params as usize != args.len() {
                return Err(CompileError::ArityMismatch {
                    name,
                    expected: info.params,
                    got: args.len(),
                });
            }

            for (i, value) in args.iter().enumerate() {
                self.ssa().push_value(i as u64 + 1);
                self.ssa().push_value(*value);
                self.ssa().add_instr(Opcode::SetParam)?;
            }

            self.ssa().push_value(info.entry);
            let jump = self.ssa().add_instr(Opcode::Jump)?;
            // the jump's value number doubles as the call result
            if !info.is_void {
                self.ssa().push_value(jump);
            }
            log::debug!(
                "call to {} function '{name}'",
                if info.is_void { "void" } else { "non-void" }
            );
            Ok((info.is_void, name))
        } else {
            // intrinsic (or unknown, which resolve_symbol reports)
            for value in args.iter().rev() {
                self.ssa().push_value(*value);
            }
            self.ssa().resolve_symbol(id, &name)?;
            Ok((id != SYM_INPUT_NUM, name))
        }
    }

    /// ifStatement = "if" relation "then" statSequence ["else" statSequence] "fi"
    fn if_statement(&mut self) -> CompileResult<()> {
        self.toks.eat(); // if
        let dominator = self.ssa().current();

        self.relation()?;

        let left = self.ssa().open_block(true);
        self.ssa().reverse_to_predecessor();
        let right = self.ssa().open_block(false);
        let merge = self.ssa().new_block();

        let mut join = JoinNode::new(merge);
        let old_symbols = self.ssa().seed_phis(&mut join);
        self.ssa().push_join(join);

        {
            let ctx = self.ssa();
            ctx.block_mut(left).dominator = Some(dominator);
            ctx.block_mut(right).dominator = Some(dominator);
            ctx.block_mut(merge).dominator = Some(dominator);
        }

        if !self.expect(TokenKind::Then, "'then'") {
            self.ssa().pop_join();
            return Ok(());
        }

        self.ssa().set_current(left);
        self.ssa().set_branch_side(Some(true));
        log::debug!("entering then-arm");
        self.stat_sequence()?;
        let left_end = self.ssa().current();

        self.ssa().set_branch_side(Some(false));
        self.ssa().set_current(right);
        self.ssa().add_instr(Opcode::Placeholder)?;
        let mut right_end = right;
        if self.toks.kind() == TokenKind::Else {
            self.toks.eat();
            self.ssa().restore_symbols(&old_symbols);
            log::debug!("entering else-arm");
            self.stat_sequence()?;
            right_end = self.ssa().current();
        }

        self.expect(TokenKind::Fi, "'fi'");
        self.ssa().set_branch_side(None);

        {
            let ctx = self.ssa();
            ctx.block_mut(merge).pred = Some(left_end);
            ctx.block_mut(merge).pred_alt = Some(right_end);
            ctx.block_mut(left_end).branch = Some(merge);
            ctx.block_mut(right_end).fallthrough = Some(merge);
            ctx.set_current(merge);
        }

        self.ssa().resolve_phi();
        self.ssa().commit_phi()?;

        // then-arm branches over the else-arm into the merge
        if let Some(front) = self.ssa().first_instr_num(merge) {
            let ctx = self.ssa();
            ctx.set_current(left_end);
            ctx.push_value(front);
            ctx.add_instr(Opcode::UnconditionalBranch)?;
            ctx.set_current(merge);
        }

        self.ssa().resolve_branch(dominator, right);
        self.ssa().pop_join();
        Ok(())
    }

    /// whileStatement = "while" relation "do" statSequence "od"
    fn while_statement(&mut self) -> CompileResult<()> {
        self.toks.eat(); // while

        // a block holding only a placeholder can serve as the condition
        // block directly
        let current = self.ssa().current();
        let reuse = {
            let block = self.ssa().block(current);
            block.len() == 1 && block.last_instr().map(|i| i.op) == Some(Opcode::Placeholder)
        };
        let cond = if reuse {
            current
        } else {
            self.ssa().open_block(true)
        };

        let exit = self.ssa().open_block(false);
        self.ssa().add_instr(Opcode::Placeholder)?;
        self.ssa().set_current(cond);

        let mut join = JoinNode::new(cond);
        join.branch_side = Some(false);
        self.ssa().seed_phis(&mut join);
        self.ssa().push_join(join);
        // the condition reads through the loop phis
        self.ssa().resolve_phi();

        let cmp = self.relation()?;
        if let Some(cmp) = cmp {
            self.ssa().set_loop_condition(cmp);
        }

        let body = self.ssa().open_block(true);
        {
            let ctx = self.ssa();
            ctx.block_mut(body).dominator = Some(cond);
            ctx.block_mut(exit).dominator = Some(cond);
        }

        if !self.expect(TokenKind::Do, "'do'") {
            self.ssa().pop_join();
            return Ok(());
        }
        log::debug!("entering loop body");
        self.stat_sequence()?;
        let body_end = self.ssa().current();
        self.ssa().block_mut(body_end).loop_entry = Some(cond);

        self.expect(TokenKind::Od, "'od'");

        self.ssa().set_current(exit);
        self.ssa().resolve_phi();
        self.ssa().commit_phi()?;

        // close the loop: the body's last block branches back to the
        // condition
        if let Some(front) = self.ssa().first_instr_num(cond) {
            let ctx = self.ssa();
            ctx.set_current(body_end);
            ctx.push_value(front);
            ctx.add_instr(Opcode::UnconditionalBranch)?;
            ctx.set_current(exit);
        }

        self.ssa().resolve_branch(cond, exit);
        self.ssa().pop_join();
        Ok(())
    }

    /// returnStatement = "return" [expression]
    fn return_statement(&mut self) -> CompileResult<()> {
        self.toks.eat(); // return
        self.expression()?;
        // pops the result if the expression produced one
        self.ssa().add_instr(Opcode::Return)?;
        Ok(())
    }

    /// relation = expression relOp expression
    ///
    /// Emits a Cmp and the negated conditional branch (taken when the source
    /// relation is false), leaving the branch target for back-patching.
    /// Returns the Cmp's value number.
    fn relation(&mut self) -> CompileResult<Option<ValueNum>> {
        self.expression()?;

        let branch_op = match self.toks.kind() {
            TokenKind::Eq => Opcode::BranchNotEqual,
            TokenKind::NotEq => Opcode::BranchEqual,
            TokenKind::Less => Opcode::BranchGreaterOrEqual,
            TokenKind::LessEq => Opcode::BranchGreater,
            TokenKind::Greater => Opcode::BranchLessOrEqual,
            TokenKind::GreaterEq => Opcode::BranchLess,
            _ => {
                self.expected("relational operator");
                return Ok(None);
            }
        };
        self.toks.eat();

        self.expression()?;
        let cmp = self.ssa().add_instr(Opcode::Cmp)?;
        self.ssa().add_instr(branch_op)?;
        Ok(Some(cmp))
    }

    /// expression = term {("+" | "-") term}
    fn expression(&mut self) -> CompileResult<()> {
        self.term()?;
        loop {
            match self.toks.kind() {
                TokenKind::Plus => {
                    self.toks.eat();
                    self.term()?;
                    self.ssa().add_instr(Opcode::Add)?;
                }
                TokenKind::Minus => {
                    self.toks.eat();
                    self.term()?;
                    self.ssa().add_instr(Opcode::Sub)?;
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// term = factor {("*" | "/") factor}
    fn term(&mut self) -> CompileResult<()> {
        self.factor()?;
        loop {
            match self.toks.kind() {
                TokenKind::Mul => {
                    self.toks.eat();
                    self.factor()?;
                    self.ssa().add_instr(Opcode::Mul)?;
                }
                TokenKind::Div => {
                    self.toks.eat();
                    self.factor()?;
                    self.ssa().add_instr(Opcode::Div)?;
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// factor = ident | number | "(" expression ")" | funcCall
    fn factor(&mut self) -> CompileResult<()> {
        match self.toks.kind() {
            TokenKind::Ident => {
                if let Some((id, name)) = self.ident() {
                    self.toks.eat();
                    self.ssa().resolve_symbol(id, &name)?;
                }
            }
            TokenKind::Number => {
                let value = self.toks.current().and_then(|t| t.val).unwrap_or(0);
                self.toks.eat();
                self.ssa().add_const(value);
            }
            TokenKind::LParen => {
                self.toks.eat();
                self.expression()?;
                self.expect(TokenKind::RParen, "')'");
            }
            TokenKind::Call => {
                let (is_void, name) = self.func_call()?;
                if is_void {
                    return Err(CompileError::VoidInExpression { name });
                }
            }
            _ => {}
        }
        Ok(())
    }
}
