//! The parser, which compiles tokens straight to bytecode in a single pass.
//!
//! Calls to functions that are not declared yet are recorded and checked
//! once the whole program has been read, so functions can be used before
//! their definition.

use std::rc::Rc;

use compact_str::CompactString;
use indexmap::IndexMap;

use crate::{libs::Library, objects::Function};

use super::{
    code::{is_constant_name, Code, ConstValue, Variable},
    error::{ParseError, ParseErrorKind},
    opcode::{JumpTarget, OpCode},
    token::{
        Token,
        TokenKind::{self, *},
    },
    Program, ENTRY_NAME,
};

/// Compiles tokens into a function table holding the natives, the script
/// functions and the entry function.
///
/// `globals` are pre-declared in the entry scope, which lets a script see
/// the globals left behind by earlier runs.
pub fn parse<'a>(
    tokens: Vec<Token>,
    natives: &Library,
    globals: impl IntoIterator<Item = &'a str>,
) -> Result<Program, ParseError> {
    let mut parser = Parser::new(tokens, natives);
    for name in globals {
        parser.entry.variables.insert(
            name.into(),
            Variable {
                name: name.into(),
                global: true,
                constant: is_constant_name(name),
            },
        );
    }
    parser.parse_program()
}

/// A script function whose body is being compiled.
struct FunctionBuilder {
    name: CompactString,
    params: Vec<CompactString>,
    code: Code,
}

/// A call or a function reference checked at the end of parsing.
struct PendingCall {
    name: CompactString,
    line: u32,
    /// `None` for a bare reference, which accepts any arity.
    arity: Option<usize>,
}

struct LoopContext {
    /// Where `continue` jumps to.
    next: JumpTarget,
    /// Stack cells owned by the loop, dropped by `break`.
    cells: usize,
    /// `break` jumps waiting for the loop exit.
    breaks: Vec<usize>,
}

/// The last postfix operation of an expression, which an assignment turns
/// into a store.
enum Access {
    Index,
    Member(CompactString),
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    /// Line of the last consumed token, attached to emitted instructions.
    line: u32,
    natives: &'a Library,
    /// Arity of every script function declared so far.
    declared: IndexMap<CompactString, usize>,
    functions: Vec<Function>,
    entry: Code,
    current: Option<FunctionBuilder>,
    loops: Vec<LoopContext>,
    pending: Vec<PendingCall>,
}

impl<'a> Parser<'a> {
    fn new(mut tokens: Vec<Token>, natives: &'a Library) -> Self {
        let last_line = tokens.last().map_or(1, |token| token.line);
        tokens.push(Token::new(last_line, Eof));
        Parser {
            tokens,
            pos: 0,
            line: 1,
            natives,
            declared: IndexMap::new(),
            functions: Vec::new(),
            entry: Code::new(),
            current: None,
            loops: Vec::new(),
            pending: Vec::new(),
        }
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_second(&self) -> &TokenKind {
        let pos = (self.pos + 1).min(self.tokens.len() - 1);
        &self.tokens[pos].kind
    }

    fn peek_line(&self) -> u32 {
        self.tokens[self.pos].line
    }

    fn next(&mut self) -> TokenKind {
        let token = &self.tokens[self.pos];
        self.line = token.line;
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token.kind.clone()
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.next();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &'static str) -> Result<(), ParseError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_ident(&mut self, expected: &'static str) -> Result<CompactString, ParseError> {
        if let Ident(name) = self.peek() {
            let name = name.clone();
            self.next();
            Ok(name)
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn skip_eols(&mut self) {
        while self.eat(&Eol) {}
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        ParseError {
            line: self.peek_line(),
            kind: ParseErrorKind::UnexpectedToken {
                found: self.peek().clone(),
                expected,
            },
        }
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            line: self.line,
            kind,
        }
    }

    fn code_mut(&mut self) -> &mut Code {
        match &mut self.current {
            Some(function) => &mut function.code,
            None => &mut self.entry,
        }
    }

    fn emit(&mut self, opcode: OpCode) -> usize {
        let line = self.line;
        self.code_mut().emit(opcode, line)
    }

    fn next_target(&mut self) -> JumpTarget {
        self.code_mut().next_target()
    }

    fn patch(&mut self, index: usize) {
        self.code_mut().patch(index);
    }

    /// Looks a name up in the current function, then in the globals declared so far.
    fn resolve(&self, name: &str) -> Option<Variable> {
        self.current
            .as_ref()
            .and_then(|function| function.code.variables.get(name))
            .or_else(|| self.entry.variables.get(name))
            .cloned()
    }

    fn function_arity(&self, name: &str) -> Option<usize> {
        self.declared
            .get(name)
            .copied()
            .or_else(|| self.natives.get(name).map(|function| function.arity()))
    }

    /// Resolves the target of an assignment, declaring it if it is new.
    fn assignment_target(&mut self, name: CompactString) -> Result<Variable, ParseError> {
        match self.resolve(&name) {
            Some(variable) if variable.constant => {
                Err(self.error(ParseErrorKind::ConstantReassignment(name)))
            }
            Some(variable) => Ok(variable),
            None => {
                let variable = Variable {
                    constant: is_constant_name(&name),
                    global: self.current.is_none(),
                    name: name.clone(),
                };
                self.code_mut().variables.insert(name, variable.clone());
                Ok(variable)
            }
        }
    }

    fn emit_store(&mut self, variable: &Variable) {
        if variable.global {
            self.emit(OpCode::StoreGlobal(variable.name.clone()));
        } else {
            self.emit(OpCode::StoreLocal(variable.name.clone()));
        }
    }

    fn parse_program(mut self) -> Result<Program, ParseError> {
        loop {
            match self.peek() {
                Eof => break,
                Eol => {
                    self.next();
                }
                Func => self.function_definition()?,
                _ => self.statement()?,
            }
        }
        self.check_pending()?;

        let mut functions: IndexMap<CompactString, Rc<Function>> = self
            .natives
            .iter()
            .map(|(name, function)| (name.clone(), function.clone()))
            .collect();
        for function in self.functions {
            log::trace!(
                "compiled function {} ({} instructions)",
                function.name,
                function.code().map_or(0, |code| code.len())
            );
            functions.insert(function.name.clone(), Rc::new(function));
        }
        let entry = Function::new(ENTRY_NAME.into(), Vec::new(), self.entry);
        functions.insert(ENTRY_NAME.into(), Rc::new(entry));
        log::debug!(
            "parsed {} script functions",
            functions.len() - self.natives.len() - 1
        );
        Ok(Program { functions })
    }

    fn check_pending(&self) -> Result<(), ParseError> {
        for call in &self.pending {
            let kind = match (self.function_arity(&call.name), call.arity) {
                (Some(required), Some(given)) if required != given => {
                    ParseErrorKind::CallArguments {
                        name: call.name.clone(),
                        required,
                        given,
                    }
                }
                (Some(_), _) => continue,
                (None, Some(_)) => ParseErrorKind::UnknownFunction(call.name.clone()),
                (None, None) => ParseErrorKind::UndeclaredVariable(call.name.clone()),
            };
            return Err(ParseError {
                line: call.line,
                kind,
            });
        }
        Ok(())
    }

    /// Parses statements until one of `enders`, which is left unconsumed.
    fn block(&mut self, enders: &[TokenKind]) -> Result<(), ParseError> {
        loop {
            self.skip_eols();
            if enders.contains(self.peek()) {
                return Ok(());
            }
            if *self.peek() == Eof {
                return Err(self.unexpected("\"end\""));
            }
            self.statement()?;
        }
    }

    fn statement(&mut self) -> Result<(), ParseError> {
        match (self.peek(), self.peek_second()) {
            (If, _) => self.if_statement(),
            (While, _) => self.while_statement(),
            (For, _) => self.for_statement(),
            (Break, _) => self.break_statement(),
            (Continue, _) => self.continue_statement(),
            (Return, _) => self.return_statement(),
            (Func, _) => {
                self.next();
                Err(self.error(ParseErrorKind::NestedFunction))
            }
            (Ident(_), Equal) => self.assignment(),
            (Ident(_), OpenBracket | Dot | OpenParen) => self.postfix_statement(),
            _ => {
                self.expression()?;
                self.emit(OpCode::Pop(1));
                self.expect(&Eol, "end of line")
            }
        }
    }

    fn function_definition(&mut self) -> Result<(), ParseError> {
        self.next();
        let name = self.expect_ident("function name")?;
        if self.function_arity(&name).is_some() {
            return Err(self.error(ParseErrorKind::FunctionRedefinition(name)));
        }

        let mut code = Code::new();
        let mut params = Vec::new();
        self.expect(&OpenParen, "\"(\"")?;
        self.skip_eols();
        while *self.peek() != CloseParen {
            let param = self.expect_ident("parameter name")?;
            if code.variables.contains_key(&param) {
                return Err(self.error(ParseErrorKind::DuplicateParameter(param)));
            }
            code.variables.insert(
                param.clone(),
                Variable {
                    name: param.clone(),
                    global: false,
                    constant: false,
                },
            );
            params.push(param);
            self.skip_eols();
            if !self.eat(&Comma) {
                break;
            }
            self.skip_eols();
        }
        self.skip_eols();
        self.expect(&CloseParen, "\")\"")?;
        self.expect(&Eol, "end of line")?;

        self.declared.insert(name.clone(), params.len());
        self.current = Some(FunctionBuilder { name, params, code });
        self.block(&[End])?;
        self.next();
        self.emit(OpCode::Push(ConstValue::Null));
        self.emit(OpCode::Return);
        if let Some(FunctionBuilder { name, params, code }) = self.current.take() {
            self.functions.push(Function::new(name, params, code));
        }
        self.expect(&Eol, "end of line")
    }

    fn assignment(&mut self) -> Result<(), ParseError> {
        let name = self.expect_ident("variable name")?;
        self.next();
        self.expression()?;
        let variable = self.assignment_target(name)?;
        if variable.constant {
            self.emit(OpCode::Freeze);
        }
        self.emit_store(&variable);
        self.expect(&Eol, "end of line")
    }

    /// A statement starting with `name[`, `name.` or `name(`: either an
    /// element or member assignment, or an expression statement.
    fn postfix_statement(&mut self) -> Result<(), ParseError> {
        let root = match self.peek() {
            Ident(name) => name.clone(),
            _ => return Err(self.unexpected("identifier")),
        };
        let access = self.postfix()?;
        match access {
            Some(access) if *self.peek() == Equal => {
                if self.resolve(&root).is_some_and(|variable| variable.constant) {
                    return Err(self.error(ParseErrorKind::ConstantReassignment(root)));
                }
                self.next();
                self.code_mut().instructions.pop();
                self.expression()?;
                match access {
                    Access::Index => self.emit(OpCode::ListSet),
                    Access::Member(name) => self.emit(OpCode::ObjSet(name)),
                };
            }
            _ => {
                self.binary_tail(0)?;
                self.emit(OpCode::Pop(1));
            }
        }
        self.expect(&Eol, "end of line")
    }

    fn if_statement(&mut self) -> Result<(), ParseError> {
        self.next();
        self.expression()?;
        let mut branch = Some(self.emit(OpCode::Branch(JumpTarget(0))));

        if self.eat(&Then) && *self.peek() != Eol {
            self.statement()?;
            if let Some(branch) = branch {
                self.patch(branch);
            }
            return Ok(());
        }
        self.expect(&Eol, "end of line")?;
        self.block(&[End, Elif, Else])?;

        let mut exits = Vec::new();
        loop {
            match self.peek() {
                Elif => {
                    exits.push(self.emit(OpCode::Jump(JumpTarget(0))));
                    if let Some(branch) = branch.take() {
                        self.patch(branch);
                    }
                    self.next();
                    self.expression()?;
                    branch = Some(self.emit(OpCode::Branch(JumpTarget(0))));
                    self.eat(&Then);
                    self.expect(&Eol, "end of line")?;
                    self.block(&[End, Elif, Else])?;
                }
                Else => {
                    exits.push(self.emit(OpCode::Jump(JumpTarget(0))));
                    if let Some(branch) = branch.take() {
                        self.patch(branch);
                    }
                    self.next();
                    self.expect(&Eol, "end of line")?;
                    self.block(&[End])?;
                }
                _ => break,
            }
        }
        if let Some(branch) = branch {
            self.patch(branch);
        }
        for exit in exits {
            self.patch(exit);
        }
        self.expect(&End, "\"end\"")?;
        self.expect(&Eol, "end of line")
    }

    fn while_statement(&mut self) -> Result<(), ParseError> {
        self.next();
        let start = self.next_target();
        self.expression()?;
        self.expect(&Eol, "end of line")?;
        let branch = self.emit(OpCode::Branch(JumpTarget(0)));

        self.loop_body(start, 0)?;
        self.emit(OpCode::Jump(start));
        self.patch(branch);
        self.end_loop()
    }

    fn for_statement(&mut self) -> Result<(), ParseError> {
        self.next();
        let name = self.expect_ident("loop variable")?;
        if is_constant_name(&name) {
            return Err(self.error(ParseErrorKind::ConstantReassignment(name)));
        }
        let variable = self.assignment_target(name)?;
        self.expect(&In, "\"in\"")?;
        self.expression()?;
        let range = self.eat(&To);
        if range {
            self.expression()?;
        } else {
            self.emit(OpCode::Push(ConstValue::Number(0.0)));
        }
        self.emit(OpCode::Push(ConstValue::Number(1.0)));
        self.expect(&Eol, "end of line")?;

        let (var, global, exit) = (variable.name, variable.global, JumpTarget(0));
        let step = if range {
            self.emit(OpCode::StepRange { var, global, exit })
        } else {
            self.emit(OpCode::StepList { var, global, exit })
        };

        self.loop_body(JumpTarget(step), 3)?;
        self.emit(OpCode::Jump(JumpTarget(step)));
        self.patch(step);
        self.end_loop()
    }

    fn loop_body(&mut self, next: JumpTarget, cells: usize) -> Result<(), ParseError> {
        self.loops.push(LoopContext {
            next,
            cells,
            breaks: Vec::new(),
        });
        self.block(&[End])
    }

    /// Closes the innermost loop: its breaks land right here.
    fn end_loop(&mut self) -> Result<(), ParseError> {
        if let Some(context) = self.loops.pop() {
            for index in context.breaks {
                self.patch(index);
            }
        }
        self.expect(&End, "\"end\"")?;
        self.expect(&Eol, "end of line")
    }

    fn break_statement(&mut self) -> Result<(), ParseError> {
        self.next();
        let Some(cells) = self.loops.last().map(|context| context.cells) else {
            return Err(self.error(ParseErrorKind::BreakOutsideLoop));
        };
        if cells > 0 {
            self.emit(OpCode::Pop(cells));
        }
        let jump = self.emit(OpCode::Jump(JumpTarget(0)));
        if let Some(context) = self.loops.last_mut() {
            context.breaks.push(jump);
        }
        self.expect(&Eol, "end of line")
    }

    fn continue_statement(&mut self) -> Result<(), ParseError> {
        self.next();
        let Some(next) = self.loops.last().map(|context| context.next) else {
            return Err(self.error(ParseErrorKind::ContinueOutsideLoop));
        };
        self.emit(OpCode::Jump(next));
        self.expect(&Eol, "end of line")
    }

    fn return_statement(&mut self) -> Result<(), ParseError> {
        self.next();
        if *self.peek() == Eol {
            self.emit(OpCode::Push(ConstValue::Null));
        } else {
            self.expression()?;
        }
        self.emit(OpCode::Return);
        self.expect(&Eol, "end of line")
    }

    fn expression(&mut self) -> Result<(), ParseError> {
        self.expression_with(0)
    }

    fn expression_with(&mut self, min_priority: u8) -> Result<(), ParseError> {
        self.unary()?;
        self.binary_tail(min_priority)
    }

    /// Compiles binary operators following an already compiled operand.
    fn binary_tail(&mut self, min_priority: u8) -> Result<(), ParseError> {
        while let Some((priority, opcode)) = binary_operator(self.peek()) {
            if priority < min_priority {
                break;
            }
            self.next();
            let skip = match opcode {
                OpCode::Or => Some(self.emit(OpCode::SkipOr(JumpTarget(0)))),
                OpCode::And => Some(self.emit(OpCode::SkipAnd(JumpTarget(0)))),
                _ => None,
            };
            self.expression_with(priority + 1)?;
            self.emit(opcode);
            if let Some(skip) = skip {
                self.patch(skip);
            }
        }
        Ok(())
    }

    fn unary(&mut self) -> Result<(), ParseError> {
        match self.peek() {
            Minus => {
                self.next();
                self.unary()?;
                self.emit(OpCode::Negate);
            }
            Not => {
                self.next();
                self.unary()?;
                self.emit(OpCode::Not);
            }
            _ => {
                self.postfix()?;
            }
        }
        Ok(())
    }

    /// Compiles a primary expression followed by any number of indexing,
    /// member and call operations.
    fn postfix(&mut self) -> Result<Option<Access>, ParseError> {
        let mut access = self.primary()?;
        loop {
            match self.peek() {
                OpenBracket => {
                    self.next();
                    self.skip_eols();
                    self.expression()?;
                    self.skip_eols();
                    self.expect(&CloseBracket, "\"]\"")?;
                    self.emit(OpCode::ListGet);
                    access = Some(Access::Index);
                }
                Dot => {
                    self.next();
                    let name = self.expect_ident("member name")?;
                    self.emit(OpCode::ObjGet(name.clone()));
                    access = Some(Access::Member(name));
                }
                OpenParen => {
                    let count = self.arguments()?;
                    self.emit(OpCode::CallIndirect(count));
                    access = None;
                }
                _ => return Ok(access),
            }
        }
    }

    fn primary(&mut self) -> Result<Option<Access>, ParseError> {
        let value = match self.peek() {
            Null => ConstValue::Null,
            Bool(v) => ConstValue::Bool(*v),
            Number(v) => ConstValue::Number(*v),
            Str(v) => ConstValue::Str(Rc::from(v.as_str())),
            OpenParen => {
                self.next();
                self.expression()?;
                self.expect(&CloseParen, "\")\"")?;
                return Ok(None);
            }
            OpenBracket => {
                self.list_literal()?;
                return Ok(None);
            }
            OpenBrace => {
                self.object_literal()?;
                return Ok(None);
            }
            Ident(_) => {
                let name = self.expect_ident("identifier")?;
                self.identifier(name)?;
                return Ok(None);
            }
            _ => return Err(self.unexpected("expression")),
        };
        self.next();
        self.emit(OpCode::Push(value));
        Ok(None)
    }

    /// Compiles a variable load, a function reference or a named call.
    fn identifier(&mut self, name: CompactString) -> Result<(), ParseError> {
        let line = self.line;
        let variable = self.resolve(&name);
        if *self.peek() == OpenParen {
            if let Some(variable) = variable {
                self.emit_load(&variable);
                let count = self.arguments()?;
                self.emit(OpCode::CallIndirect(count));
                return Ok(());
            }
            let count = self.arguments()?;
            match self.function_arity(&name) {
                Some(required) if required != count => {
                    return Err(ParseError {
                        line,
                        kind: ParseErrorKind::CallArguments {
                            name,
                            required,
                            given: count,
                        },
                    });
                }
                Some(_) => (),
                None => self.pending.push(PendingCall {
                    name: name.clone(),
                    line,
                    arity: Some(count),
                }),
            }
            self.emit(OpCode::Call(name));
        } else if let Some(variable) = variable {
            self.emit_load(&variable);
        } else {
            if self.function_arity(&name).is_none() {
                self.pending.push(PendingCall {
                    name: name.clone(),
                    line,
                    arity: None,
                });
            }
            self.emit(OpCode::Push(ConstValue::Function(name)));
        }
        Ok(())
    }

    fn emit_load(&mut self, variable: &Variable) {
        if variable.global {
            self.emit(OpCode::LoadGlobal(variable.name.clone()));
        } else {
            self.emit(OpCode::LoadLocal(variable.name.clone()));
        }
    }

    /// Compiles a parenthesized argument list, returns the argument count.
    fn arguments(&mut self) -> Result<usize, ParseError> {
        self.expect(&OpenParen, "\"(\"")?;
        self.skip_eols();
        let mut count = 0;
        while *self.peek() != CloseParen {
            self.expression()?;
            count += 1;
            self.skip_eols();
            if !self.eat(&Comma) {
                break;
            }
            self.skip_eols();
        }
        self.skip_eols();
        self.expect(&CloseParen, "\")\"")?;
        Ok(count)
    }

    fn list_literal(&mut self) -> Result<(), ParseError> {
        self.next();
        self.emit(OpCode::ListNew);
        self.skip_eols();
        while *self.peek() != CloseBracket {
            self.expression()?;
            self.emit(OpCode::ListAppend);
            self.skip_eols();
            if !self.eat(&Comma) {
                break;
            }
            self.skip_eols();
        }
        self.skip_eols();
        self.expect(&CloseBracket, "\"]\"")
    }

    fn object_literal(&mut self) -> Result<(), ParseError> {
        self.next();
        self.emit(OpCode::ObjNew);
        let mut members: Vec<CompactString> = Vec::new();
        self.skip_eols();
        while *self.peek() != CloseBrace {
            let name = self.expect_ident("member name")?;
            if members.contains(&name) {
                return Err(self.error(ParseErrorKind::DuplicateMember(name)));
            }
            self.expect(&Equal, "\"=\"")?;
            self.expression()?;
            self.emit(OpCode::ObjAppend(name.clone()));
            members.push(name);
            self.skip_eols();
            if !self.eat(&Comma) {
                break;
            }
            self.skip_eols();
        }
        self.skip_eols();
        self.expect(&CloseBrace, "\"}\"")
    }
}

/// Priority and opcode of a binary operator token.
fn binary_operator(kind: &TokenKind) -> Option<(u8, OpCode)> {
    Some(match kind {
        Or => (0, OpCode::Or),
        And => (1, OpCode::And),
        Equal => (3, OpCode::Equal),
        NotEqual => (3, OpCode::NotEqual),
        Less => (3, OpCode::Less),
        LessOrEqual => (3, OpCode::LessOrEqual),
        Greater => (3, OpCode::Greater),
        GreaterOrEqual => (3, OpCode::GreaterOrEqual),
        Plus => (4, OpCode::Add),
        Minus => (4, OpCode::Subtract),
        Multiply => (5, OpCode::Multiply),
        Divide => (5, OpCode::Divide),
        Modulo => (5, OpCode::Modulo),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::lexer::tokenize;

    fn natives() -> Library {
        let mut lib = Library::new();
        let log = Function::native("log", &["value"], |_, _| Ok(Default::default()));
        lib.insert("log".into(), Rc::new(log));
        lib
    }

    fn compile(input: &str) -> Result<Program, ParseError> {
        parse(tokenize(input).unwrap(), &natives(), [])
    }

    fn opcodes(input: &str, function: &str) -> Vec<OpCode> {
        let program = compile(input).unwrap();
        program.functions[function]
            .code()
            .unwrap()
            .instructions
            .iter()
            .map(|instruction| instruction.opcode.clone())
            .collect()
    }

    macro_rules! check_entry {
        ($input:expr, [$($opcode:expr),* $(,)?] $(,)?) => {
            assert_eq!(opcodes($input, ENTRY_NAME), vec![$($opcode),*])
        };
    }

    macro_rules! check_error {
        ($input:expr, $line:expr, $kind:expr $(,)?) => {
            assert_eq!(
                compile($input).unwrap_err(),
                ParseError {
                    line: $line,
                    kind: $kind
                }
            )
        };
    }

    fn num(v: f64) -> OpCode {
        OpCode::Push(ConstValue::Number(v))
    }

    #[test]
    fn test_assignment() {
        check_entry!("x = 1", [num(1.0), OpCode::StoreGlobal("x".into())]);
        check_entry!(
            "X = [1]",
            [
                OpCode::ListNew,
                num(1.0),
                OpCode::ListAppend,
                OpCode::Freeze,
                OpCode::StoreGlobal("X".into()),
            ]
        );
    }

    #[test]
    fn test_constant_reassignment() {
        check_error!(
            "X = 5\nlog(X)\nX = 6",
            3,
            ParseErrorKind::ConstantReassignment("X".into())
        );
        check_error!(
            "L = [1]\nL[0] = 2",
            2,
            ParseErrorKind::ConstantReassignment("L".into())
        );
        check_error!(
            "O = {a = 1}\nO.a = 2",
            2,
            ParseErrorKind::ConstantReassignment("O".into())
        );
    }

    #[test]
    fn test_precedence() {
        check_entry!(
            "x = 1 + 2 * -3",
            [
                num(1.0),
                num(2.0),
                num(3.0),
                OpCode::Negate,
                OpCode::Multiply,
                OpCode::Add,
                OpCode::StoreGlobal("x".into()),
            ]
        );
        check_entry!(
            "x = 1 - 2 - 3",
            [
                num(1.0),
                num(2.0),
                OpCode::Subtract,
                num(3.0),
                OpCode::Subtract,
                OpCode::StoreGlobal("x".into()),
            ]
        );
    }

    #[test]
    fn test_short_circuit() {
        check_entry!(
            "x = false and true or null",
            [
                OpCode::Push(ConstValue::Bool(false)),
                OpCode::SkipAnd(JumpTarget(4)),
                OpCode::Push(ConstValue::Bool(true)),
                OpCode::And,
                OpCode::SkipOr(JumpTarget(7)),
                OpCode::Push(ConstValue::Null),
                OpCode::Or,
                OpCode::StoreGlobal("x".into()),
            ]
        );
    }

    #[test]
    fn test_element_and_member_assignment() {
        check_entry!(
            "l = [0]\nl[0] = 2\no = {a = 1}\no.a = l[0]",
            [
                OpCode::ListNew,
                num(0.0),
                OpCode::ListAppend,
                OpCode::StoreGlobal("l".into()),
                OpCode::LoadGlobal("l".into()),
                num(0.0),
                num(2.0),
                OpCode::ListSet,
                OpCode::ObjNew,
                num(1.0),
                OpCode::ObjAppend("a".into()),
                OpCode::StoreGlobal("o".into()),
                OpCode::LoadGlobal("o".into()),
                OpCode::LoadGlobal("l".into()),
                num(0.0),
                OpCode::ListGet,
                OpCode::ObjSet("a".into()),
            ]
        );
        check_error!(
            "o = {a = 1, a = 2}",
            1,
            ParseErrorKind::DuplicateMember("a".into())
        );
    }

    #[test]
    fn test_expression_statement() {
        check_entry!(
            "log(1)",
            [num(1.0), OpCode::Call("log".into()), OpCode::Pop(1)]
        );
        check_entry!(
            "l = [log]\nl[0](2)",
            [
                OpCode::ListNew,
                OpCode::Push(ConstValue::Function("log".into())),
                OpCode::ListAppend,
                OpCode::StoreGlobal("l".into()),
                OpCode::LoadGlobal("l".into()),
                num(0.0),
                OpCode::ListGet,
                num(2.0),
                OpCode::CallIndirect(1),
                OpCode::Pop(1),
            ]
        );
    }

    #[test]
    fn test_if() {
        check_entry!(
            "if 1 then log(2)",
            [
                num(1.0),
                OpCode::Branch(JumpTarget(5)),
                num(2.0),
                OpCode::Call("log".into()),
                OpCode::Pop(1),
            ]
        );
        check_entry!(
            "if 1\nx = 1\nelif 2\nx = 2\nelse\nx = 3\nend",
            [
                num(1.0),
                OpCode::Branch(JumpTarget(5)),
                num(1.0),
                OpCode::StoreGlobal("x".into()),
                OpCode::Jump(JumpTarget(12)),
                num(2.0),
                OpCode::Branch(JumpTarget(10)),
                num(2.0),
                OpCode::StoreGlobal("x".into()),
                OpCode::Jump(JumpTarget(12)),
                num(3.0),
                OpCode::StoreGlobal("x".into()),
            ]
        );
    }

    #[test]
    fn test_loops() {
        check_entry!(
            "for i in 0 to 5\nif i = 3 then break\nend",
            [
                num(0.0),
                num(5.0),
                num(1.0),
                OpCode::StepRange {
                    var: "i".into(),
                    global: true,
                    exit: JumpTarget(11),
                },
                OpCode::LoadGlobal("i".into()),
                num(3.0),
                OpCode::Equal,
                OpCode::Branch(JumpTarget(10)),
                OpCode::Pop(3),
                OpCode::Jump(JumpTarget(11)),
                OpCode::Jump(JumpTarget(3)),
            ]
        );
        check_entry!(
            "for v in [1]\nlog(v)\nend",
            [
                OpCode::ListNew,
                num(1.0),
                OpCode::ListAppend,
                num(0.0),
                num(1.0),
                OpCode::StepList {
                    var: "v".into(),
                    global: true,
                    exit: JumpTarget(10),
                },
                OpCode::LoadGlobal("v".into()),
                OpCode::Call("log".into()),
                OpCode::Pop(1),
                OpCode::Jump(JumpTarget(5)),
            ]
        );
        check_entry!(
            "x = 1\nwhile x\nx = 0\ncontinue\nend",
            [
                num(1.0),
                OpCode::StoreGlobal("x".into()),
                OpCode::LoadGlobal("x".into()),
                OpCode::Branch(JumpTarget(8)),
                num(0.0),
                OpCode::StoreGlobal("x".into()),
                OpCode::Jump(JumpTarget(2)),
                OpCode::Jump(JumpTarget(2)),
            ]
        );
        check_error!("break", 1, ParseErrorKind::BreakOutsideLoop);
        check_error!("if 1 then continue", 1, ParseErrorKind::ContinueOutsideLoop);
        check_error!(
            "for I in 0 to 2\nend",
            1,
            ParseErrorKind::ConstantReassignment("I".into())
        );
    }

    #[test]
    fn test_function() {
        assert_eq!(
            opcodes("func add(a, b)\nreturn a + b\nend", "add"),
            vec![
                OpCode::LoadLocal("a".into()),
                OpCode::LoadLocal("b".into()),
                OpCode::Add,
                OpCode::Return,
                OpCode::Push(ConstValue::Null),
                OpCode::Return,
            ]
        );
        let program = compile("func f(\n  a,\n  b\n)\nend").unwrap();
        assert_eq!(program.functions["f"].params, vec!["a", "b"]);
        check_error!(
            "func f(a, a)\nend",
            1,
            ParseErrorKind::DuplicateParameter("a".into())
        );
        check_error!(
            "func f()\nend\nfunc f()\nend",
            3,
            ParseErrorKind::FunctionRedefinition("f".into())
        );
        check_error!(
            "func log(x)\nend",
            1,
            ParseErrorKind::FunctionRedefinition("log".into())
        );
        check_error!("func f()\nfunc g()\nend\nend", 2, ParseErrorKind::NestedFunction);
        check_error!("if 1\nfunc g()\nend\nend", 2, ParseErrorKind::NestedFunction);
    }

    #[test]
    fn test_forward_calls() {
        check_entry!(
            "g(1)\nfunc g(x)\nend",
            [num(1.0), OpCode::Call("g".into()), OpCode::Pop(1)]
        );
        check_error!(
            "g(1, 2)\nfunc g(x)\nend",
            1,
            ParseErrorKind::CallArguments {
                name: "g".into(),
                required: 1,
                given: 2
            }
        );
        check_error!("\nnope()", 2, ParseErrorKind::UnknownFunction("nope".into()));
        check_error!(
            "log(1, 2)",
            1,
            ParseErrorKind::CallArguments {
                name: "log".into(),
                required: 1,
                given: 2
            }
        );
    }

    #[test]
    fn test_name_resolution() {
        // A global declared before the function is visible inside it.
        assert_eq!(
            opcodes("n = 1\nfunc f()\nn = n + 1\nm = 2\nend", "f"),
            vec![
                OpCode::LoadGlobal("n".into()),
                num(1.0),
                OpCode::Add,
                OpCode::StoreGlobal("n".into()),
                num(2.0),
                OpCode::StoreLocal("m".into()),
                OpCode::Push(ConstValue::Null),
                OpCode::Return,
            ]
        );
        // A global declared after the function is not.
        check_error!(
            "func f()\nreturn n\nend\nn = 1",
            2,
            ParseErrorKind::UndeclaredVariable("n".into())
        );
        // Parameters shadow globals.
        assert_eq!(
            opcodes("n = 1\nfunc f(n)\nreturn n\nend", "f")[0],
            OpCode::LoadLocal("n".into())
        );
        check_error!("x = y", 1, ParseErrorKind::UndeclaredVariable("y".into()));
        check_error!("x = x", 1, ParseErrorKind::UndeclaredVariable("x".into()));
    }

    #[test]
    fn test_function_reference() {
        check_entry!(
            "f = g\nfunc g()\nend\nf()",
            [
                OpCode::Push(ConstValue::Function("g".into())),
                OpCode::StoreGlobal("f".into()),
                OpCode::LoadGlobal("f".into()),
                OpCode::CallIndirect(0),
                OpCode::Pop(1),
            ]
        );
    }

    #[test]
    fn test_unexpected_token() {
        check_error!(
            "x = (1",
            1,
            ParseErrorKind::UnexpectedToken {
                found: Eol,
                expected: "\")\""
            }
        );
        check_error!(
            "end",
            1,
            ParseErrorKind::UnexpectedToken {
                found: End,
                expected: "expression"
            }
        );
        check_error!(
            "while 1\nx = 1\n",
            2,
            ParseErrorKind::UnexpectedToken {
                found: Eof,
                expected: "\"end\""
            }
        );
    }

    #[test]
    fn test_multiline_literals() {
        check_entry!(
            "x = [\n  1,\n  2\n]",
            [
                OpCode::ListNew,
                num(1.0),
                OpCode::ListAppend,
                num(2.0),
                OpCode::ListAppend,
                OpCode::StoreGlobal("x".into()),
            ]
        );
        let program = compile("o = {\n  a = 1,\n  b = 2,\n}").unwrap();
        assert_eq!(program.functions[ENTRY_NAME].code().unwrap().len(), 6);
    }
}
