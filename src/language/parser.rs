use crate::language::{
    ast::*,
    errors::{SyntaxError, SyntaxErrors},
    lexer::lex,
    span::Span,
    token::{Token, TokenKind},
};
use std::rc::Rc;

pub fn parse_program(source: &str) -> Result<Program, SyntaxErrors> {
    let tokens = match lex(source) {
        Ok(tokens) => tokens,
        Err(errors) => {
            let errs = errors
                .into_iter()
                .map(|err| SyntaxError::new(err.message, err.span))
                .collect();
            return Err(SyntaxErrors::new(errs));
        }
    };
    Parser::new(tokens).parse()
}

const RANGE_PRECEDENCE: u8 = 8;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<SyntaxError>,
    restrict_struct_literal: bool,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
            restrict_struct_literal: false,
        }
    }

    fn parse(mut self) -> Result<Program, SyntaxErrors> {
        let mut statements = Vec::new();

        while !self.is_eof() {
            if self.matches(TokenKind::Semi) {
                continue;
            }
            match self.parse_statement() {
                Ok(statement) => statements.push(statement),
                Err(err) => {
                    self.report(err);
                    self.synchronize();
                }
            }
        }

        if self.errors.is_empty() {
            Ok(Program { statements })
        } else {
            Err(SyntaxErrors::new(self.errors))
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, SyntaxError> {
        let statement = match self.peek_kind() {
            Some(TokenKind::Fn) if matches!(self.peek_kind_n(1), Some(TokenKind::Identifier(_))) => {
                let start = self.advance().span.start;
                Statement::Function(self.parse_function_decl(start)?)
            }
            Some(TokenKind::Struct) => {
                let start = self.advance().span.start;
                Statement::Struct(self.parse_struct(start)?)
            }
            Some(TokenKind::Interface) => {
                let start = self.advance().span.start;
                Statement::Interface(self.parse_interface(start)?)
            }
            Some(TokenKind::Type) => {
                let start = self.advance().span.start;
                let name = self.expect_identifier("Expected type name")?;
                self.expect(TokenKind::Eq)?;
                let ty = self.parse_type_annotation()?;
                let span = Span::new(start, ty.span.end);
                Statement::TypeAlias(TypeAliasDecl { name, ty, span })
            }
            Some(TokenKind::Import) => {
                let start = self.advance().span.start;
                Statement::Import(self.parse_import(start)?)
            }
            Some(TokenKind::For) => {
                let start = self.advance().span.start;
                self.parse_for(start)?
            }
            Some(TokenKind::Break) => Statement::Break(self.advance().span),
            Some(TokenKind::Continue) => Statement::Continue(self.advance().span),
            Some(TokenKind::Return) => {
                let start = self.advance().span.start;
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                let end = self.last_span_end(start);
                Statement::Return(ReturnStmt {
                    value,
                    span: Span::new(start, end),
                })
            }
            Some(TokenKind::Throw) => {
                let start = self.advance().span.start;
                let value = self.parse_expression()?;
                let span = Span::new(start, value.span().end);
                Statement::Throw(ThrowStmt { value, span })
            }
            _ => self.parse_simple_statement()?,
        };
        self.consume_optional(TokenKind::Semi);
        Ok(statement)
    }

    /// Declarations, assignments and expression statements: the forms that
    /// may also appear in a `for` header.
    fn parse_simple_statement(&mut self) -> Result<Statement, SyntaxError> {
        if self.check(TokenKind::Let) || self.check(TokenKind::Const) {
            return self.parse_var_decls();
        }

        let expr = self.parse_expression()?;
        let Some(op) = self.current_assign_op() else {
            let span = expr.span();
            return Ok(Statement::Expr(ExprStmt { expr, span }));
        };

        if !is_assignable(&expr) {
            return Err(SyntaxError::new("Invalid assignment target", expr.span())
                .with_help("assign to a name, `a[i]`, `a.field` or `*pointer`"));
        }
        self.advance();
        let start = expr.span().start;
        let value = match op {
            AssignOp::Increment | AssignOp::Decrement => None,
            _ => Some(self.parse_expression()?),
        };
        let end = self.last_span_end(start);
        Ok(Statement::Assign(AssignStmt {
            target: expr,
            op,
            value,
            span: Span::new(start, end),
        }))
    }

    fn parse_var_decls(&mut self) -> Result<Statement, SyntaxError> {
        let keyword = self.advance().clone();
        let constant = keyword.kind == TokenKind::Const;
        let start = keyword.span.start;
        let mut declarations = Vec::new();

        loop {
            let name = self.expect_identifier("Expected variable name")?;
            let decl_start = name.span.start;
            let ty = if self.matches(TokenKind::Colon) {
                Some(self.parse_type_annotation()?)
            } else {
                None
            };
            let value = if self.matches(TokenKind::Eq) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            let end = self.last_span_end(decl_start);
            declarations.push(VarDecl {
                name,
                ty,
                value,
                constant,
                span: Span::new(decl_start, end),
            });
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }

        let span = Span::new(start, self.last_span_end(start));
        if declarations.len() == 1 {
            let mut decl = declarations.remove(0);
            decl.span = span;
            Ok(Statement::Let(decl))
        } else {
            Ok(Statement::MultiLet(MultiVarDecl { declarations, span }))
        }
    }

    fn parse_function_decl(&mut self, start: usize) -> Result<FunctionDecl, SyntaxError> {
        let name = self.expect_identifier("Expected function name")?;
        let function = self.parse_function_literal(start)?;
        let span = Span::new(start, function.span.end);
        Ok(FunctionDecl {
            name,
            function,
            span,
        })
    }

    fn parse_function_literal(&mut self, start: usize) -> Result<Rc<FunctionLiteral>, SyntaxError> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                params.push(self.parse_param()?);
                if self.matches(TokenKind::Comma) {
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RParen)?;

        let return_type = if self.matches(TokenKind::Arrow) {
            Some(self.parse_type_annotation()?)
        } else {
            None
        };
        let body = self.parse_block()?;
        let span = Span::new(start, body.span.end);
        Ok(Rc::new(FunctionLiteral {
            params,
            return_type,
            body,
            span,
        }))
    }

    fn parse_param(&mut self) -> Result<Param, SyntaxError> {
        let name = self.expect_identifier("Expected parameter name")?;
        let start = name.span.start;
        self.expect(TokenKind::Colon)?;
        let ty = self.parse_type_annotation()?;
        let default = if self.matches(TokenKind::Eq) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        let span = Span::new(start, self.last_span_end(start));
        Ok(Param {
            name,
            ty,
            default,
            span,
        })
    }

    fn parse_struct(&mut self, start: usize) -> Result<StructDecl, SyntaxError> {
        let name = self.expect_identifier("Expected struct name")?;
        self.expect(TokenKind::LBrace)?;
        let mut members = Vec::new();

        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            if self.matches(TokenKind::Comma) || self.matches(TokenKind::Semi) {
                continue;
            }
            let member_start = self.current_span_start();
            let is_static = self.matches(TokenKind::Static);
            if self.matches(TokenKind::Fn) {
                members.push(StructMember::Method(self.parse_function_decl(member_start)?));
                continue;
            }
            let attr_name = self.expect_identifier("Expected attribute or method")?;
            self.expect(TokenKind::Colon)?;
            let ty = self.parse_type_annotation()?;
            let default = if self.matches(TokenKind::Eq) {
                Some(Rc::new(self.parse_expression()?))
            } else {
                None
            };
            members.push(StructMember::Attribute(AttributeDecl {
                name: attr_name,
                ty,
                default,
                is_static,
                span: Span::new(member_start, self.last_span_end(member_start)),
            }));
        }

        let end = self.expect(TokenKind::RBrace)?.span.end;
        Ok(StructDecl {
            name,
            members,
            span: Span::new(start, end),
        })
    }

    fn parse_interface(&mut self, start: usize) -> Result<InterfaceDecl, SyntaxError> {
        let name = self.expect_identifier("Expected interface name")?;
        self.expect(TokenKind::LBrace)?;
        let mut methods = Vec::new();

        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            if self.matches(TokenKind::Comma) || self.matches(TokenKind::Semi) {
                continue;
            }
            let method_start = self.expect(TokenKind::Fn)?.span.start;
            let method_name = self.expect_identifier("Expected method name")?;
            self.expect(TokenKind::LParen)?;
            let params = self.parse_type_params()?;
            let return_type = if self.matches(TokenKind::Arrow) {
                Some(self.parse_type_expr()?)
            } else {
                None
            };
            methods.push(InterfaceMethod {
                name: method_name,
                params,
                return_type,
                span: Span::new(method_start, self.last_span_end(method_start)),
            });
        }

        let end = self.expect(TokenKind::RBrace)?.span.end;
        Ok(InterfaceDecl {
            name,
            methods,
            span: Span::new(start, end),
        })
    }

    fn parse_import(&mut self, start: usize) -> Result<ImportDecl, SyntaxError> {
        let source = match self.peek_kind() {
            Some(TokenKind::Identifier(name)) => {
                self.advance();
                ImportSource::Name(name)
            }
            Some(TokenKind::String(path)) => {
                self.advance();
                ImportSource::Path(path)
            }
            _ => return Err(self.error_here("Expected module name or path after `import`")),
        };
        let alias = if self.matches(TokenKind::As) {
            Some(self.expect_identifier("Expected alias after `as`")?)
        } else {
            None
        };
        let end = self.last_span_end(start);
        Ok(ImportDecl {
            source,
            alias,
            span: Span::new(start, end),
        })
    }

    fn parse_for(&mut self, start: usize) -> Result<Statement, SyntaxError> {
        if self.check(TokenKind::LBrace) {
            let body = self.parse_block()?;
            let span = Span::new(start, body.span.end);
            return Ok(Statement::For(ForStmt {
                init: None,
                condition: None,
                post: Vec::new(),
                body,
                span,
            }));
        }

        if self.at_iterator_header() {
            let first = self.expect_identifier("Expected loop binding")?;
            let (index, binding) = if self.matches(TokenKind::Comma) {
                let second = self.expect_identifier("Expected loop binding")?;
                (Some(first), second)
            } else {
                (None, first)
            };
            self.expect(TokenKind::In)?;
            let iterable = self.parse_restricted(|parser| parser.parse_expression())?;
            let body = self.parse_block()?;
            let span = Span::new(start, body.span.end);
            return Ok(Statement::ForIn(ForInStmt {
                index,
                binding,
                iterable,
                body,
                span,
            }));
        }

        let (init, condition, post) = self.parse_restricted(|parser| {
            let init = if parser.check(TokenKind::Semi) {
                None
            } else {
                Some(parser.parse_simple_statement()?)
            };
            if !parser.matches(TokenKind::Semi) {
                // `for cond { }`
                return match init {
                    Some(Statement::Expr(stmt)) => Ok((None, Some(stmt.expr), Vec::new())),
                    _ => Err(parser.error_here("Expected `;` in for header")),
                };
            }
            let condition = if parser.check(TokenKind::Semi) {
                None
            } else {
                Some(parser.parse_expression()?)
            };
            parser.expect(TokenKind::Semi)?;
            let mut post = Vec::new();
            if !parser.check(TokenKind::LBrace) {
                loop {
                    post.push(parser.parse_simple_statement()?);
                    if parser.matches(TokenKind::Comma) {
                        continue;
                    }
                    break;
                }
            }
            Ok((init.map(Box::new), condition, post))
        })?;

        let body = self.parse_block()?;
        let span = Span::new(start, body.span.end);
        Ok(Statement::For(ForStmt {
            init,
            condition,
            post,
            body,
            span,
        }))
    }

    fn at_iterator_header(&self) -> bool {
        if !matches!(self.peek_kind(), Some(TokenKind::Identifier(_))) {
            return false;
        }
        match self.peek_kind_n(1) {
            Some(TokenKind::In) => true,
            Some(TokenKind::Comma) => {
                matches!(self.peek_kind_n(2), Some(TokenKind::Identifier(_)))
                    && self.peek_kind_n(3) == Some(TokenKind::In)
            }
            _ => false,
        }
    }

    fn parse_block(&mut self) -> Result<Block, SyntaxError> {
        let start = self.expect(TokenKind::LBrace)?.span.start;
        let prev_flag = self.restrict_struct_literal;
        self.restrict_struct_literal = false;
        let mut statements = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            if self.matches(TokenKind::Semi) {
                continue;
            }
            match self.parse_statement() {
                Ok(statement) => statements.push(statement),
                Err(err) => {
                    self.restrict_struct_literal = prev_flag;
                    return Err(err);
                }
            }
        }
        self.restrict_struct_literal = prev_flag;
        let end = self.expect(TokenKind::RBrace)?.span.end;
        Ok(Block {
            statements,
            span: Span::new(start, end),
        })
    }

    /// Runs `f` with struct literals disabled, so `if x { ... }` reads the
    /// brace as the body rather than as `x { ... }`.
    fn parse_restricted<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        let prev_flag = self.restrict_struct_literal;
        self.restrict_struct_literal = true;
        let result = f(self);
        self.restrict_struct_literal = prev_flag;
        result
    }

    fn parse_unrestricted<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        let prev_flag = self.restrict_struct_literal;
        self.restrict_struct_literal = false;
        let result = f(self);
        self.restrict_struct_literal = prev_flag;
        result
    }

    fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        let condition = self.parse_binary(0)?;
        if !self.matches(TokenKind::Question) {
            return Ok(condition);
        }
        let then_value = self.parse_expression()?;
        self.expect(TokenKind::Colon)?;
        let else_value = self.parse_expression()?;
        let span = condition.span().union(else_value.span());
        Ok(Expr::Ternary {
            condition: Box::new(condition),
            then_value: Box::new(then_value),
            else_value: Box::new(else_value),
            span,
        })
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_unary()?;

        loop {
            if self.check(TokenKind::DotDot) {
                if RANGE_PRECEDENCE < min_prec {
                    break;
                }
                self.advance();
                let end = self.parse_binary(RANGE_PRECEDENCE + 1)?;
                let step = if self.check(TokenKind::Identifier("step".into())) {
                    self.advance();
                    Some(Box::new(self.parse_binary(RANGE_PRECEDENCE + 1)?))
                } else {
                    None
                };
                let end_span = step.as_ref().map(|s| s.span()).unwrap_or_else(|| end.span());
                let span = left.span().union(end_span);
                left = Expr::Range {
                    start: Box::new(left),
                    end: Box::new(end),
                    step,
                    span,
                };
                continue;
            }

            let (op, prec) = match self.current_binary_op() {
                Some(info) => info,
                None => break,
            };
            if prec < min_prec || self.starts_new_line_with_prefix() {
                break;
            }
            self.advance();
            let right = self.parse_binary(prec + 1)?;
            let span = left.span().union(right.span());
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = match self.peek_kind() {
            Some(TokenKind::Bang) => PrefixOp::Not,
            Some(TokenKind::Minus) => PrefixOp::Neg,
            Some(TokenKind::Plus) => PrefixOp::Plus,
            Some(TokenKind::TypeOf) => PrefixOp::TypeOf,
            Some(TokenKind::Ampersand) => PrefixOp::AddressOf,
            Some(TokenKind::Star) => PrefixOp::Deref,
            _ => return self.parse_postfix(),
        };
        let start = self.advance().span.start;
        let expr = self.parse_unary()?;
        let span = Span::new(start, expr.span().end);
        Ok(Expr::Prefix {
            op,
            expr: Box::new(expr),
            span,
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.starts_new_line_with_prefix() {
                break;
            }
            if self.matches(TokenKind::LParen) {
                let span_start = expr.span().start;
                let args = self.parse_unrestricted(|parser| {
                    let mut args = Vec::new();
                    if !parser.check(TokenKind::RParen) {
                        loop {
                            args.push(parser.parse_expression()?);
                            if parser.matches(TokenKind::Comma) {
                                continue;
                            }
                            break;
                        }
                    }
                    Ok(args)
                })?;
                let end = self.expect(TokenKind::RParen)?.span.end;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                    span: Span::new(span_start, end),
                };
                continue;
            }
            if self.matches(TokenKind::Dot) {
                let name = self.expect_identifier("Expected member name after '.'")?;
                let span = expr.span().union(name.span);
                expr = Expr::Member {
                    owner: Box::new(expr),
                    name,
                    span,
                };
                continue;
            }
            if self.matches(TokenKind::LBracket) {
                let index = self.parse_unrestricted(|parser| parser.parse_expression())?;
                let end = self.expect(TokenKind::RBracket)?.span.end;
                let span = Span::new(expr.span().start, end);
                expr = Expr::Index {
                    owner: Box::new(expr),
                    index: Box::new(index),
                    span,
                };
                continue;
            }
            break;
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::Number(value)) => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::Number(value), span))
            }
            Some(TokenKind::String(value)) => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::String(value), span))
            }
            Some(TokenKind::True) => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::Bool(true), span))
            }
            Some(TokenKind::False) => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::Bool(false), span))
            }
            Some(TokenKind::Nil) => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::Nil, span))
            }
            Some(TokenKind::Identifier(_)) => self.parse_identifier_expression(),
            Some(TokenKind::LParen) => {
                self.advance();
                let expr = self.parse_unrestricted(|parser| parser.parse_expression())?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            Some(TokenKind::LBrace) => {
                let block = self.parse_block()?;
                Ok(Expr::Block(Box::new(block)))
            }
            Some(TokenKind::If) => {
                let start = self.advance().span.start;
                Ok(Expr::If(Box::new(self.parse_if(start)?)))
            }
            Some(TokenKind::Switch) => {
                let start = self.advance().span.start;
                self.parse_switch(start)
            }
            Some(TokenKind::Try) => {
                let start = self.advance().span.start;
                let body = self.parse_block()?;
                self.expect(TokenKind::Catch)?;
                let binding = match self.peek_kind() {
                    Some(TokenKind::Identifier(_)) => {
                        Some(self.expect_identifier("Expected error binding")?)
                    }
                    _ => None,
                };
                let handler = self.parse_block()?;
                let span = Span::new(start, handler.span.end);
                Ok(Expr::Try(Box::new(TryExpr {
                    body,
                    binding,
                    handler,
                    span,
                })))
            }
            Some(TokenKind::Fn) => {
                let start = self.advance().span.start;
                Ok(Expr::Function(self.parse_function_literal(start)?))
            }
            Some(TokenKind::LBracket) => self.parse_array_literal(),
            Some(TokenKind::Map) => self.parse_map_literal(),
            _ => Err(self.error_here("Unexpected token in expression")),
        }
    }

    fn parse_identifier_expression(&mut self) -> Result<Expr, SyntaxError> {
        let is_struct_literal = !self.restrict_struct_literal
            && self.peek_kind_n(1) == Some(TokenKind::LBrace)
            && match self.peek_kind_n(2) {
                Some(TokenKind::RBrace) => true,
                Some(TokenKind::Identifier(_)) => self.peek_kind_n(3) == Some(TokenKind::Colon),
                _ => false,
            };
        let ident = self.expect_identifier("Expected identifier")?;
        if !is_struct_literal {
            return Ok(Expr::Identifier(ident));
        }

        self.expect(TokenKind::LBrace)?;
        let fields = self.parse_unrestricted(|parser| {
            let mut fields = Vec::new();
            while !parser.check(TokenKind::RBrace) && !parser.is_eof() {
                let name = parser.expect_identifier("Expected field name")?;
                parser.expect(TokenKind::Colon)?;
                let value = parser.parse_expression()?;
                fields.push(StructLiteralField { name, value });
                if !parser.matches(TokenKind::Comma) {
                    break;
                }
            }
            Ok(fields)
        })?;
        let end = self.expect(TokenKind::RBrace)?.span.end;
        let span = Span::new(ident.span.start, end);
        Ok(Expr::StructLiteral {
            name: ident,
            fields,
            span,
        })
    }

    fn parse_if(&mut self, start: usize) -> Result<IfExpr, SyntaxError> {
        let condition = self.parse_restricted(|parser| parser.parse_expression())?;
        let then_branch = self.parse_block()?;
        let else_branch = if self.matches(TokenKind::Else) {
            if self.check(TokenKind::If) {
                let nested_start = self.advance().span.start;
                Some(ElseBranch::If(Box::new(self.parse_if(nested_start)?)))
            } else {
                Some(ElseBranch::Block(self.parse_block()?))
            }
        } else {
            None
        };
        let end = match &else_branch {
            Some(ElseBranch::Block(block)) => block.span.end,
            Some(ElseBranch::If(nested)) => nested.span.end,
            None => then_branch.span.end,
        };
        Ok(IfExpr {
            condition,
            then_branch,
            else_branch,
            span: Span::new(start, end),
        })
    }

    fn parse_switch(&mut self, start: usize) -> Result<Expr, SyntaxError> {
        let discriminant = self.parse_restricted(|parser| parser.parse_expression())?;
        self.expect(TokenKind::LBrace)?;
        let mut cases = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            if self.matches(TokenKind::Semi) {
                continue;
            }
            let case_start = self.current_span_start();
            if self.matches(TokenKind::Default) {
                let body = self.parse_block()?;
                cases.push(SwitchCase {
                    patterns: Vec::new(),
                    is_default: true,
                    span: Span::new(case_start, body.span.end),
                    body,
                });
                continue;
            }
            self.expect(TokenKind::Case)?;
            let patterns = self.parse_restricted(|parser| {
                let mut patterns = Vec::new();
                loop {
                    patterns.push(parser.parse_expression()?);
                    if parser.matches(TokenKind::Comma) {
                        continue;
                    }
                    break;
                }
                Ok(patterns)
            })?;
            let body = self.parse_block()?;
            cases.push(SwitchCase {
                patterns,
                is_default: false,
                span: Span::new(case_start, body.span.end),
                body,
            });
        }
        let end = self.expect(TokenKind::RBrace)?.span.end;
        Ok(Expr::Switch(Box::new(SwitchExpr {
            discriminant,
            cases,
            span: Span::new(start, end),
        })))
    }

    fn parse_array_literal(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.expect(TokenKind::LBracket)?.span.start;
        if self.matches(TokenKind::RBracket) {
            let element = self.parse_type_annotation()?;
            let (values, end) = self.parse_literal_values()?;
            return Ok(Expr::SliceLiteral {
                element,
                values,
                span: Span::new(start, end),
            });
        }
        let size = self.parse_unrestricted(|parser| parser.parse_expression())?;
        self.expect(TokenKind::RBracket)?;
        let element = self.parse_type_annotation()?;
        let (values, end) = self.parse_literal_values()?;
        Ok(Expr::ArrayLiteral {
            size: Box::new(size),
            element,
            values,
            span: Span::new(start, end),
        })
    }

    fn parse_literal_values(&mut self) -> Result<(Vec<Expr>, usize), SyntaxError> {
        self.expect(TokenKind::LBrace)?;
        let values = self.parse_unrestricted(|parser| {
            let mut values = Vec::new();
            while !parser.check(TokenKind::RBrace) && !parser.is_eof() {
                values.push(parser.parse_expression()?);
                if !parser.matches(TokenKind::Comma) {
                    break;
                }
            }
            Ok(values)
        })?;
        let end = self.expect(TokenKind::RBrace)?.span.end;
        Ok((values, end))
    }

    fn parse_map_literal(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.expect(TokenKind::Map)?.span.start;
        self.expect(TokenKind::LBracket)?;
        let key = self.parse_type_annotation()?;
        self.expect(TokenKind::Arrow)?;
        let value = self.parse_type_annotation()?;
        self.expect(TokenKind::RBracket)?;
        self.expect(TokenKind::LBrace)?;
        let entries = self.parse_unrestricted(|parser| {
            let mut entries = Vec::new();
            while !parser.check(TokenKind::RBrace) && !parser.is_eof() {
                let key = parser.parse_expression()?;
                parser.expect(TokenKind::Colon)?;
                let value = parser.parse_expression()?;
                entries.push((key, value));
                if !parser.matches(TokenKind::Comma) {
                    break;
                }
            }
            Ok(entries)
        })?;
        let end = self.expect(TokenKind::RBrace)?.span.end;
        Ok(Expr::MapLiteral {
            key,
            value,
            entries,
            span: Span::new(start, end),
        })
    }

    fn parse_type_annotation(&mut self) -> Result<TypeAnnotation, SyntaxError> {
        let start = self.current_span_start();
        let ty = self.parse_type_expr()?;
        let end = self.last_span_end(start);
        Ok(TypeAnnotation {
            ty,
            span: Span::new(start, end),
        })
    }

    fn parse_type_expr(&mut self) -> Result<TypeExpr, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::LBracket) => {
                self.advance();
                if self.matches(TokenKind::RBracket) {
                    let element = self.parse_type_expr()?;
                    return Ok(TypeExpr::Slice(Box::new(element)));
                }
                let size = self.parse_unrestricted(|parser| parser.parse_expression())?;
                self.expect(TokenKind::RBracket)?;
                let element = self.parse_type_expr()?;
                Ok(TypeExpr::Array {
                    size: Box::new(size),
                    element: Box::new(element),
                })
            }
            Some(TokenKind::Map) => {
                self.advance();
                self.expect(TokenKind::LBracket)?;
                let key = self.parse_type_expr()?;
                self.expect(TokenKind::Arrow)?;
                let value = self.parse_type_expr()?;
                self.expect(TokenKind::RBracket)?;
                Ok(TypeExpr::Map {
                    key: Box::new(key),
                    value: Box::new(value),
                })
            }
            Some(TokenKind::Star) => {
                self.advance();
                let pointee = self.parse_type_expr()?;
                Ok(TypeExpr::Pointer(Box::new(pointee)))
            }
            Some(TokenKind::Fn) => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let params = self.parse_type_params()?;
                let ret = if self.matches(TokenKind::Arrow) {
                    Some(Box::new(self.parse_type_expr()?))
                } else {
                    None
                };
                Ok(TypeExpr::Function { params, ret })
            }
            Some(TokenKind::Nil) => {
                let span = self.advance().span;
                Ok(TypeExpr::Named("nil".into(), span))
            }
            Some(TokenKind::Identifier(name)) => {
                let span = self.advance().span;
                Ok(TypeExpr::Named(name, span))
            }
            _ => Err(self.error_here("Expected type")),
        }
    }

    /// Parameter list of a function type, after the opening parenthesis.
    /// Each entry is `T` or `label: T`.
    fn parse_type_params(&mut self) -> Result<Vec<TypeParam>, SyntaxError> {
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let label = match (self.peek_kind(), self.peek_kind_n(1)) {
                    (Some(TokenKind::Identifier(label)), Some(TokenKind::Colon)) => {
                        self.advance();
                        self.advance();
                        Some(label)
                    }
                    _ => None,
                };
                let ty = self.parse_type_expr()?;
                params.push(TypeParam { label, ty });
                if self.matches(TokenKind::Comma) {
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    fn current_binary_op(&self) -> Option<(BinaryOp, u8)> {
        match self.peek_kind() {
            Some(TokenKind::QuestionQuestion) => Some((BinaryOp::NilCoalesce, 1)),
            Some(TokenKind::PipePipe) => Some((BinaryOp::Or, 2)),
            Some(TokenKind::AmpersandAmpersand) => Some((BinaryOp::And, 3)),
            Some(TokenKind::Pipe) => Some((BinaryOp::BitOr, 4)),
            Some(TokenKind::Ampersand) => Some((BinaryOp::BitAnd, 5)),
            Some(TokenKind::EqEq) => Some((BinaryOp::Eq, 6)),
            Some(TokenKind::BangEq) => Some((BinaryOp::NotEq, 6)),
            Some(TokenKind::Lt) => Some((BinaryOp::Lt, 7)),
            Some(TokenKind::LtEq) => Some((BinaryOp::LtEq, 7)),
            Some(TokenKind::Gt) => Some((BinaryOp::Gt, 7)),
            Some(TokenKind::GtEq) => Some((BinaryOp::GtEq, 7)),
            Some(TokenKind::Plus) => Some((BinaryOp::Add, 9)),
            Some(TokenKind::Minus) => Some((BinaryOp::Sub, 9)),
            Some(TokenKind::Star) => Some((BinaryOp::Mul, 10)),
            Some(TokenKind::Slash) => Some((BinaryOp::Div, 10)),
            Some(TokenKind::Percent) => Some((BinaryOp::Rem, 10)),
            _ => None,
        }
    }

    fn current_assign_op(&self) -> Option<AssignOp> {
        match self.peek_kind() {
            Some(TokenKind::Eq) => Some(AssignOp::Assign),
            Some(TokenKind::PlusEq) => Some(AssignOp::Add),
            Some(TokenKind::MinusEq) => Some(AssignOp::Sub),
            Some(TokenKind::StarEq) => Some(AssignOp::Mul),
            Some(TokenKind::SlashEq) => Some(AssignOp::Div),
            Some(TokenKind::PercentEq) => Some(AssignOp::Rem),
            Some(TokenKind::AmpersandEq) => Some(AssignOp::BitAnd),
            Some(TokenKind::PipeEq) => Some(AssignOp::BitOr),
            Some(TokenKind::QuestionQuestionEq) => Some(AssignOp::NilCoalesce),
            Some(TokenKind::PlusPlus) => Some(AssignOp::Increment),
            Some(TokenKind::MinusMinus) => Some(AssignOp::Decrement),
            _ => None,
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.peek_kind(),
            Some(TokenKind::Semi)
                | Some(TokenKind::RBrace)
                | Some(TokenKind::Eof)
                | Some(TokenKind::Case)
                | Some(TokenKind::Default)
                | None
        )
    }

    fn expect_identifier(&mut self, msg: &str) -> Result<Identifier, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::Identifier(name)) => {
                let span = self.advance().span;
                Ok(Identifier { name, span })
            }
            _ => Err(self.error_here(msg)),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&Token, SyntaxError> {
        if self.check(kind.clone()) {
            Ok(self.advance())
        } else {
            Err(self.error_here(&format!("Expected {}", kind.describe())))
        }
    }

    fn consume_optional(&mut self, kind: TokenKind) -> bool {
        self.matches(kind)
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        matches!(self.peek_kind(), Some(tk) if tk == kind)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|t| t.kind.clone())
    }

    fn peek_kind_n(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + n).map(|t| t.kind.clone())
    }

    fn advance(&mut self) -> &Token {
        let index = self.pos.min(self.tokens.len().saturating_sub(1));
        self.pos = (self.pos + 1).min(self.tokens.len());
        &self.tokens[index]
    }

    /// `-x`, `*p`, `(a)` and friends at the start of a line begin a new
    /// statement rather than continuing the previous expression.
    fn starts_new_line_with_prefix(&self) -> bool {
        match self.tokens.get(self.pos) {
            Some(token) if token.line_start => matches!(
                token.kind,
                TokenKind::Minus
                    | TokenKind::Plus
                    | TokenKind::Star
                    | TokenKind::Ampersand
                    | TokenKind::LParen
                    | TokenKind::LBracket
            ),
            _ => false,
        }
    }

    fn is_eof(&self) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Eof) | None)
    }

    fn current_span_start(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|t| t.span.start)
            .unwrap_or_else(|| self.tokens.last().map(|t| t.span.end).unwrap_or(0))
    }

    fn last_span_end(&self, fallback: usize) -> usize {
        if self.pos == 0 {
            return fallback;
        }
        self.tokens
            .get(self.pos - 1)
            .map(|t| t.span.end)
            .unwrap_or(fallback)
    }

    fn error_here(&self, message: &str) -> SyntaxError {
        let token = self.tokens.get(self.pos).or_else(|| self.tokens.last());
        match token {
            Some(token) => SyntaxError::new(
                format!("{message}, found {}", token.kind.describe()),
                token.span,
            ),
            None => SyntaxError::new(message.to_string(), Span::new(0, 0)),
        }
    }

    fn report(&mut self, err: SyntaxError) {
        self.errors.push(err);
    }

    fn synchronize(&mut self) {
        if !self.is_eof() {
            self.advance();
        }
        while !self.is_eof() {
            match self.peek_kind() {
                Some(TokenKind::Semi) => {
                    self.advance();
                    return;
                }
                Some(
                    TokenKind::Let
                    | TokenKind::Const
                    | TokenKind::Fn
                    | TokenKind::Struct
                    | TokenKind::Interface
                    | TokenKind::Import
                    | TokenKind::For
                    | TokenKind::Return,
                ) => return,
                _ => {
                    self.advance();
                }
            }
        }
    }
}

fn is_assignable(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Identifier(_)
            | Expr::Index { .. }
            | Expr::Member { .. }
            | Expr::Prefix {
                op: PrefixOp::Deref,
                ..
            }
    )
}
