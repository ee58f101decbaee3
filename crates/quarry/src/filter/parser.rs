//! Recursive-descent parser for the filter language.
//!
//! ```text
//! Or         := And ('||' And)*
//! And        := Unary ('&&' Unary)*
//! Unary      := '!' Unary | Primary
//! Primary    := '(' Or ')' | Path (Quantifier | Projection? Comparison)
//! Path       := Ident ('.' Ident)*
//! Quantifier := ':' ('any' | 'all') '(' Or? ')'
//! Projection := ':' 'count'
//! Comparison := Operator (':' 'i')? (Literal | List)
//! ```

use crate::error::{ParseError, SyntaxError};
use crate::filter::ast::{
    ComparisonNode, Literal, LogicalNode, LogicalOp, Node, Projection, ProjectionNode,
    PropertyNode, PropertyPath, QuantifierKind, QuantifierNode,
};
use crate::filter::lexer::Tokens;
use crate::filter::token::{Token, TokenKind};
use crate::op::Op;

/// Deepest nesting of groups, negations and quantifiers accepted.
pub const MAX_NESTING: usize = 64;

/// Parses filter text into an AST.
pub fn parse(input: &str) -> Result<Node, ParseError> {
    Parser::new(input).parse()
}

pub struct Parser {
    tokens: Tokens,
    depth: usize,
}

impl Parser {
    pub fn new(input: &str) -> Self {
        Parser {
            tokens: Tokens::new(input),
            depth: 0,
        }
    }

    /// Parses the whole input; trailing tokens are an error.
    pub fn parse(mut self) -> Result<Node, ParseError> {
        let node = self.parse_or()?;
        let trailing = self.tokens.next()?;
        if !trailing.is(TokenKind::End) {
            return Err(syntax("unexpected token after complete expression", trailing));
        }
        Ok(node)
    }

    fn check(&mut self, kind: TokenKind) -> Result<bool, ParseError> {
        Ok(self.tokens.peek()?.is(kind))
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<Token, ParseError> {
        let token = self.tokens.next()?;
        if token.is(kind) {
            Ok(token)
        } else {
            Err(syntax(message, token))
        }
    }

    fn parse_or(&mut self) -> Result<Node, ParseError> {
        let mut terms = vec![self.parse_and()?];
        while self.check(TokenKind::Or)? {
            self.tokens.next()?;
            terms.push(self.parse_and()?);
        }
        Ok(LogicalNode::join(LogicalOp::Or, terms))
    }

    fn parse_and(&mut self) -> Result<Node, ParseError> {
        let mut terms = vec![self.parse_unary()?];
        while self.check(TokenKind::And)? {
            self.tokens.next()?;
            terms.push(self.parse_unary()?);
        }
        Ok(LogicalNode::join(LogicalOp::And, terms))
    }

    // Every recursive rule passes through here, so this bounds the stack.
    fn parse_unary(&mut self) -> Result<Node, ParseError> {
        if self.depth == MAX_NESTING {
            let token = self.tokens.peek()?.clone();
            return Err(syntax("expression is nested too deeply", token));
        }
        self.depth += 1;
        let node = self.parse_unary_inner();
        self.depth -= 1;
        node
    }

    fn parse_unary_inner(&mut self) -> Result<Node, ParseError> {
        if self.check(TokenKind::Not)? {
            self.tokens.next()?;
            let inner = self.parse_unary()?;
            return Ok(Node::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        let token = self.tokens.next()?;
        match token.kind {
            TokenKind::LParen => {
                let inner = self.parse_or()?;
                self.expect(TokenKind::RParen, "expected ')' to close group")?;
                Ok(inner)
            }
            TokenKind::Identifier => {
                let path = self.parse_path(token)?;
                self.parse_after_path(path)
            }
            _ => Err(syntax("expected a property name or '('", token)),
        }
    }

    fn parse_path(&mut self, first: Token) -> Result<PropertyPath, ParseError> {
        let mut segments = vec![first.text];
        while self.check(TokenKind::Dot)? {
            self.tokens.next()?;
            let segment = self.expect(TokenKind::Identifier, "expected property name after '.'")?;
            segments.push(segment.text);
        }
        Ok(PropertyPath { segments })
    }

    fn parse_after_path(&mut self, path: PropertyPath) -> Result<Node, ParseError> {
        if !self.check(TokenKind::Colon)? {
            return self.parse_comparison(PropertyNode::Path(path));
        }
        self.tokens.next()?;

        let modifier = self.tokens.next()?;
        match modifier.kind {
            TokenKind::Any => self.parse_quantifier(path, QuantifierKind::Any),
            TokenKind::All => self.parse_quantifier(path, QuantifierKind::All),
            TokenKind::Identifier if modifier.text == "count" => {
                let next = self.tokens.peek()?.clone();
                match next.kind {
                    TokenKind::Dot => Err(syntax(
                        "':count' must be the final segment of a property path",
                        next,
                    )),
                    TokenKind::Colon => Err(syntax(
                        "a path segment may carry only one modifier",
                        next,
                    )),
                    _ => self.parse_comparison(PropertyNode::Projection(ProjectionNode {
                        source: path,
                        projection: Projection::Count,
                    })),
                }
            }
            _ => Err(syntax(
                "expected 'any', 'all' or 'count' after ':'",
                modifier,
            )),
        }
    }

    fn parse_quantifier(
        &mut self,
        source: PropertyPath,
        kind: QuantifierKind,
    ) -> Result<Node, ParseError> {
        self.expect(TokenKind::LParen, "expected '(' after quantifier")?;

        let predicate = if self.check(TokenKind::RParen)? {
            if kind == QuantifierKind::All {
                let token = self.tokens.next()?;
                return Err(syntax("':all' requires a predicate", token));
            }
            None
        } else {
            Some(Box::new(self.parse_or()?))
        };
        self.expect(TokenKind::RParen, "expected ')' to close quantifier")?;

        let next = self.tokens.peek()?.clone();
        match next.kind {
            TokenKind::Colon => Err(syntax("a path segment may carry only one modifier", next)),
            TokenKind::Dot => Err(syntax(
                "a quantifier must be the final segment of a property path",
                next,
            )),
            _ => Ok(Node::Quantifier(QuantifierNode {
                source,
                kind,
                predicate,
            })),
        }
    }

    fn parse_comparison(&mut self, left: PropertyNode) -> Result<Node, ParseError> {
        let token = self.tokens.next()?;
        let op = comparison_op(&token)
            .ok_or_else(|| syntax("expected a comparison operator", token.clone()))?;

        let case_insensitive = if self.check(TokenKind::Colon)? {
            self.tokens.next()?;
            let flag = self.tokens.next()?;
            if !(flag.is(TokenKind::Identifier) && flag.text == "i") {
                return Err(syntax("unsupported operator modifier", flag));
            }
            true
        } else {
            false
        };

        let right = if op == Op::In {
            let open = self.expect(TokenKind::LBracket, "'in' requires a list literal")?;
            self.parse_list(open)?
        } else {
            let value = self.tokens.next()?;
            if value.is(TokenKind::LBracket) {
                return Err(syntax("list literals are only valid with 'in'", value));
            }
            scalar_literal(value)?
        };

        Ok(Node::Comparison(ComparisonNode {
            left,
            op,
            case_insensitive,
            right,
        }))
    }

    fn parse_list(&mut self, open: Token) -> Result<Literal, ParseError> {
        let mut items = Vec::new();
        if self.check(TokenKind::RBracket)? {
            self.tokens.next()?;
            return Ok(Literal::List(items));
        }
        loop {
            let value = self.tokens.next()?;
            items.push(scalar_literal(value)?);

            let separator = self.tokens.next()?;
            match separator.kind {
                TokenKind::Comma => continue,
                TokenKind::RBracket => return Ok(Literal::List(items)),
                TokenKind::End => {
                    let message =
                        format!("list opened at position {} is not closed", open.position);
                    return Err(syntax(&message, separator));
                }
                _ => return Err(syntax("expected ',' or ']' in list literal", separator)),
            }
        }
    }
}

fn comparison_op(token: &Token) -> Option<Op> {
    Some(match token.kind {
        TokenKind::Eq => Op::Eq,
        TokenKind::Ne => Op::Ne,
        TokenKind::Lt => Op::Lt,
        TokenKind::Lte => Op::Lte,
        TokenKind::Gt => Op::Gt,
        TokenKind::Gte => Op::Gte,
        TokenKind::Contains => Op::Contains,
        TokenKind::StartsWith => Op::StartsWith,
        TokenKind::EndsWith => Op::EndsWith,
        TokenKind::In => Op::In,
        _ => return None,
    })
}

fn scalar_literal(token: Token) -> Result<Literal, ParseError> {
    match token.kind {
        TokenKind::Number => Ok(Literal::Number(token.text)),
        TokenKind::String => Ok(Literal::String(token.text)),
        TokenKind::True => Ok(Literal::Bool(true)),
        TokenKind::False => Ok(Literal::Bool(false)),
        TokenKind::Null => Ok(Literal::Null),
        _ => Err(syntax("expected a literal value", token)),
    }
}

fn syntax(message: &str, token: Token) -> ParseError {
    ParseError::Syntax(SyntaxError::new(message, token))
}
