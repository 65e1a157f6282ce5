//! # Content Expressions
//!
//! Parses and matches node content expressions such as
//! `"section_header (block | sectioning)+"` or `"admonition_caption? paragraph+"`.
//!
//! Grammar:
//!
//! ```text
//! expr      := seq ('|' seq)*
//! seq       := subscript+
//! subscript := atom ('*' | '+' | '?' | '{' n (',' m?)? '}')*
//! atom      := '(' expr ')' | name
//! ```
//!
//! Names resolve to node type names or groups at compile time.

use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ContentExpr {
    /// Matches nothing but the empty sequence (leaf nodes)
    Empty,
    /// One child whose type is in the set
    Name(BTreeSet<String>),
    Seq(Vec<ContentExpr>),
    Choice(Vec<ContentExpr>),
    Repeat {
        expr: Box<ContentExpr>,
        min: usize,
        max: Option<usize>,
    },
}

impl ContentExpr {
    /// Compile an expression, resolving names through `resolve`
    pub(crate) fn parse(
        source: &str,
        resolve: &dyn Fn(&str) -> BTreeSet<String>,
    ) -> Result<Self, String> {
        let tokens = tokenize(source);
        if tokens.is_empty() {
            return Ok(ContentExpr::Empty);
        }

        let mut parser = Parser {
            tokens,
            pos: 0,
            resolve,
        };
        let expr = parser.parse_expr()?;

        if parser.pos < parser.tokens.len() {
            return Err(format!("unexpected token '{}'", parser.tokens[parser.pos]));
        }

        Ok(expr)
    }

    pub(crate) fn is_empty(&self) -> bool {
        matches!(self, ContentExpr::Empty)
    }

    /// Every type name the expression can accept
    pub(crate) fn referenced_types(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_types(&mut out);
        out
    }

    fn collect_types(&self, out: &mut BTreeSet<String>) {
        match self {
            ContentExpr::Empty => {}
            ContentExpr::Name(set) => out.extend(set.iter().cloned()),
            ContentExpr::Seq(items) | ContentExpr::Choice(items) => {
                for item in items {
                    item.collect_types(out);
                }
            }
            ContentExpr::Repeat { expr, .. } => expr.collect_types(out),
        }
    }

    /// Whether the full sequence of child types matches
    pub(crate) fn matches(&self, types: &[&str]) -> bool {
        self.ends(types, 0).contains(&types.len())
    }

    /// All positions at which a match starting at `start` can end
    fn ends(&self, types: &[&str], start: usize) -> BTreeSet<usize> {
        match self {
            ContentExpr::Empty => BTreeSet::from([start]),

            ContentExpr::Name(set) => {
                let mut out = BTreeSet::new();
                if start < types.len() && set.contains(types[start]) {
                    out.insert(start + 1);
                }
                out
            }

            ContentExpr::Seq(items) => {
                let mut positions = BTreeSet::from([start]);
                for item in items {
                    positions = positions
                        .iter()
                        .flat_map(|&p| item.ends(types, p))
                        .collect();
                    if positions.is_empty() {
                        break;
                    }
                }
                positions
            }

            ContentExpr::Choice(items) => items
                .iter()
                .flat_map(|item| item.ends(types, start))
                .collect(),

            ContentExpr::Repeat { expr, min, max } => {
                let mut result = BTreeSet::new();
                let mut current = BTreeSet::from([start]);
                if *min == 0 {
                    result.insert(start);
                }

                // Bounded so that expressions matching the empty sequence terminate
                let limit = max.unwrap_or(*min + types.len().saturating_sub(start) + 1);
                for count in 1..=limit {
                    let next: BTreeSet<usize> = current
                        .iter()
                        .flat_map(|&p| expr.ends(types, p))
                        .collect();
                    if next.is_empty() {
                        break;
                    }
                    if count >= *min {
                        result.extend(next.iter().copied());
                    }
                    if next == current && count >= *min {
                        break;
                    }
                    current = next;
                }
                result
            }
        }
    }
}

fn tokenize(source: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut word = String::new();

    for ch in source.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            word.push(ch);
            continue;
        }
        if !word.is_empty() {
            tokens.push(std::mem::take(&mut word));
        }
        if !ch.is_whitespace() {
            tokens.push(ch.to_string());
        }
    }
    if !word.is_empty() {
        tokens.push(word);
    }

    tokens
}

struct Parser<'a> {
    tokens: Vec<String>,
    pos: usize,
    resolve: &'a dyn Fn(&str) -> BTreeSet<String>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_expr(&mut self) -> Result<ContentExpr, String> {
        let mut alternatives = vec![self.parse_seq()?];
        while self.eat("|") {
            alternatives.push(self.parse_seq()?);
        }

        Ok(if alternatives.len() == 1 {
            alternatives.remove(0)
        } else {
            ContentExpr::Choice(alternatives)
        })
    }

    fn parse_seq(&mut self) -> Result<ContentExpr, String> {
        let mut items = Vec::new();
        loop {
            items.push(self.parse_subscript()?);
            match self.peek() {
                None | Some(")") | Some("|") => break,
                _ => {}
            }
        }

        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            ContentExpr::Seq(items)
        })
    }

    fn parse_subscript(&mut self) -> Result<ContentExpr, String> {
        let mut expr = self.parse_atom()?;
        loop {
            let (min, max) = if self.eat("+") {
                (1, None)
            } else if self.eat("*") {
                (0, None)
            } else if self.eat("?") {
                (0, Some(1))
            } else if self.eat("{") {
                self.parse_range()?
            } else {
                break;
            };
            expr = ContentExpr::Repeat {
                expr: Box::new(expr),
                min,
                max,
            };
        }
        Ok(expr)
    }

    fn parse_range(&mut self) -> Result<(usize, Option<usize>), String> {
        let min = self.parse_number()?;
        let max = if self.eat(",") {
            if self.peek() == Some("}") {
                None
            } else {
                Some(self.parse_number()?)
            }
        } else {
            Some(min)
        };

        if !self.eat("}") {
            return Err("unclosed braced range".to_string());
        }
        Ok((min, max))
    }

    fn parse_number(&mut self) -> Result<usize, String> {
        let token = self.peek().unwrap_or_default().to_string();
        let value = token
            .parse::<usize>()
            .map_err(|_| format!("expected number, got '{}'", token))?;
        self.pos += 1;
        Ok(value)
    }

    fn parse_atom(&mut self) -> Result<ContentExpr, String> {
        if self.eat("(") {
            let expr = self.parse_expr()?;
            if !self.eat(")") {
                return Err("missing closing paren".to_string());
            }
            return Ok(expr);
        }

        let Some(name) = self.peek().map(str::to_string) else {
            return Err("unexpected end of expression".to_string());
        };
        if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(format!("unexpected token '{}'", name));
        }
        self.pos += 1;

        let types = (self.resolve)(&name);
        if types.is_empty() {
            return Err(format!("no node type or group '{}' found", name));
        }
        Ok(ContentExpr::Name(types))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(name: &str) -> BTreeSet<String> {
        let table: &[(&str, &[&str])] = &[
            ("paragraph", &["block"]),
            ("section", &["sectioning"]),
            ("section_header", &[]),
            ("text", &["inline"]),
        ];
        table
            .iter()
            .filter(|(n, groups)| *n == name || groups.contains(&name))
            .map(|(n, _)| n.to_string())
            .collect()
    }

    fn parse(source: &str) -> ContentExpr {
        ContentExpr::parse(source, &resolver).unwrap()
    }

    #[test]
    fn test_plus_requires_one() {
        let expr = parse("block+");
        assert!(!expr.matches(&[]));
        assert!(expr.matches(&["paragraph", "paragraph"]));
        assert!(!expr.matches(&["text"]));
    }

    #[test]
    fn test_star_and_optional() {
        assert!(parse("inline*").matches(&[]));
        assert!(parse("section_header? block").matches(&["paragraph"]));
        assert!(parse("section_header? block").matches(&["section_header", "paragraph"]));
    }

    #[test]
    fn test_grouped_choice() {
        let expr = parse("section_header (block | sectioning)+");
        assert!(expr.matches(&["section_header", "paragraph", "section"]));
        assert!(!expr.matches(&["section_header"]));
        assert!(!expr.matches(&["paragraph"]));
    }

    #[test]
    fn test_braced_ranges() {
        let expr = parse("paragraph{2,3}");
        assert!(!expr.matches(&["paragraph"]));
        assert!(expr.matches(&["paragraph", "paragraph"]));
        assert!(!expr.matches(&["paragraph", "paragraph", "paragraph", "paragraph"]));
        assert!(parse("paragraph{1,}").matches(&["paragraph"; 5]));
    }

    #[test]
    fn test_unknown_name_is_an_error() {
        let err = ContentExpr::parse("figure_content", &resolver).unwrap_err();
        assert!(err.contains("figure_content"));
    }

    #[test]
    fn test_nested_star_terminates() {
        let expr = parse("(inline*)*");
        assert!(expr.matches(&["text", "text"]));
    }
}
