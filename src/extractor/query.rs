use crate::extractor::{ArgValue, CallFrame, QueryChain};
use crate::syntax::{ExprKind, LiteralKind, NodeKind, SyntaxNode};
use log::debug;

/// Extractor for fluent query-builder chains.
///
/// A chain is a run of member calls whose innermost receiver is a static call on a
/// type name, e.g. `Post::where('published', true)->latest()->paginate(15)`.
/// Member calls that do not bottom out in such a root are not chains on their own,
/// but their receivers and arguments are still searched.
///
/// Closures and arrow functions are not descended into, and neither are the arguments
/// of a chain that has been reported.
pub struct QueryExtractor;

impl QueryExtractor {
    /// Collects the query chains of a method body in source order.
    ///
    /// Passing a method declaration scans its body only; any other node is scanned as is.
    pub fn extract_queries(node: &SyntaxNode) -> Vec<QueryChain> {
        let mut chains = Vec::new();
        match node.kind() {
            NodeKind::Method => {
                if let Some(body) = node.child_by_field("body") {
                    Self::scan(body, &mut chains);
                }
            }
            _ => Self::scan(node, &mut chains),
        }
        chains
    }

    fn scan(node: &SyntaxNode, chains: &mut Vec<QueryChain>) {
        match node.kind() {
            NodeKind::Expr(ExprKind::Closure) => return,
            NodeKind::Expr(ExprKind::StaticCall) | NodeKind::Expr(ExprKind::MemberCall) => {
                if let Some(chain) = Self::resolve_chain(node) {
                    debug!("Found query chain: {}", chain);
                    chains.push(chain);
                    return;
                }
            }
            _ => {}
        }

        for child in node.children() {
            Self::scan(child, chains);
        }
    }

    /// Walks from the outermost call down through receivers to the static root.
    fn resolve_chain(outer: &SyntaxNode) -> Option<QueryChain> {
        let mut frames = Vec::new();
        let mut current = outer;

        loop {
            match current.kind() {
                NodeKind::Expr(ExprKind::MemberCall) => {
                    frames.push(Self::frame(current)?);
                    current = current.child_by_field("object")?;
                }
                NodeKind::Expr(ExprKind::StaticCall) => {
                    let scope = current.child_by_field("scope")?;
                    if scope.kind() != NodeKind::Name {
                        return None;
                    }
                    frames.push(Self::frame(current)?);
                    frames.reverse();
                    return Some(QueryChain {
                        model: scope.text(),
                        calls: frames,
                        line: outer.span().start_line,
                        text: outer.text(),
                    });
                }
                _ => return None,
            }
        }
    }

    fn frame(call: &SyntaxNode) -> Option<CallFrame> {
        let method = call.child_by_field("name")?.text();
        let args = call
            .child_by_field("arguments")
            .map(|list| {
                list.children()
                    .iter()
                    .filter(|c| c.kind() == NodeKind::Argument)
                    .map(Self::argument_value)
                    .collect()
            })
            .unwrap_or_default();

        Some(CallFrame { method, args })
    }

    fn argument_value(argument: &SyntaxNode) -> ArgValue {
        // Named arguments keep their label under the `name` field; the value is the
        // last expression child.
        argument
            .named_children()
            .filter(|c| !matches!(c.field(), Some("name") | Some("reference_modifier")))
            .last()
            .map(resolve_literal)
            .unwrap_or(ArgValue::Opaque)
    }
}

/// Resolves an expression to a literal value, or [`ArgValue::Opaque`].
pub fn resolve_literal(expr: &SyntaxNode) -> ArgValue {
    match expr.kind() {
        NodeKind::Expr(ExprKind::Literal(literal)) => {
            let text = expr.text();
            match literal {
                LiteralKind::String => ArgValue::String(decode_single_quoted(&text)),
                LiteralKind::InterpolatedString => {
                    if is_plain_string(expr) {
                        decode_double_quoted(&text)
                            .map(ArgValue::String)
                            .unwrap_or(ArgValue::Opaque)
                    } else {
                        ArgValue::Opaque
                    }
                }
                LiteralKind::Integer => parse_integer(&text),
                LiteralKind::Float => text
                    .replace('_', "")
                    .parse::<f64>()
                    .map(ArgValue::Float)
                    .unwrap_or(ArgValue::Opaque),
                LiteralKind::Boolean | LiteralKind::Null => ArgValue::Constant(text),
            }
        }
        NodeKind::Name => ArgValue::Constant(expr.text()),
        _ => ArgValue::Opaque,
    }
}

fn is_plain_string(expr: &SyntaxNode) -> bool {
    expr.named_children().all(|part| {
        matches!(
            part.grammar(),
            "string_content" | "string_value" | "escape_sequence"
        )
    })
}

/// Strips an optional `b` prefix and the surrounding quote characters.
fn unquote(text: &str, quote: char) -> &str {
    let text = text
        .strip_prefix('b')
        .or_else(|| text.strip_prefix('B'))
        .unwrap_or(text);
    text.strip_prefix(quote)
        .and_then(|t| t.strip_suffix(quote))
        .unwrap_or(text)
}

fn decode_single_quoted(text: &str) -> String {
    let body = unquote(text, '\'');
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if next == '\\' || next == '\'' {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Decodes a double-quoted body. `\x` and octal escapes yield raw bytes, so the
/// result is `None` when they do not form valid UTF-8.
fn decode_double_quoted(text: &str) -> Option<String> {
    let body = unquote(text, '"');
    let mut out: Vec<u8> = Vec::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            push_char(&mut out, c);
            continue;
        }
        let Some(&next) = chars.peek() else {
            out.push(b'\\');
            break;
        };
        let simple = match next {
            'n' => Some(b'\n'),
            't' => Some(b'\t'),
            'r' => Some(b'\r'),
            'v' => Some(0x0B),
            'e' => Some(0x1B),
            'f' => Some(0x0C),
            '\\' => Some(b'\\'),
            '$' => Some(b'$'),
            '"' => Some(b'"'),
            _ => None,
        };
        if let Some(decoded) = simple {
            out.push(decoded);
            chars.next();
            continue;
        }

        match next {
            'x' => {
                chars.next();
                let digits = take_digits(&mut chars, 2, 16);
                match u8::from_str_radix(&digits, 16) {
                    Ok(byte) => out.push(byte),
                    Err(_) => {
                        out.extend_from_slice(b"\\x");
                        out.extend_from_slice(digits.as_bytes());
                    }
                }
            }
            'u' => {
                chars.next();
                if chars.peek() == Some(&'{') {
                    chars.next();
                    let digits: String = chars.by_ref().take_while(|&d| d != '}').collect();
                    match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
                        Some(decoded) => push_char(&mut out, decoded),
                        None => {
                            out.extend_from_slice(b"\\u{");
                            out.extend_from_slice(digits.as_bytes());
                            out.push(b'}');
                        }
                    }
                } else {
                    out.extend_from_slice(b"\\u");
                }
            }
            '0'..='7' => {
                let digits = take_digits(&mut chars, 3, 8);
                // "\400" and above wrap to a single byte.
                match u32::from_str_radix(&digits, 8) {
                    Ok(value) => out.push((value & 0xFF) as u8),
                    Err(_) => {
                        out.push(b'\\');
                        out.extend_from_slice(digits.as_bytes());
                    }
                }
            }
            _ => out.push(b'\\'),
        }
    }

    String::from_utf8(out).ok()
}

fn push_char(out: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

fn take_digits(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    max: usize,
    radix: u32,
) -> String {
    let mut digits = String::new();
    while digits.len() < max {
        match chars.peek() {
            Some(&d) if d.is_digit(radix) => {
                digits.push(d);
                chars.next();
            }
            _ => break,
        }
    }
    digits
}

fn parse_integer(text: &str) -> ArgValue {
    let cleaned = text.replace('_', "");
    let lower = cleaned.to_ascii_lowercase();

    let parsed = if let Some(hex) = lower.strip_prefix("0x") {
        i64::from_str_radix(hex, 16)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i64::from_str_radix(bin, 2)
    } else if let Some(oct) = lower.strip_prefix("0o") {
        i64::from_str_radix(oct, 8)
    } else if lower.len() > 1 && lower.starts_with('0') {
        i64::from_str_radix(&lower[1..], 8)
    } else {
        lower.parse::<i64>()
    };

    match parsed {
        Ok(value) => ArgValue::Integer(value),
        // Integer literals past i64 become floats at runtime.
        Err(_) => lower
            .parse::<f64>()
            .map(ArgValue::Float)
            .unwrap_or(ArgValue::Opaque),
    }
}
