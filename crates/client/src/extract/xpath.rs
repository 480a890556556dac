//! XPath location paths translated to CSS selectors.
//!
//! Supported subset:
//! - `//` (descendant) and `/` (child) axes, with an optional leading `.`
//! - name tests and `*`
//! - predicates `[@a]`, `[@a='v']`, `[contains(@a,'v')]`, `[starts-with(@a,'v')]`,
//!   `[n]` and `[last()]`
//! - a final `/text()` or `/@attr` step choosing what value a match yields
//!
//! Positional predicates count siblings sharing the element name, so they
//! are only accepted as the first predicate of a step. After a filter such as
//! `[@class='row']` the position would be relative to the filtered set, which
//! CSS cannot express.
//!
//! Anything else is rejected at compile time.

use sitegrab_core::Error;

/// Which value a matched element contributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeValue {
    /// Concatenated descendant text.
    Text,
    /// Each direct text child on its own, as `/text()` selects.
    OwnText,
    /// Value of the named attribute; elements without it are not matches.
    Attr(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

/// Whether an expression should be read as XPath rather than CSS.
pub fn is_xpath(expr: &str) -> bool {
    let expr = expr.trim_start();
    expr.starts_with('/') || expr.starts_with("./")
}

/// Translate an XPath expression into a CSS selector and the value to extract.
pub fn translate(expr: &str) -> Result<(String, NodeValue), Error> {
    let fail = |reason: String| Error::Compilation { selector: expr.to_string(), reason };

    let mut rest = expr.trim();
    if let Some(relative) = rest.strip_prefix('.') {
        rest = relative;
    }

    let mut css = String::new();
    let mut value = NodeValue::Text;

    while !rest.is_empty() {
        let axis = if let Some(r) = rest.strip_prefix("//") {
            rest = r;
            Axis::Descendant
        } else if let Some(r) = rest.strip_prefix('/') {
            rest = r;
            Axis::Child
        } else {
            return Err(fail(format!("expected '/' or '//' before {rest:?}")));
        };

        let (step, tail) = split_step(rest).map_err(fail)?;
        rest = tail;

        if step.is_empty() {
            return Err(fail("empty location step".into()));
        }

        if step == "text()" || step.starts_with('@') {
            if !rest.is_empty() {
                return Err(fail(format!("{step} must be the last step")));
            }
            value = match step.strip_prefix('@') {
                Some(attr) if is_name(attr) => NodeValue::Attr(attr.to_string()),
                Some(attr) => return Err(fail(format!("invalid attribute name {attr:?}"))),
                None => NodeValue::OwnText,
            };
            break;
        }

        let compound = translate_step(step).map_err(fail)?;
        match (css.is_empty(), axis) {
            (true, Axis::Child) => {
                css.push_str(&compound);
                css.push_str(":root");
            }
            (true, Axis::Descendant) => css.push_str(&compound),
            (false, Axis::Child) => {
                css.push_str(" > ");
                css.push_str(&compound);
            }
            (false, Axis::Descendant) => {
                css.push(' ');
                css.push_str(&compound);
            }
        }
    }

    if css.is_empty() {
        return Err(fail("expression selects no element".into()));
    }

    Ok((css, value))
}

/// Split off the next location step, honouring brackets and quotes.
fn split_step(input: &str) -> Result<(&str, &str), String> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.checked_sub(1).ok_or("unbalanced ']'")?,
            (None, '/') if depth == 0 => return Ok((input[..i].trim(), &input[i..])),
            _ => {}
        }
    }

    if quote.is_some() {
        return Err("unterminated string literal".into());
    }
    if depth != 0 {
        return Err("unbalanced '['".into());
    }
    Ok((input.trim(), ""))
}

fn translate_step(step: &str) -> Result<String, String> {
    let (name, mut predicates) = match step.find('[') {
        Some(i) => (step[..i].trim(), &step[i..]),
        None => (step, ""),
    };

    if name != "*" && !is_name(name) {
        return Err(format!("unsupported node test {name:?}"));
    }

    let mut out = name.to_string();
    let mut first = true;
    while !predicates.is_empty() {
        let inner = predicates
            .strip_prefix('[')
            .ok_or_else(|| format!("unexpected {predicates:?} after predicate"))?;
        let end = closing_bracket(inner).ok_or("unbalanced '['")?;
        let predicate = inner[..end].trim();
        if !first && is_positional(predicate) {
            return Err(format!("positional predicate [{predicate}] must come first in its step"));
        }
        out.push_str(&translate_predicate(predicate, name == "*")?);
        predicates = inner[end + 1..].trim_start();
        first = false;
    }

    Ok(out)
}

fn closing_bracket(input: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, ']') => return Some(i),
            _ => {}
        }
    }
    None
}

fn is_positional(predicate: &str) -> bool {
    predicate == "last()" || (!predicate.is_empty() && predicate.chars().all(|c| c.is_ascii_digit()))
}

fn translate_predicate(predicate: &str, wildcard: bool) -> Result<String, String> {
    if !predicate.is_empty() && predicate.chars().all(|c| c.is_ascii_digit()) {
        let n: usize = predicate.parse().map_err(|_| format!("position out of range: {predicate}"))?;
        if n == 0 {
            return Err("positions start at 1".into());
        }
        return Ok(if wildcard { format!(":nth-child({n})") } else { format!(":nth-of-type({n})") });
    }

    if predicate == "last()" {
        return Ok(if wildcard { ":last-child".into() } else { ":last-of-type".into() });
    }

    for (function, operator) in [("contains(", "*="), ("starts-with(", "^=")] {
        if let Some(args) = predicate.strip_prefix(function) {
            let args = args.strip_suffix(')').ok_or_else(|| format!("unterminated {function}"))?;
            let (attr, literal) = args.split_once(',').ok_or_else(|| format!("{function} takes two arguments"))?;
            let attr = attribute(attr)?;
            return Ok(format!("[{attr}{operator}\"{}\"]", css_escape(string_literal(literal)?)));
        }
    }

    if predicate.starts_with('@') {
        return match predicate.split_once('=') {
            Some((attr, literal)) => {
                Ok(format!("[{}=\"{}\"]", attribute(attr)?, css_escape(string_literal(literal)?)))
            }
            None => Ok(format!("[{}]", attribute(predicate)?)),
        };
    }

    Err(format!("unsupported predicate [{predicate}]"))
}

fn attribute(raw: &str) -> Result<&str, String> {
    let name = raw
        .trim()
        .strip_prefix('@')
        .ok_or_else(|| format!("expected attribute, found {raw:?}"))?;
    if is_name(name) { Ok(name) } else { Err(format!("invalid attribute name {name:?}")) }
}

fn string_literal(raw: &str) -> Result<&str, String> {
    let raw = raw.trim();
    for q in ['\'', '"'] {
        if raw.len() >= 2 && raw.starts_with(q) && raw.ends_with(q) {
            return Ok(&raw[1..raw.len() - 1]);
        }
    }
    Err(format!("expected quoted string, found {raw:?}"))
}

fn css_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn css(expr: &str) -> String {
        translate(expr).unwrap().0
    }

    #[test]
    fn test_is_xpath() {
        assert!(is_xpath("//title"));
        assert!(is_xpath("  /html/body"));
        assert!(is_xpath(".//span"));
        assert!(!is_xpath("div.price > span"));
        assert!(!is_xpath("title"));
    }

    #[test]
    fn test_descendant_name() {
        assert_eq!(translate("//title").unwrap(), ("title".to_string(), NodeValue::Text));
    }

    #[test]
    fn test_absolute_path_anchors_at_root() {
        assert_eq!(css("/html/body/div"), "html:root > body > div");
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(css(".//ul/li"), "ul > li");
    }

    #[test]
    fn test_attribute_predicates() {
        assert_eq!(css("//div[@class='price']/span"), "div[class=\"price\"] > span");
        assert_eq!(css("//img[@alt]"), "img[alt]");
        assert_eq!(css("//a[contains(@href, 'product')]"), "a[href*=\"product\"]");
        assert_eq!(css("//a[starts-with(@href,\"/p/\")]"), "a[href^=\"/p/\"]");
    }

    #[test]
    fn test_positional_predicates() {
        assert_eq!(css("//li[2]"), "li:nth-of-type(2)");
        assert_eq!(css("//*[3]"), "*:nth-child(3)");
        assert_eq!(css("//li[last()]"), "li:last-of-type");
        assert_eq!(css("//tr[1][@class='row']"), "tr:nth-of-type(1)[class=\"row\"]");
    }

    #[test]
    fn test_positional_after_filter_is_rejected() {
        for expr in ["//tr[@class='row'][1]", "//li[@id][last()]", "//li[2][3]"] {
            let result = translate(expr);
            assert!(matches!(result, Err(Error::Compilation { .. })), "{expr}: {result:?}");
        }
    }

    #[test]
    fn test_terminal_text_and_attribute() {
        assert_eq!(translate("//h1/text()").unwrap(), ("h1".to_string(), NodeValue::OwnText));
        assert_eq!(translate("//a/@href").unwrap(), ("a".to_string(), NodeValue::Attr("href".into())));
    }

    #[test]
    fn test_slash_inside_literal_is_not_a_step() {
        assert_eq!(css("//a[@href='/x/y']"), "a[href=\"/x/y\"]");
    }

    #[test]
    fn test_literal_escaping() {
        assert_eq!(css("//p[@title='say \"hi\"']"), "p[title=\"say \\\"hi\\\"\"]");
    }

    #[test]
    fn test_rejects_unsupported() {
        for expr in [
            "//",
            "/text()",
            "//div[",
            "//div[@a=unquoted]",
            "//a/@href/b",
            "//div[0]",
            "//div[position()>1]",
            "//ns:div",
            "//a[@href='open",
            "//following-sibling::p",
        ] {
            let result = translate(expr);
            assert!(matches!(result, Err(Error::Compilation { .. })), "{expr} should not translate: {result:?}");
        }
    }
}
