//! HTML escaping and ANSI SGR to markup conversion for error and log text
//!
//! Text is escaped first and colorized second. Escaping leaves the escape
//! sequences intact, and the markup produced by colorizing is never escaped.

use std::sync::LazyLock;

use regex::Regex;

static ANSI_SEQUENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[([0-9;]*)([A-Za-z])").expect("ANSI pattern is valid")
});

const PALETTE: [&str; 16] = [
    "#000", "#A00", "#0A0", "#A50", "#00A", "#A0A", "#0AA", "#AAA", "#555", "#F55", "#5F5",
    "#FF5", "#55F", "#F5F", "#5FF", "#FFF",
];

/// Escape `& < > " '` as HTML entities
pub fn escape_html(unsafe_text: &str) -> String {
    let mut out = String::with_capacity(unsafe_text.len());
    for c in unsafe_text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
    out
}

/// Escape then colorize, the order every rendered error and log goes through
pub fn render_text(text: &str) -> String {
    ansi_to_html(&escape_html(text))
}

/// Replace SGR sequences with `<span style=...>` markup.
///
/// Every opened span is closed by a reset or at the end of the text.
/// Non-SGR sequences (cursor movement, erase) are dropped.
pub fn ansi_to_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut open_spans = 0usize;
    let mut last = 0;

    for caps in ANSI_SEQUENCE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&text[last..whole.start()]);
        last = whole.end();

        if &caps[2] != "m" {
            continue;
        }

        for action in parse_sgr(&caps[1]) {
            match action {
                SgrAction::Reset => {
                    close_spans(&mut out, open_spans);
                    open_spans = 0;
                }
                SgrAction::Style(style) => {
                    out.push_str("<span style=\"");
                    out.push_str(&style);
                    out.push_str("\">");
                    open_spans += 1;
                }
            }
        }
    }

    out.push_str(&text[last..]);
    close_spans(&mut out, open_spans);
    out
}

#[derive(Debug, PartialEq)]
enum SgrAction {
    Reset,
    Style(String),
}

fn parse_sgr(params: &str) -> Vec<SgrAction> {
    if params.is_empty() {
        return vec![SgrAction::Reset];
    }

    let codes: Vec<u32> = params
        .split(';')
        .map(|p| p.parse().unwrap_or(0))
        .collect();

    let mut actions = Vec::new();
    let mut i = 0;
    while i < codes.len() {
        let code = codes[i];
        match code {
            0 | 22 | 23 | 24 | 39 | 49 => actions.push(SgrAction::Reset),
            1 => actions.push(SgrAction::Style("font-weight:bold".to_string())),
            2 => actions.push(SgrAction::Style("opacity:0.5".to_string())),
            3 => actions.push(SgrAction::Style("font-style:italic".to_string())),
            4 => actions.push(SgrAction::Style("text-decoration:underline".to_string())),
            30..=37 => actions.push(color("color", PALETTE[(code - 30) as usize])),
            90..=97 => actions.push(color("color", PALETTE[(code - 90 + 8) as usize])),
            40..=47 => actions.push(color("background-color", PALETTE[(code - 40) as usize])),
            100..=107 => actions.push(color(
                "background-color",
                PALETTE[(code - 100 + 8) as usize],
            )),
            38 | 48 => {
                let property = if code == 38 { "color" } else { "background-color" };
                match codes.get(i + 1) {
                    Some(2) if i + 4 < codes.len() => {
                        let rgb = format!(
                            "rgb({},{},{})",
                            codes[i + 2].min(255),
                            codes[i + 3].min(255),
                            codes[i + 4].min(255)
                        );
                        actions.push(color(property, &rgb));
                        i += 4;
                    }
                    Some(5) if i + 2 < codes.len() => {
                        if let Some(hex) = PALETTE.get(codes[i + 2] as usize) {
                            actions.push(color(property, hex));
                        }
                        i += 2;
                    }
                    _ => {}
                }
            }
            _ => {}
        }
        i += 1;
    }
    actions
}

fn color(property: &str, value: &str) -> SgrAction {
    SgrAction::Style(format!("{}:{}", property, value))
}

fn close_spans(out: &mut String, count: usize) {
    for _ in 0..count {
        out.push_str("</span>");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#039;Jerry&#039;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_color_then_reset() {
        let html = ansi_to_html("\x1b[31mExpected\x1b[39m done");
        assert_eq!(html, "<span style=\"color:#A00\">Expected</span> done");
    }

    #[test]
    fn test_unclosed_span_is_closed() {
        let html = ansi_to_html("\x1b[1m\x1b[32mok");
        assert_eq!(
            html,
            "<span style=\"font-weight:bold\"><span style=\"color:#0A0\">ok</span></span>"
        );
    }

    #[test]
    fn test_non_sgr_sequences_dropped() {
        assert_eq!(ansi_to_html("a\x1b[2Kb"), "ab");
    }

    #[test]
    fn test_escape_before_colorize() {
        let html = render_text("\x1b[31m<div>\x1b[0m");
        assert_eq!(html, "<span style=\"color:#A00\">&lt;div&gt;</span>");
    }

    #[test]
    fn test_truecolor() {
        let html = ansi_to_html("\x1b[38;2;255;0;10mx\x1b[0m");
        assert_eq!(html, "<span style=\"color:rgb(255,0,10)\">x</span>");
    }
}
