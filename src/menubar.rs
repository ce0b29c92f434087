use std::io::Write;

use crossterm::{queue, style};

use crate::config::KeyBindings;

/// Menu bar entries for the given bindings.
pub fn menu_items(bindings: &KeyBindings) -> Vec<String> {
    vec![
        format!("[{}][{}] quit", bindings.quit, bindings.quit_alt),
        format!("[{}] restart", bindings.restart),
    ]
}

/// Print a menu item string, bolding any text inside `[...]` brackets.
/// Text outside brackets is printed dim.
pub fn print_menu_item(out: &mut impl Write, item: &str) -> anyhow::Result<()> {
    let mut rest = item;
    while !rest.is_empty() {
        let Some(open) = rest.find('[') else {
            queue!(
                out,
                style::SetAttribute(style::Attribute::Dim),
                style::Print(rest),
                style::SetAttribute(style::Attribute::Reset),
            )?;
            break;
        };
        if open > 0 {
            queue!(
                out,
                style::SetAttribute(style::Attribute::Dim),
                style::Print(&rest[..open]),
                style::SetAttribute(style::Attribute::Reset),
            )?;
        }
        rest = &rest[open..];
        match rest.find(']') {
            Some(close) => {
                queue!(
                    out,
                    style::SetAttribute(style::Attribute::Bold),
                    style::Print(&rest[..=close]),
                    style::SetAttribute(style::Attribute::Reset),
                )?;
                rest = &rest[close + 1..];
            }
            None => {
                queue!(out, style::Print(rest))?;
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_items_follow_bindings() {
        let bindings = KeyBindings {
            restart: "F5".into(),
            ..Default::default()
        };
        assert_eq!(menu_items(&bindings), vec!["[q][Esc] quit", "[F5] restart"]);
    }

    #[test]
    fn test_brackets_are_bold() {
        let mut out = Vec::new();
        print_menu_item(&mut out, "[r] restart").unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("\x1b[1m[r]"));
        assert!(text.contains("\x1b[2m restart"));
    }

    #[test]
    fn test_unclosed_bracket_printed_plain() {
        let mut out = Vec::new();
        print_menu_item(&mut out, "[oops").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[oops");
    }
}
