//! Property-based tests for package list filtering
//!
//! These tests verify:
//! - Comment and blank lines never produce package names
//! - Every real package line survives, in file order
//! - Hardware choices parse back from their command line spelling

use archsetup::packages::{install_command, parse_package_list};
use archsetup::{GpuDriver, KeyboardLayout};
use proptest::prelude::*;

/// A line of a package list, tagged with whether it names a package
#[derive(Debug, Clone)]
enum Line {
    Package(String),
    Comment(String),
    Blank(String),
}

fn line_strategy() -> impl Strategy<Value = Line> {
    prop_oneof![
        "[a-z0-9][a-z0-9@._+-]{0,30}".prop_map(Line::Package),
        ("[ \t]{0,3}", "[ -~]{0,30}").prop_map(|(pad, text)| Line::Comment(format!("{}#{}", pad, text))),
        "[ \t]{0,4}".prop_map(Line::Blank),
    ]
}

fn render(lines: &[Line], crlf: bool) -> String {
    let eol = if crlf { "\r\n" } else { "\n" };
    lines
        .iter()
        .map(|l| match l {
            Line::Package(p) => p.clone(),
            Line::Comment(c) => c.clone(),
            Line::Blank(b) => b.clone(),
        })
        .collect::<Vec<_>>()
        .join(eol)
}

proptest! {
    /// Exactly the package lines come out, in order, duplicates kept
    #[test]
    fn parse_keeps_exactly_package_lines(lines in prop::collection::vec(line_strategy(), 0..40), crlf in any::<bool>()) {
        let text = render(&lines, crlf);
        let expected: Vec<String> = lines
            .iter()
            .filter_map(|l| match l {
                Line::Package(p) => Some(p.clone()),
                _ => None,
            })
            .collect();
        prop_assert_eq!(parse_package_list(&text), expected);
    }

    /// Nothing parsed is empty, padded, or a comment
    #[test]
    fn parsed_names_are_clean(text in "[ -~\n\t]{0,400}") {
        for name in parse_package_list(&text) {
            prop_assert!(!name.is_empty());
            prop_assert!(!name.starts_with('#'));
            prop_assert_eq!(name.trim(), name.as_str());
        }
    }

    /// Each install command carries the skip-installed and no-prompt flags
    #[test]
    fn install_command_is_needed_noconfirm(pkg in "[a-z0-9][a-z0-9@._+-]{0,30}") {
        let spec = install_command("yay", &pkg);
        prop_assert_eq!(spec.args, vec!["-S".to_string(), "--needed".into(), "--noconfirm".into(), pkg]);
    }
}

#[test]
fn hardware_choices_parse_from_cli_spelling() {
    for (s, gpu) in [("nvidia", GpuDriver::Nvidia), ("other", GpuDriver::Other)] {
        assert_eq!(s.parse::<GpuDriver>().unwrap(), gpu);
    }
    for (s, kb) in [("us", KeyboardLayout::Us), ("latam", KeyboardLayout::Latam)] {
        assert_eq!(s.parse::<KeyboardLayout>().unwrap(), kb);
    }
}
