//! Plain-text rendering of a dropdown's read model

use dropsel_select::{CanonicalList, Dropdown, ListItem, SelectOption};
use std::fmt::Write;

/// Render a dropdown's state: header, visible tree when open, value line
pub fn render(name: &str, dropdown: &Dropdown) -> String {
    let view = dropdown.view();
    let mut out = String::new();

    let active = view
        .active_option()
        .map(|entry| entry.option.id.as_str());

    let _ = writeln!(
        out,
        "[{}] {}{} | {} visible{} | active: {}",
        name,
        if view.is_open { "open" } else { "closed" },
        if dropdown.is_disabled() { ", disabled" } else { "" },
        view.flat_options.len(),
        if view.use_virtualized_list { " (virtualized)" } else { "" },
        active.unwrap_or("none"),
    );

    if view.is_open {
        if !dropdown.search_term().is_empty() {
            let _ = writeln!(out, "  search: {:?}", dropdown.search_term());
        }
        render_tree(&mut out, view.display_list, |option| view.is_selected(option), active);
    }

    let _ = writeln!(
        out,
        "  value: {}  text: {:?}",
        dropdown.value().to_json(),
        dropdown.display_text()
    );
    out
}

/// Render a list, one line per group and option
pub fn render_tree<F>(out: &mut String, list: &CanonicalList, is_selected: F, active: Option<&str>)
where
    F: Fn(&SelectOption) -> bool,
{
    for item in list.items() {
        match item {
            ListItem::Option(option) => {
                render_option(out, option, option.disabled, &is_selected, active, 1)
            }
            ListItem::Group(group) => {
                let _ = writeln!(
                    out,
                    "  {}{}",
                    group.label,
                    if group.disabled { " (disabled)" } else { "" }
                );
                for option in &group.options {
                    render_option(out, option, group.is_option_disabled(option), &is_selected, active, 2);
                }
            }
        }
    }
}

fn render_option<F>(
    out: &mut String,
    option: &SelectOption,
    disabled: bool,
    is_selected: &F,
    active: Option<&str>,
    depth: usize,
) where
    F: Fn(&SelectOption) -> bool,
{
    let cursor = if active == Some(option.id.as_str()) { ">" } else { " " };
    let mark = if is_selected(option) { "x" } else { " " };
    let _ = writeln!(
        out,
        "{}{} [{}] {}  {}{}",
        "  ".repeat(depth),
        cursor,
        mark,
        option.id,
        option.label,
        if disabled { " (disabled)" } else { "" }
    );
}
