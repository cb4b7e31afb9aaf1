//! Terminal renderers for listings and diffs.
//!
//! The diff view is two panes side by side, reference on the left and
//! fresh build on the right, with a one-character opcode gutter in the
//! middle. Changed spans inside replaced lines are underlined with
//! carets on a marker row, the way assemblers point at columns.

use colored::{ColoredString, Colorize};
use pad::PadStr;
use romdiff_lib::diff::{Changes, Event, Opcode, Span};
use romdiff_lib::disasm::{Disassembly, Item};

/// Pane width; wide enough for any rendered instruction.
const PANE: usize = 40;
/// Tab stops used when flattening rendered lines.
const TAB: usize = 8;

/// Expand tabs to spaces so pane widths line up.
fn tabs2spaces(line: &str) -> String {
    let mut result = String::new();
    let mut column = 0;
    for c in line.chars() {
        if c == '\t' {
            let next_stop = column + TAB - (column % TAB);
            result.push_str(&" ".repeat(next_stop - column));
            column = next_stop;
        } else {
            result.push(c);
            column += 1;
        }
    }
    result
}

/// Render one item as its listing rows: an optional label row and
/// the indented text row with an address gutter.
fn listing_rows(item: &Item) -> Vec<String> {
    let mut rows = Vec::with_capacity(2);
    if let Some(label) = item.label() {
        rows.push(format!("{}:", label));
    }
    let text = tabs2spaces(&item.to_string());
    rows.push(format!(
        "\t{}# {:08x}",
        text.pad_to_width(PANE),
        item.address()
    ));
    rows
}

/// Print one function's labelled listing.
pub fn print_listing(disassembly: Disassembly) {
    for item in disassembly {
        for row in listing_rows(&item) {
            if row.ends_with(':') {
                println!("{}", row.bright_yellow());
            } else {
                println!("{}", row);
            }
        }
    }
}

/// Map tab-expanded columns back onto a span given in raw offsets.
fn expand_span(line: &str, span: &Span) -> (usize, usize) {
    let mut column = 0;
    let mut start = 0;
    let mut end = 0;
    for (offset, c) in line.chars().enumerate() {
        if offset == span.start {
            start = column;
        }
        if offset == span.end {
            end = column;
        }
        if c == '\t' {
            column += TAB - (column % TAB);
        } else {
            column += 1;
        }
    }
    if span.start >= line.chars().count() {
        start = column;
    }
    if span.end >= line.chars().count() {
        end = column;
    }
    (start, end)
}

/// The caret row under a replaced line.
fn marker_row(line: &str, spans: &[Span]) -> String {
    let width = tabs2spaces(line).chars().count();
    let mut row: Vec<char> = vec![' '; width];
    for span in spans {
        let (start, end) = expand_span(line, span);
        for cell in row.iter_mut().take(end.min(width)).skip(start) {
            *cell = span.kind.as_char();
        }
    }
    row.into_iter().collect::<String>().trim_end().to_string()
}

fn paint(event: &Event, text: &str) -> ColoredString {
    match event.opcode {
        Opcode::Equal => text.normal(),
        Opcode::Insert => text.green(),
        Opcode::Delete => text.red(),
        Opcode::ReplaceLeft | Opcode::ReplaceRight => text.yellow(),
    }
}

/// One pane cell: optional label row plus the rendered line.
fn pane_lines(event: Option<&Event>) -> (Option<String>, String, Option<String>) {
    match event {
        None => (None, String::new(), None),
        Some(event) => {
            let label = event.label.as_ref().map(|label| {
                if label.is_empty() {
                    String::new()
                } else {
                    format!("{}:", label)
                }
            });
            let text = format!(
                "{} # {:08x}",
                tabs2spaces(&event.text).pad_to_width(PANE - 11),
                event.address
            );
            let markers = match &event.changes {
                Some(Changes::Text(spans)) => Some(marker_row(&event.text, spans)),
                _ => None,
            };
            (label, text, markers)
        }
    }
}

fn print_row(gutter: char, left: Option<&Event>, right: Option<&Event>) {
    let (left_label, left_text, left_markers) = pane_lines(left);
    let (right_label, right_text, right_markers) = pane_lines(right);
    if left_label.is_some() || right_label.is_some() {
        println!(
            "{}   {}",
            left_label
                .unwrap_or_default()
                .pad_to_width(PANE)
                .bright_yellow(),
            right_label.unwrap_or_default().bright_yellow()
        );
    }
    let left_painted = left
        .map(|event| paint(event, &left_text.pad_to_width(PANE)))
        .unwrap_or_else(|| "".pad_to_width(PANE).normal());
    let right_painted = right
        .map(|event| paint(event, &right_text))
        .unwrap_or_else(|| "".normal());
    println!("{} {} {}", left_painted, gutter, right_painted);
    if left_markers.is_some() || right_markers.is_some() {
        println!(
            "{}   {}",
            left_markers.unwrap_or_default().pad_to_width(PANE),
            right_markers.unwrap_or_default()
        );
    }
}

/// Render the event stream as a side-by-side diff.
pub fn print_diff(events: &[Event]) {
    let mut pending_left: Option<&Event> = None;
    for event in events {
        match event.opcode {
            Opcode::Equal => print_row(' ', Some(event), Some(event)),
            Opcode::Delete => print_row('-', Some(event), None),
            Opcode::Insert => print_row('+', None, Some(event)),
            // The differ emits '<' immediately followed by its '>'
            Opcode::ReplaceLeft => pending_left = Some(event),
            Opcode::ReplaceRight => {
                let gutter = match event.changes {
                    Some(Changes::Address) => '|',
                    _ => '^',
                };
                print_row(gutter, pending_left.take(), Some(event));
            }
        }
    }
}

/// Print a summary line for a finished compare.
pub fn print_summary(function: &str, events: &[Event]) {
    let changed = events
        .iter()
        .filter(|event| event.opcode != Opcode::Equal)
        .count();
    if changed == 0 {
        println!("{}: {}", function, "no differences".bright_green());
    } else {
        println!(
            "{}: {} of {} lines differ",
            function,
            changed.to_string().bright_red(),
            events.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use romdiff_lib::diff::SpanKind;
    use romdiff_lib::disasm::Disassembler;
    use romdiff_lib::rom::{Rom, ROM_BASE};
    use romdiff_lib::symbols::SymbolTable;

    #[test]
    fn tabs_expand_to_the_next_stop() {
        assert_eq!(tabs2spaces("mov\tr0"), "mov     r0");
        assert_eq!(tabs2spaces("\tx"), "        x");
        assert_eq!(tabs2spaces("plain"), "plain");
    }

    #[test]
    fn marker_rows_track_tab_expansion() {
        // "mov\tr0, #1": the '1' sits at raw offset 9
        let row = marker_row(
            "mov\tr0, #1",
            &[Span {
                kind: SpanKind::Changed,
                start: 9,
                end: 10,
            }],
        );
        // After expansion the '1' lands on column 13
        assert_eq!(row, "             ^");
    }

    #[test]
    fn listings_carry_labels_and_addresses() {
        let image = [0x01, 0x20, 0x70, 0x47]; // mov r0, #1; bx lr
        let symbols = SymbolTable::default();
        let disassembly = Disassembler::new(Rom::new(&image), &symbols)
            .disassemble(ROM_BASE)
            .expect("walk succeeds");
        let rows: Vec<String> = disassembly
            .into_iter()
            .flat_map(|item| listing_rows(&item))
            .collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], "sub_8000000:");
        assert!(rows[1].contains("mov     r0, #1"));
        assert!(rows[1].ends_with("# 08000000"));
        assert!(rows[2].contains("bx      lr"));
    }
}
