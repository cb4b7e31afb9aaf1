//! The disassembly differ.
//!
//! Compares two item sequences and yields a flat event stream. The
//! coarse structure comes from line-level matching; `replace` ranges
//! are refined by searching for a *synch pair* of similar lines and
//! recursing around it, so a single changed operand shows up as one
//! `'<'`/`'>'` pair with intra-line change spans instead of a block
//! dump. Textually equal lines at different addresses are reported as
//! address shifts, again as a `'<'`/`'>'` pair.

use log::trace;

use crate::disasm::{Item, ItemKind};

mod matcher;

pub use matcher::{DiffOp, DiffTag, SequenceMatcher};

/// Candidates must strictly beat this ratio while scanning...
const BEST_RATIO_FLOOR: f64 = 0.74;
/// ...and the winner is only accepted at or above this one.
const SYNCH_CUTOFF: f64 = 0.75;

/// The event alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// `' '` both sides agree.
    Equal,
    /// `'+'` only the right side has this item.
    Insert,
    /// `'-'` only the left side has this item.
    Delete,
    /// `'<'` the left half of a changed pair.
    ReplaceLeft,
    /// `'>'` the right half of a changed pair.
    ReplaceRight,
}

impl Opcode {
    pub fn as_char(self) -> char {
        match self {
            Opcode::Equal => ' ',
            Opcode::Insert => '+',
            Opcode::Delete => '-',
            Opcode::ReplaceLeft => '<',
            Opcode::ReplaceRight => '>',
        }
    }
}

/// How a span of a replaced line changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    /// `'^'` rewritten in place.
    Changed,
    /// `'+'` inserted on this side.
    Inserted,
    /// `'-'` deleted from this side.
    Deleted,
}

impl SpanKind {
    pub fn as_char(self) -> char {
        match self {
            SpanKind::Changed => '^',
            SpanKind::Inserted => '+',
            SpanKind::Deleted => '-',
        }
    }
}

/// A changed region `[start, end)` of a rendered line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub kind: SpanKind,
    pub start: usize,
    pub end: usize,
}

/// What changed about a `'<'`/`'>'` item.
#[derive(Debug, Clone, PartialEq)]
pub enum Changes {
    /// Text is identical, only the address moved.
    Address,
    /// Intra-line change spans.
    Text(Vec<Span>),
}

/// One differ output event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub opcode: Opcode,
    pub kind: ItemKind,
    pub address: u32,
    pub size: u32,
    pub text: String,
    pub label: Option<String>,
    /// Present on `'<'`/`'>'` events only.
    pub changes: Option<Changes>,
}

impl Event {
    fn new(opcode: Opcode, item: &Item) -> Event {
        Event {
            opcode,
            kind: item.kind(),
            address: item.address(),
            size: item.size(),
            text: item.to_string(),
            label: item.label().map(str::to_string),
            changes: None,
        }
    }
}

/// Render the matcher's view of an item sequence.
fn prepare_lines(items: &[Item]) -> Vec<String> {
    items.iter().map(|item| format!("{}\n", item)).collect()
}

/// Diff two materialised disassemblies.
///
/// Events are deterministic for a given input pair: they follow the
/// coarse operation order, items within a block keep their index
/// order, and plain replaces emit the shorter block first.
pub fn diff(a: &[Item], b: &[Item]) -> Vec<Event> {
    let al = prepare_lines(a);
    let bl = prepare_lines(b);
    let mut events = Vec::new();
    for op in SequenceMatcher::new(&al, &bl).get_opcodes() {
        trace!("Coarse op {:?}", op);
        match op.tag {
            DiffTag::Delete => dump(Opcode::Delete, &a[op.alo..op.ahi], &mut events),
            DiffTag::Insert => dump(Opcode::Insert, &b[op.blo..op.bhi], &mut events),
            DiffTag::Equal => {
                // Equal text may still sit at different addresses when
                // earlier edits shifted the code
                for (x, y) in a[op.alo..op.ahi].iter().zip(&b[op.blo..op.bhi]) {
                    if x.address() == y.address() {
                        events.push(Event::new(Opcode::Equal, x));
                    } else {
                        push_pair(x, y, Changes::Address, Changes::Address, &mut events);
                    }
                }
            }
            DiffTag::Replace => fancy_replace(
                a,
                op.alo,
                op.ahi,
                b,
                op.blo,
                op.bhi,
                &al,
                &bl,
                &mut events,
            ),
        }
    }
    events
}

fn dump(opcode: Opcode, items: &[Item], events: &mut Vec<Event>) {
    for item in items {
        events.push(Event::new(opcode, item));
    }
}

/// Emit a `'<'`/`'>'` pair.
///
/// If either side carries a label the other side is normalised to an
/// empty one, so a rendered pane always reserves the label row and
/// the two sides stay visually aligned.
fn push_pair(x: &Item, y: &Item, left: Changes, right: Changes, events: &mut Vec<Event>) {
    let has_label = x.label().is_some() || y.label().is_some();
    let fake_label = if has_label { Some(String::new()) } else { None };
    let mut event = Event::new(Opcode::ReplaceLeft, x);
    event.label = event.label.or_else(|| fake_label.clone());
    event.changes = Some(left);
    events.push(event);
    let mut event = Event::new(Opcode::ReplaceRight, y);
    event.label = event.label.or(fake_label);
    event.changes = Some(right);
    events.push(event);
}

/// Refine a replace range around the most similar line pair.
#[allow(clippy::too_many_arguments)]
fn fancy_replace(
    a: &[Item],
    alo: usize,
    ahi: usize,
    b: &[Item],
    blo: usize,
    bhi: usize,
    al: &[String],
    bl: &[String],
    events: &mut Vec<Event>,
) {
    let mut best_ratio = BEST_RATIO_FLOOR;
    let mut best: Option<(usize, usize)> = None;
    let mut identical: Option<(usize, usize)> = None;

    for j in blo..bhi {
        let bj: Vec<char> = bl[j].chars().collect();
        for i in alo..ahi {
            if al[i] == bl[j] {
                // Identical lines do not take part in similarity
                // selection, but remember the first pair as a
                // fallback anchor
                if identical.is_none() {
                    identical = Some((i, j));
                }
                continue;
            }
            let ai: Vec<char> = al[i].chars().collect();
            let mut cruncher = SequenceMatcher::new(&ai, &bj);
            // Cheap upper bounds first, the real ratio last
            if cruncher.real_quick_ratio() > best_ratio
                && cruncher.quick_ratio() > best_ratio
                && cruncher.ratio() > best_ratio
            {
                best_ratio = cruncher.ratio();
                best = Some((i, j));
            }
        }
    }

    let (best_i, best_j, synch_is_identical) = if best_ratio < SYNCH_CUTOFF {
        match identical {
            // No close pair and nothing identical: dump the blocks,
            // shorter one first
            None => {
                trace!("No synch pair in a[{}..{}] x b[{}..{}]", alo, ahi, blo, bhi);
                if bhi - blo < ahi - alo {
                    dump(Opcode::Insert, &b[blo..bhi], events);
                    dump(Opcode::Delete, &a[alo..ahi], events);
                } else {
                    dump(Opcode::Delete, &a[alo..ahi], events);
                    dump(Opcode::Insert, &b[blo..bhi], events);
                }
                return;
            }
            Some((i, j)) => (i, j, true),
        }
    } else {
        let (i, j) = best.expect("a ratio above the floor implies a candidate");
        (i, j, false)
    };
    trace!(
        "Synch pair a[{}] x b[{}] (identical: {})",
        best_i,
        best_j,
        synch_is_identical
    );

    fancy_helper(a, alo, best_i, b, blo, best_j, al, bl, events);

    if synch_is_identical {
        events.push(Event::new(Opcode::Equal, &a[best_i]));
    } else {
        // Mark the changed regions of the two lines
        let ac: Vec<char> = al[best_i].chars().collect();
        let bc: Vec<char> = bl[best_j].chars().collect();
        let mut atags = Vec::new();
        let mut btags = Vec::new();
        for op in SequenceMatcher::new(&ac, &bc).get_opcodes() {
            match op.tag {
                DiffTag::Replace => {
                    atags.push(Span {
                        kind: SpanKind::Changed,
                        start: op.alo,
                        end: op.ahi,
                    });
                    btags.push(Span {
                        kind: SpanKind::Changed,
                        start: op.blo,
                        end: op.bhi,
                    });
                }
                DiffTag::Delete => atags.push(Span {
                    kind: SpanKind::Deleted,
                    start: op.alo,
                    end: op.ahi,
                }),
                DiffTag::Insert => btags.push(Span {
                    kind: SpanKind::Inserted,
                    start: op.blo,
                    end: op.bhi,
                }),
                DiffTag::Equal => {}
            }
        }
        push_pair(
            &a[best_i],
            &b[best_j],
            Changes::Text(atags),
            Changes::Text(btags),
            events,
        );
    }

    fancy_helper(a, best_i + 1, ahi, b, best_j + 1, bhi, al, bl, events);
}

/// Dispatch a flank of a synch pair, degenerating to a plain dump
/// when one side is empty.
#[allow(clippy::too_many_arguments)]
fn fancy_helper(
    a: &[Item],
    alo: usize,
    ahi: usize,
    b: &[Item],
    blo: usize,
    bhi: usize,
    al: &[String],
    bl: &[String],
    events: &mut Vec<Event>,
) {
    if alo < ahi {
        if blo < bhi {
            fancy_replace(a, alo, ahi, b, blo, bhi, al, bl, events);
        } else {
            dump(Opcode::Delete, &a[alo..ahi], events);
        }
    } else if blo < bhi {
        dump(Opcode::Insert, &b[blo..bhi], events);
    }
}
