//! The symbol index.
//!
//! Built once from the `{name, value, size, kind}` records an ELF
//! reader (or any other source) supplies. Function values carry the
//! Thumb low bit; the index strips it before sorting, so interval
//! queries work on *effective* start addresses.

use std::collections::HashMap;

/// What a symbol describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// A function. Its value carries the Thumb bit.
    Function,
    /// Anything else (data, section markers, ...).
    Object,
}

/// A single symbol record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    /// The raw value, including the Thumb low bit for functions.
    pub value: u32,
    /// Size in bytes. May be zero.
    pub size: u32,
    pub kind: SymbolKind,
}

impl Symbol {
    /// The address this symbol actually starts at.
    ///
    /// For functions this is the value with the Thumb bit cleared.
    pub fn effective_start(&self) -> u32 {
        match self.kind {
            SymbolKind::Function => self.value & !1,
            SymbolKind::Object => self.value,
        }
    }
}

/// A successful address lookup: the enclosing symbol and the
/// displacement of the queried address from its effective start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolLookup<'a> {
    pub symbol: &'a Symbol,
    pub disp: u32,
}

/// Name and interval index over a set of symbols.
///
/// # Example
///
/// ```
/// # use romdiff_lib::symbols::{Symbol, SymbolKind, SymbolTable};
/// let table = SymbolTable::new(vec![Symbol {
///     name: "AgbMain".into(),
///     value: 0x0800_0401,
///     size: 0x20,
///     kind: SymbolKind::Function,
/// }]);
///
/// assert_eq!(table.lookup_name("AgbMain").unwrap().effective_start(), 0x0800_0400);
/// let hit = table.lookup(0x0800_0408).unwrap();
/// assert_eq!(hit.symbol.name, "AgbMain");
/// assert_eq!(hit.disp, 8);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTable {
    by_name: HashMap<String, usize>,
    starts: Vec<u32>,
    ends: Vec<u32>,
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    /// Build the index from a list of symbol records.
    ///
    /// Symbols are stable-sorted by effective start; ties keep their
    /// input order and callers must tolerate either symbol winning an
    /// address query on the shared start.
    pub fn new(symbols: Vec<Symbol>) -> Self {
        let mut symbols = symbols;
        symbols.sort_by_key(Symbol::effective_start);
        let mut by_name = HashMap::with_capacity(symbols.len());
        let mut starts = Vec::with_capacity(symbols.len());
        let mut ends = Vec::with_capacity(symbols.len());
        for (index, symbol) in symbols.iter().enumerate() {
            let start = symbol.effective_start();
            by_name.insert(symbol.name.clone(), index);
            starts.push(start);
            ends.push(start + symbol.size);
        }
        SymbolTable {
            by_name,
            starts,
            ends,
            symbols,
        }
    }
    /// Number of indexed symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }
    /// Is the table empty?
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
    /// Look a symbol up by name.
    pub fn lookup_name(&self, name: &str) -> Option<&Symbol> {
        self.by_name.get(name).map(|&index| &self.symbols[index])
    }
    /// Find the symbol enclosing `address`.
    ///
    /// Binary search for the greatest start `<= address`; the hit
    /// counts if the symbol has size zero or the address falls short
    /// of its end.
    pub fn lookup(&self, address: u32) -> Option<SymbolLookup> {
        let i = self.starts.partition_point(|&start| start <= address);
        if i == 0 {
            return None;
        }
        let symbol = &self.symbols[i - 1];
        if symbol.size == 0 || address < self.ends[i - 1] {
            Some(SymbolLookup {
                symbol,
                disp: address - self.starts[i - 1],
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn function(name: &str, value: u32, size: u32) -> Symbol {
        Symbol {
            name: name.into(),
            value,
            size,
            kind: SymbolKind::Function,
        }
    }

    fn table() -> SymbolTable {
        SymbolTable::new(vec![
            function("First", 0x0800_0101, 0x10),
            function("Second", 0x0800_0111, 0x20),
            Symbol {
                name: "gUnknownMarker".into(),
                value: 0x0800_0200,
                size: 0,
                kind: SymbolKind::Object,
            },
            Symbol {
                name: "gTable".into(),
                value: 0x0800_0300,
                size: 8,
                kind: SymbolKind::Object,
            },
        ])
    }

    #[test]
    fn name_lookup_finds_symbols() {
        let table = table();
        assert_eq!(table.lookup_name("First").unwrap().value, 0x0800_0101);
        assert_eq!(table.lookup_name("gTable").unwrap().size, 8);
        assert!(table.lookup_name("Missing").is_none());
    }

    #[test]
    fn the_thumb_bit_is_stripped_from_function_starts() {
        let table = table();
        let hit = table.lookup(0x0800_0100).unwrap();
        assert_eq!(hit.symbol.name, "First");
        assert_eq!(hit.disp, 0);
    }

    #[test]
    fn address_lookup_respects_symbol_bounds() {
        let table = table();
        // Last address inside First
        let hit = table.lookup(0x0800_010F).unwrap();
        assert_eq!(hit.symbol.name, "First");
        assert_eq!(hit.disp, 0xF);
        // First address of Second
        let hit = table.lookup(0x0800_0110).unwrap();
        assert_eq!(hit.symbol.name, "Second");
        assert_eq!(hit.disp, 0);
        // Past the end of Second, before the marker
        assert!(table.lookup(0x0800_0130).is_none());
        // Before every symbol
        assert!(table.lookup(0x0800_0000).is_none());
    }

    #[test]
    fn size_zero_symbols_match_without_an_end_check() {
        let table = table();
        let hit = table.lookup(0x0800_0220).unwrap();
        assert_eq!(hit.symbol.name, "gUnknownMarker");
        assert_eq!(hit.disp, 0x20);
    }

    proptest! {
        #[test]
        fn every_address_inside_a_symbol_resolves_to_it(offset in 0u32..0x54) {
            let table = SymbolTable::new(vec![
                function("Lone", 0x0800_2001, 0x54),
            ]);
            let address = 0x0800_2000 + offset;
            let hit = table.lookup(address).expect("address inside the symbol");
            prop_assert_eq!(hit.symbol.name.as_str(), "Lone");
            prop_assert_eq!(hit.disp, offset);
        }
    }
}
