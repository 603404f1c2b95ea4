//! Human-readable rendering of types for diagnostics.

use tyc_binder::SymbolTable;
use tyc_common::interner::NameTable;

use crate::intern::TypeInterner;
use crate::types::{TypeData, TypeId};

pub fn type_to_string(
    interner: &TypeInterner,
    table: &SymbolTable,
    names: &NameTable,
    id: TypeId,
) -> String {
    match interner.data(id) {
        TypeData::Untyped => "untyped".to_string(),
        TypeData::Bottom => "nothing".to_string(),
        TypeData::Class { symbol, args } => {
            let name = table
                .get(symbol)
                .map(|s| names.resolve(s.name).to_string())
                .unwrap_or_else(|| "<unknown>".to_string());
            if args.is_empty() {
                name
            } else {
                let args: Vec<String> = args
                    .iter()
                    .map(|&a| type_to_string(interner, table, names, a))
                    .collect();
                format!("{}[{}]", name, args.join(", "))
            }
        }
        TypeData::Union { members } => members
            .iter()
            .map(|&m| type_to_string(interner, table, names, m))
            .collect::<Vec<_>>()
            .join(" | "),
        TypeData::Intersection { members } => members
            .iter()
            .map(|&m| type_to_string(interner, table, names, m))
            .collect::<Vec<_>>()
            .join(" & "),
        TypeData::Nilable { inner } => {
            let inner = type_to_string(interner, table, names, inner);
            // Parenthesize compound inners so `(A | B)?` stays readable.
            if inner.contains(' ') {
                format!("({inner})?")
            } else {
                format!("{inner}?")
            }
        }
        TypeData::TypeVar { symbol, .. } => table
            .get(symbol)
            .map(|s| names.resolve(s.name).to_string())
            .unwrap_or_else(|| "<typevar>".to_string()),
    }
}
