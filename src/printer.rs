//! The printer: value tree → text, in `write` and `display` modes (spec
//! §4.6). Pair printing walks the cdr spine iteratively so printing a long
//! list does not consume Rust stack proportional to its length; `car`
//! values still recurse, since list *nesting* depth is rarely large.

use std::io::{self, Write};

use crate::cell::CellKind;
use crate::heap::Heap;
use crate::value::Value;

pub fn write_value(out: &mut dyn Write, heap: &Heap, v: Value, display: bool) -> io::Result<()> {
    match v {
        Value::Fixnum(n) => write!(out, "{n}"),
        Value::Ptr(ptr) => match &heap.cell(ptr).kind {
            CellKind::Null => write!(out, "()"),
            CellKind::Boolean(b) => write!(out, "{}", if *b { "#t" } else { "#f" }),
            CellKind::Character(c) => {
                if display {
                    write!(out, "{c}")
                } else {
                    write!(out, "#\\{c}")
                }
            }
            CellKind::Pair { .. } => write_pair(out, heap, v, display),
            CellKind::Symbol { name, .. } => write!(out, "{name}"),
            CellKind::Str(s) => {
                if display {
                    write!(out, "{s}")
                } else {
                    write!(out, "\"{}\"", escape_string(s))
                }
            }
            CellKind::Primitive { name, .. } => {
                write!(out, "#<subr {}>", name.symbol_name(heap).unwrap_or("?"))
            }
            CellKind::SpecialPrimitive { name, .. } => {
                write!(out, "#<fsubr {}>", name.symbol_name(heap).unwrap_or("?"))
            }
            CellKind::Closure { .. } => write!(out, "#<closure {:x}>", ptr.index()),
            CellKind::EnvHandle(_) => write!(out, "#<environment {:x}>", ptr.index()),
            CellKind::Port(p) => write!(out, "#<port {}>", p.name()),
            CellKind::Eof => write!(out, "#<eof>"),
            CellKind::Free(_) => write!(out, "#<free>"),
        },
    }
}

fn write_pair(out: &mut dyn Write, heap: &Heap, first: Value, display: bool) -> io::Result<()> {
    write!(out, "(")?;
    let mut cur = first;
    let mut first_elem = true;
    loop {
        let car = cur.car(heap).expect("write_pair called on a non-pair");
        if !first_elem {
            write!(out, " ")?;
        }
        first_elem = false;
        write_value(out, heap, car, display)?;

        let cdr = cur.cdr(heap).expect("write_pair called on a non-pair");
        if cdr.is_null(heap) {
            break;
        } else if cdr.is_pair(heap) {
            cur = cdr;
        } else {
            write!(out, " . ")?;
            write_value(out, heap, cdr, display)?;
            break;
        }
    }
    write!(out, ")")
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out
}

/// Render a value to an owned `String` using `write`-mode quoting. Used by
/// the primitives that synthesize error messages and by tests.
pub fn write_to_string(heap: &Heap, v: Value, display: bool) -> String {
    let mut buf = Vec::new();
    write_value(&mut buf, heap, v, display).expect("writing to a Vec<u8> cannot fail");
    String::from_utf8(buf).expect("printer never emits invalid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Reader;

    fn read_one(heap: &mut Heap, src: &str) -> Value {
        Reader::new(src).read(heap).unwrap().unwrap()
    }

    #[test]
    fn writes_dotted_list_as_proper_list() {
        let mut heap = Heap::new(256).unwrap();
        let v = read_one(&mut heap, "(a . (b . (c . ())))");
        assert_eq!(write_to_string(&heap, v, false), "(A B C)");
    }

    #[test]
    fn writes_improper_list_with_dot() {
        let mut heap = Heap::new(256).unwrap();
        let v = read_one(&mut heap, "(a . b)");
        assert_eq!(write_to_string(&heap, v, false), "(A . B)");
    }

    #[test]
    fn string_write_vs_display() {
        let mut heap = Heap::new(256).unwrap();
        let v = read_one(&mut heap, "\"hi\"");
        assert_eq!(write_to_string(&heap, v, false), "\"hi\"");
        assert_eq!(write_to_string(&heap, v, true), "hi");
    }

    #[test]
    fn booleans_and_fixnums() {
        let mut heap = Heap::new(256).unwrap();
        assert_eq!(write_to_string(&heap, heap.boolean(true), false), "#t");
        assert_eq!(write_to_string(&heap, Value::Fixnum(-3), false), "-3");
    }
}
