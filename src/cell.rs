// Copyright 2014 Nick Fitzgerald
// Copyright 2026 the rascheme contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The boxed half of a Scheme value: a fixed-size heap cell with a GC mark
//! bit and a type tag, following the teacher's `Cons`/`Arena` layout from
//! `heap.rs` generalized from "cons cells and strings" to the full set of
//! kinds this dialect needs (symbols, closures, ports, primitives, ...).

use std::fmt;

use crate::port::PortHandle;
use crate::value::Value;

/// An index into the heap's cell pool. Carries no lifetime: dereferencing
/// requires an explicit `&Heap`/`&mut Heap`, which is how this
/// implementation avoids the teacher's raw-pointer `ArenaPtr<T>` (see
/// DESIGN.md for why that trade is worth the extra `&heap` plumbing).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellPtr(pub(crate) usize);

impl CellPtr {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for CellPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<cell {}>", self.0)
    }
}

/// A built-in procedure of fixed arity 0..=3, receiving already-evaluated
/// arguments.
pub type PrimitiveFn = fn(&mut crate::eval::Interpreter, &[Value]) -> crate::error::EvalResult<Value>;

/// A built-in procedure receiving its arguments *unevaluated*, together with
/// the calling environment. Used for introspection primitives such as
/// `the-environment`.
pub type SpecialFn =
    fn(&mut crate::eval::Interpreter, Value, Value) -> crate::error::EvalResult<Value>;

/// The fixed arity a `Primitive` cell dispatches on. `Variadic` corresponds
/// to the spec's "Primitive-N": the function receives one `Value` that is a
/// proper list of the evaluated arguments.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Arity {
    Fixed0,
    Fixed1,
    Fixed2,
    Fixed3,
    Variadic,
}

impl Arity {
    pub fn matches(self, n: usize) -> bool {
        match self {
            Arity::Fixed0 => n == 0,
            Arity::Fixed1 => n == 1,
            Arity::Fixed2 => n == 2,
            Arity::Fixed3 => n == 3,
            Arity::Variadic => true,
        }
    }
}

/// The per-kind payload of a boxed cell. The closed set is fixed by the
/// dialect; adding a kind here means extending the GC tracer in `gc.rs`,
/// the printer, and usually the reader.
pub enum CellKind {
    /// The empty list, `()`. Exactly one cell of this kind ever exists.
    Null,
    /// `#t` / `#f`. Exactly two cells of this kind ever exist.
    Boolean(bool),
    Character(char),
    Pair {
        car: Value,
        cdr: Value,
    },
    Symbol {
        name: Box<str>,
        /// The symbol's top-level binding slot. Either `Value::unbound()`
        /// or a legitimate value (invariant I4).
        value: Value,
    },
    Str(String),
    /// A built-in of fixed arity 0..=3 or variadic ("Primitive-N").
    Primitive {
        name: Value,
        arity: Arity,
        func: PrimitiveFn,
    },
    /// A built-in that receives unevaluated arguments and the calling
    /// environment ("Special-primitive").
    SpecialPrimitive {
        name: Value,
        func: SpecialFn,
    },
    Closure {
        params: Value,
        body: Value,
        env: Value,
    },
    /// Reification of an association-list environment, returned by the
    /// `the-environment` introspection primitive.
    EnvHandle(Value),
    Port(PortHandle),
    /// The distinguished end-of-file sentinel.
    Eof,
    /// Free-list link. Payload is ignored except for the link itself.
    Free(Option<CellPtr>),
}

impl CellKind {
    pub fn tag_name(&self) -> &'static str {
        match self {
            CellKind::Null => "null",
            CellKind::Boolean(_) => "boolean",
            CellKind::Character(_) => "character",
            CellKind::Pair { .. } => "pair",
            CellKind::Symbol { .. } => "symbol",
            CellKind::Str(_) => "string",
            CellKind::Primitive { .. } => "subr",
            CellKind::SpecialPrimitive { .. } => "fsubr",
            CellKind::Closure { .. } => "closure",
            CellKind::EnvHandle(_) => "environment",
            CellKind::Port(_) => "port",
            CellKind::Eof => "eof",
            CellKind::Free(_) => "free",
        }
    }
}

/// A fixed-size heap-resident record: a GC mark bit plus a type tag and its
/// payload (I1: a free cell is never reachable from a non-free cell, so the
/// mark bit on a `Free` cell is meaningless and always left clear).
pub struct Cell {
    pub marked: bool,
    pub kind: CellKind,
}

impl Cell {
    pub fn free(next: Option<CellPtr>) -> Cell {
        Cell {
            marked: false,
            kind: CellKind::Free(next),
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self.kind, CellKind::Free(_))
    }
}
