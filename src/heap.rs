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

//! Heap, allocator, and garbage collector for Scheme values.
//!
//! Grounded in the teacher's `heap.rs`: a pre-allocated pool plus a free
//! list threaded through the cells themselves, and a mark-and-sweep
//! collector triggered on allocation failure. Two things are deliberately
//! redesigned relative to both the teacher and the distilled spec's source:
//!
//! * **No arena growth.** The teacher's `ArenaSet` allocates additional
//!   arenas from the OS on demand. This dialect's spec fixes the heap at a
//!   single capacity N set at startup (default 100,000 cells) and treats
//!   exhaustion after a collection as fatal, matching the distilled spec
//!   exactly.
//! * **Precise root-stack rooting instead of conservative stack/register
//!   scanning.** See the module doc on `push_root`/`pop_roots` below and
//!   SPEC_FULL.md §4.3 for the rationale; this keeps the teacher's
//!   `Rooted<T>`/"Just Root It" discipline but drops the raw-pointer
//!   `ArenaPtr<T>` machinery that discipline was built on top of, since a
//!   plain `CellPtr` index needs no unsafe `Deref` impl.

use std::collections::HashMap;

use tracing::debug;

use crate::cell::{Arity, Cell, CellKind, CellPtr, PrimitiveFn, SpecialFn};
use crate::error::FatalError;
use crate::port::PortHandle;
use crate::reader::Location;
use crate::value::Value;

/// The default capacity of the cell pool, matching the distilled spec's
/// "default N = 100_000".
pub const DEFAULT_HEAP_CAPACITY: usize = 100_000;

/// The distinguished singleton cells and ports, allocated once at init and
/// kept alive directly by `Heap` rather than through the obarray (I2: a
/// boxed value is either a live cell or one of these statics).
pub struct Singletons {
    pub null: Value,
    pub t: Value,
    pub f: Value,
    pub eof: Value,
    pub unbound: Value,
    pub unspecified: Value,
    pub stdin: Value,
    pub stdout: Value,
    pub stderr: Value,
}

pub struct Heap {
    cells: Vec<Cell>,
    free_list: Option<CellPtr>,
    free_count: usize,
    capacity: usize,

    /// The explicit root stack. Every `Value` pushed here (and not yet
    /// popped) is scanned as a GC root. `push_root`/`pop_roots` replace the
    /// teacher's `Rooted<T>` RAII guard: because `CellPtr` carries no
    /// lifetime, a plain mark/unroot-to-mark bracket around any function
    /// that holds a `Value` across an allocation-capable call gives the
    /// same safety property without requiring `Heap` to hand out aliased
    /// raw pointers to itself. See `Interpreter::evaluate` for the
    /// canonical bracket: `let mark = heap.root_mark(); ...; heap.unroot_to(mark);`.
    roots: Vec<Value>,

    obarray: crate::obarray::Obarray,
    pub singletons: Singletons,
    pub global_env: Value,

    /// Source locations attached to list-opening pairs by the reader, so
    /// evaluator errors can report "near line N". Grounded directly in the
    /// teacher's `locations: HashMap<ConsPtr, Location>` / `enlocate` /
    /// `locate` methods.
    locations: HashMap<usize, Location>,
}

impl Heap {
    pub fn new(capacity: usize) -> Result<Heap, FatalError> {
        if capacity == 0 {
            return Err(FatalError::HeapAllocationFailed(capacity));
        }

        let mut cells = Vec::with_capacity(capacity);
        for i in 0..capacity {
            let next = if i + 1 < capacity {
                Some(CellPtr(i + 1))
            } else {
                None
            };
            cells.push(Cell::free(next));
        }

        let mut heap = Heap {
            cells,
            free_list: Some(CellPtr(0)),
            free_count: capacity,
            capacity,
            roots: Vec::new(),
            obarray: crate::obarray::Obarray::new(),
            singletons: Singletons {
                null: Value::Fixnum(0), // placeholder, replaced below
                t: Value::Fixnum(0),
                f: Value::Fixnum(0),
                eof: Value::Fixnum(0),
                unbound: Value::Fixnum(0),
                unspecified: Value::Fixnum(0),
                stdin: Value::Fixnum(0),
                stdout: Value::Fixnum(0),
                stderr: Value::Fixnum(0),
            },
            global_env: Value::Fixnum(0),
            locations: HashMap::new(),
        };

        heap.init_singletons()?;
        heap.global_env = heap.singletons.null;
        Ok(heap)
    }

    fn init_singletons(&mut self) -> Result<(), FatalError> {
        let null = self.alloc_raw(CellKind::Null)?;
        let t = self.alloc_raw(CellKind::Boolean(true))?;
        let f = self.alloc_raw(CellKind::Boolean(false))?;
        let eof = self.alloc_raw(CellKind::Eof)?;

        let unbound = self.alloc_raw(CellKind::Symbol {
            name: "*unbound*".into(),
            value: Value::Fixnum(0),
        })?;
        unbound.set_symbol_value(self, unbound);

        let unspecified = self.alloc_raw(CellKind::Symbol {
            name: "*unspecified*".into(),
            value: Value::Fixnum(0),
        })?;
        unspecified.set_symbol_value(self, unspecified);

        let stdin = self.alloc_raw(CellKind::Port(PortHandle::Stdin(std::io::stdin())))?;
        let stdout = self.alloc_raw(CellKind::Port(PortHandle::Stdout(std::io::stdout())))?;
        let stderr = self.alloc_raw(CellKind::Port(PortHandle::Stderr(std::io::stdout())))?;

        self.singletons = Singletons {
            null,
            t,
            f,
            eof,
            unbound,
            unspecified,
            stdin,
            stdout,
            stderr,
        };
        Ok(())
    }

    // ---- basic accessors -------------------------------------------------

    pub fn null(&self) -> Value {
        self.singletons.null
    }

    pub fn boolean(&self, b: bool) -> Value {
        if b {
            self.singletons.t
        } else {
            self.singletons.f
        }
    }

    pub fn eof(&self) -> Value {
        self.singletons.eof
    }

    pub fn unbound(&self) -> Value {
        self.singletons.unbound
    }

    pub fn unspecified(&self) -> Value {
        self.singletons.unspecified
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn free_count(&self) -> usize {
        self.free_count
    }

    pub fn cell(&self, ptr: CellPtr) -> &Cell {
        &self.cells[ptr.index()]
    }

    pub fn cell_mut(&mut self, ptr: CellPtr) -> &mut Cell {
        &mut self.cells[ptr.index()]
    }

    // ---- rooting -----------------------------------------------------

    pub fn push_root(&mut self, v: Value) {
        self.roots.push(v);
    }

    pub fn root_mark(&self) -> usize {
        self.roots.len()
    }

    pub fn pop_roots(&mut self, n: usize) {
        let new_len = self.roots.len().saturating_sub(n);
        self.roots.truncate(new_len);
    }

    pub fn unroot_to(&mut self, mark: usize) {
        self.roots.truncate(mark);
    }

    // ---- allocation --------------------------------------------------

    /// Allocate a cell without participating in GC pressure accounting.
    /// Only used during singleton bootstrap, before the obarray/roots exist
    /// to scan meaningfully.
    fn alloc_raw(&mut self, kind: CellKind) -> Result<Value, FatalError> {
        match self.free_list {
            None => Err(FatalError::HeapAllocationFailed(self.capacity)),
            Some(ptr) => {
                let next = match &self.cells[ptr.index()].kind {
                    CellKind::Free(next) => *next,
                    _ => unreachable!("free list pointed at a non-free cell"),
                };
                self.free_list = next;
                self.free_count -= 1;
                self.cells[ptr.index()] = Cell {
                    marked: false,
                    kind,
                };
                Ok(Value::Ptr(ptr))
            }
        }
    }

    /// Allocate a new cell of the given kind, triggering a collection if the
    /// free list is exhausted, and aborting the process if the heap is
    /// still full afterwards (the spec's "the run is aborted (fatal)").
    pub fn alloc_cell(&mut self, kind: CellKind) -> Value {
        if self.free_list.is_none() {
            self.collect_garbage();
        }
        match self.alloc_raw(kind) {
            Ok(v) => v,
            Err(_) => {
                // Still nothing free after a collection: truly out of memory.
                tracing::error!("{}", FatalError::OutOfMemory);
                std::process::exit(1);
            }
        }
    }

    pub fn cons(&mut self, car: Value, cdr: Value) -> Value {
        self.alloc_cell(CellKind::Pair { car, cdr })
    }

    pub fn new_character(&mut self, c: char) -> Value {
        self.alloc_cell(CellKind::Character(c))
    }

    pub fn new_string(&mut self, s: String) -> Value {
        self.alloc_cell(CellKind::Str(s))
    }

    pub fn new_closure(&mut self, params: Value, body: Value, env: Value) -> Value {
        self.alloc_cell(CellKind::Closure { params, body, env })
    }

    pub fn new_env_handle(&mut self, env: Value) -> Value {
        self.alloc_cell(CellKind::EnvHandle(env))
    }

    pub fn new_port(&mut self, handle: PortHandle) -> Value {
        self.alloc_cell(CellKind::Port(handle))
    }

    pub fn define_primitive(&mut self, name: &str, arity: Arity, func: PrimitiveFn) -> Value {
        let sym = self.intern(name);
        let cell = self.alloc_cell(CellKind::Primitive {
            name: sym,
            arity,
            func,
        });
        sym.set_symbol_value(self, cell);
        cell
    }

    pub fn define_special(&mut self, name: &str, func: SpecialFn) -> Value {
        let sym = self.intern(name);
        let cell = self.alloc_cell(CellKind::SpecialPrimitive { name: sym, func });
        sym.set_symbol_value(self, cell);
        cell
    }

    // ---- obarray -------------------------------------------------------

    /// Intern `name`, case-folded to upper case by every caller that reads
    /// it from source text (P5, P3): this function itself does not fold, so
    /// that internal callers defining reserved symbols can choose the
    /// canonical spelling explicitly.
    pub fn intern(&mut self, name: &str) -> Value {
        if let Some(ptr) = self.obarray.lookup(name) {
            return Value::Ptr(ptr);
        }
        let boxed: Box<str> = name.into();
        let sym = self.alloc_cell(CellKind::Symbol {
            name: boxed.clone(),
            value: Value::Fixnum(0),
        });
        let ptr = sym.as_cell_ptr().expect("alloc_cell returned a fixnum for a Symbol");
        let unbound = self.singletons.unbound;
        ptr.set_symbol_value_direct(self, unbound);
        self.obarray.insert(boxed, ptr);
        sym
    }

    pub fn obarray_len(&self) -> usize {
        self.obarray.len()
    }

    // ---- source locations ------------------------------------------------

    pub fn enlocate(&mut self, pair: Value, loc: Location) {
        if let Some(ptr) = pair.as_cell_ptr() {
            self.locations.insert(ptr.index(), loc);
        }
    }

    pub fn locate(&self, pair: Value) -> Location {
        pair.as_cell_ptr()
            .and_then(|p| self.locations.get(&p.index()))
            .cloned()
            .unwrap_or_else(Location::unknown)
    }

    // ---- garbage collection ----------------------------------------------

    pub fn collect_garbage(&mut self) {
        let mut pending: Vec<CellPtr> = self.gather_roots();
        let mut marked_count = 0usize;

        while let Some(ptr) = pending.pop() {
            if self.cells[ptr.index()].marked {
                continue;
            }
            self.cells[ptr.index()].marked = true;
            marked_count += 1;
            self.trace_into(ptr, &mut pending);
        }

        let reclaimed = self.sweep();
        debug!(marked = marked_count, reclaimed, "garbage collection");
    }

    fn gather_roots(&self) -> Vec<CellPtr> {
        let mut roots = Vec::new();

        for v in &self.roots {
            if let Some(p) = v.as_cell_ptr() {
                roots.push(p);
            }
        }
        for p in self.obarray.roots() {
            roots.push(p);
        }
        if let Some(p) = self.global_env.as_cell_ptr() {
            roots.push(p);
        }

        let singleton_values = [
            self.singletons.null,
            self.singletons.t,
            self.singletons.f,
            self.singletons.eof,
            self.singletons.unbound,
            self.singletons.unspecified,
            self.singletons.stdin,
            self.singletons.stdout,
            self.singletons.stderr,
        ];
        for v in singleton_values {
            if let Some(p) = v.as_cell_ptr() {
                roots.push(p);
            }
        }

        roots
    }

    /// Push every `Value` directly referenced by `ptr`'s cell onto
    /// `pending`, per the per-kind trace rules in the spec. Leaf kinds push
    /// nothing.
    fn trace_into(&self, ptr: CellPtr, pending: &mut Vec<CellPtr>) {
        let mut push_val = |v: Value, pending: &mut Vec<CellPtr>| {
            if let Some(p) = v.as_cell_ptr() {
                pending.push(p);
            }
        };

        match &self.cells[ptr.index()].kind {
            CellKind::Pair { car, cdr } => {
                push_val(*car, pending);
                push_val(*cdr, pending);
            }
            CellKind::Symbol { value, .. } => {
                push_val(*value, pending);
            }
            CellKind::Closure { params, body, env } => {
                push_val(*params, pending);
                push_val(*body, pending);
                push_val(*env, pending);
            }
            CellKind::EnvHandle(v) => {
                push_val(*v, pending);
            }
            CellKind::Primitive { name, .. } => push_val(*name, pending),
            CellKind::SpecialPrimitive { name, .. } => push_val(*name, pending),
            CellKind::Null
            | CellKind::Boolean(_)
            | CellKind::Character(_)
            | CellKind::Str(_)
            | CellKind::Port(_)
            | CellKind::Eof
            | CellKind::Free(_) => {}
        }
    }

    fn sweep(&mut self) -> usize {
        let mut reclaimed = 0usize;
        let mut new_free_list: Option<CellPtr> = None;

        for i in 0..self.cells.len() {
            let ptr = CellPtr(i);
            if self.cells[i].marked {
                self.cells[i].marked = false;
                continue;
            }
            if self.cells[i].is_free() {
                continue;
            }

            // Finalize.
            if let CellKind::Port(handle) = &mut self.cells[i].kind {
                if let Some(name) = handle.close() {
                    debug!(port = %name, "closed unreachable port during GC");
                }
            }
            self.locations.remove(&i);

            self.cells[i] = Cell::free(new_free_list);
            new_free_list = Some(ptr);
            reclaimed += 1;
        }

        self.free_list = new_free_list;
        self.free_count += reclaimed;
        reclaimed
    }
}

impl CellPtr {
    /// Internal helper used only while bootstrapping a symbol whose `Value`
    /// wrapper (`self`) is not yet available as a standalone binding.
    fn set_symbol_value_direct(self, heap: &mut Heap, new_value: Value) {
        if let CellKind::Symbol { value, .. } = &mut heap.cells[self.index()].kind {
            *value = new_value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_and_free_roundtrip() {
        let mut heap = Heap::new(16).unwrap();
        let before = heap.free_count();
        let v = heap.cons(Value::Fixnum(1), heap.null());
        assert!(before > heap.free_count());
        assert!(v.is_pair(&heap));
    }

    #[test]
    fn gc_reclaims_unrooted_cells() {
        let mut heap = Heap::new(8).unwrap();
        for _ in 0..100 {
            let _ = heap.cons(Value::Fixnum(1), heap.null());
        }
        // Heap capacity is 8 but singletons + port cells already consumed a
        // few; as long as nothing keeps the conses alive, repeated
        // allocation must not abort the process.
        assert!(heap.free_count() <= heap.capacity());
    }

    #[test]
    fn interning_is_idempotent() {
        let mut heap = Heap::new(64).unwrap();
        let a = heap.intern("FOO");
        let b = heap.intern("FOO");
        assert_eq!(a, b);
    }
}
