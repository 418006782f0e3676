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

//! The lexical environment: a chain of `(symbol . value)` pairs, exactly as
//! the spec's data model describes. No distinct "frame" kind exists; a new
//! scope is just a run of freshly consed bindings prepended to the front of
//! the chain the closure captured, which is also how this module resolves
//! internal `define`s (see `eval.rs::eval_body`).
//!
//! Global bindings are *not* stored in this chain: `()` (the empty
//! environment) is the top level, and a lookup that runs off the end of the
//! chain falls through to the symbol's own value slot (§4.7).

use crate::error::EvalError;
use crate::heap::Heap;
use crate::value::Value;

/// Look up `sym` in `env`, falling through to the symbol's global value
/// slot. Returns `Err(UnboundVariable)` only once both have failed.
pub fn lookup(heap: &Heap, env: Value, sym: Value) -> Result<Value, EvalError> {
    let mut cur = env;
    while !cur.is_null(heap) {
        let binding = cur.car(heap).expect("env chain link must be a pair");
        let bound_sym = binding.car(heap).expect("env binding must be (symbol . value)");
        if bound_sym.eq(&sym) {
            return Ok(binding.cdr(heap).expect("env binding must be (symbol . value)"));
        }
        cur = cur.cdr(heap).expect("env chain link must be a pair");
    }

    let global = sym.symbol_value(heap).expect("looked-up value must be a symbol");
    if global.eq(&heap.unbound()) {
        Err(EvalError::UnboundVariable(
            sym.symbol_name(heap).unwrap_or("?").to_string(),
        ))
    } else {
        Ok(global)
    }
}

/// `set!`: find the innermost binding and mutate it in place; if none
/// exists locally, fall through to the symbol's global slot. Errors if the
/// symbol is unbound anywhere.
pub fn set(heap: &mut Heap, env: Value, sym: Value, new_value: Value) -> Result<(), EvalError> {
    let mut cur = env;
    while !cur.is_null(heap) {
        let binding = cur.car(heap).expect("env chain link must be a pair");
        let bound_sym = binding.car(heap).expect("env binding must be (symbol . value)");
        if bound_sym.eq(&sym) {
            binding.set_cdr(heap, new_value);
            return Ok(());
        }
        cur = cur.cdr(heap).expect("env chain link must be a pair");
    }

    let global = sym.symbol_value(heap).expect("set! target must be a symbol");
    if global.eq(&heap.unbound()) {
        Err(EvalError::UnboundVariable(
            sym.symbol_name(heap).unwrap_or("?").to_string(),
        ))
    } else {
        sym.set_symbol_value(heap, new_value);
        Ok(())
    }
}

/// `define`: if `sym` already has a binding within `env` (this activation's
/// chain, not the caller's), update it in place. Otherwise, if `env` is the
/// empty (top-level) environment, install directly into the symbol's
/// global value slot; if `env` is non-empty, prepend a fresh binding and
/// return the extended environment the caller must keep using.
pub fn define(heap: &mut Heap, env: Value, sym: Value, value: Value) -> Value {
    let mut cur = env;
    while !cur.is_null(heap) {
        let binding = cur.car(heap).expect("env chain link must be a pair");
        let bound_sym = binding.car(heap).expect("env binding must be (symbol . value)");
        if bound_sym.eq(&sym) {
            binding.set_cdr(heap, value);
            return env;
        }
        cur = cur.cdr(heap).expect("env chain link must be a pair");
    }

    if env.is_null(heap) {
        sym.set_symbol_value(heap, value);
        env
    } else {
        heap.push_root(env);
        heap.push_root(sym);
        heap.push_root(value);
        let binding = heap.cons(sym, value);
        heap.push_root(binding);
        let extended = heap.cons(binding, env);
        heap.pop_roots(4);
        extended
    }
}

/// Extend `env` with one frame binding `params` (a lambda parameter list)
/// against `args` (already-evaluated arguments), per the spec's three
/// parameter shapes: bare symbol (all args), proper list (exact arity), or
/// dotted list (fixed prefix + rest).
pub fn bind_params(
    heap: &mut Heap,
    params: Value,
    args: &[Value],
    outer_env: Value,
) -> Result<Value, EvalError> {
    heap.push_root(outer_env);
    let result = bind_params_inner(heap, params, args, outer_env);
    heap.pop_roots(1);
    result
}

fn bind_params_inner(
    heap: &mut Heap,
    params: Value,
    args: &[Value],
    outer_env: Value,
) -> Result<Value, EvalError> {
    // Bare symbol: the whole argument list is bound to it.
    if params.is_symbol(heap) {
        let rest = crate::value::list_from_slice(heap, args);
        heap.push_root(rest);
        let extended = prepend_binding(heap, params, rest, outer_env);
        heap.pop_roots(1);
        return Ok(extended);
    }

    let mut env = outer_env;
    let mut cur_params = params;
    let mut i = 0usize;

    loop {
        if cur_params.is_null(heap) {
            if i != args.len() {
                return Err(EvalError::WrongArgCount("#<closure>".to_string()));
            }
            return Ok(env);
        }
        if cur_params.is_symbol(heap) {
            // Dotted tail: remaining args become a list bound to this symbol.
            let rest = crate::value::list_from_slice(heap, &args[i..]);
            heap.push_root(env);
            heap.push_root(rest);
            env = prepend_binding(heap, cur_params, rest, env);
            heap.pop_roots(2);
            return Ok(env);
        }
        if !cur_params.is_pair(heap) {
            return Err(EvalError::IllFormedSpecialForm(
                "lambda parameter list must be a symbol, proper list, or dotted list".to_string(),
            ));
        }
        if i >= args.len() {
            return Err(EvalError::WrongArgCount("#<closure>".to_string()));
        }
        let name = cur_params.car(heap).expect("checked is_pair");
        heap.push_root(env);
        env = prepend_binding(heap, name, args[i], env);
        heap.pop_roots(1);
        i += 1;
        cur_params = cur_params.cdr(heap).expect("checked is_pair");
    }
}

/// Unconditionally prepend a fresh `(sym . value)` binding onto `env`,
/// shadowing any existing binding of the same name. Used by `let`/`let*`/
/// `letrec` and by lambda parameter binding, all of which introduce a new
/// scope regardless of whether the enclosing environment happens to be the
/// top level -- unlike `define`, they must never fall through to the
/// symbol's global slot.
pub fn extend(heap: &mut Heap, sym: Value, value: Value, env: Value) -> Value {
    prepend_binding(heap, sym, value, env)
}

fn prepend_binding(heap: &mut Heap, sym: Value, value: Value, env: Value) -> Value {
    heap.push_root(sym);
    heap.push_root(value);
    heap.push_root(env);
    let binding = heap.cons(sym, value);
    heap.push_root(binding);
    let extended = heap.cons(binding, env);
    heap.pop_roots(4);
    extended
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::Heap;

    #[test]
    fn define_at_top_level_sets_global_slot() {
        let mut heap = Heap::new(256).unwrap();
        let sym = heap.intern("X");
        let env = heap.null();
        let env = define(&mut heap, env, sym, Value::Fixnum(5));
        assert!(env.is_null(&heap));
        assert_eq!(lookup(&heap, env, sym).unwrap(), Value::Fixnum(5));
    }

    #[test]
    fn define_inside_frame_extends_chain() {
        let mut heap = Heap::new(256).unwrap();
        let sym = heap.intern("Y");
        let frame_marker = heap.intern("DUMMY");
        let null_env = heap.null();
        let env = prepend_binding(&mut heap, frame_marker, Value::Fixnum(0), null_env);
        let env = define(&mut heap, env, sym, Value::Fixnum(9));
        assert!(!env.is_null(&heap));
        assert_eq!(lookup(&heap, env, sym).unwrap(), Value::Fixnum(9));
    }

    #[test]
    fn set_bang_mutates_captured_cell() {
        let mut heap = Heap::new(256).unwrap();
        let sym = heap.intern("K");
        let null_env = heap.null();
        let env = prepend_binding(&mut heap, sym, Value::Fixnum(0), null_env);
        set(&mut heap, env, sym, Value::Fixnum(1)).unwrap();
        assert_eq!(lookup(&heap, env, sym).unwrap(), Value::Fixnum(1));
    }
}
