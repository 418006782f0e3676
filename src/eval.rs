//! The evaluator: special-form dispatch, environment extension, and the
//! call convention for primitives, special-primitives, and closures.
//!
//! `evaluate` is a loop, not a naive recursive function: whenever the next
//! thing to evaluate is in tail position (the last form of a body, the
//! branch taken by `if`, the winning `cond`/`case` clause, a closure
//! application's body), the loop just reassigns its `expr`/`env` locals and
//! goes around again instead of making a fresh Rust call frame. Every other
//! subexpression (operators, arguments, test expressions, all-but-last body
//! forms) goes through a genuine recursive call to `evaluate`, which is
//! exactly where a `Rooted`-style discipline matters: any `Value` local that
//! outlives such a call is pushed onto the heap's root stack first.
//!
//! Root-stack bookkeeping here is advisory, not RAII: a `?` that bubbles an
//! error out of a frame skips that frame's `unroot_to`, so the root stack
//! can grow past what's logically live on an error path. The REPL's
//! recovery point (`main.rs`) resets it with `heap.unroot_to(0)` between
//! top-level forms, which is the same convention `heap.rs` documents for
//! `push_root`/`pop_roots`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cell::{Arity, CellKind, PrimitiveFn};
use crate::env;
use crate::error::{EvalError, EvalResult};
use crate::heap::Heap;
use crate::value::{list_to_vec, Value};

/// The reserved operator symbols seeded at startup (§6). `do` and `delay`
/// are interned so they exist in the obarray but have no dispatch arm
/// below, which is what makes them "reserved but unbound": referencing one
/// bare falls through to `UnboundVariable`, and using one as an operator
/// falls through to ordinary application, which fails the same way.
struct ReservedSymbols {
    quote: Value,
    lambda: Value,
    and: Value,
    or: Value,
    let_: Value,
    let_star: Value,
    letrec: Value,
    begin: Value,
    if_: Value,
    cond: Value,
    case: Value,
    else_: Value,
    set_bang: Value,
    define: Value,
}

impl ReservedSymbols {
    fn install(heap: &mut Heap) -> ReservedSymbols {
        let syms = ReservedSymbols {
            quote: heap.intern("QUOTE"),
            lambda: heap.intern("LAMBDA"),
            and: heap.intern("AND"),
            or: heap.intern("OR"),
            let_: heap.intern("LET"),
            let_star: heap.intern("LET*"),
            letrec: heap.intern("LETREC"),
            begin: heap.intern("BEGIN"),
            if_: heap.intern("IF"),
            cond: heap.intern("COND"),
            case: heap.intern("CASE"),
            else_: heap.intern("ELSE"),
            set_bang: heap.intern("SET!"),
            define: heap.intern("DEFINE"),
        };
        // Reserved but unbound: interned so they occupy the obarray, never
        // given a dispatch arm or a value.
        heap.intern("QUASIQUOTE");
        heap.intern("UNQUOTE");
        heap.intern("UNQUOTE-SPLICING");
        heap.intern("DO");
        heap.intern("DELAY");
        heap.intern("SYS:TOPLEVEL");
        heap.intern(".");
        syms
    }
}

/// The whole mutable world an evaluation needs: the heap plus the fixed set
/// of things seeded once at startup. One `Interpreter` is built in `main`
/// and threaded through everything explicitly, never global/`static` state.
pub struct Interpreter {
    pub heap: Heap,
    reserved: ReservedSymbols,
    interrupted: Arc<AtomicBool>,
}

/// What a body (a sequence of forms, implicit `begin`) resolves to: either a
/// concrete value because the body was empty or its last form's evaluation
/// was performed eagerly, or a tail position the caller's loop should
/// continue into.
enum BodyResult {
    Value(Value),
    Tail(Value, Value),
}

impl Interpreter {
    pub fn new(mut heap: Heap) -> Interpreter {
        let reserved = ReservedSymbols::install(&mut heap);
        Interpreter {
            heap,
            reserved,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A clone of the interrupt flag for a signal handler to set. Checked
    /// cooperatively at the top of every `evaluate` call, never polled
    /// asynchronously (§5).
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupted)
    }

    pub fn eval_top(&mut self, expr: Value) -> EvalResult<Value> {
        let env = self.heap.global_env;
        self.evaluate(expr, env)
    }

    fn check_interrupt(&self) -> EvalResult<()> {
        if self.interrupted.swap(false, Ordering::SeqCst) {
            Err(EvalError::Interrupted)
        } else {
            Ok(())
        }
    }

    pub fn evaluate(&mut self, mut expr: Value, mut env: Value) -> EvalResult<Value> {
        loop {
            self.check_interrupt()?;

            if expr.is_fixnum() {
                return Ok(expr);
            }
            match self.heap.cell_kind_tag(expr) {
                Tag::Symbol => return env::lookup(&self.heap, env, expr),
                Tag::Pair => {}
                _ => return Ok(expr), // self-evaluating: (), #t/#f, chars, strings, procedures...
            }

            let mark = self.heap.root_mark();
            self.heap.push_root(expr);
            self.heap.push_root(env);

            let op = expr.car(&self.heap).expect("checked pair");
            let args_form = expr.cdr(&self.heap).expect("checked pair");

            let dispatch = self.dispatch_special(op, args_form, expr, env)?;
            let result = match dispatch {
                Some(BodyResult::Value(v)) => {
                    self.heap.unroot_to(mark);
                    return Ok(v);
                }
                Some(BodyResult::Tail(next_expr, next_env)) => {
                    expr = next_expr;
                    env = next_env;
                    self.heap.unroot_to(mark);
                    continue;
                }
                None => self.eval_application(op, args_form, env)?,
            };

            match result {
                BodyResult::Value(v) => {
                    self.heap.unroot_to(mark);
                    return Ok(v);
                }
                BodyResult::Tail(next_expr, next_env) => {
                    expr = next_expr;
                    env = next_env;
                    self.heap.unroot_to(mark);
                }
            }
        }
    }

    /// Handle `op` if it is one of the reserved special forms; `None` means
    /// "not a special form, evaluate as an ordinary application".
    fn dispatch_special(
        &mut self,
        op: Value,
        args_form: Value,
        whole_form: Value,
        env: Value,
    ) -> EvalResult<Option<BodyResult>> {
        if !op.is_symbol(&self.heap) {
            return Ok(None);
        }

        if op.eq(&self.reserved.quote) {
            let datum = args_form
                .car(&self.heap)
                .ok_or_else(|| EvalError::IllFormedSpecialForm("quote".to_string()))?;
            return Ok(Some(BodyResult::Value(datum)));
        }
        if op.eq(&self.reserved.lambda) {
            let params = args_form
                .car(&self.heap)
                .ok_or_else(|| EvalError::IllFormedSpecialForm("lambda".to_string()))?;
            let body = args_form.cdr(&self.heap).expect("checked pair above via car");
            let closure = self.heap.new_closure(params, body, env);
            return Ok(Some(BodyResult::Value(closure)));
        }
        if op.eq(&self.reserved.begin) {
            return Ok(Some(self.eval_body(args_form, env)?));
        }
        if op.eq(&self.reserved.if_) {
            return Ok(Some(self.eval_if(args_form, env)?));
        }
        if op.eq(&self.reserved.and) {
            return Ok(Some(self.eval_and(args_form, env)?));
        }
        if op.eq(&self.reserved.or) {
            return Ok(Some(self.eval_or(args_form, env)?));
        }
        if op.eq(&self.reserved.cond) {
            return Ok(Some(self.eval_cond(args_form, env)?));
        }
        if op.eq(&self.reserved.case) {
            return Ok(Some(self.eval_case(args_form, env)?));
        }
        if op.eq(&self.reserved.let_) {
            return Ok(Some(self.eval_let(args_form, env)?));
        }
        if op.eq(&self.reserved.let_star) {
            return Ok(Some(self.eval_let_star(args_form, env)?));
        }
        if op.eq(&self.reserved.letrec) {
            return Ok(Some(self.eval_letrec(args_form, env)?));
        }
        if op.eq(&self.reserved.set_bang) {
            return Ok(Some(BodyResult::Value(self.eval_set_bang(args_form, env)?)));
        }
        if op.eq(&self.reserved.define) {
            let (value, _new_env) = self.eval_define(whole_form, env)?;
            return Ok(Some(BodyResult::Value(value)));
        }

        Ok(None)
    }

    fn eval_if(&mut self, args_form: Value, env: Value) -> EvalResult<BodyResult> {
        let test = args_form
            .car(&self.heap)
            .ok_or_else(|| EvalError::IllFormedSpecialForm("if".to_string()))?;
        let rest = args_form.cdr(&self.heap).expect("checked pair");
        let consequent = rest
            .car(&self.heap)
            .ok_or_else(|| EvalError::IllFormedSpecialForm("if".to_string()))?;
        let alternative = rest.cdr(&self.heap).and_then(|r| r.car(&self.heap));

        let test_val = self.evaluate(test, env)?;
        if test_val.is_truthy(&self.heap) {
            Ok(BodyResult::Tail(consequent, env))
        } else if let Some(alt) = alternative {
            Ok(BodyResult::Tail(alt, env))
        } else {
            Ok(BodyResult::Value(self.heap.unspecified()))
        }
    }

    fn eval_and(&mut self, args_form: Value, env: Value) -> EvalResult<BodyResult> {
        if args_form.is_null(&self.heap) {
            return Ok(BodyResult::Value(self.heap.boolean(true)));
        }
        let mut cur = args_form;
        loop {
            let form = cur.car(&self.heap).expect("and list element");
            let rest = cur.cdr(&self.heap).expect("and list tail");
            if rest.is_null(&self.heap) {
                return Ok(BodyResult::Tail(form, env));
            }
            let v = self.evaluate(form, env)?;
            if v.is_false(&self.heap) {
                return Ok(BodyResult::Value(v));
            }
            cur = rest;
        }
    }

    fn eval_or(&mut self, args_form: Value, env: Value) -> EvalResult<BodyResult> {
        if args_form.is_null(&self.heap) {
            return Ok(BodyResult::Value(self.heap.boolean(false)));
        }
        let mut cur = args_form;
        loop {
            let form = cur.car(&self.heap).expect("or list element");
            let rest = cur.cdr(&self.heap).expect("or list tail");
            if rest.is_null(&self.heap) {
                return Ok(BodyResult::Tail(form, env));
            }
            let v = self.evaluate(form, env)?;
            if v.is_truthy(&self.heap) {
                return Ok(BodyResult::Value(v));
            }
            cur = rest;
        }
    }

    fn eval_cond(&mut self, clauses: Value, env: Value) -> EvalResult<BodyResult> {
        let mut cur = clauses;
        while !cur.is_null(&self.heap) {
            let clause = cur.car(&self.heap).expect("cond clause");
            let test = clause
                .car(&self.heap)
                .ok_or_else(|| EvalError::IllFormedSpecialForm("cond".to_string()))?;
            let body = clause.cdr(&self.heap).expect("checked pair");

            let test_value = if test.eq(&self.reserved.else_) {
                self.heap.boolean(true)
            } else {
                self.evaluate(test, env)?
            };
            if test_value.is_truthy(&self.heap) {
                if body.is_null(&self.heap) {
                    return Ok(BodyResult::Value(test_value));
                }
                return Ok(self.eval_body(body, env)?);
            }
            cur = cur.cdr(&self.heap).expect("cond clause list");
        }
        Ok(BodyResult::Value(self.heap.unspecified()))
    }

    fn eval_case(&mut self, form: Value, env: Value) -> EvalResult<BodyResult> {
        let key_form = form
            .car(&self.heap)
            .ok_or_else(|| EvalError::IllFormedSpecialForm("case".to_string()))?;
        let clauses = form.cdr(&self.heap).expect("checked pair");
        let key = self.evaluate(key_form, env)?;

        let mut cur = clauses;
        while !cur.is_null(&self.heap) {
            let clause = cur.car(&self.heap).expect("case clause");
            let datums = clause
                .car(&self.heap)
                .ok_or_else(|| EvalError::IllFormedSpecialForm("case".to_string()))?;
            let body = clause.cdr(&self.heap).expect("checked pair");

            let matched = if datums.eq(&self.reserved.else_) {
                true
            } else {
                list_to_vec(&self.heap, datums)
                    .ok_or_else(|| EvalError::IllFormedSpecialForm("case".to_string()))?
                    .iter()
                    .any(|d| datum_eqv(&self.heap, *d, key))
            };

            if matched {
                if body.is_null(&self.heap) {
                    return Ok(BodyResult::Value(self.heap.unspecified()));
                }
                return Ok(self.eval_body(body, env)?);
            }
            cur = cur.cdr(&self.heap).expect("case clause list");
        }
        Ok(BodyResult::Value(self.heap.unspecified()))
    }

    fn eval_let(&mut self, form: Value, env: Value) -> EvalResult<BodyResult> {
        let bindings = form
            .car(&self.heap)
            .ok_or_else(|| EvalError::IllFormedSpecialForm("let".to_string()))?;
        if bindings.is_symbol(&self.heap) {
            return Err(EvalError::NamedLetUnsupported);
        }
        let body = form.cdr(&self.heap).expect("checked pair");

        let binding_forms =
            list_to_vec(&self.heap, bindings).ok_or_else(|| EvalError::IllFormedSpecialForm("let".to_string()))?;
        let mut names = Vec::with_capacity(binding_forms.len());
        let mut values = Vec::with_capacity(binding_forms.len());
        let mark = self.heap.root_mark();
        for b in binding_forms {
            let name = b
                .car(&self.heap)
                .ok_or_else(|| EvalError::IllFormedSpecialForm("let".to_string()))?;
            let init = b
                .cdr(&self.heap)
                .and_then(|r| r.car(&self.heap))
                .unwrap_or_else(|| self.heap.unspecified());
            let v = self.evaluate(init, env)?;
            self.heap.push_root(v);
            names.push(name);
            values.push(v);
        }

        let mut new_env = env;
        for (name, value) in names.into_iter().zip(values.into_iter()) {
            new_env = env::extend(&mut self.heap, name, value, new_env);
        }
        self.heap.unroot_to(mark);
        Ok(self.eval_body(body, new_env)?)
    }

    fn eval_let_star(&mut self, form: Value, env: Value) -> EvalResult<BodyResult> {
        let bindings = form
            .car(&self.heap)
            .ok_or_else(|| EvalError::IllFormedSpecialForm("let*".to_string()))?;
        let body = form.cdr(&self.heap).expect("checked pair");

        let binding_forms = list_to_vec(&self.heap, bindings)
            .ok_or_else(|| EvalError::IllFormedSpecialForm("let*".to_string()))?;
        let mut new_env = env;
        for b in binding_forms {
            let name = b
                .car(&self.heap)
                .ok_or_else(|| EvalError::IllFormedSpecialForm("let*".to_string()))?;
            let init = b
                .cdr(&self.heap)
                .and_then(|r| r.car(&self.heap))
                .unwrap_or_else(|| self.heap.unspecified());
            let v = self.evaluate(init, new_env)?;
            new_env = env::extend(&mut self.heap, name, v, new_env);
        }
        Ok(self.eval_body(body, new_env)?)
    }

    fn eval_letrec(&mut self, form: Value, env: Value) -> EvalResult<BodyResult> {
        let bindings = form
            .car(&self.heap)
            .ok_or_else(|| EvalError::IllFormedSpecialForm("letrec".to_string()))?;
        let body = form.cdr(&self.heap).expect("checked pair");

        let binding_forms = list_to_vec(&self.heap, bindings)
            .ok_or_else(|| EvalError::IllFormedSpecialForm("letrec".to_string()))?;

        let mut new_env = env;
        let unspecified = self.heap.unspecified();
        let mut names = Vec::with_capacity(binding_forms.len());
        for b in &binding_forms {
            let name = b
                .car(&self.heap)
                .ok_or_else(|| EvalError::IllFormedSpecialForm("letrec".to_string()))?;
            new_env = env::extend(&mut self.heap, name, unspecified, new_env);
            names.push(name);
        }
        for (name, b) in names.into_iter().zip(binding_forms.into_iter()) {
            let init = b
                .cdr(&self.heap)
                .and_then(|r| r.car(&self.heap))
                .unwrap_or_else(|| self.heap.unspecified());
            let v = self.evaluate(init, new_env)?;
            env::set(&mut self.heap, new_env, name, v)?;
        }
        Ok(self.eval_body(body, new_env)?)
    }

    fn eval_set_bang(&mut self, form: Value, env: Value) -> EvalResult<Value> {
        let name = form
            .car(&self.heap)
            .ok_or_else(|| EvalError::IllFormedSpecialForm("set!".to_string()))?;
        let expr = form
            .cdr(&self.heap)
            .and_then(|r| r.car(&self.heap))
            .ok_or_else(|| EvalError::IllFormedSpecialForm("set!".to_string()))?;
        let v = self.evaluate(expr, env)?;
        env::set(&mut self.heap, env, name, v)?;
        Ok(self.heap.unspecified())
    }

    /// Shared by the `define` special form and by `eval_body`'s non-tail
    /// sequencing (which needs the possibly-extended environment threaded
    /// to the body's remaining forms).
    fn eval_define(&mut self, form: Value, env: Value) -> EvalResult<(Value, Value)> {
        let rest = form.cdr(&self.heap).expect("define form is a pair");
        let target = rest
            .car(&self.heap)
            .ok_or_else(|| EvalError::IllFormedSpecialForm("define".to_string()))?;
        let after_target = rest.cdr(&self.heap).expect("checked pair");

        if target.is_pair(&self.heap) {
            let name = target
                .car(&self.heap)
                .ok_or_else(|| EvalError::IllFormedSpecialForm("define".to_string()))?;
            let params = target.cdr(&self.heap).expect("checked pair");
            let closure = self.heap.new_closure(params, after_target, env);
            let new_env = env::define(&mut self.heap, env, name, closure);
            Ok((self.heap.unspecified(), new_env))
        } else {
            let value = match after_target.car(&self.heap) {
                Some(init) => self.evaluate(init, env)?,
                None => self.heap.unspecified(),
            };
            let new_env = env::define(&mut self.heap, env, target, value);
            Ok((self.heap.unspecified(), new_env))
        }
    }

    /// Evaluate a body (a list of forms, implicit `begin`), threading
    /// `define`'s environment extension to subsequent sibling forms and
    /// leaving the last form for the caller to evaluate in tail position.
    fn eval_body(&mut self, body: Value, env: Value) -> EvalResult<BodyResult> {
        if body.is_null(&self.heap) {
            return Ok(BodyResult::Value(self.heap.unspecified()));
        }
        let mut cur = body;
        let mut env = env;
        loop {
            let form = cur.car(&self.heap).expect("body list element");
            let rest = cur.cdr(&self.heap).expect("body list tail");
            if rest.is_null(&self.heap) {
                return Ok(BodyResult::Tail(form, env));
            }
            if self.form_operator(form).map(|op| op.eq(&self.reserved.define)) == Some(true) {
                let (_, new_env) = self.eval_define(form, env)?;
                env = new_env;
            } else {
                self.evaluate(form, env)?;
            }
            cur = rest;
        }
    }

    fn form_operator(&self, form: Value) -> Option<Value> {
        if form.is_pair(&self.heap) {
            form.car(&self.heap)
        } else {
            None
        }
    }

    fn eval_application(&mut self, op: Value, args_form: Value, env: Value) -> EvalResult<BodyResult> {
        let proc = self.evaluate(op, env)?;
        self.heap.push_root(proc);

        if let Some(ptr) = proc.as_cell_ptr() {
            if let CellKind::SpecialPrimitive { func, .. } = &self.heap.cell(ptr).kind {
                let func = *func;
                let result = func(self, args_form, env);
                self.heap.pop_roots(1);
                return result.map(BodyResult::Value);
            }
        }

        let arg_forms =
            list_to_vec(&self.heap, args_form).ok_or_else(|| EvalError::IllFormedSpecialForm("application".to_string()))?;
        let mut args = Vec::with_capacity(arg_forms.len());
        for f in arg_forms {
            let v = self.evaluate(f, env)?;
            self.heap.push_root(v);
            args.push(v);
        }

        let result = self.apply(proc, &args, env);
        self.heap.pop_roots(args.len() + 1);
        result
    }

    /// Apply an already-evaluated procedure value to already-evaluated
    /// arguments. Used both by ordinary application and by primitives such
    /// as `apply`/`map` that need to call back into the evaluator.
    pub fn apply(&mut self, proc: Value, args: &[Value], _caller_env: Value) -> EvalResult<BodyResult> {
        enum Dispatch {
            Primitive(Arity, PrimitiveFn, Value),
            SpecialPrimitive,
            Closure(Value, Value, Value),
            NotApplicable,
        }

        let ptr = proc
            .as_cell_ptr()
            .ok_or_else(|| EvalError::UnknownFunctionType("fixnum is not applicable".to_string()))?;
        let dispatch = match &self.heap.cell(ptr).kind {
            CellKind::Primitive { arity, func, name } => Dispatch::Primitive(*arity, *func, *name),
            CellKind::SpecialPrimitive { .. } => Dispatch::SpecialPrimitive,
            CellKind::Closure { params, body, env } => Dispatch::Closure(*params, *body, *env),
            _ => Dispatch::NotApplicable,
        };

        match dispatch {
            Dispatch::Primitive(arity, func, name) => {
                if !arity.matches(args.len()) {
                    let name = name.symbol_name(&self.heap).unwrap_or("?").to_string();
                    return Err(EvalError::WrongArgCount(name));
                }
                Ok(BodyResult::Value(func(self, args)?))
            }
            Dispatch::SpecialPrimitive => Err(EvalError::UnknownFunctionType(
                "special primitive cannot be applied to evaluated arguments".to_string(),
            )),
            Dispatch::Closure(params, body, captured_env) => {
                let new_env = env::bind_params(&mut self.heap, params, args, captured_env)?;
                self.eval_body(body, new_env)
            }
            Dispatch::NotApplicable => Err(EvalError::UnknownFunctionType(
                "value is not a procedure".to_string(),
            )),
        }
    }

    /// Fully evaluate `proc(args)` to a `Value`, driving any tail position
    /// to completion. Used by primitives that need a concrete result, since
    /// `BodyResult` is private to this module.
    pub fn call(&mut self, proc: Value, args: &[Value]) -> EvalResult<Value> {
        let env = self.heap.global_env;
        match self.apply(proc, args, env)? {
            BodyResult::Value(v) => Ok(v),
            BodyResult::Tail(expr, env) => self.evaluate(expr, env),
        }
    }
}

/// `eqv?`-ish comparison for `case` datum matching: by value for fixnums,
/// characters, and booleans (each of which may be a distinct heap cell per
/// occurrence), by `eq?` identity for everything else (symbols are
/// interned, so this is exact).
fn datum_eqv(heap: &Heap, a: Value, b: Value) -> bool {
    if let (Some(x), Some(y)) = (a.as_fixnum(), b.as_fixnum()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_character(heap), b.as_character(heap)) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_boolean(heap), b.as_boolean(heap)) {
        return x == y;
    }
    a.eq(&b)
}

enum Tag {
    Symbol,
    Pair,
    Other,
}

impl Heap {
    fn cell_kind_tag(&self, v: Value) -> Tag {
        match v.as_cell_ptr() {
            None => Tag::Other,
            Some(p) => match &self.cell(p).kind {
                CellKind::Symbol { .. } => Tag::Symbol,
                CellKind::Pair { .. } => Tag::Pair,
                _ => Tag::Other,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::Heap;
    use crate::reader::Reader;

    fn eval_str(interp: &mut Interpreter, src: &str) -> Value {
        let v = Reader::new(src).read(&mut interp.heap).unwrap().unwrap();
        interp.eval_top(v).unwrap()
    }

    #[test]
    fn arithmetic_primitive_application() {
        let mut interp = Interpreter::new(Heap::new(4096).unwrap());
        crate::primitives::install(&mut interp.heap);
        let v = eval_str(&mut interp, "(+ 1 2)");
        assert_eq!(v.as_fixnum(), Some(3));
    }

    #[test]
    fn if_and_quote() {
        let mut interp = Interpreter::new(Heap::new(4096).unwrap());
        crate::primitives::install(&mut interp.heap);
        let v = eval_str(&mut interp, "(if #t (quote yes) (quote no))");
        assert_eq!(v.symbol_name(&interp.heap), Some("YES"));
    }

    #[test]
    fn lambda_application_and_rest_params() {
        let mut interp = Interpreter::new(Heap::new(4096).unwrap());
        crate::primitives::install(&mut interp.heap);
        let v = eval_str(&mut interp, "((lambda args args) 1 2 3)");
        assert_eq!(v.list_len(&interp.heap), Some(3));
    }

    #[test]
    fn let_star_sees_earlier_bindings() {
        let mut interp = Interpreter::new(Heap::new(4096).unwrap());
        crate::primitives::install(&mut interp.heap);
        let v = eval_str(&mut interp, "(let* ((x 2) (y (+ x 1))) y)");
        assert_eq!(v.as_fixnum(), Some(3));
    }

    #[test]
    fn letrec_factorial() {
        let mut interp = Interpreter::new(Heap::new(16384).unwrap());
        crate::primitives::install(&mut interp.heap);
        let v = eval_str(
            &mut interp,
            "(letrec ((fact (lambda (n) (if (= n 0) 1 (* n (fact (- n 1))))))) (fact 10))",
        );
        assert_eq!(v.as_fixnum(), Some(3628800));
    }

    #[test]
    fn closure_captures_mutable_counter() {
        let mut interp = Interpreter::new(Heap::new(4096).unwrap());
        crate::primitives::install(&mut interp.heap);
        eval_str(
            &mut interp,
            "(define counter (let ((n 0)) (lambda () (set! n (+ n 1)) n)))",
        );
        assert_eq!(eval_str(&mut interp, "(counter)").as_fixnum(), Some(1));
        assert_eq!(eval_str(&mut interp, "(counter)").as_fixnum(), Some(2));
    }

    #[test]
    fn cond_falls_through_to_unspecified() {
        let mut interp = Interpreter::new(Heap::new(4096).unwrap());
        crate::primitives::install(&mut interp.heap);
        let v = eval_str(&mut interp, "(cond (#f 1))");
        assert!(v.eq(&interp.heap.unspecified()));
    }

    #[test]
    fn named_let_is_rejected() {
        let mut interp = Interpreter::new(Heap::new(4096).unwrap());
        crate::primitives::install(&mut interp.heap);
        let form = Reader::new("(let loop ((x 0)) x)")
            .read(&mut interp.heap)
            .unwrap()
            .unwrap();
        let err = interp.eval_top(form).unwrap_err();
        assert!(matches!(err, EvalError::NamedLetUnsupported));
    }

    #[test]
    fn case_matches_by_eqv_not_identity() {
        let mut interp = Interpreter::new(Heap::new(4096).unwrap());
        crate::primitives::install(&mut interp.heap);
        let v = eval_str(&mut interp, "(case 2 ((1) 'one) ((2 3) 'two-or-three) (else 'other))");
        assert_eq!(v.symbol_name(&interp.heap), Some("TWO-OR-THREE"));
    }
}
