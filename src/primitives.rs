//! The built-in procedure table: arithmetic, pairs, predicates, symbols,
//! and I/O, wired into the obarray at startup via `Heap::define_primitive`/
//! `define_special` (§4.7, §6). Each function here is a `PrimitiveFn` —
//! arity is checked once by `Interpreter::apply` against the `Arity` tag
//! given at registration, so a primitive only needs to re-check variadic
//! arities that have their own internal minimums (subtraction needs at
//! least one argument; `display` takes one value and an optional port).

use crate::cell::Arity;
use crate::error::{EvalError, EvalResult};
use crate::eval::Interpreter;
use crate::heap::Heap;
use crate::port::PortHandle;
use crate::printer::{write_to_string, write_value};
use crate::reader::Reader;
use crate::value::{list_from_slice, list_to_vec, Value};

pub fn install(heap: &mut Heap) {
    heap.define_primitive("+", Arity::Variadic, prim_add);
    heap.define_primitive("-", Arity::Variadic, prim_sub);
    heap.define_primitive("*", Arity::Variadic, prim_mul);
    heap.define_primitive("QUOTIENT", Arity::Fixed2, prim_quotient);
    heap.define_primitive("REMAINDER", Arity::Fixed2, prim_remainder);
    heap.define_primitive("=", Arity::Variadic, prim_num_eq);
    heap.define_primitive("<", Arity::Variadic, prim_lt);
    heap.define_primitive(">", Arity::Variadic, prim_gt);
    heap.define_primitive("<=", Arity::Variadic, prim_le);
    heap.define_primitive(">=", Arity::Variadic, prim_ge);
    heap.define_primitive("ZERO?", Arity::Fixed1, prim_zero_p);

    heap.define_primitive("CONS", Arity::Fixed2, prim_cons);
    heap.define_primitive("CAR", Arity::Fixed1, prim_car);
    heap.define_primitive("CDR", Arity::Fixed1, prim_cdr);
    heap.define_primitive("SET-CAR!", Arity::Fixed2, prim_set_car);
    heap.define_primitive("SET-CDR!", Arity::Fixed2, prim_set_cdr);
    heap.define_primitive("LIST", Arity::Variadic, prim_list);
    heap.define_primitive("LENGTH", Arity::Fixed1, prim_length);
    heap.define_primitive("APPEND", Arity::Variadic, prim_append);
    heap.define_primitive("REVERSE", Arity::Fixed1, prim_reverse);

    heap.define_primitive("NULL?", Arity::Fixed1, prim_null_p);
    heap.define_primitive("PAIR?", Arity::Fixed1, prim_pair_p);
    heap.define_primitive("SYMBOL?", Arity::Fixed1, prim_symbol_p);
    heap.define_primitive("STRING?", Arity::Fixed1, prim_string_p);
    heap.define_primitive("NUMBER?", Arity::Fixed1, prim_number_p);
    heap.define_primitive("PROCEDURE?", Arity::Fixed1, prim_procedure_p);
    heap.define_primitive("BOOLEAN?", Arity::Fixed1, prim_boolean_p);
    heap.define_primitive("EOF-OBJECT?", Arity::Fixed1, prim_eof_object_p);
    heap.define_primitive("EQ?", Arity::Fixed2, prim_eq_p);
    heap.define_primitive("NOT", Arity::Fixed1, prim_not);

    heap.define_primitive("SYMBOL->STRING", Arity::Fixed1, prim_symbol_to_string);
    heap.define_primitive("STRING->SYMBOL", Arity::Fixed1, prim_string_to_symbol);
    heap.define_primitive("STRING-LENGTH", Arity::Fixed1, prim_string_length);
    heap.define_primitive("STRING-APPEND", Arity::Variadic, prim_string_append);

    heap.define_primitive("DISPLAY", Arity::Variadic, prim_display);
    heap.define_primitive("WRITE", Arity::Variadic, prim_write);
    heap.define_primitive("NEWLINE", Arity::Variadic, prim_newline);
    heap.define_primitive("OPEN-INPUT-FILE", Arity::Fixed1, prim_open_input_file);
    heap.define_primitive("OPEN-OUTPUT-FILE", Arity::Fixed1, prim_open_output_file);
    heap.define_primitive("CLOSE-PORT", Arity::Fixed1, prim_close_port);
    heap.define_primitive("READ-CHAR", Arity::Variadic, prim_read_char);

    heap.define_primitive("APPLY", Arity::Fixed2, prim_apply);
    heap.define_primitive("SYS:TOPLEVEL", Arity::Fixed0, prim_sys_toplevel);

    heap.define_special("THE-ENVIRONMENT", prim_the_environment);
}

fn expect_fixnum(v: Value, who: &str) -> EvalResult<i64> {
    v.as_fixnum()
        .ok_or_else(|| EvalError::WrongType(format!("{who}: expected a fixnum")))
}

fn expect_pair(heap: &Heap, v: Value, who: &str) -> EvalResult<()> {
    if v.is_pair(heap) {
        Ok(())
    } else {
        Err(EvalError::WrongType(format!("{who}: expected a pair")))
    }
}

fn expect_string<'h>(heap: &'h Heap, v: Value, who: &str) -> EvalResult<&'h str> {
    v.as_string(heap)
        .ok_or_else(|| EvalError::WrongType(format!("{who}: expected a string")))
}

fn expect_symbol<'h>(heap: &'h Heap, v: Value, who: &str) -> EvalResult<&'h str> {
    v.symbol_name(heap)
        .ok_or_else(|| EvalError::WrongType(format!("{who}: expected a symbol")))
}

// ---- arithmetic -----------------------------------------------------------

fn prim_add(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    let mut acc: i64 = 0;
    for a in args {
        acc = acc.wrapping_add(expect_fixnum(*a, "+")?);
    }
    Ok(Value::Fixnum(acc))
}

fn prim_sub(_interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    match args {
        [] => Err(EvalError::WrongArgCount("-".to_string())),
        [only] => Ok(Value::Fixnum(expect_fixnum(*only, "-")?.wrapping_neg())),
        [first, rest @ ..] => {
            let mut acc = expect_fixnum(*first, "-")?;
            for a in rest {
                acc = acc.wrapping_sub(expect_fixnum(*a, "-")?);
            }
            Ok(Value::Fixnum(acc))
        }
    }
}

fn prim_mul(_interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    let mut acc: i64 = 1;
    for a in args {
        acc = acc.wrapping_mul(expect_fixnum(*a, "*")?);
    }
    Ok(Value::Fixnum(acc))
}

fn prim_quotient(_interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    let a = expect_fixnum(args[0], "quotient")?;
    let b = expect_fixnum(args[1], "quotient")?;
    if b == 0 {
        return Err(EvalError::WrongType("quotient: division by zero".to_string()));
    }
    Ok(Value::Fixnum(a.wrapping_div(b)))
}

fn prim_remainder(_interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    let a = expect_fixnum(args[0], "remainder")?;
    let b = expect_fixnum(args[1], "remainder")?;
    if b == 0 {
        return Err(EvalError::WrongType("remainder: division by zero".to_string()));
    }
    Ok(Value::Fixnum(a.wrapping_rem(b)))
}

fn numeric_chain(args: &[Value], who: &str, cmp: impl Fn(i64, i64) -> bool) -> EvalResult<bool> {
    if args.len() < 2 {
        return Ok(true);
    }
    for pair in args.windows(2) {
        let a = expect_fixnum(pair[0], who)?;
        let b = expect_fixnum(pair[1], who)?;
        if !cmp(a, b) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn prim_num_eq(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    Ok(interp.heap.boolean(numeric_chain(args, "=", |a, b| a == b)?))
}

fn prim_lt(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    Ok(interp.heap.boolean(numeric_chain(args, "<", |a, b| a < b)?))
}

fn prim_gt(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    Ok(interp.heap.boolean(numeric_chain(args, ">", |a, b| a > b)?))
}

fn prim_le(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    Ok(interp.heap.boolean(numeric_chain(args, "<=", |a, b| a <= b)?))
}

fn prim_ge(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    Ok(interp.heap.boolean(numeric_chain(args, ">=", |a, b| a >= b)?))
}

fn prim_zero_p(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    Ok(interp.heap.boolean(expect_fixnum(args[0], "zero?")? == 0))
}

// ---- pairs and lists -------------------------------------------------------

fn prim_cons(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    Ok(interp.heap.cons(args[0], args[1]))
}

fn prim_car(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    expect_pair(&interp.heap, args[0], "car")?;
    Ok(args[0].car(&interp.heap).expect("checked pair"))
}

fn prim_cdr(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    expect_pair(&interp.heap, args[0], "cdr")?;
    Ok(args[0].cdr(&interp.heap).expect("checked pair"))
}

fn prim_set_car(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    expect_pair(&interp.heap, args[0], "set-car!")?;
    args[0].set_car(&mut interp.heap, args[1]);
    Ok(interp.heap.unspecified())
}

fn prim_set_cdr(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    expect_pair(&interp.heap, args[0], "set-cdr!")?;
    args[0].set_cdr(&mut interp.heap, args[1]);
    Ok(interp.heap.unspecified())
}

fn prim_list(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    Ok(list_from_slice(&mut interp.heap, args))
}

/// `()` is a perfectly good length-0 list structurally, but `length`
/// demands a pair: calling it on the empty list is an error here, not 0.
fn prim_length(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    expect_pair(&interp.heap, args[0], "length")?;
    let n = args[0]
        .list_len(&interp.heap)
        .ok_or_else(|| EvalError::WrongType("length: improper list".to_string()))?;
    Ok(Value::Fixnum(n as i64))
}

fn prim_append(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    if args.is_empty() {
        return Ok(interp.heap.null());
    }
    let mut items = Vec::new();
    for (i, a) in args.iter().enumerate() {
        if i + 1 == args.len() {
            // Last argument becomes the tail, improper lists allowed.
            let mut result = *a;
            for v in items.iter().rev() {
                result = interp.heap.cons(*v, result);
            }
            return Ok(result);
        }
        let vs = list_to_vec(&interp.heap, *a)
            .ok_or_else(|| EvalError::WrongType("append: improper list argument".to_string()))?;
        items.extend(vs);
    }
    unreachable!("loop always returns on the last argument")
}

fn prim_reverse(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    let items = list_to_vec(&interp.heap, args[0])
        .ok_or_else(|| EvalError::WrongType("reverse: improper list".to_string()))?;
    let mut result = interp.heap.null();
    for v in items {
        result = interp.heap.cons(v, result);
    }
    Ok(result)
}

// ---- predicates -------------------------------------------------------

fn prim_null_p(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    Ok(interp.heap.boolean(args[0].is_null(&interp.heap)))
}

fn prim_pair_p(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    Ok(interp.heap.boolean(args[0].is_pair(&interp.heap)))
}

fn prim_symbol_p(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    Ok(interp.heap.boolean(args[0].is_symbol(&interp.heap)))
}

fn prim_string_p(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    Ok(interp.heap.boolean(args[0].is_string(&interp.heap)))
}

fn prim_number_p(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    Ok(interp.heap.boolean(args[0].is_fixnum()))
}

fn prim_procedure_p(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    Ok(interp.heap.boolean(args[0].is_procedure(&interp.heap)))
}

fn prim_boolean_p(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    Ok(interp.heap.boolean(args[0].is_boolean(&interp.heap)))
}

fn prim_eof_object_p(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    Ok(interp.heap.boolean(args[0].is_eof(&interp.heap)))
}

fn prim_eq_p(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    Ok(interp.heap.boolean(args[0].eq(&args[1])))
}

fn prim_not(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    Ok(interp.heap.boolean(args[0].is_false(&interp.heap)))
}

// ---- symbols and strings -----------------------------------------------

fn prim_symbol_to_string(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    let name = expect_symbol(&interp.heap, args[0], "symbol->string")?.to_string();
    Ok(interp.heap.new_string(name))
}

fn prim_string_to_symbol(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    let s = expect_string(&interp.heap, args[0], "string->symbol")?.to_string();
    Ok(interp.heap.intern(&s))
}

fn prim_string_length(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    let s = expect_string(&interp.heap, args[0], "string-length")?;
    Ok(Value::Fixnum(s.chars().count() as i64))
}

fn prim_string_append(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    let mut out = String::new();
    for a in args {
        out.push_str(expect_string(&interp.heap, *a, "string-append")?);
    }
    Ok(interp.heap.new_string(out))
}

// ---- I/O ----------------------------------------------------------------

fn port_or_stdout(interp: &Interpreter, args: &[Value], idx: usize) -> Value {
    args.get(idx).copied().unwrap_or(interp.heap.singletons.stdout)
}

fn prim_display(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    write_to_port(interp, args, true)
}

fn prim_write(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    write_to_port(interp, args, false)
}

fn write_to_port(interp: &mut Interpreter, args: &[Value], display: bool) -> EvalResult<Value> {
    if args.is_empty() {
        return Err(EvalError::WrongArgCount(if display { "display" } else { "write" }.to_string()));
    }
    let port = port_or_stdout(interp, args, 1);
    let ptr = port
        .as_cell_ptr()
        .ok_or_else(|| EvalError::WrongType("expected a port".to_string()))?;
    let mut buf = Vec::new();
    write_value(&mut buf, &interp.heap, args[0], display).expect("writing to a Vec<u8> cannot fail");
    let text = String::from_utf8(buf).expect("printer never emits invalid UTF-8");
    if let crate::cell::CellKind::Port(handle) = &mut interp.heap.cell_mut(ptr).kind {
        handle
            .write_str(&text)
            .map_err(|e| EvalError::WrongType(format!("write to port failed: {e}")))?;
    } else {
        return Err(EvalError::WrongType("expected a port".to_string()));
    }
    Ok(interp.heap.unspecified())
}

fn prim_newline(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    let port = port_or_stdout(interp, args, 0);
    let ptr = port
        .as_cell_ptr()
        .ok_or_else(|| EvalError::WrongType("expected a port".to_string()))?;
    if let crate::cell::CellKind::Port(handle) = &mut interp.heap.cell_mut(ptr).kind {
        handle
            .write_str("\n")
            .map_err(|e| EvalError::WrongType(format!("write to port failed: {e}")))?;
    } else {
        return Err(EvalError::WrongType("expected a port".to_string()));
    }
    Ok(interp.heap.unspecified())
}

fn prim_open_input_file(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    let path = expect_string(&interp.heap, args[0], "open-input-file")?.to_string();
    let handle = PortHandle::open_input(&path)
        .map_err(|e| EvalError::WrongType(format!("open-input-file: {e}")))?;
    Ok(interp.heap.new_port(handle))
}

fn prim_open_output_file(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    let path = expect_string(&interp.heap, args[0], "open-output-file")?.to_string();
    let handle = PortHandle::open_output(&path)
        .map_err(|e| EvalError::WrongType(format!("open-output-file: {e}")))?;
    Ok(interp.heap.new_port(handle))
}

fn prim_close_port(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    let ptr = args[0]
        .as_cell_ptr()
        .ok_or_else(|| EvalError::WrongType("expected a port".to_string()))?;
    if let crate::cell::CellKind::Port(handle) = &mut interp.heap.cell_mut(ptr).kind {
        handle.close();
        Ok(interp.heap.unspecified())
    } else {
        Err(EvalError::WrongType("expected a port".to_string()))
    }
}

fn prim_read_char(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    let port = port_or_stdout(interp, args, 0);
    let ptr = port
        .as_cell_ptr()
        .ok_or_else(|| EvalError::WrongType("expected a port".to_string()))?;
    let c = if let crate::cell::CellKind::Port(handle) = &mut interp.heap.cell_mut(ptr).kind {
        handle
            .read_char()
            .map_err(|e| EvalError::WrongType(format!("read-char: {e}")))?
    } else {
        return Err(EvalError::WrongType("expected a port".to_string()));
    };
    Ok(match c {
        Some(ch) => interp.heap.new_character(ch),
        None => interp.heap.eof(),
    })
}

// ---- control --------------------------------------------------------------

fn prim_apply(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    let proc = args[0];
    let call_args = list_to_vec(&interp.heap, args[1])
        .ok_or_else(|| EvalError::WrongType("apply: last argument must be a list".to_string()))?;
    interp.call(proc, &call_args)
}

fn prim_the_environment(interp: &mut Interpreter, _args: Value, env: Value) -> EvalResult<Value> {
    Ok(interp.heap.new_env_handle(env))
}

/// The REPL loop, bound as an ordinary zero-argument primitive rather than
/// wired into `main` directly, so `main` just evaluates `(sys:toplevel)`
/// (§6) and the recovery-point discipline lives in one place. Reads all of
/// stdin up front rather than line-by-line: the reader already treats
/// newlines as ordinary whitespace, so one buffer holding arbitrarily many
/// forms (typed interactively and terminated with EOF, or piped in from a
/// script) is simpler than threading an incremental read across `Reader`'s
/// borrowed cursor.
fn prim_sys_toplevel(interp: &mut Interpreter, _args: &[Value]) -> EvalResult<Value> {
    use std::io::{self, Read, Write};

    let mut source = String::new();
    if io::stdin().read_to_string(&mut source).is_err() {
        return Ok(interp.heap.unspecified());
    }

    let mut reader = Reader::new(&source);
    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let mark = interp.heap.root_mark();
        match reader.read(&mut interp.heap) {
            Ok(None) => break,
            Ok(Some(form)) => {
                interp.heap.push_root(form);
                match interp.eval_top(form) {
                    Ok(v) if !v.eq(&interp.heap.unspecified()) => {
                        println!("{}", write_to_string(&interp.heap, v, false));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("{e}");
                        eprintln!("error: {e}");
                    }
                }
            }
            Err(e) => {
                tracing::warn!("{e}");
                eprintln!("error: {e}");
            }
        }
        interp.heap.unroot_to(mark);
    }
    Ok(interp.heap.unspecified())
}
