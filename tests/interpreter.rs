//! End-to-end reader -> evaluator -> printer tests through the public API,
//! the same path `main`'s REPL loop drives.

use rascheme::{Heap, Interpreter};
use rascheme::reader::Reader;
use rascheme::printer::write_to_string;

fn run(src: &str) -> String {
    let mut interp = Interpreter::new(Heap::new(8192).unwrap());
    rascheme::primitives::install(&mut interp.heap);
    let mut reader = Reader::new(src);
    let mut last = interp.heap.unspecified();
    while let Some(form) = reader.read(&mut interp.heap).unwrap() {
        last = interp.eval_top(form).unwrap();
    }
    write_to_string(&interp.heap, last, false)
}

#[test]
fn sequential_defines_build_on_each_other() {
    assert_eq!(
        run("(define x 10) (define y (* x 2)) y"),
        "20"
    );
}

#[test]
fn recursive_closures_over_lists() {
    let out = run(
        "(define (sum lst) (if (null? lst) 0 (+ (car lst) (sum (cdr lst)))))
         (sum (list 1 2 3 4 5))",
    );
    assert_eq!(out, "15");
}

#[test]
fn quasi_reserved_names_are_unbound_not_special() {
    let mut interp = Interpreter::new(Heap::new(1024).unwrap());
    rascheme::primitives::install(&mut interp.heap);
    let form = Reader::new("do").read(&mut interp.heap).unwrap().unwrap();
    let err = interp.eval_top(form).unwrap_err();
    assert!(matches!(err, rascheme::EvalError::UnboundVariable(_)));
}

#[test]
fn apply_calls_back_into_the_evaluator() {
    let out = run("(apply + (list 1 2 3))");
    assert_eq!(out, "6");
}
