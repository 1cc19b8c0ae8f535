use super::*;
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn should_return_42() {
    let s = param(|| 42);

    assert_eq!(&42, get(&s));
}

#[test]
fn should_return_42_also_after_changed_backing_field_value() {
    let seed = Rc::new(Cell::new(42));
    let source = seed.clone();

    let s = param(move || source.get());

    assert_eq!(&42, get(&s));

    seed.set(43);
    assert_eq!(&42, get(&s));
}

#[test]
fn should_call_producer_just_once() {
    let sentinel = Rc::new(Cell::new(0));
    let counter = sentinel.clone();

    let p = param(move || {
        counter.set(counter.get() + 1);
        42
    });

    assert_eq!(&42, get(&p));
    get(&p);
    assert_eq!(1, sentinel.get());
}

#[test]
fn should_not_call_producer_before_access() {
    let sentinel = Rc::new(Cell::new(0));
    let counter = sentinel.clone();

    let p = param(move || {
        counter.set(counter.get() + 1);
        42
    });

    assert!(!p.has_value());
    assert_eq!(0, p.value_or(0));
    assert_eq!(0, sentinel.get());

    get(&p);
    assert!(p.has_value());
}

#[test]
fn should_work_with_string_too() {
    let p = param(|| "string slice");

    assert_eq!(&"string slice", get(&p));
}

#[test]
fn should_accept_fn_once_producer() {
    let a = "42".to_string();

    let p = param(move || a);

    assert_eq!("42", get(&p));
}

#[test]
fn use_function_as_producer() {
    fn producer() -> i32 {
        42
    }

    let p = param(producer);

    assert_eq!(&42, get(&p));
}

#[test]
fn should_never_call_producer_when_dropped_unused() {
    let sentinel = Rc::new(Cell::new(0));
    let counter = sentinel.clone();

    drop(param(move || counter.set(counter.get() + 1)));

    assert_eq!(0, sentinel.get());
}
