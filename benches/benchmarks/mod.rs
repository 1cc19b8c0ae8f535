use super::*;
use criterion::Criterion;
use std::hint::black_box;

pub fn get_1000(c: &mut Criterion) {
    let p = param(|| 42);
    get(&p);

    c.bench_function(&format!("{NAME}/get_1000"), |b| {
        b.iter(|| {
            for _ in 0..1000 {
                black_box(get(&p));
            }
        })
    });
}

pub fn get_100000(c: &mut Criterion) {
    let p = param(|| 42);
    get(&p);

    c.bench_function(&format!("{NAME}/get_100000"), |b| {
        b.iter(|| {
            for _ in 0..100000 {
                black_box(get(&p));
            }
        })
    });
}

pub fn first_access(c: &mut Criterion) {
    c.bench_function(&format!("{NAME}/first_access"), |b| {
        b.iter(|| {
            let p = param(|| 42);
            black_box(*get(&p))
        })
    });
}
