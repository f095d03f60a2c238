use crate::{
    adapters::{parameter_type, Adapter},
    diagnostics::Error,
    modules::Module,
    value::Value,
};

pub fn module() -> Module {
    Module::new("series")
        .native("series/sma", windowed(sma))
        .native("series/momentum", windowed(momentum))
        .native("series/rel-change-n", windowed(rel_change_n))
        .native("series/abs-change-n", windowed(abs_change_n))
        .native("series/stdev-n", windowed(stdev_n))
        .native("series/max-n", windowed(max_n))
        .native("series/rel-change", on_vector(rel_change))
        .native("series/abs-change", on_vector(abs_change))
        .native("series/accum-dev", on_vector(accum_dev))
        .native("series/nrank", on_vector(nrank))
        .native("series/mean", aggregate(mean))
        .native("series/sum", aggregate(sum))
        .native("series/stdev", aggregate(stdev))
}

// Curried window operator: the outer call fixes n and returns the
// vector-consuming native.
fn windowed(f: fn(usize, &[f64]) -> Vec<f64>) -> Value {
    Value::native_with(
        vec![Adapter::Arity(1), Adapter::IntAt(0)],
        move |args: &[Value]| {
            let n = args[0].as_int().ok_or_else(parameter_type)?;
            if n < 1 {
                return Err(Error::new("invalid argument"));
            }
            let n = n as usize;
            Ok(Value::native_with(
                vec![Adapter::Arity(1)],
                move |args: &[Value]| {
                    let Value::Vector(values) = &args[0] else {
                        return Err(parameter_type());
                    };
                    let values = values.borrow();
                    Ok(Value::vector(f(n, &values)))
                },
            ))
        },
    )
}

fn on_vector(f: fn(&[f64]) -> Vec<f64>) -> Value {
    Value::native_with(vec![Adapter::Arity(1)], move |args: &[Value]| {
        let Value::Vector(values) = &args[0] else {
            return Err(parameter_type());
        };
        let values = values.borrow();
        Ok(Value::vector(f(&values)))
    })
}

fn aggregate(f: fn(&[f64]) -> f64) -> Value {
    Value::native_with(vec![Adapter::Arity(1)], move |args: &[Value]| {
        let Value::Vector(values) = &args[0] else {
            return Err(parameter_type());
        };
        let values = values.borrow();
        Ok(Value::Float(f(&values)))
    })
}

fn sma(window: usize, values: &[f64]) -> Vec<f64> {
    values.windows(window).map(mean).collect()
}

fn momentum(n: usize, values: &[f64]) -> Vec<f64> {
    if n >= values.len() {
        return Vec::new();
    }
    values[n..]
        .iter()
        .zip(values.iter())
        .map(|(later, base)| later / base - 1.0)
        .collect()
}

fn rel_change_n(n: usize, values: &[f64]) -> Vec<f64> {
    if n >= values.len() {
        return Vec::new();
    }
    values[n..]
        .iter()
        .zip(values.iter())
        .map(|(later, base)| (later - base) / base)
        .collect()
}

fn abs_change_n(n: usize, values: &[f64]) -> Vec<f64> {
    if n >= values.len() {
        return Vec::new();
    }
    values[n..]
        .iter()
        .zip(values.iter())
        .map(|(later, base)| later - base)
        .collect()
}

fn stdev_n(n: usize, values: &[f64]) -> Vec<f64> {
    values.windows(n).map(stdev).collect()
}

// Each output is the current value maxed with the previous outputs
// still inside the window, so a peak persists while it propagates.
fn max_n(window: usize, values: &[f64]) -> Vec<f64> {
    let mut res: Vec<f64> = Vec::with_capacity(values.len());
    for (i, v) in values.iter().enumerate() {
        let mut peak = *v;
        for prev in &res[i.saturating_sub(window)..i] {
            peak = nan_max(peak, *prev);
        }
        res.push(peak);
    }
    res
}

fn rel_change(values: &[f64]) -> Vec<f64> {
    changes(values, |v, prev| (v - prev) / prev)
}

fn abs_change(values: &[f64]) -> Vec<f64> {
    changes(values, |v, prev| v - prev)
}

// The first element reports no change, keeping output and input the
// same length.
fn changes(values: &[f64], change: fn(f64, f64) -> f64) -> Vec<f64> {
    let mut res = Vec::with_capacity(values.len());
    let mut prev = 0.0;
    for (i, v) in values.iter().enumerate() {
        if i == 0 {
            res.push(0.0);
        } else {
            res.push(change(*v, prev));
        }
        prev = *v;
    }
    res
}

fn accum_dev(values: &[f64]) -> Vec<f64> {
    let mut res = Vec::with_capacity(values.len());
    let mut acc = 0.0;
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            acc = (1.0 + acc) * (1.0 + v) - 1.0;
        }
        res.push(acc);
    }
    res
}

fn nrank(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    if values.len() == 1 {
        return vec![1.0];
    }
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|a, b| values[*a].total_cmp(&values[*b]));
    let scale = 1.0 / (values.len() - 1) as f64;
    let mut res = vec![0.0; values.len()];
    for (rank, original) in idx.into_iter().enumerate() {
        res[original] = rank as f64 * scale;
    }
    res
}

fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

fn mean(values: &[f64]) -> f64 {
    sum(values) / values.len() as f64
}

fn stdev(values: &[f64]) -> f64 {
    let mean = mean(values);
    let dev: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (dev / values.len() as f64).sqrt()
}

fn nan_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}
