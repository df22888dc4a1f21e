/// Math library. Arithmetic itself is written as an expression, `((x) * 2)`;
/// these reporters cover what the operators cannot.
///
/// `random from [min] to [max]` is inclusive on both ends and yields whole
/// numbers when both bounds are whole.
///
/// The constants are `pi constant` and `e constant` so that a bare `(e)`
/// still reads a variable.
///
/// On WASM `random` needs a `js_math_random` import from the host.
use crate::error::Result;
use crate::object::Object;
use crate::params::Params;
use crate::vocabulary::Vocabulary;

#[cfg(target_arch = "wasm32")]
extern "C" {
    fn js_math_random() -> f64;
}

/// A uniform sample from `[0, 1)`.
#[cfg(not(target_arch = "wasm32"))]
fn unit() -> f64 {
    use rand::Rng;
    rand::thread_rng().gen::<f64>()
}

#[cfg(target_arch = "wasm32")]
fn unit() -> f64 {
    unsafe { js_math_random() }
}

fn random(p: &mut Params<'_>) -> Result<Object> {
    let min = p.num(0)?;
    let max = p.num(1)?;
    if min > max {
        return Err(p.err(format!("min ({}) is greater than max ({})", min, max)));
    }

    let value = if min.fract() == 0.0 && max.fract() == 0.0 {
        (min + ((max - min + 1.0) * unit()).floor()).min(max)
    } else {
        min + (max - min) * unit()
    };
    Ok(Object::Number(value))
}

fn sqrt(p: &mut Params<'_>) -> Result<Object> {
    let n = p.num(0)?;
    if n < 0.0 {
        return Err(p.err(format!("Cannot take the square root of {}", n)));
    }
    Ok(Object::Number(n.sqrt()))
}

pub fn register(vocabulary: &mut Vocabulary) {
    vocabulary.add_reporter("random from [] to []", random);
    vocabulary.add_reporter("round []", |p| Ok(Object::Number(p.num(0)?.round())));
    vocabulary.add_reporter("abs []", |p| Ok(Object::Number(p.num(0)?.abs())));
    vocabulary.add_reporter("sqrt []", sqrt);
    vocabulary.add_reporter("pi constant", |_| Ok(Object::Number(std::f64::consts::PI)));
    vocabulary.add_reporter("e constant", |_| Ok(Object::Number(std::f64::consts::E)));
}
