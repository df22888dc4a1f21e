/// Control library: conditionals and loops.
///
/// ```vision
/// if ((x) > 3)
///     print [big]
/// else if ((x) > 1)
///     print [medium]
/// else
///     print [small]
/// end
///
/// for [i] from [10] to [1]
///     print [#i#...]
/// end
///
/// while [true]
///     change [tries] by [1]
///     stop loop
/// end
/// ```
///
/// `stop loop` stops the innermost enclosing c-block, whichever kind it is.
use crate::error::Result;
use crate::object::Object;
use crate::params::BlockParams;
use crate::vocabulary::{CBlockFn, Vocabulary};

const IF_CHAINS: &[&str] = &["else if []", "else"];

// ---------------------------------------------------------------------------
// if / else if / else
// ---------------------------------------------------------------------------

pub struct If;

impl CBlockFn for If {
    fn run(&self, p: &mut BlockParams<'_>) -> Result<()> {
        if p.bool(0)? {
            p.run_body()?;
        } else {
            p.run_chain()?;
        }
        Ok(())
    }
}

pub struct Else;

impl CBlockFn for Else {
    fn run(&self, p: &mut BlockParams<'_>) -> Result<()> {
        p.run_body()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Loops
// ---------------------------------------------------------------------------

pub struct Repeat;

impl CBlockFn for Repeat {
    fn run(&self, p: &mut BlockParams<'_>) -> Result<()> {
        let count = p.int(0)?;
        if count < 0 {
            return Err(p.err(format!("Cannot repeat a negative number of times ({})", count)));
        }
        for _ in 0..count {
            if !p.run_body()? {
                break;
            }
        }
        Ok(())
    }
}

/// Re-evaluates its condition before every iteration.
pub struct While;

impl CBlockFn for While {
    fn run(&self, p: &mut BlockParams<'_>) -> Result<()> {
        while p.bool(0)? {
            if !p.run_body()? {
                break;
            }
        }
        Ok(())
    }
}

pub struct Forever;

impl CBlockFn for Forever {
    fn run(&self, p: &mut BlockParams<'_>) -> Result<()> {
        while p.run_body()? {}
        Ok(())
    }
}

/// Counts from one bound to the other, inclusive, in steps of one. The
/// counter lives in the block's own scope.
pub struct ForRange;

impl CBlockFn for ForRange {
    fn run(&self, p: &mut BlockParams<'_>) -> Result<()> {
        let name = p.str(0)?;
        let from = p.num(1)?;
        let to = p.num(2)?;
        let step = if from <= to { 1.0 } else { -1.0 };

        let mut i = from;
        while (step > 0.0 && i <= to) || (step < 0.0 && i >= to) {
            p.set_local(&name, Object::Number(i));
            if !p.run_body()? {
                break;
            }
            i += step;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

pub fn register(vocabulary: &mut Vocabulary) {
    vocabulary.add_cblock("if []", IF_CHAINS, If);
    vocabulary.add_cblock("else if []", IF_CHAINS, If); // same logic as `if`
    vocabulary.add_cblock("else", &[], Else);
    vocabulary.add_cblock("repeat []", &[], Repeat);
    vocabulary.add_cblock("while []", &[], While);
    vocabulary.add_cblock("forever", &[], Forever);
    vocabulary.add_cblock("for [] from [] to []", &[], ForRange);

    vocabulary.add_command("stop loop", |p| p.stop_loop());
}
