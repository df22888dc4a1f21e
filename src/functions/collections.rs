/// Collections library: lists, indexed from 1.
///
/// ```vision
/// set [names] to (list [Ann] [Bob])
/// for (names) add [Cid]
/// for each [name] in (names)
///     print [Hi #name#]
/// end
/// print (for (names) size)
/// ```
///
/// Lists are shared: every variable holding the same list sees its changes.
use crate::error::Result;
use crate::object::Object;
use crate::params::{BlockParams, Params};
use crate::vocabulary::{CBlockFn, Vocabulary};

/// Read input `input` as a 1-based index into a list of `len` items and
/// return the 0-based position. `extra` allows one past the end.
fn position(p: &mut Params<'_>, input: usize, len: usize, extra: bool) -> Result<usize> {
    let index = p.int(input)?;
    let limit = if extra { len + 1 } else { len };
    match usize::try_from(index) {
        Ok(i) if i >= 1 && i <= limit => Ok(i - 1),
        _ => Err(p.err(format!(
            "Index {} is out of range for a list of size {}",
            index, len
        ))),
    }
}

// ---------------------------------------------------------------------------
// for each [] in []
// ---------------------------------------------------------------------------

/// Iterates over a snapshot of the list, so the body may change it.
pub struct ForEach;

impl CBlockFn for ForEach {
    fn run(&self, p: &mut BlockParams<'_>) -> Result<()> {
        let name = p.str(0)?;
        let items = p.list(1)?.borrow().clone();
        for item in items {
            p.set_local(&name, item);
            if !p.run_body()? {
                break;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

pub fn register(vocabulary: &mut Vocabulary) {
    // Constructors. There is no bare `list` (it would hide a variable of
    // that name) and no bare `[]>>`, which would make `((x))` a list.
    vocabulary.add_reporter("list []>>", |p| Ok(Object::list(p.rest(0)?)));
    vocabulary.add_reporter("new list", |_| Ok(Object::list(Vec::new())));

    // Commands.
    vocabulary.add_command("for () add []", |p| {
        let list = p.list(0)?;
        let value = p.get(1)?;
        list.borrow_mut().push(value);
        Ok(())
    });

    vocabulary.add_command("for () add [] at index []", |p| {
        let list = p.list(0)?;
        let value = p.get(1)?;
        let len = list.borrow().len();
        let at = position(p, 2, len, true)?;
        list.borrow_mut().insert(at, value);
        Ok(())
    });

    vocabulary.add_command("for () set index [] to []", |p| {
        let list = p.list(0)?;
        let value = p.get(2)?;
        let len = list.borrow().len();
        let at = position(p, 1, len, false)?;
        list.borrow_mut()[at] = value;
        Ok(())
    });

    vocabulary.add_command("for () remove index []", |p| {
        let list = p.list(0)?;
        let len = list.borrow().len();
        let at = position(p, 1, len, false)?;
        list.borrow_mut().remove(at);
        Ok(())
    });

    vocabulary.add_command("for () clear", |p| {
        p.list(0)?.borrow_mut().clear();
        Ok(())
    });

    // Reporters.
    vocabulary.add_reporter("for () item []", |p| {
        let list = p.list(0)?;
        let len = list.borrow().len();
        let at = position(p, 1, len, false)?;
        let item = list.borrow()[at].clone();
        Ok(item)
    });

    vocabulary.add_reporter("for () size", |p| {
        Ok(Object::Number(p.list(0)?.borrow().len() as f64))
    });

    // 0 when the value is absent.
    vocabulary.add_reporter("for () index of []", |p| {
        let list = p.list(0)?;
        let value = p.get(1)?;
        let index = list
            .borrow()
            .iter()
            .position(|item| item.same_as(&value))
            .map_or(0, |i| i + 1);
        Ok(Object::Number(index as f64))
    });

    vocabulary.add_reporter("for () contains []", |p| {
        let list = p.list(0)?;
        let value = p.get(1)?;
        let found = list.borrow().iter().any(|item| item.same_as(&value));
        Ok(Object::Bool(found))
    });

    vocabulary.add_reporter("for () is empty", |p| {
        Ok(Object::Bool(p.list(0)?.borrow().is_empty()))
    });

    vocabulary.add_cblock("for each [] in []", &[], ForEach);
}
