/// Variables library.
///
/// `set` updates a variable wherever it is visible and creates it in the hat
/// otherwise. `set global` always writes the script-wide variable and
/// `set local` always writes the innermost running c-block.
///
/// ```vision
/// set [count] to [0]
/// change [count] by [1]
/// print (value of [count])
/// ```
use crate::object::Object;
use crate::vocabulary::Vocabulary;

pub fn register(vocabulary: &mut Vocabulary) {
    vocabulary.add_command("set [] to []", |p| {
        let name = p.str(0)?;
        let value = p.get(1)?;
        p.set_variable(&name, value);
        Ok(())
    });

    vocabulary.add_command("set global [] to []", |p| {
        let name = p.str(0)?;
        let value = p.get(1)?;
        p.set_global(&name, value);
        Ok(())
    });

    vocabulary.add_command("set local [] to []", |p| {
        let name = p.str(0)?;
        let value = p.get(1)?;
        p.set_local(&name, value);
        Ok(())
    });

    vocabulary.add_command("change [] by []", |p| {
        let name = p.str(0)?;
        let current = p
            .variable(&name)
            .ok_or_else(|| p.err(format!("Variable '{}' could not be found!", name)))?;
        let current = current
            .as_number()
            .ok_or_else(|| p.err(format!("Variable '{}' is not a number", name)))?;
        let delta = p.num(1)?;
        p.set_variable(&name, Object::Number(current + delta));
        Ok(())
    });

    vocabulary.add_reporter("value of []", |p| {
        let name = p.str(0)?;
        p.variable(&name)
            .ok_or_else(|| p.err(format!("Variable '{}' could not be found!", name)))
    });
}
