/// Custom objects: property bags with a type name.
///
/// Creating an object fires every `when custom object () created` hat with
/// the new object bound to the hat's parameter.
///
/// ```vision
/// when custom object (obj) created
///     for (obj) set [created] to [true]
/// end
///
/// when started
///     set [book] to (new [book])
///     for (book) set [title] to [Robinson Crusoe]
///     print (for (book) get [title])
/// end
/// ```
use crate::object::Object;
use crate::vocabulary::Vocabulary;

/// Hat fired for every object created with `new []`.
pub const CREATED_HAT: &str = "when custom object () created";

pub fn register(vocabulary: &mut Vocabulary) {
    vocabulary.add_hat(CREATED_HAT);

    vocabulary.add_reporter("new []", |p| {
        let object = Object::custom(p.str(0)?);
        let errors = p.script().start_with(CREATED_HAT, &[object.clone()]);
        match errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(object),
        }
    });

    vocabulary.add_command("for () set [] to []", |p| {
        let object = p.custom(0)?;
        let property = p.str(1)?;
        let value = p.get(2)?;
        object.borrow_mut().properties.insert(property, value);
        Ok(())
    });

    vocabulary.add_reporter("for () get []", |p| {
        let object = p.custom(0)?;
        let property = p.str(1)?;
        let value = object.borrow().properties.get(&property).cloned();
        value.ok_or_else(|| {
            p.err(format!(
                "Cannot find property '{}' in custom object '{}'",
                property,
                Object::Custom(object)
            ))
        })
    });

    vocabulary.add_reporter("for () type", |p| {
        let kind = p.custom(0)?.borrow().kind.clone();
        Ok(Object::Text(kind))
    });
}
