/// Strings library.
///
/// ```vision
/// print (join [Hello] [ ] [World])   # Hello World
/// print (length of [abc])            # 3
/// print (letter [1] of [abc])        # a
/// ```
///
/// Letters are counted in characters, not bytes, starting at 1.
use crate::object::Object;
use crate::vocabulary::Vocabulary;

pub fn register(vocabulary: &mut Vocabulary) {
    vocabulary.add_reporter("join []>>", |p| {
        let parts = p.rest(0)?;
        Ok(Object::Text(parts.iter().map(|o| o.to_string()).collect()))
    });

    // Lists report their size.
    vocabulary.add_reporter("length of []", |p| {
        let length = match p.get(0)? {
            Object::List(items) => items.borrow().len(),
            other => other.to_string().chars().count(),
        };
        Ok(Object::Number(length as f64))
    });

    vocabulary.add_reporter("letter [] of []", |p| {
        let index = p.int(0)?;
        let text = p.str(1)?;
        let letter = usize::try_from(index)
            .ok()
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| text.chars().nth(i))
            .ok_or_else(|| {
                p.err(format!(
                    "Letter {} is out of range for '{}' ({} letters)",
                    index,
                    text,
                    text.chars().count()
                ))
            })?;
        Ok(Object::Text(letter.to_string()))
    });
}
