/// Base library: the start hat, output and hat-level control.
///
/// ```vision
/// when started
///     print [Hello World]
/// end
/// ```
///
/// `return [value]` stops the hat and hands `value` to the caller of a
/// user-defined reporter; `stop` does the same without a value.
use crate::interpreter::DEFAULT_HAT;
use crate::vocabulary::Vocabulary;

pub fn register(vocabulary: &mut Vocabulary) {
    vocabulary.add_hat(DEFAULT_HAT);

    vocabulary.add_command("print []", |p| {
        let line = p.str(0)?;
        p.print(line);
        Ok(())
    });

    vocabulary.add_command("stop", |p| {
        p.hat_return(None);
        Ok(())
    });

    vocabulary.add_command("return []", |p| {
        let value = p.get(0)?;
        p.hat_return(Some(value));
        Ok(())
    });

    #[cfg(not(target_arch = "wasm32"))]
    native::register(vocabulary);
}

/// `read line` blocks on stdin, so it is left out of WASM builds.
#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::io::{self, BufRead};

    use crate::object::Object;
    use crate::vocabulary::Vocabulary;

    pub fn register(vocabulary: &mut Vocabulary) {
        vocabulary.add_reporter("read line", |p| {
            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .map_err(|e| p.err(format!("Could not read from stdin: {}", e)))?;
            let line = line.trim_end_matches(['\r', '\n']);
            Ok(Object::text(line))
        });
    }
}
