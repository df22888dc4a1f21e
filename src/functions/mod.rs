use crate::vocabulary::Vocabulary;

// ---------------------------------------------------------------------------
// Built-in libraries
// Each module registers its hats, commands, c-blocks and reporters with a
// `register` function. Patterns registered first win when two overlap.
// ---------------------------------------------------------------------------

pub mod base;        // when started, print, stop, return, read line
pub mod collections; // list []>>, for () add [], for each [] in [], ...
pub mod control;     // if / else if / else, repeat, while, forever, for, stop loop
pub mod math;        // random, round, abs, sqrt, pi constant, e constant
pub mod objects;     // new [], for () set [] to [], for () get [], for () type
pub mod strings;     // join, length of, letter [] of []
pub mod variables;   // set, set global, set local, change, value of

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Register every built-in library.
pub fn register_all(vocabulary: &mut Vocabulary) {
    base::register(vocabulary);
    control::register(vocabulary);
    variables::register(vocabulary);
    math::register(vocabulary);
    strings::register(vocabulary);
    collections::register(vocabulary);
    objects::register(vocabulary);
}
