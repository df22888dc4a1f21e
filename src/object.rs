use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A run-time value.
///
/// Lists and custom objects are shared by reference, like they are in the
/// scripts' own semantics: `for (l) add [x]` mutates every alias of `l`.
#[derive(Debug, Clone)]
pub enum Object {
    Number(f64),
    Text(String),
    Bool(bool),
    List(Rc<RefCell<Vec<Object>>>),
    Custom(Rc<RefCell<CustomObject>>),
}

/// A property bag created with `new []`.
#[derive(Debug, Clone, Default)]
pub struct CustomObject {
    pub kind: String,
    pub properties: BTreeMap<String, Object>,
}

impl Object {
    pub fn text(s: impl Into<String>) -> Self {
        Object::Text(s.into())
    }

    pub fn list(items: Vec<Object>) -> Self {
        Object::List(Rc::new(RefCell::new(items)))
    }

    pub fn custom(kind: impl Into<String>) -> Self {
        Object::Custom(Rc::new(RefCell::new(CustomObject {
            kind: kind.into(),
            properties: BTreeMap::new(),
        })))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Number(_) => "number",
            Object::Text(_) => "text",
            Object::Bool(_) => "boolean",
            Object::List(_) => "list",
            Object::Custom(_) => "custom object",
        }
    }

    /// Numeric coercion: numbers as-is, booleans as 1/0, numeric text parsed.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Object::Number(n) => Some(*n),
            Object::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Object::Text(s) => s.trim().parse().ok(),
            Object::List(_) | Object::Custom(_) => None,
        }
    }

    /// Boolean coercion: booleans as-is, numbers by non-zero, text only for
    /// `true`/`false` (any case).
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Bool(b) => Some(*b),
            Object::Number(n) => Some(*n != 0.0),
            Object::Text(s) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("true") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("false") {
                    Some(false)
                } else {
                    None
                }
            }
            Object::List(_) | Object::Custom(_) => None,
        }
    }

    /// Script-level equality: numerically when both sides are numbers,
    /// by identity for lists and objects, textually otherwise.
    pub fn same_as(&self, other: &Object) -> bool {
        match (self, other) {
            (Object::List(a), Object::List(b)) => Rc::ptr_eq(a, b),
            (Object::Custom(a), Object::Custom(b)) => Rc::ptr_eq(a, b),
            (Object::List(_) | Object::Custom(_), _) | (_, Object::List(_) | Object::Custom(_)) => false,
            (Object::Bool(a), Object::Bool(b)) => a == b,
            (Object::Bool(_), _) | (_, Object::Bool(_)) => self.to_string() == other.to_string(),
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a == b,
                _ => self.to_string() == other.to_string(),
            },
        }
    }
}

/// Whole numbers print without a fractional part.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

impl Object {
    /// Writes `self`, printing `[...]` / `kind{...}` for a list or object
    /// that is already being written further up.
    fn write_to(&self, f: &mut fmt::Formatter<'_>, open: &mut Vec<*const ()>) -> fmt::Result {
        match self {
            Object::Number(n) => f.write_str(&format_number(*n)),
            Object::Text(s) => f.write_str(s),
            Object::Bool(b) => write!(f, "{}", b),
            Object::List(items) => {
                let id = Rc::as_ptr(items) as *const ();
                if open.contains(&id) {
                    return f.write_str("[...]");
                }
                open.push(id);
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.write_to(f, open)?;
                }
                open.pop();
                write!(f, "]")
            }
            Object::Custom(obj) => {
                let id = Rc::as_ptr(obj) as *const ();
                let obj = obj.borrow();
                if open.contains(&id) {
                    return write!(f, "{}{{...}}", obj.kind);
                }
                open.push(id);
                write!(f, "{}{{", obj.kind)?;
                for (i, (key, value)) in obj.properties.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: ", key)?;
                    value.write_to(f, open)?;
                }
                open.pop();
                write!(f, "}}")
            }
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f, &mut Vec::new())
    }
}

impl From<f64> for Object {
    fn from(n: f64) -> Self {
        Object::Number(n)
    }
}

impl From<bool> for Object {
    fn from(b: bool) -> Self {
        Object::Bool(b)
    }
}

impl From<String> for Object {
    fn from(s: String) -> Self {
        Object::Text(s)
    }
}

impl From<&str> for Object {
    fn from(s: &str) -> Self {
        Object::Text(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_display_without_trailing_zero() {
        assert_eq!(Object::Number(5.0).to_string(), "5");
        assert_eq!(Object::Number(-2.5).to_string(), "-2.5");
        assert_eq!(Object::Number(std::f64::consts::PI).to_string(), "3.141592653589793");
    }

    #[test]
    fn coercion_table() {
        assert_eq!(Object::text(" 4.5 ").as_number(), Some(4.5));
        assert_eq!(Object::Bool(true).as_number(), Some(1.0));
        assert_eq!(Object::text("four").as_number(), None);
        assert_eq!(Object::list(vec![]).as_number(), None);

        assert_eq!(Object::text("FALSE").as_bool(), Some(false));
        assert_eq!(Object::Number(2.0).as_bool(), Some(true));
        assert_eq!(Object::text("yes").as_bool(), None);
    }

    #[test]
    fn equality_is_numeric_when_possible() {
        assert!(Object::text("5").same_as(&Object::Number(5.0)));
        assert!(Object::text("abc").same_as(&Object::text("abc")));
        assert!(!Object::Bool(true).same_as(&Object::Number(1.0)));
        let list = Object::list(vec![]);
        assert!(list.same_as(&list.clone()));
        assert!(!list.same_as(&Object::list(vec![])));
    }

    #[test]
    fn containers_display_their_contents() {
        let list = Object::list(vec![Object::Number(1.0), Object::text("a")]);
        assert_eq!(list.to_string(), "[1, a]");
        let obj = Object::custom("book");
        if let Object::Custom(o) = &obj {
            o.borrow_mut()
                .properties
                .insert("title".into(), Object::text("Robinson Crusoe"));
        }
        assert_eq!(obj.to_string(), "book{title: Robinson Crusoe}");
    }

    #[test]
    fn self_containing_values_print_a_placeholder() {
        let list = Object::list(vec![Object::Number(1.0)]);
        if let Object::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        assert_eq!(list.to_string(), "[1, [...]]");

        let node = Object::custom("node");
        if let Object::Custom(o) = &node {
            o.borrow_mut().properties.insert("next".into(), node.clone());
        }
        assert_eq!(node.to_string(), "node{next: node{...}}");

        // The same list twice side by side is not a cycle.
        let inner = Object::list(vec![Object::text("a")]);
        let outer = Object::list(vec![inner.clone(), inner]);
        assert_eq!(outer.to_string(), "[[a], [a]]");
    }
}
