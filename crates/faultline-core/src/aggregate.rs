//! `add` / `rebase`: merging error records into trees.
//!
//! Both operations may return a different record than the base they were
//! given (a generic base is superseded by the error added to it), so callers
//! always continue with the returned handle:
//!
//! ```rust
//! use faultline_core::{add, add_at, ErrorRecord};
//!
//! let mut base = ErrorRecord::new("request failed").into_ref();
//! base = add(&base, &ErrorRecord::new("timeout").into_ref());
//! base = add_at(&base, Some("email"), &ErrorRecord::new("invalid").into_ref());
//! assert_eq!(base.errors().len(), 1);
//! assert!(base.field_error("email").is_some());
//! ```

use std::mem;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::AggregationError;
use crate::types::ErrorRef;
use crate::value::from_value;

/// Merge `err` into `base` under `err`'s own `field`, or as an unnamed
/// error when it has none.
pub fn add(base: &ErrorRef, err: &ErrorRef) -> ErrorRef {
    let field = err.field();
    add_at(base, field.as_deref(), err)
}

/// Merge `err` into `base` under exactly `field`; `None` attaches it as an
/// unnamed error even when `err.field` is set.
pub fn add_at(base: &ErrorRef, field: Option<&str>, err: &ErrorRef) -> ErrorRef {
    Merge::default().add_at(base, field, err)
}

/// Promote `new_base` to the root and demote `old_base` to its first error.
///
/// `new_base`'s own errors end up after `old_base` and the errors it carried;
/// its own fields are merged back on top of whatever `old_base` contributed.
pub fn rebase(old_base: &ErrorRef, new_base: &ErrorRef) -> ErrorRef {
    Merge::default().rebase(old_base, new_base)
}

/// One top-level merge. Tracks the records whose sub-errors are being
/// folded so a tree that already contains a cycle is folded once.
#[derive(Default)]
struct Merge {
    folding: Vec<usize>,
}

impl Merge {
    fn add(&mut self, base: &ErrorRef, err: &ErrorRef) -> ErrorRef {
        let field = err.field();
        self.add_at(base, field.as_deref(), err)
    }

    fn add_at(&mut self, base: &ErrorRef, field: Option<&str>, err: &ErrorRef) -> ErrorRef {
        if base.ptr_eq(err) {
            return base.clone();
        }

        // Snapshot what we need from `err`; no guard may outlive this block
        // because the recursion below can reach the same records again.
        let (err_generic, err_errors, err_fields) = {
            let record = err.read();
            (record.generic, record.errors.clone(), record.fields.clone())
        };

        let id = err.id();
        let fold = !self.folding.contains(&id);
        if !fold {
            tracing::trace!(err = %err, "sub-errors already being folded");
        }

        match field {
            None => {
                if !err_generic {
                    if base.is_generic() {
                        return self.rebase(base, err);
                    }
                    let mut record = base.write();
                    if !record.errors.iter().any(|known| known.ptr_eq(err)) {
                        record.errors.push(err.clone());
                    }
                }

                let mut base = base.clone();
                if fold {
                    self.folding.push(id);
                    for sub in &err_errors {
                        base = self.add(&base, sub);
                    }
                    for (path, sub) in err_fields.iter().flatten() {
                        base = self.add_at(&base, Some(path), sub);
                    }
                    self.folding.pop();
                }
                base
            }
            Some(field) => {
                let existing = base.field_error(field);
                let stored = match existing {
                    Some(existing) if !err_generic && existing.is_generic() => {
                        self.rebase(&existing, err)
                    }
                    Some(existing) => self.add(&existing, err),
                    None => err.clone(),
                };
                base.write()
                    .fields
                    .get_or_insert_with(IndexMap::new)
                    .insert(field.to_string(), stored);

                let mut base = base.clone();
                if fold {
                    self.folding.push(id);
                    for (path, sub) in err_fields.iter().flatten() {
                        base = self.add_at(&base, Some(&format!("{field}.{path}")), sub);
                    }
                    self.folding.pop();
                }
                base
            }
        }
    }

    fn rebase(&mut self, old_base: &ErrorRef, new_base: &ErrorRef) -> ErrorRef {
        tracing::trace!(old = %old_base, new = %new_base, "rebasing error tree");

        let (errors, fields) = {
            let mut record = new_base.write();
            (mem::take(&mut record.errors), record.fields.take())
        };

        let mut rebased = self.add_at(new_base, None, old_base);

        if !errors.is_empty() {
            rebased.write().errors.extend(errors);
        }
        for (path, sub) in fields.iter().flatten() {
            rebased = self.add_at(&rebased, Some(path), sub);
        }
        rebased
    }
}

/// [`add`] for a loosely typed base, such as a parsed JSON document.
///
/// Objects and arrays are coerced into a record first; any other value is a
/// usage error.
pub fn add_value(base: &Value, err: &ErrorRef) -> Result<ErrorRef, AggregationError> {
    match base {
        Value::Object(_) | Value::Array(_) => Ok(add(&from_value(base), err)),
        _ => Err(AggregationError {
            errors: vec![err.clone()],
        }),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorRecord;
    use serde_json::json;

    fn err(message: &str) -> ErrorRef {
        ErrorRecord::new(message).into_ref()
    }

    fn same(actual: &[ErrorRef], expected: &[&ErrorRef]) -> bool {
        actual.len() == expected.len()
            && actual.iter().zip(expected).all(|(a, b)| a.ptr_eq(b))
    }

    fn field_names(err: &ErrorRef) -> Vec<String> {
        err.fields().into_iter().map(|(name, _)| name).collect()
    }

    #[test]
    fn adds_an_error_to_another() {
        let err1 = err("error 1");
        let err2 = err("error 2");
        let err1 = add(&err1, &err2);
        assert!(same(&err1.errors(), &[&err2]));
        assert!(!err1.has_fields());
    }

    #[test]
    fn adds_an_error_as_a_field() {
        let err1 = err("error 1");
        let err2 = err("error 2");
        let err1 = add_at(&err1, Some("test"), &err2);
        assert!(err1.errors().is_empty());
        assert!(err1.field_error("test").unwrap().ptr_eq(&err2));
    }

    #[test]
    fn uses_the_errors_own_field() {
        let err1 = err("error 1");
        let err2 = ErrorRecord::new("error 2").with_field("test").into_ref();
        let err1 = add(&err1, &err2);
        assert!(err1.field_error("test").unwrap().ptr_eq(&err2));
    }

    #[test]
    fn explicit_none_ignores_the_errors_own_field() {
        let err1 = err("error 1");
        let err2 = ErrorRecord::new("error 2").with_field("test").into_ref();
        let err1 = add_at(&err1, None, &err2);
        assert!(!err1.has_fields());
        assert!(same(&err1.errors(), &[&err2]));
    }

    #[test]
    fn non_object_base_is_a_usage_error() {
        let err1 = err("Err!");
        let failure = add_value(&json!("bad"), &err1).unwrap_err();
        assert_eq!(failure.to_string(), "Cannot add error to non object");
        assert!(same(&failure.errors, &[&err1]));
    }

    #[test]
    fn object_value_base_is_coerced() {
        let err1 = err("Err!");
        let base = add_value(&json!({ "message": "base" }), &err1).unwrap();
        assert_eq!(base.message().as_deref(), Some("base"));
        assert!(same(&base.errors(), &[&err1]));
    }

    #[test]
    fn adds_multiple_errors_in_order() {
        let err2 = err("error 2");
        let err3 = err("error 3");

        let mut fielded = err("test error 1");
        fielded = add_at(&fielded, Some("test"), &err2);
        fielded = add_at(&fielded, Some("test2"), &err3);
        assert_eq!(field_names(&fielded), vec!["test", "test2"]);

        let mut listed = err("test error 2");
        listed = add(&listed, &err2);
        listed = add(&listed, &err3);
        assert!(same(&listed.errors(), &[&err2, &err3]));
    }

    #[test]
    fn flattens_errors_of_the_added_error() {
        let err2 = err("error 2");
        let err3 = err("error 3");
        let mut err1 = err("test error 1");
        err1 = add(&err1, &err2);
        err1 = add(&err1, &err3);

        let test_err = add(&err("test error 2"), &err1);
        assert!(same(&test_err.errors(), &[&err1, &err2, &err3]));
    }

    #[test]
    fn field_attach_keeps_the_added_errors_on_the_field() {
        let err2 = err("error 2");
        let err3 = err("error 3");
        let mut err1 = err("test error 1");
        err1 = add(&err1, &err2);
        err1 = add(&err1, &err3);

        let test_err = add_at(&err("test error 2"), Some("test"), &err1);
        let field = test_err.field_error("test").unwrap();
        assert!(field.ptr_eq(&err1));
        assert!(same(&field.errors(), &[&err2, &err3]));
    }

    #[test]
    fn merges_into_an_existing_field() {
        let err2 = err("error 2");
        let err3 = err("error 3");
        let err4 = err("error 4");
        let mut err1 = err("test error 1");
        err1 = add(&err1, &err2);
        err1 = add(&err1, &err3);

        let mut test_err = err("test error 2");
        test_err = add_at(&test_err, Some("test"), &err4);
        test_err = add_at(&test_err, Some("test"), &err1);

        assert!(test_err.errors().is_empty());
        assert_eq!(field_names(&test_err), vec!["test"]);
        let field = test_err.field_error("test").unwrap();
        assert!(field.ptr_eq(&err4));
        assert!(same(&field.errors(), &[&err1, &err2, &err3]));
    }

    #[test]
    fn flattens_fields_under_dotted_paths() {
        let err2 = err("error 2");
        let err3 = err("error 3");
        let err4 = err("error 4");
        let mut err1 = err("error 1");
        err1 = add_at(&err1, Some("field"), &err2);
        err1 = add_at(&err1, Some("field"), &err3);
        assert!(err1.field_error("field").unwrap().ptr_eq(&err2));

        let mut test_err = err("test error");
        test_err = add_at(&test_err, Some("test"), &err4);
        test_err = add_at(&test_err, Some("test"), &err1);

        assert!(test_err.errors().is_empty());
        assert_eq!(field_names(&test_err), vec!["test", "test.field"]);
        assert!(test_err.field_error("test").unwrap().ptr_eq(&err4));
        assert!(test_err.field_error("test.field").unwrap().ptr_eq(&err2));
        assert!(same(&err4.errors(), &[&err1]));
        assert!(same(&err2.errors(), &[&err3]));
    }

    #[test]
    fn nested_field_lands_at_joined_path() {
        let leaf = err("leaf");
        let inner = add_at(&err("inner"), Some("g"), &leaf);
        let x = add_at(&err("x"), Some("f"), &inner);
        assert!(x.field_error("f.g").unwrap().ptr_eq(&leaf));
        assert!(x.field_error("f").unwrap().ptr_eq(&inner));
    }

    #[test]
    fn never_adds_an_error_to_itself() {
        let e = err("test");
        let result = add(&e, &e);
        assert!(result.ptr_eq(&e));
        assert!(e.errors().is_empty());
    }

    #[test]
    fn adding_twice_is_idempotent() {
        let e = err("test");
        let e2 = err("test 2");
        let e = add(&e, &e2);
        let e = add(&e, &e2);
        assert!(same(&e.errors(), &[&e2]));
    }

    #[test]
    fn skips_sub_errors_that_point_back_at_the_base() {
        let e = err("test");
        let e2 = add(&err("test 2"), &e);
        let e = add(&e, &e2);
        assert!(same(&e.errors(), &[&e2]));
    }

    #[test]
    fn skips_sub_fields_that_point_back_at_the_base() {
        let e = err("test");
        let e2 = add_at(&err("test 2"), Some("field"), &e);
        let e = add(&e, &e2);
        assert!(same(&e.errors(), &[&e2]));
        assert!(!e.has_fields());
    }

    #[test]
    fn generic_base_is_replaced() {
        let err1 = ErrorRecord::new("error 1").generic().into_ref();
        let err2 = err("error 2");
        let base = add(&err1, &err2);
        assert!(base.ptr_eq(&err2));
        assert!(base.errors().is_empty());
    }

    #[test]
    fn generic_field_is_replaced() {
        let err3 = ErrorRecord::new("error 3").generic().into_ref();
        let err4 = err("error 4");
        let err1 = add_at(&err("error 1"), Some("test"), &err3);
        let err2 = add_at(&err("error 2"), Some("test"), &err4);

        let base = add(&err1, &err2);
        assert!(base.ptr_eq(&err1));
        assert_eq!(field_names(&base), vec!["test"]);
        let field = base.field_error("test").unwrap();
        assert!(field.ptr_eq(&err4));
        assert!(field.errors().is_empty());
    }

    #[test]
    fn generic_errors_are_folded_but_not_listed() {
        let inner = err("inner");
        let generic = add(&ErrorRecord::new("generic").generic().into_ref(), &inner);
        // `generic` was superseded by `inner`
        assert!(generic.ptr_eq(&inner));

        let placeholder = ErrorRecord::new("placeholder").generic().into_ref();
        let base = add(&err("base"), &placeholder);
        assert!(base.errors().is_empty());
    }

    #[test]
    fn rebase_swaps_err_and_base() {
        let base = err("base error");
        let new = err("new base error");
        let result = rebase(&base, &new);
        assert!(result.ptr_eq(&new));
        assert!(same(&result.errors(), &[&base]));
        assert!(!result.has_fields());
    }

    #[test]
    fn rebase_moves_base_errors_to_new_root() {
        let err1 = err("error 1");
        let base = add(&err("base error"), &err1);
        let new = err("new base error");
        let result = rebase(&base, &new);
        assert!(result.ptr_eq(&new));
        assert!(same(&result.errors(), &[&base, &err1]));
    }

    #[test]
    fn rebase_moves_base_fields_to_new_root() {
        let err1 = err("error 1");
        let base = add_at(&err("base error"), Some("test"), &err1);
        let new = err("new base error");
        let result = rebase(&base, &new);
        assert!(result.field_error("test").unwrap().ptr_eq(&err1));
        assert!(same(&result.errors(), &[&base]));
    }

    #[test]
    fn rebase_keeps_own_errors_after_the_base() {
        let err1 = err("error 1");
        let base = err("base error");
        let new = add(&err("new base error"), &err1);
        let result = rebase(&base, &new);
        assert!(result.ptr_eq(&new));
        assert!(same(&result.errors(), &[&base, &err1]));
    }

    #[test]
    fn rebase_keeps_own_fields() {
        let err1 = err("error 1");
        let base = err("base error");
        let new = add_at(&err("new base error"), Some("test"), &err1);
        let result = rebase(&base, &new);
        assert!(result.field_error("test").unwrap().ptr_eq(&err1));
        assert!(same(&result.errors(), &[&base]));
    }

    #[test]
    fn rebase_merges_same_named_fields() {
        let from_base = err("from base");
        let from_new = err("from new");
        let base = add_at(&err("base error"), Some("test"), &from_base);
        let new = add_at(&err("new base error"), Some("test"), &from_new);
        let result = rebase(&base, &new);
        let field = result.field_error("test").unwrap();
        assert!(field.ptr_eq(&from_base));
        assert!(same(&field.errors(), &[&from_new]));
    }

    #[test]
    fn rebase_discards_a_generic_base() {
        let err1 = err("error 1");
        let err2 = err("error 2");
        let base = add(&ErrorRecord::new("base error").generic().into_ref(), &err1);
        let new = add(&err("new base error"), &err2);

        let result = rebase(&base, &new);
        assert!(result.ptr_eq(&new));
        assert!(same(&result.errors(), &[&err1, &err2]));
    }

    #[test]
    fn adding_a_cyclic_tree_terminates() {
        let a = err("a");
        let b = err("b");
        let a = add(&a, &b);
        let b = add(&b, &a);
        assert!(same(&a.errors(), &[&b]));
        assert!(same(&b.errors(), &[&a]));

        let c = add(&err("c"), &a);
        assert!(same(&c.errors(), &[&a, &b]));
    }

    #[test]
    fn adding_a_cyclic_field_tree_terminates() {
        let a = err("a");
        let b = err("b");
        let a = add_at(&a, Some("f"), &b);
        b.write()
            .fields
            .get_or_insert_with(IndexMap::new)
            .insert("g".into(), a.clone());

        let c = add_at(&err("c"), Some("x"), &a);
        assert!(c.field_error("x").unwrap().ptr_eq(&a));
        assert!(c.field_error("x.f").unwrap().ptr_eq(&b));
        assert!(c.field_error("x.f.g").unwrap().ptr_eq(&a));
    }
}
