//! Request-scoped schema context.
//!
//! One [`SchemaContext`] exists per unit of work (request, task, command
//! invocation). It is never stored in process-wide state; concurrent units
//! of work each own their own stack, which is the isolation guarantee that
//! prevents cross-tenant leakage under concurrency.

use parking_lot::Mutex;
use tracing::trace;

use crate::schema::SchemaName;

/// A stack of active schema names for one unit of work.
///
/// The shared schema sits at the bottom and can never be popped, so the
/// stack is never empty when a database operation runs. Activation is
/// scoped: [`SchemaContext::activate`] returns a guard that restores the
/// previous schema on every exit path, including error exits.
#[derive(Debug)]
pub struct SchemaContext {
    shared: SchemaName,
    stack: Mutex<Vec<SchemaName>>,
}

impl SchemaContext {
    /// Create a context with the shared schema as the base of the stack.
    pub fn new(shared: SchemaName) -> Self {
        let stack = Mutex::new(vec![shared.clone()]);
        Self { shared, stack }
    }

    /// The currently effective schema (innermost activation).
    pub fn current(&self) -> SchemaName {
        self.stack
            .lock()
            .last()
            .expect("schema stack holds at least the shared schema")
            .clone()
    }

    /// The reserved shared schema.
    pub fn shared(&self) -> &SchemaName {
        &self.shared
    }

    /// Activation depth, excluding the shared base.
    pub fn depth(&self) -> usize {
        self.stack.lock().len() - 1
    }

    /// Push a schema for the lifetime of the returned guard.
    ///
    /// Nesting is explicit: an inner activation shadows the outer one and
    /// the guard's drop restores it, so management operations can
    /// temporarily work on another schema without disturbing the caller's
    /// context.
    #[must_use = "the schema is deactivated when the guard is dropped"]
    pub fn activate(&self, schema: SchemaName) -> SchemaGuard<'_> {
        trace!(schema = %schema, "activating schema");
        self.stack.lock().push(schema);
        SchemaGuard { context: self }
    }

    /// The namespace list for the active schema: the current schema
    /// followed by the shared fallback, deduplicated when the shared
    /// schema itself is active.
    pub fn search_path(&self) -> Vec<SchemaName> {
        let current = self.current();
        if current == self.shared {
            vec![current]
        } else {
            vec![current, self.shared.clone()]
        }
    }
}

/// Scoped activation of a schema; pops on drop.
#[derive(Debug)]
pub struct SchemaGuard<'a> {
    context: &'a SchemaContext,
}

impl SchemaGuard<'_> {
    /// The context this guard belongs to.
    pub fn context(&self) -> &SchemaContext {
        self.context
    }
}

impl Drop for SchemaGuard<'_> {
    fn drop(&mut self) {
        let mut stack = self.context.stack.lock();
        // The base entry belongs to the context itself, not to any guard.
        if stack.len() > 1 {
            let popped = stack.pop();
            if let Some(schema) = popped {
                trace!(schema = %schema, "deactivated schema");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(name: &str) -> SchemaName {
        SchemaName::new(name).unwrap()
    }

    #[test]
    fn test_starts_at_shared() {
        let ctx = SchemaContext::new(schema("public"));
        assert_eq!(ctx.current(), "public");
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn test_activate_and_restore() {
        let ctx = SchemaContext::new(schema("public"));
        {
            let _guard = ctx.activate(schema("client1"));
            assert_eq!(ctx.current(), "client1");
            assert_eq!(ctx.depth(), 1);
        }
        assert_eq!(ctx.current(), "public");
    }

    #[test]
    fn test_nested_activation() {
        let ctx = SchemaContext::new(schema("public"));
        let _outer = ctx.activate(schema("client1"));
        {
            let _inner = ctx.activate(schema("client2"));
            assert_eq!(ctx.current(), "client2");
        }
        assert_eq!(ctx.current(), "client1");
    }

    #[test]
    fn test_restore_on_panic() {
        let ctx = SchemaContext::new(schema("public"));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = ctx.activate(schema("client1"));
            panic!("unit of work failed");
        }));
        assert!(result.is_err());
        assert_eq!(ctx.current(), "public");
    }

    #[test]
    fn test_search_path() {
        let ctx = SchemaContext::new(schema("public"));
        assert_eq!(ctx.search_path(), vec![schema("public")]);

        let _guard = ctx.activate(schema("client1"));
        assert_eq!(
            ctx.search_path(),
            vec![schema("client1"), schema("public")]
        );
    }

    #[test]
    fn test_contexts_are_independent() {
        let a = SchemaContext::new(schema("public"));
        let b = SchemaContext::new(schema("public"));
        let _guard = a.activate(schema("client1"));
        assert_eq!(a.current(), "client1");
        assert_eq!(b.current(), "public");
    }
}
