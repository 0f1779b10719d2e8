//! Built-in core-ops link library.
//!
//! Small, composable links for moving values through the store, asserting
//! run preconditions, and inspecting state. Domain-heavy processing lives
//! outside the engine; these are the pieces nearly every pipeline needs.

pub mod assert_in_store;
pub mod copy_value;
pub mod delete_keys;
pub mod print_store;
pub mod repeat_source;
pub mod set_value;
pub mod store_inspector;

pub use assert_in_store::AssertInStore;
pub use copy_value::CopyValue;
pub use delete_keys::DeleteKeys;
pub use print_store::PrintStore;
pub use repeat_source::RepeatSource;
pub use set_value::SetValue;
pub use store_inspector::StoreInspector;

use crate::assembly::LinkRegistry;

/// Registers every built-in link kind.
pub fn register_builtins(registry: &mut LinkRegistry) {
    registry.register(SetValue::KIND, SetValue::from_doc);
    registry.register(AssertInStore::KIND, AssertInStore::from_doc);
    registry.register(CopyValue::KIND, CopyValue::from_doc);
    registry.register(DeleteKeys::KIND, DeleteKeys::from_doc);
    registry.register(PrintStore::KIND, PrintStore::from_doc);
    registry.register(StoreInspector::KIND, StoreInspector::from_doc);
    registry.register(RepeatSource::KIND, RepeatSource::from_doc);
}
