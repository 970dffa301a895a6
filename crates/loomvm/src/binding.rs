//! Binding and specifiers (§4.D).
//!
//! A word cell's binding is either already specific (points straight at a
//! context's varlist) or merely relative (points at an action's paramlist,
//! meaning "the Nth parameter of whichever call is currently running this
//! action body"). Relative words only become usable once paired with a
//! [`Specifier`] supplied by the array or frame they're being looked up
//! through; that's the whole reason arrays and frames carry one.

use crate::arena::NodeId;

/// What a word cell's binding slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WordBinding {
    #[default]
    Unbound,
    /// Bound directly to a context's varlist; lookup needs no specifier.
    Specific(NodeId),
    /// Bound relatively to an action's paramlist; lookup needs a
    /// [`Specifier`] to find out which call's argument slots to use.
    Relative(NodeId),
}

/// The reference that turns a relative word into a specific one, carried by
/// arrays (when bound during a function body scan) and by frames (the
/// currently-running call).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Specifier {
    #[default]
    Unbound,
    /// Resolve relative words against this context's varlist.
    Context(NodeId),
    /// Resolve relative words against this running frame's varlist.
    Frame(NodeId),
}

/// Where a (possibly relative) word binding ultimately points, once resolved
/// against a specifier: the varlist to look up the word's slot in, or
/// nothing if it was never bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedBinding {
    Unbound,
    Varlist(NodeId),
}

/// Resolves a word's binding against a specifier. A relative word paired
/// with `Unbound` resolves to nothing (relative words are never valid
/// outside a specifier context); paired with a `Context`/`Frame` specifier,
/// it resolves to that specifier's varlist.
///
/// The relative binding's own paramlist id is not checked against the
/// specifier here: producing a relative word bound to one paramlist and
/// then looking it up through an unrelated specifier is something only a
/// lexical binder could do, and that binder is an external collaborator
/// (§1) this core doesn't implement — nothing in this crate constructs
/// such a mismatched pairing.
#[must_use]
pub fn resolve(binding: WordBinding, specifier: Specifier) -> ResolvedBinding {
    match binding {
        WordBinding::Unbound => ResolvedBinding::Unbound,
        WordBinding::Specific(node) => ResolvedBinding::Varlist(node),
        WordBinding::Relative(_) => match specifier {
            Specifier::Unbound => ResolvedBinding::Unbound,
            Specifier::Context(node) | Specifier::Frame(node) => ResolvedBinding::Varlist(node),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::NodeId;

    #[test]
    fn specific_binding_ignores_specifier() {
        let node = NodeId::from_test_id(7);
        let resolved = resolve(WordBinding::Specific(node), Specifier::Unbound);
        assert_eq!(resolved, ResolvedBinding::Varlist(node));
    }

    #[test]
    fn relative_binding_needs_a_specifier() {
        let paramlist = NodeId::from_test_id(1);
        let binding = WordBinding::Relative(paramlist);
        assert_eq!(resolve(binding, Specifier::Unbound), ResolvedBinding::Unbound);
        let frame = NodeId::from_test_id(9);
        assert_eq!(
            resolve(binding, Specifier::Frame(frame)),
            ResolvedBinding::Varlist(frame)
        );
    }
}
