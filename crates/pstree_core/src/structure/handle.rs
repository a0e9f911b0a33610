//! The root handle returned by [`load_structure`](super::load_structure).

use std::cell::{Ref, RefCell};
use std::future::Future;
use std::rc::Rc;
use std::sync::Arc;

use futures::channel::oneshot;
use futures::future::Shared;
use futures::FutureExt;

use crate::structure::loader::{LoadError, LoadSummary};
use crate::tree::{NodeId, ProductTree, TreeNode};

/// Final result of a structure load, as seen by every listener.
pub type LoadOutcome = Result<LoadSummary, Arc<LoadError>>;

/// Sending half of the one-shot "loaded" notification.
///
/// Dropping it without firing (the load future was dropped) resolves every
/// listener with [`LoadError::Aborted`].
#[derive(Debug)]
pub struct LoadedSignal {
    sender: oneshot::Sender<LoadOutcome>,
}

impl LoadedSignal {
    /// Resolve the signal. Consumes it, so it can only fire once.
    pub fn fire(self, outcome: LoadOutcome) {
        // Nobody listening is fine: the handle may already be gone.
        let _ = self.sender.send(outcome);
    }
}

/// A product structure whose tree is being, or has been, populated.
///
/// The root exists as soon as the handle does; its subtree fills in while the
/// load future runs. Clones share the same tree and signal.
#[derive(Clone)]
pub struct ProductStructure {
    tree: Rc<RefCell<ProductTree>>,
    root: NodeId,
    loaded: Shared<oneshot::Receiver<LoadOutcome>>,
}

impl ProductStructure {
    /// Wrap `tree` and create the signal that reports its load outcome.
    pub fn new(tree: Rc<RefCell<ProductTree>>, root: NodeId) -> (Self, LoadedSignal) {
        let (sender, receiver) = oneshot::channel();
        let structure = Self {
            tree,
            root,
            loaded: receiver.shared(),
        };
        (structure, LoadedSignal { sender })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Borrow the tree. Do not hold the borrow across an `.await` of the load.
    pub fn tree(&self) -> Ref<'_, ProductTree> {
        self.tree.borrow()
    }

    /// Run `f` on the root node.
    pub fn with_root<R>(&self, f: impl FnOnce(&TreeNode) -> R) -> Option<R> {
        self.tree.borrow().get(self.root).map(f)
    }

    /// Resolves once with the load outcome.
    pub fn loaded(&self) -> impl Future<Output = LoadOutcome> + 'static {
        self.loaded
            .clone()
            .map(|received| received.unwrap_or_else(|_| Err(Arc::new(LoadError::Aborted))))
    }

    /// The outcome, if the load has already finished.
    pub fn outcome(&self) -> Option<LoadOutcome> {
        self.loaded().now_or_never()
    }

    /// `true` once the whole tree has been populated successfully.
    pub fn is_loaded(&self) -> bool {
        matches!(self.outcome(), Some(Ok(_)))
    }
}
