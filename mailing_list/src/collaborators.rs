use crate::domain::{Notifier, UserDirectory};
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

type DirectoryFactory = Box<
    dyn Fn() -> BoxFuture<'static, Result<Arc<dyn UserDirectory>, anyhow::Error>> + Send + Sync,
>;
type NotifierFactory =
    Box<dyn Fn() -> BoxFuture<'static, Result<Arc<dyn Notifier>, anyhow::Error>> + Send + Sync>;

/// Collaborators used when an enrollment request does not bring its own.
///
/// Each default is built by a factory the first time a request needs it and
/// cached afterwards. Requests that override a collaborator never trigger its
/// factory, so tests that substitute doubles never touch the real backends.
pub struct DefaultCollaborators {
    directory_factory: DirectoryFactory,
    notifier_factory: NotifierFactory,
    directory: OnceCell<Arc<dyn UserDirectory>>,
    notifier: OnceCell<Arc<dyn Notifier>>,
}

impl DefaultCollaborators {
    pub fn new<D, DFut, N, NFut>(directory_factory: D, notifier_factory: N) -> Self
    where
        D: Fn() -> DFut + Send + Sync + 'static,
        DFut: Future<Output = Result<Arc<dyn UserDirectory>, anyhow::Error>> + Send + 'static,
        N: Fn() -> NFut + Send + Sync + 'static,
        NFut: Future<Output = Result<Arc<dyn Notifier>, anyhow::Error>> + Send + 'static,
    {
        Self {
            directory_factory: Box::new(move || directory_factory().boxed()),
            notifier_factory: Box::new(move || notifier_factory().boxed()),
            directory: OnceCell::new(),
            notifier: OnceCell::new(),
        }
    }

    #[tracing::instrument(name = "Resolving default user directory", skip(self))]
    pub async fn directory(&self) -> Result<Arc<dyn UserDirectory>, anyhow::Error> {
        self.directory
            .get_or_try_init(|| (self.directory_factory)())
            .await
            .map(Arc::clone)
    }

    #[tracing::instrument(name = "Resolving default notifier", skip(self))]
    pub async fn notifier(&self) -> Result<Arc<dyn Notifier>, anyhow::Error> {
        self.notifier
            .get_or_try_init(|| (self.notifier_factory)())
            .await
            .map(Arc::clone)
    }

    pub fn directory_is_resolved(&self) -> bool {
        self.directory.initialized()
    }

    pub fn notifier_is_resolved(&self) -> bool {
        self.notifier.initialized()
    }
}
