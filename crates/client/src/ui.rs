//! Seams for the user-facing side effects of a mutation.

use std::sync::Arc;

use async_trait::async_trait;

pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

#[async_trait]
pub trait Confirmer: Send + Sync {
    /// Returns false when the user cancels.
    async fn confirm(&self, prompt: &str) -> bool;

    /// Blocking error dialog for a confirmed action that then failed.
    async fn alert(&self, message: &str);
}

pub trait Navigator: Send + Sync {
    fn back(&self);
}

#[derive(Clone)]
pub struct UiPorts {
    pub notifier: Arc<dyn Notifier>,
    pub confirmer: Arc<dyn Confirmer>,
    pub navigator: Arc<dyn Navigator>,
}

impl UiPorts {
    /// One value serving all three seams.
    pub fn shared<T>(ui: Arc<T>) -> Self
    where
        T: Notifier + Confirmer + Navigator + 'static,
    {
        Self { notifier: ui.clone(), confirmer: ui.clone(), navigator: ui }
    }
}
