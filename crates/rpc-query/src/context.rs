//! Handler context
//!
//! Every local procedure handler receives the router's application context
//! wrapped in a [`Context`].

use std::ops::Deref;

/// Application context handed to handlers.
#[derive(Debug, Clone)]
pub struct Context<Ctx> {
    inner: Ctx,
}

impl<Ctx> Context<Ctx> {
    /// Wrap an application context.
    pub fn new(inner: Ctx) -> Self {
        Self { inner }
    }

    /// The application context.
    pub fn inner(&self) -> &Ctx {
        &self.inner
    }

    /// Unwrap the application context.
    pub fn into_inner(self) -> Ctx {
        self.inner
    }
}

impl<Ctx> Deref for Context<Ctx> {
    type Target = Ctx;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Context of routers that need none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmptyContext;
