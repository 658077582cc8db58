use async_trait::async_trait;

use crate::core::context::RequestContext;
use crate::core::response::Response;

///
/// What a piece of middleware decided: carry on with a (possibly changed)
/// context, or stop here with a response of its own.
///
pub enum Flow {
    Continue(RequestContext),
    Halt(Response),
}

///
/// A stage run on every request before routing. Middleware that wants work
/// done after the response (persisting something, say) spawns it and returns
/// `Flow::Continue` right away.
///
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, context: RequestContext) -> Flow;
}

///
/// The ordered list of middleware. Order is registration order and matters:
/// each stage sees the context as the previous stage left it.
///
#[derive(Default)]
pub struct MiddlewareChain {
    middleware: Vec<Box<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        MiddlewareChain {
            middleware: Vec::new(),
        }
    }

    pub fn push<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middleware.push(Box::new(middleware));
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    ///
    /// Run every stage in order. Returns the final context if all of them
    /// continued, or the response of the first one that halted.
    ///
    pub async fn apply(&self, mut context: RequestContext) -> Flow {
        for (index, middleware) in self.middleware.iter().enumerate() {
            match middleware.handle(context).await {
                Flow::Continue(next) => context = next,
                Flow::Halt(response) => {
                    debug!(
                        "Middleware {} of {} answered the request itself",
                        index + 1,
                        self.middleware.len()
                    );
                    return Flow::Halt(response);
                }
            }
        }

        Flow::Continue(context)
    }
}
