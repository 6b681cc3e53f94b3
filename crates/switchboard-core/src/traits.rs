use futures::future::BoxFuture;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::ChatMessage;

/// Handler: one specialized dialogue agent backed by a language model.
///
/// The transition engine only ever sees these three operations; everything
/// else about a handler (model, tools, temperature) stays behind the trait.
pub trait Handler: Send + Sync + 'static {
    /// Unique agent name (the routing key).
    fn name(&self) -> &str;

    /// Static system prompt for this agent.
    fn system_message(&self) -> &str;

    /// Run the model over `messages` and stream back text fragments.
    ///
    /// The returned stream is finite. An `Err` from the future or from the
    /// stream is a backend failure.
    fn execute(
        &self,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<BoxStream<'_, Result<String>>>>;
}
