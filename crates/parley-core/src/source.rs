//! Streaming source abstraction over the language-model backend.

use std::sync::Arc;

use futures::stream::BoxStream;

use crate::Result;

/// Lazy, ordered and finite sequence of text fragments for one request.
///
/// The stream may yield an error at any point, after which no further
/// fragments are consumed.
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// Producer of text fragments for a single prompt.
///
/// Implementations must not buffer the whole response before yielding:
/// fragments are consumed and published one by one.
#[async_trait::async_trait]
pub trait FragmentSource: Send + Sync {
    /// Starts generating a response for `prompt`.
    ///
    /// Failing to open the stream is treated by the aggregator exactly like
    /// a failure raised mid-stream.
    async fn open(&self, prompt: &str) -> Result<FragmentStream>;
}

#[async_trait::async_trait]
impl<T> FragmentSource for Arc<T>
where
    T: FragmentSource + ?Sized,
{
    async fn open(&self, prompt: &str) -> Result<FragmentStream> {
        (**self).open(prompt).await
    }
}
