#[cfg(test)]
use std::collections::VecDeque;

use bytes::Bytes;
use reqwest::Response;

/// Reading the response body failed midway.
#[derive(Debug, PartialEq, Eq)]
pub struct Error(pub String);

/// A source of body chunks.
pub enum Chunks {
    Response(Response),
    #[cfg(test)]
    Fixed(VecDeque<Bytes>),
}

impl Chunks {
    #[inline]
    pub fn from_response(response: Response) -> Self {
        Chunks::Response(response)
    }

    #[cfg(test)]
    pub fn from_fixed<I: IntoIterator<Item = Bytes>>(chunks: I) -> Self {
        Chunks::Fixed(chunks.into_iter().collect())
    }

    /// Returns the next chunk, or `None` once the body is exhausted.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        match self {
            Chunks::Response(response) => {
                response.chunk().await.map_err(|err| Error(err.to_string()))
            }
            #[cfg(test)]
            Chunks::Fixed(chunks) => Ok(chunks.pop_front()),
        }
    }
}
