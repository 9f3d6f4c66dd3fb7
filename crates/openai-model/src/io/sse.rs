use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    Chunks(ChunksError),
    InvalidPayload,
}

/// Reads server-sent events from a chunk stream and yields the `data` of
/// each event.
///
/// Only the subset used by chat-completion streams is handled: `data`
/// fields (joined by `\n` when repeated) are collected, comments and the
/// `event`, `id` and `retry` fields are skipped. Carriage returns are
/// dropped on input, so both `\n` and `\r\n` line endings work.
pub struct Sse {
    buf: Vec<u8>,
    chunks: Chunks,
    exhausted: bool,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            chunks,
            exhausted: false,
        }
    }

    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            if let Some(event) = self.try_parse_event()? {
                return Ok(Some(event));
            }
            if self.exhausted {
                if !self.buf.iter().all(u8::is_ascii_whitespace) {
                    trace!("dropping an unterminated event");
                }
                return Ok(None);
            }

            match self.chunks.next_chunk().await.map_err(Error::Chunks)? {
                Some(bytes) => self
                    .buf
                    .extend(bytes.iter().copied().filter(|b| *b != b'\r')),
                None => self.exhausted = true,
            }
        }
    }

    fn try_parse_event(&mut self) -> Result<Option<String>, Error> {
        // event         = *( comment / field ) end-of-line
        // comment       = colon *any-char end-of-line
        // field         = 1*name-char [ colon [ space ] *any-char ] end-of-line
        while let Some(end) = self.buf.windows(2).position(|w| w == b"\n\n") {
            let block = self.buf.drain(..end + 2).collect::<Vec<_>>();
            let Ok(block) = str::from_utf8(&block[..end]) else {
                return Err(Error::InvalidPayload);
            };

            let mut data: Option<String> = None;
            for line in block.split('\n') {
                if line.is_empty() || line.starts_with(':') {
                    continue;
                }
                let (name, value) = match line.split_once(':') {
                    Some((name, value)) => {
                        (name, value.strip_prefix(' ').unwrap_or(value))
                    }
                    None => (line, ""),
                };
                match name {
                    "data" => {
                        let data = data.get_or_insert_default();
                        if !data.is_empty() {
                            data.push('\n');
                        }
                        data.push_str(value);
                    }
                    "event" | "id" | "retry" => {}
                    _ => return Err(Error::InvalidPayload),
                }
            }

            // Blocks without data (keep-alive comments) dispatch nothing.
            if let Some(data) = data {
                return Ok(Some(data));
            }
        }
        Ok(None)
    }
}
