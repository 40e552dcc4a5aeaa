//! One request, one response, then close.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tokio_util::codec::{Framed, LinesCodecError};
use tracing::debug;

use crate::dispatch::DispatchTable;
use crate::protocol::{self, ProtocolError, Request, Response};
use crate::{CourierError, Result};

/// Serve exactly one call on an established stream.
///
/// Reading the request line is bounded by `read_timeout`, and so is writing
/// the response. The handler runs on the blocking pool. Requests that cannot be decoded are answered with an error
/// response. A peer that stalls or disconnects before sending a full line
/// gets no response and produces a [`CourierError::Connection`].
pub async fn handle_connection<S>(
    stream: S,
    table: &DispatchTable,
    read_timeout: Duration,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(stream, protocol::envelope_codec());

    let response = match timeout(read_timeout, framed.next()).await {
        Err(_) => {
            return Err(CourierError::Connection(format!(
                "no request within {read_timeout:?}"
            )));
        }
        Ok(None) => {
            return Err(CourierError::Connection(
                "peer closed the connection before sending a request".to_string(),
            ));
        }
        Ok(Some(Err(LinesCodecError::MaxLineLengthExceeded))) => {
            Response::from(ProtocolError::EnvelopeTooLarge {
                limit: protocol::MAX_ENVELOPE_BYTES,
            })
        }
        Ok(Some(Err(LinesCodecError::Io(e)))) => return Err(e.into()),
        Ok(Some(Ok(line))) => match Request::decode(&line) {
            Ok(request) => {
                debug!(method = %request.method, "request received");
                table.dispatch_blocking(request).await
            }
            Err(e) => {
                debug!(error = %e, "rejecting malformed request");
                Response::from(e)
            }
        },
    };

    let line = response.encode()?;
    timeout(read_timeout, async {
        framed.send(line).await?;
        SinkExt::<String>::close(&mut framed).await
    })
    .await
    .map_err(|_| CourierError::Connection("writing the response timed out".to_string()))??;

    Ok(())
}
