// Chunked streaming of dashboard updates as length-prefixed JSON frames
use crate::domain::dashboard::Dashboard;
use crate::infrastructure::http_response::brotli_compress;
use crate::infrastructure::view_mapper::{DashboardDto, dashboard_to_dto};
use axum::body::Body;
use axum::http::{Response, StatusCode, header};
use axum::response::IntoResponse;
use bytes::{BufMut, Bytes, BytesMut};
use futures::StreamExt;
use futures::stream::Stream;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

pub const FRAME_CONTENT_TYPE: &str = "application/x-dashboard-frames";

/// Create a chunked response with one frame per dashboard
pub fn chunked_json_stream<S>(stream: S, compress: bool) -> Result<Response<Body>, StatusCode>
where
    S: Stream<Item = DashboardDto> + Send + 'static,
{
    let byte_stream = stream.then(move |dto| async move { serialize_frame(dto, compress).await });

    // Frames are compressed individually, so no Content-Encoding header.
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, FRAME_CONTENT_TYPE)
        .body(Body::from_stream(byte_stream))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Serialize one dashboard as a frame: 4-byte big-endian length, then the payload
pub async fn serialize_frame(dto: DashboardDto, compress: bool) -> Result<Bytes, std::io::Error> {
    let json = serde_json::to_vec(&dto).map_err(std::io::Error::other)?;

    let payload = if compress {
        brotli_compress(json).await?
    } else {
        json
    };

    let mut frame = BytesMut::with_capacity(4 + payload.len());
    frame.put_u32(payload.len() as u32);
    frame.put_slice(&payload);

    Ok(frame.freeze())
}

/// Stream the current dashboard followed by every later update
pub fn stream_from_updates(
    initial: DashboardDto,
    rx: broadcast::Receiver<Dashboard>,
    compress: bool,
) -> impl IntoResponse {
    let stream = async_stream::stream! {
        yield initial;

        let mut updates = BroadcastStream::new(rx);
        while let Some(update) = updates.next().await {
            match update {
                Ok(dashboard) => yield dashboard_to_dto(&dashboard),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!("Dashboard stream lagged, skipped {} updates", skipped);
                }
            }
        }
    };

    match chunked_json_stream(stream, compress) {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}
