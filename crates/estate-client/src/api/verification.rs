use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream::{self, Stream};
use reqwest::multipart::{Form, Part};
use tracing::{debug, info, warn};

use super::{message_in, ApiClient};
use crate::error::ClientError;
use crate::outcome::Outcome;
use crate::session::SessionStore;
use crate::upload::{
    ByteMeter, FileDescriptor, MultipartUpload, PendingUploadSet, UploadProgress,
    VerificationRequest,
};

const UPLOAD_FAILED: &str = "Unable to upload your documents, please try again";
const CHUNK_SIZE: usize = 64 * 1024;

struct LoadedFile {
    part_name: String,
    descriptor: FileDescriptor,
    contents: Bytes,
}

impl<S> ApiClient<S>
where
    S: SessionStore + 'static,
{
    /// `POST /property/verify` with the owner's details and the three documents.
    pub async fn submit_verification(
        &self,
        request: &VerificationRequest,
        files: &PendingUploadSet,
        progress: &UploadProgress,
    ) -> Outcome<()> {
        self.submit_multipart_upload("property/verify", request.to_upload(files), progress)
            .await
    }

    /// Send `upload` as multipart to `path`.
    ///
    /// Missing required parts fail before any I/O. While the body streams,
    /// `progress` sees non-decreasing percentages; when this returns, whatever
    /// the result, it reads not-in-progress at 0%.
    pub async fn submit_multipart_upload(
        &self,
        path: &str,
        upload: MultipartUpload,
        progress: &UploadProgress,
    ) -> Outcome<()> {
        if let Err(err) = upload.validate() {
            debug!(path, error = %err, "upload rejected before sending");
            return Err(err.into_failure(UPLOAD_FAILED));
        }

        let _reset = progress.begin();
        match self.send_multipart(path, upload, progress).await {
            Ok(bytes) => {
                info!(path, bytes, "upload complete");
                Ok(())
            }
            Err(err) => {
                warn!(path, error = %err, "upload failed");
                Err(err.into_failure(UPLOAD_FAILED))
            }
        }
    }

    async fn send_multipart(
        &self,
        path: &str,
        upload: MultipartUpload,
        progress: &UploadProgress,
    ) -> Result<u64, ClientError> {
        let segments: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();
        let url = self.endpoint(&segments)?;

        let mut loaded = Vec::with_capacity(upload.files.len());
        for part in upload.files {
            if let Some(descriptor) = part.file {
                let contents = tokio::fs::read(&descriptor.location)
                    .await
                    .map_err(|source| ClientError::File {
                        path: descriptor.location.clone(),
                        source,
                    })?;
                loaded.push(LoadedFile {
                    part_name: part.name,
                    descriptor,
                    contents: Bytes::from(contents),
                });
            }
        }

        let total: u64 = loaded.iter().map(|file| file.contents.len() as u64).sum();
        let meter = Arc::new(ByteMeter::new(total));

        let mut form = Form::new();
        for field in upload.fields {
            if field.required || !field.value.is_empty() {
                form = form.text(field.name, field.value);
            }
        }
        for file in loaded {
            let length = file.contents.len() as u64;
            let body = reqwest::Body::wrap_stream(metered_chunks(
                file.contents,
                Arc::clone(&meter),
                progress.clone(),
            ));
            let part = Part::stream_with_length(body, length)
                .file_name(file.descriptor.display_name)
                .mime_str(file.descriptor.media_type.as_ref())?;
            form = form.part(file.part_name, part);
        }

        let response = self.http.post(url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Server {
                status: Some(status),
                message: message_in(&body),
            });
        }

        progress.report(100);
        Ok(total)
    }
}

/// Split `contents` into chunks that advance `meter` as the transport pulls them.
fn metered_chunks(
    contents: Bytes,
    meter: Arc<ByteMeter>,
    progress: UploadProgress,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    let length = contents.len();
    let chunks: Vec<Bytes> = (0..length)
        .step_by(CHUNK_SIZE)
        .map(|start| contents.slice(start..(start + CHUNK_SIZE).min(length)))
        .collect();

    stream::iter(chunks.into_iter().map(move |chunk| {
        progress.report(meter.advance(chunk.len() as u64));
        Ok(chunk)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use std::sync::Mutex;

    #[tokio::test]
    async fn metered_chunks_report_as_they_are_pulled() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress = UploadProgress::with_listener(move |percent| {
            sink.lock().expect("progress mutex").push(percent);
        });
        let contents = Bytes::from(vec![7u8; CHUNK_SIZE * 4]);
        let meter = Arc::new(ByteMeter::new(contents.len() as u64));

        let chunks: Vec<_> = metered_chunks(contents, meter, progress.clone())
            .collect()
            .await;

        assert_eq!(chunks.len(), 4);
        assert_eq!(
            seen.lock().expect("progress mutex").clone(),
            vec![25, 50, 75, 100]
        );
    }
}
