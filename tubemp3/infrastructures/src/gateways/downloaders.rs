use ::async_trait::async_trait;
use ::futures::prelude::*;
use ::use_cases::gateways::AudioDownloader;
use ::use_cases::models::descriptors::Mp3Url;
use ::use_cases::models::descriptors::PartiallyResolvedVideo;
use ::use_cases::models::descriptors::ResolvedVideo;
use ::use_cases::models::descriptors::Step;
use ::use_cases::models::errors::StepError;
use ::use_cases::models::events::AudioDownloadCompletedEvent;
use ::use_cases::models::events::AudioDownloadEvent;
use ::use_cases::models::events::AudioDownloadProgressUpdatedEvent;
use ::use_cases::models::events::AudioDownloadStartedEvent;

use crate::utils::aliases::BoxedStream;
use crate::utils::aliases::Fallible;
use crate::utils::aliases::MaybeOwnedPath;
use crate::utils::aliases::MaybeOwnedString;
use crate::utils::extensions::ResultExt as _;

/// The CDN only serves files to requests that appear to come from the site.
pub const DEFAULT_REFERER: &str = "https://cnvmp3.com";

/// Content types a CDN may declare for an MP3 body. An absent header is tolerated too.
const ACCEPTED_CONTENT_TYPES: &[&str] = &[
    "audio/mpeg",
    "audio/mp3",
    "audio/mpeg3",
    "audio/x-mpeg-3",
    "application/octet-stream",
    "binary/octet-stream",
];

/// Streams converted MP3 files from the CDN to disk.
#[derive(::bon::Builder)]
pub struct HttpAudioDownloader {
    #[builder(default)]
    http: ::reqwest::Client,

    #[builder(into, default = MaybeOwnedString::Borrowed(DEFAULT_REFERER))]
    referer: MaybeOwnedString,
}

#[async_trait]
impl AudioDownloader for HttpAudioDownloader {
    async fn download(
        self: ::std::sync::Arc<Self>, video: PartiallyResolvedVideo, mp3_url: Mp3Url, destination: MaybeOwnedPath,
    ) -> Fallible<BoxedStream<Fallible<AudioDownloadEvent>>> {
        const STEP: Step = Step::DownloadFile;

        ::tracing::debug!(%mp3_url, destination = %destination.display(), "requesting audio");

        let response = self
            .http
            .get(&*mp3_url)
            .header(::reqwest::header::REFERER, &*self.referer)
            .send()
            .await
            .or_fail(STEP, None)?;

        let status = response.status();
        if !status.is_success() {
            return Err(StepError::new(STEP, Some(status.as_u16()), format!("CDN refused to serve {}", mp3_url)).into());
        }

        let content_type = response
            .headers()
            .get(::reqwest::header::CONTENT_TYPE)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

        if !is_audio_content_type(content_type.as_deref()) {
            return Err(StepError::new(
                STEP,
                Some(status.as_u16()),
                format!("expected MP3 data but the CDN declared {}", content_type.unwrap_or_default()),
            )
            .into());
        }

        let total_bytes = response.content_length();

        ::tracing::info!(%mp3_url, ?total_bytes, "downloading audio");

        let (events_tx, events_rx) = ::tokio::sync::mpsc::unbounded_channel();

        ::tokio::spawn(async move {
            let partial_destination = partial_path(&destination);

            let result = transfer(video, response, &partial_destination, destination, total_bytes, &events_tx).await;

            if let Err(err) = result {
                ::tracing::warn!(error = %format!("{:#}", err), "audio download failed");

                if let Err(err) = ::tokio::fs::remove_file(&partial_destination).await {
                    if err.kind() != ::std::io::ErrorKind::NotFound {
                        ::tracing::warn!(%err, path = %partial_destination.display(), "could not remove partial file");
                    }
                }

                let _ = events_tx.send(Err(err));
            }
        });

        Ok(::std::boxed::Box::pin(::tokio_stream::wrappers::UnboundedReceiverStream::new(events_rx)))
    }
}

async fn transfer(
    video: PartiallyResolvedVideo, response: ::reqwest::Response, partial_destination: &::std::path::Path,
    destination: MaybeOwnedPath, total_bytes: Option<u64>,
    events: &::tokio::sync::mpsc::UnboundedSender<Fallible<AudioDownloadEvent>>,
) -> Fallible<()> {
    use ::tokio::io::AsyncWriteExt as _;

    const STEP: Step = Step::DownloadFile;

    events.send(Ok(AudioDownloadEvent::Started(
        AudioDownloadStartedEvent::builder()
            .video(video.clone())
            .maybe_total_bytes(total_bytes)
            .build(),
    )))?;

    let mut file = ::tokio::fs::File::create(partial_destination).await.or_fail(STEP, None)?;

    let started_at = ::std::time::Instant::now();
    let mut downloaded_bytes = 0_u64;
    let mut head = Vec::with_capacity(SNIFF_LEN);

    let mut chunks = response.bytes_stream();

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.or_fail(STEP, None)?;

        if head.len() < SNIFF_LEN {
            head.extend(chunk.iter().take(SNIFF_LEN - head.len()));

            if head.len() == SNIFF_LEN && !looks_like_mp3(&head) {
                return Err(StepError::new(STEP, None, "downloaded content is not an MP3 file").into());
            }
        }

        file.write_all(&chunk).await.or_fail(STEP, None)?;
        downloaded_bytes += chunk.len() as u64;

        events.send(Ok(AudioDownloadEvent::ProgressUpdated(
            AudioDownloadProgressUpdatedEvent::builder()
                .downloaded_bytes(downloaded_bytes)
                .maybe_total_bytes(total_bytes)
                .elapsed(started_at.elapsed())
                .build(),
        )))?;
    }

    if !looks_like_mp3(&head) {
        return Err(StepError::new(STEP, None, "downloaded content is not an MP3 file").into());
    }

    file.flush().await.or_fail(STEP, None)?;
    drop(file);

    ::tokio::fs::rename(partial_destination, &destination)
        .await
        .or_fail(STEP, None)?;

    ::tracing::info!(path = %destination.display(), downloaded_bytes, "saved audio");

    let video = ResolvedVideo::builder()
        .id(video.id)
        .url(video.url)
        .metadata(video.metadata)
        .path(destination)
        .build();

    events.send(Ok(AudioDownloadEvent::Completed(
        AudioDownloadCompletedEvent::builder()
            .video(video)
            .downloaded_bytes(downloaded_bytes)
            .build(),
    )))?;

    Ok(())
}

fn partial_path(destination: &::std::path::Path) -> ::std::path::PathBuf {
    let mut path = destination.as_os_str().to_owned();
    path.push(".part");
    path.into()
}

fn is_audio_content_type(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return true;
    };

    let essence = content_type.split(';').next().unwrap_or_default().trim();

    ACCEPTED_CONTENT_TYPES
        .iter()
        .any(|accepted| accepted.eq_ignore_ascii_case(essence))
}

const SNIFF_LEN: usize = 3;

/// An ID3v2 tag, or the 11-bit sync word of an MPEG audio frame.
fn looks_like_mp3(head: &[u8]) -> bool {
    match head {
        [b'I', b'D', b'3', ..] => true,
        [0xFF, second, ..] => second & 0xE0 == 0xE0,
        _ => false,
    }
}
