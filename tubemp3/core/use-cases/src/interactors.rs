use ::async_trait::async_trait;
use ::domain::Bitrate;
use ::domain::VideoUrl;
use ::futures::prelude::*;

use crate::boundaries::Accept;
use crate::boundaries::AudioSource;
use crate::boundaries::ConvertVideoOutputBoundary;
use crate::boundaries::ConvertVideoRequestModel;
use crate::boundaries::ConvertVideoResponseModel;
use crate::gateways::AudioDownloader;
use crate::gateways::AudioRepository;
use crate::gateways::ConversionService;
use crate::models::descriptors::CacheLookup;
use crate::models::descriptors::Mp3Url;
use crate::models::descriptors::PartiallyResolvedVideo;
use crate::models::descriptors::ResolvedVideo;
use crate::models::descriptors::Step;
use crate::models::errors::StepError;
use crate::models::events::AudioDownloadEvent;
use crate::models::events::DiagnosticEvent;
use crate::models::events::DiagnosticLevel;
use crate::models::events::PipelineEvent;
use crate::models::events::PipelineSkippedEvent;
use crate::models::events::StepCompletedEvent;
use crate::models::events::StepStartedEvent;
use crate::utils::aliases::BoxedStream;
use crate::utils::aliases::Fallible;
use crate::utils::aliases::MaybeOwnedString;

/// Runs the conversion chain for one video: cache lookup, metadata, server-side
/// conversion, cache insert, then the CDN download.
#[derive(::bon::Builder)]
pub struct ConvertVideoInteractor {
    output_boundary: ::std::sync::Arc<dyn ConvertVideoOutputBoundary>,

    service: ::std::sync::Arc<dyn ConversionService>,
    downloader: ::std::sync::Arc<dyn AudioDownloader>,
    repository: ::std::sync::Arc<dyn AudioRepository>,
}

#[async_trait]
impl Accept<ConvertVideoRequestModel> for ConvertVideoInteractor {
    type Output = ConvertVideoResponseModel;

    async fn accept(self: ::std::sync::Arc<Self>, request: ConvertVideoRequestModel) -> Fallible<ConvertVideoResponseModel> {
        let ConvertVideoRequestModel { url, bitrate, force } = request;

        let url = VideoUrl::parse(url)?;

        ::std::sync::Arc::clone(&self.output_boundary).activate().await?;

        let response = ::std::sync::Arc::clone(&self).convert(url, bitrate, force).await;

        if let Ok(ref response) = response {
            ::std::sync::Arc::clone(&self.output_boundary).update(response).await?;
        }

        ::std::sync::Arc::clone(&self.output_boundary).deactivate().await?;

        response
    }
}

#[async_trait]
impl Accept<BoxedStream<Fallible<AudioDownloadEvent>>> for ConvertVideoInteractor {
    type Output = ResolvedVideo;

    async fn accept(self: ::std::sync::Arc<Self>, events: BoxedStream<Fallible<AudioDownloadEvent>>) -> Fallible<ResolvedVideo> {
        ::futures::pin_mut!(events);

        let mut video = None;

        while let Some(event) = events.next().await {
            let event = event?;

            ::std::sync::Arc::clone(&self.output_boundary).update(&event).await?;

            if let AudioDownloadEvent::Completed(event) = event {
                video = Some(event.video);
            }
        }

        video.ok_or_else(|| StepError::new(Step::DownloadFile, None, "download ended before the file was complete").into())
    }
}

/// Attributes an error to `step` unless it already names one.
fn blame(step: Step, err: ::anyhow::Error) -> ::anyhow::Error {
    if err.is::<StepError>() {
        return err;
    }

    StepError::new(step, None, format!("{:#}", err)).into()
}

impl ConvertVideoInteractor {
    async fn convert(self: ::std::sync::Arc<Self>, url: VideoUrl, bitrate: Bitrate, force: bool) -> Fallible<ConvertVideoResponseModel> {
        let id = url.id().clone();

        if !force {
            if let Some(path) = ::std::sync::Arc::clone(&self.repository).find(&id).await? {
                let video = ResolvedVideo::builder().id(id).url(url).path(path).build();

                let event = PipelineSkippedEvent::builder().video(video.clone()).build();
                ::std::sync::Arc::clone(&self.output_boundary).update(&PipelineEvent::Skipped(event)).await?;

                return Ok(ConvertVideoResponseModel { video, source: AudioSource::Local });
            }
        }

        self.start(Step::CheckDatabase).await?;
        let lookup = ::std::sync::Arc::clone(&self.service).check_database(&id, bitrate).await?;

        match lookup {
            CacheLookup::Hit(cached) => {
                self.complete(Step::CheckDatabase, "already converted by the backend").await?;

                let video = PartiallyResolvedVideo::builder()
                    .id(id)
                    .url(url)
                    .metadata(cached.metadata)
                    .build();

                let video = ::std::sync::Arc::clone(&self).download(video, cached.mp3_url).await?;

                Ok(ConvertVideoResponseModel { video, source: AudioSource::BackendCache })
            },

            CacheLookup::Miss(miss) => {
                self.complete(Step::CheckDatabase, format!("not cached ({})", miss.reason)).await?;

                self.start(Step::GetVideoData).await?;
                let metadata = ::std::sync::Arc::clone(&self.service).get_video_data(&url).await?;
                self.complete(Step::GetVideoData, metadata.title.clone().unwrap_or_default()).await?;

                self.start(Step::DownloadVideo).await?;
                let mp3_url = ::std::sync::Arc::clone(&self.service)
                    .download_video(&url, &metadata, bitrate)
                    .await?;
                self.complete(Step::DownloadVideo, mp3_url.clone()).await?;

                let video = PartiallyResolvedVideo::builder()
                    .id(id)
                    .url(url)
                    .metadata(metadata)
                    .build();

                self.start(Step::InsertToDatabase).await?;
                match ::std::sync::Arc::clone(&self.service).insert_to_database(&video, &mp3_url, bitrate).await {
                    Ok(acknowledgement) => self.complete(Step::InsertToDatabase, acknowledgement.message).await?,
                    Err(err) => self.warn(format!("{:#}", err)).await?,
                }

                let video = ::std::sync::Arc::clone(&self).download(video, mp3_url).await?;

                Ok(ConvertVideoResponseModel { video, source: AudioSource::Converted })
            },
        }
    }

    async fn download(self: ::std::sync::Arc<Self>, video: PartiallyResolvedVideo, mp3_url: Mp3Url) -> Fallible<ResolvedVideo> {
        self.start(Step::DownloadFile).await?;

        let destination = ::std::sync::Arc::clone(&self.repository)
            .locate(&video.id)
            .await
            .map_err(|err| blame(Step::DownloadFile, err))?;
        let events = ::std::sync::Arc::clone(&self.downloader).download(video, mp3_url, destination).await?;
        let video = ::std::sync::Arc::clone(&self).accept(events).await?;

        self.complete(Step::DownloadFile, video.path.display().to_string()).await?;

        Ok(video)
    }

    async fn start(&self, step: Step) -> Fallible<()> {
        let event = StepStartedEvent::builder().step(step).build();

        ::std::sync::Arc::clone(&self.output_boundary).update(&PipelineEvent::StepStarted(event)).await
    }

    async fn complete<Summary>(&self, step: Step, summary: Summary) -> Fallible<()>
    where
        Summary: Into<MaybeOwnedString> + ::core::marker::Send,
    {
        let event = StepCompletedEvent::builder().step(step).summary(summary).build();

        ::std::sync::Arc::clone(&self.output_boundary).update(&PipelineEvent::StepCompleted(event)).await
    }

    async fn warn(&self, message: String) -> Fallible<()> {
        let event = DiagnosticEvent::builder()
            .level(DiagnosticLevel::Warning)
            .message(message)
            .build();

        ::std::sync::Arc::clone(&self.output_boundary).update(&event).await
    }
}
