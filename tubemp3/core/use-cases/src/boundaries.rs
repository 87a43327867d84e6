use ::async_trait::async_trait;
use ::domain::Bitrate;

use crate::models::descriptors::ResolvedVideo;
use crate::models::events::AudioDownloadEvent;
use crate::models::events::DiagnosticEvent;
use crate::models::events::PipelineEvent;
use crate::utils::aliases::Fallible;
use crate::utils::aliases::MaybeOwnedString;

#[async_trait]
pub trait Accept<Input>: Send + Sync {
    type Output;

    async fn accept(self: ::std::sync::Arc<Self>, input: Input) -> Fallible<Self::Output>;
}

#[async_trait]
pub trait Activate: Send + Sync {
    async fn activate(self: ::std::sync::Arc<Self>) -> Fallible<()>;
    async fn deactivate(self: ::std::sync::Arc<Self>) -> Fallible<()>;
}

#[async_trait]
pub trait Update<Event>: Send + Sync {
    async fn update(self: ::std::sync::Arc<Self>, event: &Event) -> Fallible<()>;
}

pub trait ConvertVideoOutputBoundary:
    Activate
    + Update<PipelineEvent>
    + Update<AudioDownloadEvent>
    + Update<DiagnosticEvent>
    + Update<ConvertVideoResponseModel>
{
}

impl<View> ConvertVideoOutputBoundary for View where
    View: Activate
        + Update<PipelineEvent>
        + Update<AudioDownloadEvent>
        + Update<DiagnosticEvent>
        + Update<ConvertVideoResponseModel>
{
}

#[derive(Debug, Clone, ::bon::Builder)]
pub struct ConvertVideoRequestModel {
    #[builder(into)]
    pub url: MaybeOwnedString,

    #[builder(default)]
    pub bitrate: Bitrate,

    /// Convert again even if the audio is already on disk.
    #[builder(default)]
    pub force: bool,
}

#[derive(Debug, Clone)]
pub struct ConvertVideoResponseModel {
    pub video: ResolvedVideo,
    pub source: AudioSource,
}

/// Which path through the pipeline produced the audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSource {
    /// Found on disk, nothing was requested.
    Local,
    /// The backend had converted this video before.
    BackendCache,
    /// Converted by the backend during this run.
    Converted,
}
