use ::async_trait::async_trait;
use ::domain::Bitrate;
use ::domain::VideoId;
use ::domain::VideoMetadata;
use ::domain::VideoUrl;

use crate::models::descriptors::Acknowledgement;
use crate::models::descriptors::CacheLookup;
use crate::models::descriptors::Mp3Url;
use crate::models::descriptors::PartiallyResolvedVideo;
use crate::models::events::AudioDownloadEvent;
use crate::utils::aliases::BoxedStream;
use crate::utils::aliases::Fallible;
use crate::utils::aliases::MaybeOwnedPath;

/// The remote conversion backend, one method per call it exposes.
#[async_trait]
pub trait ConversionService: Send + Sync {
    async fn check_database(self: ::std::sync::Arc<Self>, id: &VideoId, bitrate: Bitrate) -> Fallible<CacheLookup>;

    async fn get_video_data(self: ::std::sync::Arc<Self>, url: &VideoUrl) -> Fallible<VideoMetadata>;

    async fn download_video(
        self: ::std::sync::Arc<Self>, url: &VideoUrl, metadata: &VideoMetadata, bitrate: Bitrate,
    ) -> Fallible<Mp3Url>;

    async fn insert_to_database(
        self: ::std::sync::Arc<Self>, video: &PartiallyResolvedVideo, mp3_url: &Mp3Url, bitrate: Bitrate,
    ) -> Fallible<Acknowledgement>;
}

#[async_trait]
pub trait AudioDownloader: Send + Sync {
    /// Fails early if the CDN refuses to serve MP3 data. Failures once bytes
    /// are flowing arrive through the stream.
    async fn download(
        self: ::std::sync::Arc<Self>, video: PartiallyResolvedVideo, mp3_url: Mp3Url, destination: MaybeOwnedPath,
    ) -> Fallible<BoxedStream<Fallible<AudioDownloadEvent>>>;
}

#[async_trait]
pub trait AudioRepository: Send + Sync {
    async fn find(self: ::std::sync::Arc<Self>, id: &VideoId) -> Fallible<Option<MaybeOwnedPath>>;

    async fn locate(self: ::std::sync::Arc<Self>, id: &VideoId) -> Fallible<MaybeOwnedPath>;
}
