use ::async_trait::async_trait;
use ::domain::Bitrate;
use ::domain::VideoId;
use ::domain::VideoMetadata;
use ::domain::VideoUrl;
use ::use_cases::gateways::ConversionService;
use ::use_cases::models::descriptors::Acknowledgement;
use ::use_cases::models::descriptors::CacheLookup;
use ::use_cases::models::descriptors::CacheMiss;
use ::use_cases::models::descriptors::CachedAudio;
use ::use_cases::models::descriptors::Mp3Url;
use ::use_cases::models::descriptors::PartiallyResolvedVideo;
use ::use_cases::models::descriptors::Step;
use ::use_cases::models::errors::StepError;

use crate::utils::aliases::Fallible;
use crate::utils::aliases::MaybeOwnedString;
use crate::utils::extensions::ResultExt as _;

pub const DEFAULT_BASE_URL: &str = "https://cnvmp3.com";

/// `formatValue` the backend expects for MP3 output. MP4 would be `0`.
const MP3_FORMAT_VALUE: u8 = 1;

/// Client for the undocumented JSON API behind cnvmp3.com.
#[derive(::bon::Builder)]
pub struct Cnvmp3Client {
    #[builder(default)]
    http: ::reqwest::Client,

    #[builder(into, default = MaybeOwnedString::Borrowed(DEFAULT_BASE_URL))]
    base_url: MaybeOwnedString,

    #[builder(default)]
    endpoints: Cnvmp3Endpoints,
}

/// Paths of the four backend calls, relative to the base URL.
#[derive(Debug, Clone, ::bon::Builder)]
#[builder(on(MaybeOwnedString, into))]
pub struct Cnvmp3Endpoints {
    #[builder(default = MaybeOwnedString::Borrowed("/check_database.php"))]
    pub check_database: MaybeOwnedString,

    #[builder(default = MaybeOwnedString::Borrowed("/get_video_data.php"))]
    pub get_video_data: MaybeOwnedString,

    #[builder(default = MaybeOwnedString::Borrowed("/download_video.php"))]
    pub download_video: MaybeOwnedString,

    #[builder(default = MaybeOwnedString::Borrowed("/insert_to_database.php"))]
    pub insert_to_database: MaybeOwnedString,
}

impl Default for Cnvmp3Endpoints {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[async_trait]
impl ConversionService for Cnvmp3Client {
    async fn check_database(self: ::std::sync::Arc<Self>, id: &VideoId, bitrate: Bitrate) -> Fallible<CacheLookup> {
        let payload = schema::CheckDatabaseRequest {
            format_value: MP3_FORMAT_VALUE,
            quality: bitrate.code(),
            youtube_id: id,
        };

        let reply: schema::Reply<schema::CheckDatabaseHit> =
            self.post(Step::CheckDatabase, &self.endpoints.check_database, &payload).await?;

        let lookup = match reply {
            schema::Reply::Success(hit) => CacheLookup::Hit(
                CachedAudio::builder()
                    .mp3_url(hit.data.server_path)
                    .metadata(VideoMetadata { title: hit.data.title.map(Into::into) })
                    .build(),
            ),
            schema::Reply::Failure(failure) => CacheLookup::Miss(CacheMiss::builder().reason(failure.describe()).build()),
        };

        ::tracing::info!(%id, hit = matches!(lookup, CacheLookup::Hit(_)), "checked backend cache");

        Ok(lookup)
    }

    async fn get_video_data(self: ::std::sync::Arc<Self>, url: &VideoUrl) -> Fallible<VideoMetadata> {
        ::tracing::debug!(%url, kind = %url.kind(), "resolving video");

        let url = url.canonical();
        let payload = schema::VideoDataRequest { url: &url };

        let reply: schema::Reply<schema::VideoData> =
            self.post(Step::GetVideoData, &self.endpoints.get_video_data, &payload).await?;

        let data = reply.succeeded(Step::GetVideoData)?;

        ::tracing::info!(%url, title = %data.title, "fetched video data");

        Ok(VideoMetadata { title: Some(data.title.into()) })
    }

    async fn download_video(
        self: ::std::sync::Arc<Self>, url: &VideoUrl, metadata: &VideoMetadata, bitrate: Bitrate,
    ) -> Fallible<Mp3Url> {
        let url = url.canonical();
        let payload = schema::DownloadVideoRequest {
            format_value: MP3_FORMAT_VALUE,
            quality: bitrate.code(),
            title: metadata.title.as_deref().unwrap_or_default(),
            url: &url,
        };

        let reply: schema::Reply<schema::ConvertedVideo> =
            self.post(Step::DownloadVideo, &self.endpoints.download_video, &payload).await?;

        let converted = reply.succeeded(Step::DownloadVideo)?;

        ::tracing::info!(%url, download_link = %converted.download_link, "backend converted video");

        Ok(converted.download_link.into())
    }

    async fn insert_to_database(
        self: ::std::sync::Arc<Self>, video: &PartiallyResolvedVideo, mp3_url: &Mp3Url, bitrate: Bitrate,
    ) -> Fallible<Acknowledgement> {
        let payload = schema::InsertToDatabaseRequest {
            format_value: MP3_FORMAT_VALUE,
            quality: bitrate.code(),
            server_path: mp3_url,
            title: video.metadata.title.as_deref().unwrap_or_default(),
            youtube_id: &video.id,
        };

        let reply: schema::Reply<schema::Inserted> =
            self.post(Step::InsertToDatabase, &self.endpoints.insert_to_database, &payload).await?;

        let inserted = reply.succeeded(Step::InsertToDatabase)?;
        let message = inserted.message.unwrap_or_else(|| "inserted".to_owned());

        ::tracing::info!(id = %video.id, %message, "recorded conversion in backend cache");

        Ok(Acknowledgement::builder().message(message).build())
    }
}

impl Cnvmp3Client {
    async fn post<Payload, Data>(&self, step: Step, endpoint: &str, payload: &Payload) -> Result<schema::Reply<Data>, StepError>
    where
        Payload: ::serde::Serialize + ::core::marker::Sync,
        Data: ::serde::de::DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint.trim_start_matches('/'));

        ::tracing::debug!(%step, %url, "sending request");

        let response = self
            .http
            .post(&url)
            .header(::reqwest::header::ACCEPT, "application/json")
            .json(payload)
            .send()
            .await
            .or_fail(step, None)?;

        let status = response.status();
        let body = response.text().await.or_fail(step, Some(status.as_u16()))?;

        ::tracing::debug!(%step, %status, body_len = body.len(), "received response");

        if !status.is_success() {
            return Err(StepError::new(step, Some(status.as_u16()), excerpt(&body)));
        }

        schema::Reply::parse(&body)
            .map_err(|err| StepError::new(step, None, format!("unexpected response ({}): {}", err, excerpt(&body))))
    }
}

fn excerpt(body: &str) -> String {
    const LIMIT: usize = 200;

    let body = body.trim();
    match body.char_indices().nth(LIMIT) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None if body.is_empty() => "empty response body".to_owned(),
        None => body.to_owned(),
    }
}

mod schema {
    use ::serde::Deserialize as _;
    use ::use_cases::models::descriptors::Step;
    use ::use_cases::models::errors::StepError;

    #[derive(Debug, ::serde::Serialize)]
    pub struct CheckDatabaseRequest<'a> {
        #[serde(rename = "formatValue")]
        pub format_value: u8,
        pub quality: u8,
        pub youtube_id: &'a str,
    }

    #[derive(Debug, ::serde::Serialize)]
    pub struct VideoDataRequest<'a> {
        pub url: &'a str,
    }

    #[derive(Debug, ::serde::Serialize)]
    pub struct DownloadVideoRequest<'a> {
        #[serde(rename = "formatValue")]
        pub format_value: u8,
        pub quality: u8,
        pub title: &'a str,
        pub url: &'a str,
    }

    #[derive(Debug, ::serde::Serialize)]
    pub struct InsertToDatabaseRequest<'a> {
        #[serde(rename = "formatValue")]
        pub format_value: u8,
        pub quality: u8,
        pub server_path: &'a str,
        pub title: &'a str,
        pub youtube_id: &'a str,
    }

    /// `data.quality` comes back as a string and `id`/`youtube_id` echo the
    /// request, so only the fields the pipeline needs are read.
    #[derive(Debug, ::serde::Deserialize)]
    pub struct CheckDatabaseHit {
        pub data: CachedEntry,
    }

    #[derive(Debug, ::serde::Deserialize)]
    pub struct CachedEntry {
        pub server_path: String,

        #[serde(default)]
        pub title: Option<String>,
    }

    #[derive(Debug, ::serde::Deserialize)]
    pub struct VideoData {
        pub title: String,
    }

    #[derive(Debug, ::serde::Deserialize)]
    pub struct ConvertedVideo {
        pub download_link: String,
    }

    #[derive(Debug, ::serde::Deserialize)]
    pub struct Inserted {
        #[serde(default)]
        pub message: Option<String>,
    }

    #[derive(Debug, Default, ::serde::Deserialize)]
    pub struct Failure {
        #[serde(default)]
        pub error: Option<String>,

        /// An integer code on the live service; strings are tolerated too.
        #[serde(default, rename = "errorType")]
        pub error_type: Option<::serde_json::Value>,
    }

    impl Failure {
        pub fn describe(&self) -> String {
            let error = self.error.as_deref().unwrap_or("backend reported failure without a reason");

            match &self.error_type {
                None | Some(::serde_json::Value::Null) => error.to_owned(),
                Some(::serde_json::Value::String(error_type)) => format!("{} ({})", error, error_type),
                Some(error_type) => format!("{} ({})", error, error_type),
            }
        }
    }

    #[derive(Debug, ::serde::Deserialize)]
    struct Outcome {
        success: bool,
    }

    /// Every response carries `success`; the rest of the body depends on it.
    #[derive(Debug)]
    pub enum Reply<Data> {
        Success(Data),
        Failure(Failure),
    }

    impl<Data> Reply<Data>
    where
        Data: ::serde::de::DeserializeOwned,
    {
        pub fn parse(body: &str) -> Result<Self, ::serde_json::Error> {
            let value: ::serde_json::Value = ::serde_json::from_str(body)?;
            let Outcome { success } = Outcome::deserialize(&value)?;

            if success {
                Ok(Self::Success(Data::deserialize(value)?))
            } else {
                Ok(Self::Failure(Failure::deserialize(value)?))
            }
        }
    }

    impl<Data> Reply<Data> {
        pub fn succeeded(self, step: Step) -> Result<Data, StepError> {
            match self {
                Self::Success(data) => Ok(data),
                Self::Failure(failure) => Err(StepError::new(step, None, failure.describe())),
            }
        }
    }

}
